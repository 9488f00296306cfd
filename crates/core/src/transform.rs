//! Transformer: validated parse tree -> soul schema JSON document.
//!
//! The output is a plain `Serialize` tree. Field order in the JSON follows
//! field order in these structs.

use crate::parser::ParseTree;
use crate::SOUL_SCHEMA_VERSION;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Runtime block type in the output schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BlockType {
    Python,
    Js,
    Web,
    Quantum,
    Native,
    Blueprint,
    Language,
}

impl BlockType {
    /// Map a block language to its runtime type. Unlisted languages fall
    /// back to `LANGUAGE`.
    pub fn from_language(language: &str) -> Self {
        match language.to_lowercase().as_str() {
            "python" => BlockType::Python,
            "javascript" | "js" => BlockType::Js,
            "web" => BlockType::Web,
            "quantum" => BlockType::Quantum,
            "native" => BlockType::Native,
            "blueprint" => BlockType::Blueprint,
            _ => BlockType::Language,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BlockType::Python => "PYTHON",
            BlockType::Js => "JS",
            BlockType::Web => "WEB",
            BlockType::Quantum => "QUANTUM",
            BlockType::Native => "NATIVE",
            BlockType::Blueprint => "BLUEPRINT",
            BlockType::Language => "LANGUAGE",
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SoulBlock {
    pub idx: usize,
    #[serde(rename = "type")]
    pub block_type: BlockType,
    pub code: String,
    pub parameters: BTreeMap<String, Value>,
}

/// Versioned output document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputSchema {
    pub version: String,
    pub blocks: Vec<SoulBlock>,
}

impl OutputSchema {
    pub fn to_json_value(&self) -> Value {
        // Serializing plain structs of strings and maps cannot fail.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

pub fn transform(tree: &ParseTree) -> OutputSchema {
    let blocks = tree
        .blocks
        .iter()
        .enumerate()
        .map(|(idx, block)| SoulBlock {
            idx,
            block_type: BlockType::from_language(&block.language),
            code: block.body.clone(),
            parameters: BTreeMap::new(),
        })
        .collect();

    OutputSchema {
        version: SOUL_SCHEMA_VERSION.to_owned(),
        blocks,
    }
}
