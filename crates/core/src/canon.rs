//! Canon rule store: the authoritative list of schools, operations and
//! block types, loaded from a YAML lock document.
//!
//! ```yaml
//! schools:
//!   alchemy:
//!     name: Alchemy
//!     law:
//!       operations:
//!         - name: "alchemy:transmute"
//! block_types: [PYTHON, JS]   # optional
//! ```

use crate::error::RitualError;
use crate::source::SourceProvider;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

/// Canon location, relative to the tool, used when neither a flag nor the
/// environment names one.
pub const DEFAULT_CANON_PATH: &str = "lexicon/canon.lock.yaml";
/// The repository canon, used when no file is found beside the tool.
pub const SHIPPED_CANON: &str = include_str!("../../../lexicon/canon.lock.yaml");
/// Environment variable overriding [`DEFAULT_CANON_PATH`].
pub const CANON_PATH_ENV: &str = "CODECRAFT_CANON";

/// Block types the runtime accepts when the canon does not list its own.
pub const DEFAULT_BLOCK_TYPES: [&str; 8] = [
    "PYTHON",
    "JS",
    "JAVASCRIPT",
    "WEB",
    "QUANTUM",
    "NATIVE",
    "BLUEPRINT",
    "LANGUAGE",
];

// ── On-disk document ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CanonDocument {
    #[serde(default)]
    schools: Option<serde_yaml::Mapping>,
    #[serde(default)]
    block_types: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct SchoolEntry {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    law: LawEntry,
}

#[derive(Debug, Default, Deserialize)]
struct LawEntry {
    #[serde(default)]
    operations: Vec<OperationEntry>,
}

#[derive(Debug, Deserialize)]
struct OperationEntry {
    #[serde(default)]
    name: String,
}

// ── Rules ────────────────────────────────────────────────────────────

/// Read-only view of the canon. School and operation names are lowercase,
/// block types uppercase. Every operation listed under a school is also in
/// the global operation set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonRules {
    valid_schools: BTreeSet<String>,
    valid_operations: BTreeSet<String>,
    school_operation_map: BTreeMap<String, BTreeSet<String>>,
    valid_block_types: BTreeSet<String>,
}

impl Default for CanonRules {
    fn default() -> Self {
        Self::new()
    }
}

impl CanonRules {
    /// No schools, default block types.
    pub fn new() -> Self {
        CanonRules {
            valid_schools: BTreeSet::new(),
            valid_operations: BTreeSet::new(),
            school_operation_map: BTreeMap::new(),
            valid_block_types: DEFAULT_BLOCK_TYPES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Add a school and its operations. A school with no operations accepts
    /// any globally valid operation.
    pub fn with_school<I, S>(mut self, school: &str, operations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.add_school(school, operations);
        self
    }

    /// Replace the accepted block types.
    pub fn with_block_types<I, S>(mut self, block_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.valid_block_types = block_types
            .into_iter()
            .map(|s| s.as_ref().to_uppercase())
            .collect();
        self
    }

    fn add_school<I, S>(&mut self, school: &str, operations: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let school = school.to_lowercase();
        let ops: BTreeSet<String> = operations
            .into_iter()
            .map(|op| op.as_ref().to_lowercase())
            .collect();
        self.valid_operations.extend(ops.iter().cloned());
        if !ops.is_empty() {
            self.school_operation_map
                .entry(school.clone())
                .or_default()
                .extend(ops);
        }
        self.valid_schools.insert(school);
    }

    /// Parse a canon lock document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        let doc: CanonDocument = serde_yaml::from_str(yaml)?;
        let mut rules = CanonRules::new();

        for (key, value) in doc.schools.unwrap_or_default() {
            let entry: SchoolEntry = if value.is_null() {
                SchoolEntry::default()
            } else {
                serde_yaml::from_value(value)?
            };
            let name = match entry.name {
                Some(name) if !name.trim().is_empty() => name,
                _ => yaml_key_to_string(&key),
            };
            // "school:operation"; anything without a colon is not an operation
            let ops: Vec<String> = entry
                .law
                .operations
                .iter()
                .filter_map(|op| op.name.split_once(':').map(|(_, op)| op.to_owned()))
                .collect();
            tracing::debug!(school = %name, operations = ops.len(), "canon school");
            rules.add_school(&name, ops);
        }

        if let Some(block_types) = doc.block_types {
            rules = rules.with_block_types(block_types);
        }
        Ok(rules)
    }

    /// Load the canon at `path`. A missing file is `Ok(None)`; unreadable or
    /// malformed files are errors.
    pub fn load(path: &Path, provider: &dyn SourceProvider) -> Result<Option<Self>, RitualError> {
        let text = match provider.read_source(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(RitualError::Io {
                    path: path.display().to_string(),
                    source: e,
                })
            }
        };
        let rules = Self::from_yaml_str(&text).map_err(|e| RitualError::Canon {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        tracing::info!(
            path = %path.display(),
            schools = rules.valid_schools.len(),
            operations = rules.valid_operations.len(),
            "loaded canon rules"
        );
        Ok(Some(rules))
    }

    pub fn schools(&self) -> &BTreeSet<String> {
        &self.valid_schools
    }

    pub fn operations(&self) -> &BTreeSet<String> {
        &self.valid_operations
    }

    /// The school's own operation list, if it declares one.
    pub fn operations_for(&self, school: &str) -> Option<&BTreeSet<String>> {
        self.school_operation_map.get(&school.to_lowercase())
    }

    pub fn block_types(&self) -> &BTreeSet<String> {
        &self.valid_block_types
    }

    pub fn has_school(&self, school: &str) -> bool {
        self.valid_schools.contains(&school.to_lowercase())
    }

    pub fn has_operation(&self, operation: &str) -> bool {
        self.valid_operations.contains(&operation.to_lowercase())
    }

    pub fn accepts_block_type(&self, block_type: &str) -> bool {
        self.valid_block_types.contains(&block_type.to_uppercase())
    }
}

fn yaml_key_to_string(key: &serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

/// Where the canon rules are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanonLocation {
    File(PathBuf),
    /// The canon compiled into this library.
    Shipped,
}

impl CanonLocation {
    /// Load the rules. Only a `File` can be missing.
    pub fn load(&self, provider: &dyn SourceProvider) -> Result<Option<CanonRules>, RitualError> {
        match self {
            CanonLocation::File(path) => CanonRules::load(path, provider),
            CanonLocation::Shipped => CanonRules::from_yaml_str(SHIPPED_CANON)
                .map(Some)
                .map_err(|e| RitualError::Canon {
                    path: self.to_string(),
                    message: e.to_string(),
                }),
        }
    }
}

impl fmt::Display for CanonLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CanonLocation::File(path) => write!(f, "{}", path.display()),
            CanonLocation::Shipped => f.write_str("<built-in canon>"),
        }
    }
}

/// Pick the canon: explicit path, then `$CODECRAFT_CANON`, then
/// [`DEFAULT_CANON_PATH`] next to the running executable or one of its
/// parent directories, then the shipped canon.
///
/// Explicit and environment paths are taken as given even when the file is
/// missing; loading them then degrades to no validation.
pub fn locate_canon(explicit: Option<&Path>) -> CanonLocation {
    if let Some(path) = explicit {
        return CanonLocation::File(path.to_path_buf());
    }
    match std::env::var_os(CANON_PATH_ENV) {
        Some(value) if !value.is_empty() => return CanonLocation::File(PathBuf::from(value)),
        _ => {}
    }
    std::env::current_exe()
        .ok()
        .and_then(|exe| find_beside(&exe))
        .map_or(CanonLocation::Shipped, CanonLocation::File)
}

/// Search the executable's directory and up to three ancestors, so both
/// `<prefix>/bin/codecraft` and `target/<profile>/codecraft` find the
/// repository's `lexicon/`.
fn find_beside(exe: &Path) -> Option<PathBuf> {
    exe.parent()?
        .ancestors()
        .take(4)
        .map(|dir| dir.join(DEFAULT_CANON_PATH))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InMemoryProvider;

    const CANON: &str = r#"
schools:
  alchemy:
    name: Alchemy
    emoji: "⚗️"
    law:
      operations:
        - name: "alchemy:transmute"
        - name: "alchemy:Distill"
  necromancy:
    name: Necromancy
    law:
      operations:
        - name: "necromancy:raise_dead"
        - name: "get:timestamp"
        - name: "malformed"
  cantrip:
    name: Cantrip
"#;

    #[test]
    fn parses_schools_and_operations() {
        let rules = CanonRules::from_yaml_str(CANON).unwrap();
        assert_eq!(
            rules.schools().iter().collect::<Vec<_>>(),
            vec!["alchemy", "cantrip", "necromancy"]
        );
        assert!(rules.has_operation("transmute"));
        assert!(rules.has_operation("DISTILL"));
        assert!(rules.has_operation("timestamp"));
        assert!(!rules.has_operation("malformed"));
        assert!(rules.operations_for("cantrip").is_none());
        assert!(rules
            .operations_for("Necromancy")
            .unwrap()
            .contains("raise_dead"));
    }

    #[test]
    fn school_operations_are_subset_of_global_operations() {
        let rules = CanonRules::from_yaml_str(CANON).unwrap();
        for ops in rules.school_operation_map.values() {
            assert!(ops.is_subset(rules.operations()));
        }
    }

    #[test]
    fn default_block_types_apply() {
        let rules = CanonRules::from_yaml_str(CANON).unwrap();
        assert!(rules.accepts_block_type("python"));
        assert!(rules.accepts_block_type("LANGUAGE"));
        assert!(!rules.accepts_block_type("RUST"));
    }

    #[test]
    fn block_types_can_be_overridden() {
        let rules = CanonRules::from_yaml_str("schools: {}\nblock_types: [python, Native]\n").unwrap();
        assert_eq!(
            rules.block_types().iter().collect::<Vec<_>>(),
            vec!["NATIVE", "PYTHON"]
        );
    }

    #[test]
    fn numeric_keys_and_missing_names_fall_back_to_key() {
        let rules = CanonRules::from_yaml_str(
            "schools:\n  1:\n    law:\n      operations:\n        - name: \"x:y\"\n  whisper:\n",
        )
        .unwrap();
        assert!(rules.has_school("1"));
        assert!(rules.has_school("whisper"));
        assert!(rules.operations_for("1").unwrap().contains("y"));
    }

    #[test]
    fn empty_document_has_no_schools() {
        assert!(CanonRules::from_yaml_str("{}").unwrap().schools().is_empty());
        assert!(CanonRules::from_yaml_str("schools:\n").unwrap().schools().is_empty());
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        assert!(CanonRules::from_yaml_str("schools: [unclosed").is_err());
        assert!(CanonRules::from_yaml_str("schools:\n  a:\n    law: 7\n").is_err());
    }

    #[test]
    fn load_missing_is_none() {
        let provider = InMemoryProvider::default();
        let loaded = CanonRules::load(Path::new("/nope.yaml"), &provider).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn load_malformed_is_canon_error() {
        let provider = InMemoryProvider::default().with_file("/canon.yaml", "schools: [");
        let err = CanonRules::load(Path::new("/canon.yaml"), &provider).unwrap_err();
        assert!(matches!(err, RitualError::Canon { .. }));
        assert!(err.to_string().contains("/canon.yaml"));
    }

    #[test]
    fn builder_keeps_invariant() {
        let rules = CanonRules::new()
            .with_school("Alchemy", ["Transmute"])
            .with_school("cantrip", Vec::<String>::new());
        assert!(rules.has_school("alchemy"));
        assert!(rules.has_operation("transmute"));
        assert!(rules.operations_for("cantrip").is_none());
    }

    #[test]
    fn explicit_canon_path_wins() {
        let loc = locate_canon(Some(Path::new("custom/canon.yaml")));
        assert_eq!(loc, CanonLocation::File(PathBuf::from("custom/canon.yaml")));
        assert_eq!(loc.to_string(), "custom/canon.yaml");
    }

    #[test]
    fn canon_is_found_beside_the_executable() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("lexicon")).unwrap();
        std::fs::create_dir_all(root.path().join("target/debug")).unwrap();
        std::fs::write(root.path().join(DEFAULT_CANON_PATH), "schools: {}\n").unwrap();

        let exe = root.path().join("target/debug/codecraft");
        assert_eq!(find_beside(&exe), Some(root.path().join(DEFAULT_CANON_PATH)));
    }

    #[test]
    fn nothing_beside_the_executable() {
        let root = tempfile::tempdir().unwrap();
        assert_eq!(find_beside(&root.path().join("bin/codecraft")), None);
    }

    #[test]
    fn shipped_canon_loads() {
        let rules = CanonLocation::Shipped
            .load(&InMemoryProvider::default())
            .unwrap()
            .expect("shipped canon always present");
        assert_eq!(rules.schools().len(), 20);
        assert!(rules.has_school("necromancy"));
        assert_eq!(CanonLocation::Shipped.to_string(), "<built-in canon>");
    }
}
