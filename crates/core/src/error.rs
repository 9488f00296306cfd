//! Pipeline errors.
//!
//! Lexing and parsing are total, so every variant here comes from file I/O,
//! canon loading, or semantic analysis.

use serde::Serialize;
use std::fmt;

/// Which canon check an invocation or block failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    UnknownSchool,
    UnknownOperation,
    OperationNotInSchool,
    UnknownBlockType,
}

/// A single constitutional violation with its source location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub kind: ViolationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    pub message: String,
}

impl Violation {
    pub fn new(
        kind: ViolationKind,
        location: Option<(u32, u32)>,
        detail: impl fmt::Display,
    ) -> Self {
        let message = match location {
            Some((line, column)) => {
                format!("Constitutional violation at L{}:C{}: {}", line, column, detail)
            }
            None => format!("Constitutional violation: {}", detail),
        };
        Violation {
            kind,
            line: location.map(|(l, _)| l),
            column: location.map(|(_, c)| c),
            message,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RitualError {
    /// The ritual source file does not exist.
    #[error("ritual not found: {path}")]
    RitualNotFound { path: String },

    /// Any other failure reading a ritual file.
    #[error("cannot read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The canon rule file exists but could not be understood.
    #[error("malformed canon rules in '{path}': {message}")]
    Canon { path: String, message: String },

    /// One or more semantic violations; always carries every violation found.
    #[error("CONSTITUTIONAL VIOLATIONS DETECTED:\n{}", join_violations(.0))]
    Constitutional(Vec<Violation>),
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.message.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

impl RitualError {
    /// Short machine-readable tag for the variant.
    pub fn code(&self) -> &'static str {
        match self {
            RitualError::RitualNotFound { .. } => "ritual_not_found",
            RitualError::Io { .. } => "io",
            RitualError::Canon { .. } => "canon",
            RitualError::Constitutional(_) => "constitutional",
        }
    }

    /// True for errors about reading input files rather than their content.
    pub fn is_file_error(&self) -> bool {
        matches!(
            self,
            RitualError::RitualNotFound { .. } | RitualError::Io { .. }
        )
    }

    pub fn violations(&self) -> &[Violation] {
        match self {
            RitualError::Constitutional(v) => v,
            _ => &[],
        }
    }

    /// Render as a JSON object for `--output json` diagnostics.
    /// `violations` is always present (empty for non-semantic errors).
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::json!({
            "error":      self.code(),
            "message":    self.to_string(),
            "violations": self.violations(),
        })
    }
}
