//! codecraft-core: the CodeCraft ritual compiler.
//!
//! Turns `.ccraft` ritual source into the versioned soul schema JSON
//! document, checking every school invocation and block type against the
//! canon rule file along the way.
//!
//! # Public API
//!
//! Key types are re-exported at the crate root for convenience:
//!
//! - [`parse_ritual()`] -- run the full pipeline over a file
//! - [`compile_source()`] -- run the pipeline over in-memory text
//! - [`tokenize()`], [`parse()`], [`transform()`] -- individual stages
//! - [`SemanticAnalyzer`] and [`CanonRules`] -- canon validation
//! - [`RitualError`] -- pipeline error type

/// Soul schema version written into every output document.
pub const SOUL_SCHEMA_VERSION: &str = "1.0";

pub mod analyze;
pub mod canon;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod pipeline;
pub mod source;
pub mod transform;

// ── Convenience re-exports: key types ────────────────────────────────

pub use analyze::{Invocation, SemanticAnalyzer};
pub use canon::{CanonLocation, CanonRules};
pub use error::{RitualError, Violation, ViolationKind};
pub use lexer::{Span, Token, TokenKind};
pub use parser::{ParseBlock, ParseTree, Reconstruction};
pub use transform::{BlockType, OutputSchema, SoulBlock};

// ── Convenience re-exports: pipeline entry points ────────────────────

pub use analyze::analyze;
pub use canon::locate_canon;
pub use lexer::tokenize;
pub use parser::{parse, parse_with};
pub use pipeline::{compile_source, parse_ritual, parse_ritual_with_provider, PipelineOptions};
pub use transform::transform;
