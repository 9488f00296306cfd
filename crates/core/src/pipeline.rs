//! Ritual compiler: source -> tokens -> parse tree -> analysis -> soul schema.
//!
//! This is a thin orchestrator that calls each stage in order.

use crate::analyze::SemanticAnalyzer;
use crate::canon::locate_canon;
use crate::error::RitualError;
use crate::lexer;
use crate::parser::{self, Reconstruction};
use crate::source::{FileSystemProvider, SourceProvider};
use crate::transform::{self, OutputSchema};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Explicit canon location; see [`locate_canon`] for the fallback.
    pub canon_path: Option<PathBuf>,
    pub reconstruction: Reconstruction,
}

/// Compile the ritual at `path` from the filesystem.
pub fn parse_ritual(path: &Path, options: &PipelineOptions) -> Result<OutputSchema, RitualError> {
    parse_ritual_with_provider(path, options, &FileSystemProvider)
}

/// Compile the ritual at `path`, reading the ritual and the canon through
/// `provider`. Stops at the first failing stage.
pub fn parse_ritual_with_provider(
    path: &Path,
    options: &PipelineOptions,
    provider: &dyn SourceProvider,
) -> Result<OutputSchema, RitualError> {
    let source = read_ritual(path, provider)?;

    let canon = locate_canon(options.canon_path.as_deref());
    let analyzer = SemanticAnalyzer::from_location(&canon, provider)?;

    compile_source(&source, &analyzer, options.reconstruction)
}

/// Read a ritual file, mapping a missing file to [`RitualError::RitualNotFound`].
pub fn read_ritual(path: &Path, provider: &dyn SourceProvider) -> Result<String, RitualError> {
    provider.read_source(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            RitualError::RitualNotFound {
                path: path.display().to_string(),
            }
        } else {
            RitualError::Io {
                path: path.display().to_string(),
                source: e,
            }
        }
    })
}

/// Run every stage over in-memory source text.
pub fn compile_source(
    source: &str,
    analyzer: &SemanticAnalyzer,
    mode: Reconstruction,
) -> Result<OutputSchema, RitualError> {
    let tokens = lexer::tokenize(source);
    tracing::debug!(tokens = tokens.len(), "lexed ritual");

    let tree = parser::parse_with(source, &tokens, mode);
    tracing::debug!(
        blocks = tree.blocks.len(),
        deferred = tree.deferred.len(),
        "parsed ritual"
    );
    for deferred in &tree.deferred {
        tracing::warn!(
            tag = %deferred.tag,
            line = deferred.line,
            column = deferred.column,
            "{} blocks are not yet supported; skipping",
            deferred.language
        );
    }

    let tree = analyzer.analyze(tree, &tokens)?;

    Ok(transform::transform(&tree))
}
