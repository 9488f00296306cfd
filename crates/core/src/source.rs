//! Source provider abstraction for filesystem-independent parsing.
//!
//! The [`SourceProvider`] trait abstracts file reads so the pipeline can run
//! over in-memory rituals and canon documents in tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Reads ritual sources and canon documents.
pub trait SourceProvider {
    /// Read the text at `path`. A missing file must be reported as
    /// `std::io::ErrorKind::NotFound`; the pipeline relies on it.
    fn read_source(&self, path: &Path) -> Result<String, std::io::Error>;
}

/// Default provider backed by `std::fs`.
pub struct FileSystemProvider;

impl SourceProvider for FileSystemProvider {
    fn read_source(&self, path: &Path) -> Result<String, std::io::Error> {
        std::fs::read_to_string(path)
    }
}

/// In-memory source provider for testing.
///
/// Maps paths to source text strings. Lookups normalize the path without
/// touching the filesystem.
#[derive(Default)]
pub struct InMemoryProvider {
    files: HashMap<PathBuf, String>,
}

impl InMemoryProvider {
    pub fn new(files: HashMap<PathBuf, String>) -> Self {
        Self { files }
    }

    /// Builder-style insert.
    pub fn with_file(mut self, path: impl AsRef<Path>, text: impl Into<String>) -> Self {
        self.files
            .insert(Self::normalize_path(path.as_ref()), text.into());
        self
    }

    /// Resolve `.` and `..` components without touching the filesystem.
    fn normalize_path(path: &Path) -> PathBuf {
        let mut components = Vec::new();
        for component in path.components() {
            match component {
                std::path::Component::CurDir => {}
                std::path::Component::ParentDir => {
                    components.pop();
                }
                other => components.push(other),
            }
        }
        components.iter().collect()
    }
}

impl SourceProvider for InMemoryProvider {
    fn read_source(&self, path: &Path) -> Result<String, std::io::Error> {
        let normalized = Self::normalize_path(path);
        self.files.get(&normalized).cloned().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("file not found in memory: {}", normalized.display()),
            )
        })
    }
}
