//! Where the application policy text lives.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{PolicyError, PolicyResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicySource {
    /// A policy file, re-read on every reload.
    File(PathBuf),
    /// Policy text held in memory.
    Inline(String),
}

impl PolicySource {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    pub fn inline(text: impl Into<String>) -> Self {
        Self::Inline(text.into())
    }

    /// The policy file path, if file-backed.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::File(path) => Some(path),
            Self::Inline(_) => None,
        }
    }

    pub fn read(&self) -> PolicyResult<String> {
        match self {
            Self::File(path) => fs::read_to_string(path).map_err(|e| PolicyError::io(path, e)),
            Self::Inline(text) => Ok(text.clone()),
        }
    }

    /// Replaces the policy text.
    pub fn write(&mut self, text: &str) -> PolicyResult<()> {
        match self {
            Self::File(path) => fs::write(&*path, text).map_err(|e| PolicyError::io(&*path, e)),
            Self::Inline(current) => {
                text.clone_into(current);
                Ok(())
            }
        }
    }
}

impl std::fmt::Display for PolicySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Inline(_) => f.write_str("<inline>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let source = PolicySource::file(dir.path().join("application-policy.xml"));
        assert!(matches!(source.read(), Err(PolicyError::NotFound { .. })));
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = PolicySource::file(dir.path().join("application-policy.xml"));
        source.write("<Policy PolicyId=\"application-policy\"/>").unwrap();
        assert_eq!(
            source.read().unwrap(),
            "<Policy PolicyId=\"application-policy\"/>"
        );

        let mut inline = PolicySource::inline("old");
        inline.write("new").unwrap();
        assert_eq!(inline.read().unwrap(), "new");
    }
}
