//! Decision point error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for policy loading.
pub type PolicyResult<T> = Result<T, PolicyError>;

/// Why a policy could not be bound.
///
/// Loading failures never take down a decision point: it keeps its previous
/// binding, or stays not ready if it never had one.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The policy file does not exist.
    #[error("application policy file not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// The policy file could not be read or written.
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The document is not well-formed XML.
    #[error("malformed policy document: {0}")]
    Malformed(String),

    /// The document has no `Policy` or `PolicySet` root element.
    #[error("policy document has no Policy or PolicySet root element")]
    MissingRoot,

    /// The root element carries no id attribute.
    #[error("root element {element} has no id attribute")]
    MissingPolicyId { element: String },

    /// The document declares a different policy id than expected.
    #[error("expected policy id \"{expected}\", got \"{found}\"")]
    IdMismatch { expected: String, found: String },

    /// The evaluation engine rejected the document.
    #[error("policy compilation failed: {0}")]
    Compile(String),
}

impl PolicyError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound { path }
        } else {
            Self::Io { path, source }
        }
    }
}

/// An attribute finder could not answer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FinderError {
    /// The backing store is unreachable.
    #[error("attribute source unavailable: {0}")]
    Unavailable(String),

    /// The lookup itself failed.
    #[error("lookup of '{id}' failed: {reason}")]
    Lookup { id: String, reason: String },
}
