//! Attribute model error types.

use thiserror::Error;

use crate::attribute::{DataType, OwnerKind};

/// Result type for attribute construction.
pub type Result<T> = std::result::Result<T, AttributeError>;

/// Contract violations detected while building attributes and parties.
///
/// These are caller bugs. They are reported at construction time so that a
/// malformed attribute never reaches a decision point.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttributeError {
    /// An ATOMIC attribute was given zero or more than one value.
    #[error("atomic attribute '{id}' must carry exactly one value, got {count}")]
    AtomicCardinality { id: String, count: usize },

    /// A value does not match the attribute's declared data type.
    #[error("attribute '{id}' is declared {expected:?} but got a {found:?} value")]
    TypeMismatch {
        id: String,
        expected: DataType,
        found: DataType,
    },

    /// The owner kind could not be inferred from the id prefix.
    #[error("cannot infer owner kind of attribute '{id}' from its prefix")]
    UnknownOwnerPrefix { id: String },

    /// An attribute was attached to a party of a different kind.
    #[error("attribute '{id}' belongs to {found:?} but was attached to {expected:?}")]
    OwnerMismatch {
        id: String,
        expected: OwnerKind,
        found: OwnerKind,
    },

    /// A party already carries an attribute with this id.
    #[error("duplicate attribute '{id}'")]
    DuplicateAttribute { id: String },
}
