//! Error types for assembling a PUMA deployment.

use puma_config::{ConfigError, TransportKind};
use puma_pdp::PolicyError;
use thiserror::Error;

/// Result type for composition-root operations.
pub type Result<T> = std::result::Result<T, PumaError>;

#[derive(Debug, Error)]
pub enum PumaError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("policy error: {0}")]
    Policy(#[from] PolicyError),

    /// The configuration names a transport that cannot be wired here.
    #[error("transport {transport} requires {missing}")]
    MissingCollaborator {
        transport: TransportKind,
        missing: &'static str,
    },
}
