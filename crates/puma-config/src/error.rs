//! Configuration error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Validation(String),

    #[error("failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("XDG directory error: {0}")]
    Xdg(String),
}
