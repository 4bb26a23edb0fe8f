//! CLI error types.

use trellis_config::ConfigError;
use trellis_views::{LoadError, RenderError, WatchError};

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Load(#[from] LoadError),

    #[error("{0}")]
    Render(#[from] RenderError),

    #[error("{0}")]
    Watch(#[from] WatchError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid context file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Validation(String),
}
