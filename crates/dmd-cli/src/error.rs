use dmd_core::{ConfigError, ExtractError, UnknownFeedError};
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    UnknownFeed(#[from] UnknownFeedError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("strict mode failed: failed_cursors={failed_cursors}, malformed_rows={malformed_rows}")]
    StrictModeViolation {
        failed_cursors: usize,
        malformed_rows: usize,
    },

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::UnknownFeed(_) => 2,
            Self::Config(_) => 3,
            Self::Extract(ExtractError::Config(_)) => 3,
            Self::Extract(ExtractError::UnknownFeed(_)) => 2,
            Self::Extract(ExtractError::Authentication(_)) => 4,
            Self::Extract(_) => 1,
            Self::StrictModeViolation { .. } => 5,
            Self::Serialization(_) => 6,
            Self::Io(_) => 10,
        }
    }
}
