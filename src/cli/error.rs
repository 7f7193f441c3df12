//! CLI error types

use std::path::PathBuf;

use thiserror::Error;

use crate::error::CodecError;

/// Errors surfaced by CLI commands
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to read {0}: {1}")]
    FileReadError(PathBuf, String),

    #[error("Failed to write {0}: {1}")]
    FileWriteError(PathBuf, String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl CliError {
    /// Message for the terminal, with hints where the codec offers them
    pub fn user_message(&self) -> String {
        match self {
            CliError::Codec(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_errors_keep_hints() {
        let err = CliError::from(CodecError::MalformedPayload("truncated".to_string()));
        assert!(err.user_message().contains("--format"));
    }

    #[test]
    fn test_file_read_message() {
        let err = CliError::FileReadError(PathBuf::from("feed.xml"), "not found".to_string());
        assert_eq!(err.user_message(), "Failed to read feed.xml: not found");
    }
}
