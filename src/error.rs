use crate::providers::ProviderError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unable to read credential file {}: {source}", .path.display())]
    Read { path: PathBuf, source: std::io::Error },

    #[error("malformed credential file {}: {source}", .path.display())]
    Malformed { path: PathBuf, source: serde_json::Error },

    #[error("missing credentials: {0}")]
    MissingCredentials(String),

    #[error("missing argument: {0}")]
    MissingArgument(String),

    #[error("prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("unable to write {}: {source}", .path.display())]
    Write { path: PathBuf, source: std::io::Error },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Error in Credentials: {0}")]
    InvalidCredentials(ProviderError),
}
