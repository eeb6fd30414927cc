use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("invalid argument in {operation}: {reason}")]
    InvalidArgument {
        operation: &'static str,
        reason: String,
    },

    #[error("execution environment unavailable for `{command}`: {source}")]
    Environment {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{operation} failed for {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt registry at {path}: {reason}")]
    CorruptData { path: PathBuf, reason: String },
}

pub type Result<T> = std::result::Result<T, RegistryError>;
