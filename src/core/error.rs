use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManagerError {
    #[error("Invalid shard key: {0}")]
    InvalidShardKey(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Supervision error on unit '{unit}': {message}")]
    Supervision { unit: String, message: String },

    #[error("Filesystem error at '{}': {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Connection refused by {host}:{port}")]
    ConnectionRefused { host: String, port: u16, code: i32 },

    #[error("Failed to connect to {host}:{port} - {message} (code {code})")]
    Connection {
        host: String,
        port: u16,
        code: i32,
        message: String,
    },

    #[error("Network error talking to {host}:{port}: {source}")]
    Network {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, ManagerError>;

impl ManagerError {
    pub(crate) fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn supervision(unit: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Supervision {
            unit: unit.into(),
            message: message.into(),
        }
    }
}
