use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClipBatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{context}: {source}")]
    FileSystem {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{message}")]
    ToolExecution { message: String, diagnostic: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Message catalog error: {0}")]
    Catalog(String),
}

impl ClipBatchError {
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest(reason.into())
    }

    pub fn file_system(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::FileSystem {
            context: context.into(),
            source,
        }
    }

    pub fn tool_execution(message: impl Into<String>, diagnostic: impl Into<String>) -> Self {
        Self::ToolExecution {
            message: message.into(),
            diagnostic: diagnostic.into(),
        }
    }

    /// Locale-neutral classification surfaced to callers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest(_) | Self::Json(_) | Self::Toml(_) | Self::Config(_) => {
                ErrorKind::InvalidRequest
            }
            Self::Io(_) | Self::FileSystem { .. } | Self::Catalog(_) => ErrorKind::IoFailure,
            Self::ToolExecution { .. } => ErrorKind::ToolExecutionFailure,
        }
    }

    /// Raw detail for the failure: captured tool output, or the underlying system error.
    pub fn diagnostic(&self) -> String {
        match self {
            Self::ToolExecution { diagnostic, .. } => diagnostic.clone(),
            Self::FileSystem { source, .. } => source.to_string(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidRequest,
    IoFailure,
    ToolExecutionFailure,
}

pub type Result<T> = std::result::Result<T, ClipBatchError>;
