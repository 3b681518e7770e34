use std::path::PathBuf;
use thiserror::Error;

/// Core error type for blackboox operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read config at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Generation(#[from] GenerationWriteError),

    #[error("{0}")]
    Other(String),
}

impl Error {
    #[must_use]
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

/// Export discovery failed. Aborts the build-start pass.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Cannot read {path}: {source}")]
    DirectoryUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}:{line}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Invalid file pattern `{pattern}`: {message}")]
    Pattern { pattern: String, message: String },
}

/// The transform hook could not process a module.
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Failed to parse {id}:{line}: {message}")]
    Parse {
        id: String,
        line: usize,
        message: String,
    },

    #[error("Failed to emit {id}: {message}")]
    Emit { id: String, message: String },

    #[error("Transform requested for the {pipeline} pipeline before any build-start completed")]
    NotStarted { pipeline: &'static str },
}

/// Writing a generated artifact failed; no artifact of the pass was replaced.
#[derive(Error, Debug)]
#[error("Failed to write generated file {path}: {source}")]
pub struct GenerationWriteError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// A proxied call was rejected by the host dispatcher.
///
/// Contained to the single call; never affects other calls or the registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Cannot find service named {service}")]
    ServiceNotFound { service: String },

    #[error("Cannot find method named {method} in service {service}")]
    MethodNotFound { service: String, method: String },

    #[error("{service}.{method} failed: {message}")]
    Failed {
        service: String,
        method: String,
        message: String,
    },
}

impl DispatchError {
    /// Wire code for this failure.
    #[must_use]
    pub fn code(&self) -> &'static str {
        use blackboox_proto::codes;
        match self {
            Self::ServiceNotFound { .. } => codes::SERVICE_NOT_FOUND,
            Self::MethodNotFound { .. } => codes::METHOD_NOT_FOUND,
            Self::Failed { .. } => codes::SERVICE_FAILED,
        }
    }
}
