//! Error types for the render pipeline

use thiserror::Error;

/// Result type alias for raycanvas operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building, dispatching or presenting a frame
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Width or height failed validation before dispatch
    #[error("Invalid dimension: {0}")]
    InvalidDimension(String),

    /// The engine could not be resolved
    #[error("Engine failed to load: {0}")]
    EngineLoadFailure(String),

    /// The engine was loaded but `generate` failed
    #[error("Engine error: {0}")]
    Engine(String),

    /// The pixel buffer does not match the reported dimensions
    #[error("Malformed response: expected {expected} bytes for {width}x{height}, got {actual}")]
    MalformedResponse {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    /// The device-native image could not be built or blitted
    #[error("Transfer failed: {0}")]
    TransferFailure(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// A worker line could not be decoded
    #[error("Worker protocol error: {0}")]
    WorkerProtocol(String),

    /// I/O error (stringified so the enum stays `Clone`)
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Coarse classification used by diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidDimension,
    EngineLoadFailure,
    Engine,
    MalformedResponse,
    TransferFailure,
    Config,
    Other,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidDimension(_) => ErrorKind::InvalidDimension,
            Error::EngineLoadFailure(_) => ErrorKind::EngineLoadFailure,
            Error::Engine(_) | Error::WorkerProtocol(_) => ErrorKind::Engine,
            Error::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            Error::TransferFailure(_) => ErrorKind::TransferFailure,
            Error::ConfigError(_) => ErrorKind::Config,
            Error::Io(_) | Error::Other(_) => ErrorKind::Other,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::WorkerProtocol(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_response_message_names_sizes() {
        let err = Error::MalformedResponse { width: 10, height: 10, expected: 400, actual: 100 };
        let msg = err.to_string();
        assert!(msg.contains("400"));
        assert!(msg.contains("100"));
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
    }

    #[test]
    fn worker_protocol_errors_count_as_engine_errors() {
        let err: Error = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert_eq!(err.kind(), ErrorKind::Engine);
    }
}
