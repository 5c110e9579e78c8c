use thiserror::Error;

use crate::domain::Operation;

/// Errors returned synchronously by the submission path.
///
/// Failures of the operation itself never show up here; they reach the
/// continuation as [`crate::domain::OperationFailure`].
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("{operation} takes {expected} arguments, got {actual}")]
    InvalidArgument {
        operation: Operation,
        expected: usize,
        actual: usize,
    },

    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    #[error("pending queue is full (capacity {capacity})")]
    QueueFull { capacity: usize },

    #[error("dispatcher must be created inside a tokio runtime")]
    NoRuntime,

    #[error("result bridge is already being driven")]
    BridgeBusy,
}

/// Errors while loading a [`crate::app::DispatcherConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse config: {0}")]
    Parse(#[from] serde_json::Error),
}
