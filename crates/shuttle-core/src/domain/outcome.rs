//! Outcome model: what a request produces.
//!
//! The worker only ever builds [`RawOutcome`] (plain integers and strings).
//! The caller thread turns it into an [`Outcome`] right before the
//! continuation runs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque token for a resource the provider created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceHandle(u64);

impl ResourceHandle {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handle-{:#x}", self.0)
    }
}

/// Why an operation did not produce a resource.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperationFailure {
    /// Non-success status returned by the provider, passed through as-is.
    #[error("operation failed with status {code}")]
    Status { code: i32 },

    /// The provider panicked while running the request.
    #[error("operation panicked: {message}")]
    Panicked { message: String },
}

impl OperationFailure {
    pub fn status(code: i32) -> Self {
        OperationFailure::Status { code }
    }

    /// Provider status code, if the failure came from one.
    pub fn code(&self) -> Option<i32> {
        match self {
            OperationFailure::Status { code } => Some(*code),
            OperationFailure::Panicked { .. } => None,
        }
    }
}

/// Worker-side result: plain data only.
pub type RawOutcome = Result<u64, OperationFailure>;

/// Caller-side result handed to the continuation.
pub type Outcome = Result<ResourceHandle, OperationFailure>;

/// Unmarshal a worker result on the caller thread.
pub fn into_outcome(raw: RawOutcome) -> Outcome {
    raw.map(ResourceHandle::from_raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_success_becomes_handle() {
        let outcome = into_outcome(Ok(0x2a));
        assert_eq!(outcome, Ok(ResourceHandle::from_raw(42)));
    }

    #[test]
    fn status_failure_is_passed_through_verbatim() {
        let outcome = into_outcome(Err(OperationFailure::status(-7)));
        let err = outcome.unwrap_err();
        assert_eq!(err.code(), Some(-7));
        assert_eq!(err.to_string(), "operation failed with status -7");
    }

    #[test]
    fn failure_is_tagged_in_json() {
        let v = serde_json::to_value(OperationFailure::status(-1)).unwrap();
        assert_eq!(v["kind"], "status");
        assert_eq!(v["code"], -1);
    }

    #[test]
    fn handle_display_is_hex() {
        assert_eq!(ResourceHandle::from_raw(255).to_string(), "handle-0xff");
    }
}
