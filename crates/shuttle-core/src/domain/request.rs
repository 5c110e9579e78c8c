//! Request - 1 件の作業単位
//!
//! 呼び出し側の値はここで owned な `String` にコピーされる（境界を越える前の
//! marshaling）。`Request` は `Send` だが `Clone` ではない。
//! 所有権は submitter → queue → worker → bridge と移動し、複製されない。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::RequestId;
use super::operation::Operation;
use crate::error::DispatchError;

/// Ordered string arguments of a request.
///
/// `Debug` does not print the values: payloads carry passwords.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(Vec<String>);

impl Payload {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(args.into_iter().map(Into::into).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl From<Vec<String>> for Payload {
    fn from(args: Vec<String>) -> Self {
        Self(args)
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Payload(<{} args>)", self.0.len())
    }
}

/// One unit of queued work.
///
/// The continuation is not stored here; `id` is the token that finds it
/// again on the caller thread.
#[derive(Debug)]
pub struct Request {
    id: RequestId,
    operation: Operation,
    payload: Payload,
    submitted_at: DateTime<Utc>,
}

impl Request {
    /// Build a request, rejecting a payload of the wrong length.
    pub fn new(id: RequestId, operation: Operation, payload: Payload) -> Result<Self, DispatchError> {
        if payload.len() != operation.arity() {
            return Err(DispatchError::InvalidArgument {
                operation,
                expected: operation.arity(),
                actual: payload.len(),
            });
        }
        Ok(Self {
            id,
            operation,
            payload,
            submitted_at: Utc::now(),
        })
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::IdSequence;
    use rstest::rstest;

    fn assert_send<T: Send>() {}

    #[test]
    fn request_can_cross_threads() {
        assert_send::<Request>();
    }

    #[rstest]
    #[case(vec![], 0)]
    #[case(vec!["user1"], 1)]
    #[case(vec!["user1", "pw1", "extra"], 3)]
    fn wrong_arity_is_invalid_argument(#[case] args: Vec<&str>, #[case] actual: usize) {
        let mut ids = IdSequence::new();
        let err = Request::new(ids.next_id(), Operation::CreateAccount, Payload::new(args))
            .unwrap_err();

        assert!(matches!(
            err,
            DispatchError::InvalidArgument { operation: Operation::CreateAccount, expected: 2, actual: a }
                if a == actual
        ));
    }

    #[test]
    fn valid_request_keeps_its_arguments_in_order() {
        let mut ids = IdSequence::new();
        let id = ids.next_id();
        let req = Request::new(id, Operation::CreateAccount, Payload::new(["user1", "pw1"])).unwrap();

        assert_eq!(req.id(), id);
        assert_eq!(req.payload().as_slice(), ["user1".to_string(), "pw1".to_string()]);
    }

    #[test]
    fn payload_debug_hides_values() {
        let payload = Payload::new(["user1", "hunter2"]);
        let s = format!("{payload:?}");
        assert!(!s.contains("hunter2"));
        assert_eq!(s, "Payload(<2 args>)");
    }
}
