//! Domain model (ids, operations, requests, outcomes).
//!
//! ここにある型はスレッドを知らない。`Request` と `RawOutcome` が
//! ワーカーとの境界を越える唯一のデータ。

pub mod ids;
pub mod operation;
pub mod outcome;
pub mod request;

pub use ids::{BatchId, Id, IdMarker, IdSequence, RequestId};
pub use operation::Operation;
pub use outcome::{OperationFailure, Outcome, RawOutcome, ResourceHandle, into_outcome};
pub use request::{Payload, Request};
