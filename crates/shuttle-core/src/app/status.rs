//! Status - ディスパッチャの状態スナップショット

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    /// Requests accepted by `submit`.
    pub submitted: u64,
    /// Requests rejected synchronously (bad arguments, unknown operation, full queue).
    pub rejected: u64,
    /// Continuations invoked.
    pub delivered: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Workers started; each runs exactly one request.
    pub workers_started: u64,
    /// Times the dispatch flag went from clear to set.
    pub batches_started: u64,
    /// Requests waiting in the pending queue right now.
    pub pending: usize,
    /// Accepted requests whose continuation has not run yet.
    pub outstanding: usize,
    /// Dispatch flag.
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_delivered_at: Option<DateTime<Utc>>,
}
