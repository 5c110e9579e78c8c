//! Result Delivery Bridge - ワーカーの結果を呼び出し側スレッドへ戻す
//!
//! # フロー
//! 1. ワーカーが `(Request, RawOutcome)` を `BridgeMessage::Completed` で送る
//! 2. 呼び出し側スレッドが `Dispatcher::pump` / `run_until_idle` で受け取る
//! 3. `RequestId` で `ContinuationArena` から continuation を取り出して呼ぶ
//! 4. continuation が戻ってから、呼び出し側がキューの次の request を起動する
//!
//! ワーカーが結果を返さずに死んだときは `BridgeMessage::Abandoned` が来る。
//!
//! continuation は `Send` でなくてよい。arena ごと呼び出し側スレッドに
//! 置かれ、ワーカーへは `RequestId` しか渡らない。
//! 同時に動くワーカーは 1 つだけなので、届く順番 = 実行した順番。

use chrono::{DateTime, Utc};
use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use tokio::sync::mpsc;

use crate::domain::{BatchId, Outcome, RawOutcome, Request, RequestId};

/// Caller-side callback that consumes a request's outcome exactly once.
pub type Continuation = Box<dyn FnOnce(Outcome) + 'static>;

/// One finished request travelling back to the caller thread.
#[derive(Debug)]
pub struct Completion {
    pub request: Request,
    pub outcome: RawOutcome,
    pub batch: BatchId,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug)]
pub enum BridgeMessage {
    Completed(Completion),
    /// The worker for `request` ended without reporting a result.
    Abandoned {
        request: RequestId,
        batch: BatchId,
        message: String,
    },
}

/// Worker-side end of the bridge.
#[derive(Clone)]
pub struct BridgeSender {
    tx: mpsc::UnboundedSender<BridgeMessage>,
}

impl BridgeSender {
    /// Hand a completion back. Returns `false` if the caller side is gone.
    pub fn completed(&self, completion: Completion) -> bool {
        self.tx.send(BridgeMessage::Completed(completion)).is_ok()
    }

    /// Returns `false` if the caller side is gone.
    pub fn abandoned(&self, request: RequestId, batch: BatchId, message: String) -> bool {
        self.tx
            .send(BridgeMessage::Abandoned {
                request,
                batch,
                message,
            })
            .is_ok()
    }
}

pub type BridgeReceiver = mpsc::UnboundedReceiver<BridgeMessage>;

pub fn channel() -> (BridgeSender, BridgeReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (BridgeSender { tx }, rx)
}

/// Continuations waiting for their request, keyed by token.
#[derive(Default)]
pub struct ContinuationArena {
    slots: HashMap<RequestId, Continuation>,
}

impl ContinuationArena {
    pub fn insert(&mut self, id: RequestId, continuation: Continuation) {
        self.slots.insert(id, continuation);
    }

    /// Remove the continuation. A second `take` for the same id returns `None`.
    pub fn take(&mut self, id: RequestId) -> Option<Continuation> {
        self.slots.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Run a continuation, containing a panic to this one request.
pub fn invoke(continuation: Continuation, outcome: Outcome) -> Result<(), String> {
    panic::catch_unwind(AssertUnwindSafe(move || continuation(outcome)))
        .map_err(|payload| panic_message(&*payload))
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
