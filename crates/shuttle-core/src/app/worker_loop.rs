//! WorkerLoop - バックグラウンドでの直列実行
//!
//! # モデル: 1 request = 1 ワーカー
//! 呼び出し側スレッドが request を 1 件渡してワーカーを起動する。
//! ワーカーは provider を 1 回呼び、結果を bridge に渡して終わる。
//! 次の request を pop するのは呼び出し側スレッドで、continuation を
//! 呼び終えてから（`Dispatcher::deliver` の後）。
//!
//! # フロー
//! 1. provider を同期的に呼ぶ（キューのロックは持たない）
//! 2. `(Request, RawOutcome)` を bridge に渡す
//! 3. 終了
//!
//! ワーカーが `catch_unwind` の外で死んだ場合は、監視タスクが
//! `BridgeMessage::Abandoned` を送る。呼び出し側はそれを失敗として配送し、
//! キューを先へ進める。
//!
//! dispatch flag はここには来ない。ワーカーは flag を読むことも書くこともない。

use chrono::Utc;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use super::bridge::{BridgeSender, Completion, panic_message};
use crate::domain::{BatchId, OperationFailure, RawOutcome, Request, RequestId};
use crate::ports::OperationProvider;

/// Everything one worker needs to run one request.
pub struct WorkerContext {
    pub batch: BatchId,
    pub dispatcher: Arc<str>,
    pub provider: Arc<dyn OperationProvider>,
    pub bridge: BridgeSender,
}

/// Start a worker for `request` on the runtime's blocking pool.
pub fn start(runtime: &Handle, request: Request, ctx: WorkerContext) {
    let request_id = request.id();
    let batch = ctx.batch;
    let bridge = ctx.bridge.clone();
    let worker = runtime.spawn_blocking(move || run(request, ctx));
    runtime.spawn(watch(worker, request_id, batch, bridge));
}

/// Report a worker that ended without handing its result back.
async fn watch(worker: JoinHandle<()>, request_id: RequestId, batch: BatchId, bridge: BridgeSender) {
    if let Err(err) = worker.await {
        tracing::error!(%request_id, %batch, error = %err, "worker thread died");
        if !bridge.abandoned(request_id, batch, err.to_string()) {
            tracing::warn!(%request_id, "dispatcher dropped, worker failure not reported");
        }
    }
}

/// Run one request and hand its result to the bridge.
pub fn run(request: Request, ctx: WorkerContext) {
    let span = tracing::info_span!(
        "worker",
        dispatcher = %ctx.dispatcher,
        batch = %ctx.batch,
        request_id = %request.id()
    );
    let _entered = span.enter();

    let outcome = execute(ctx.provider.as_ref(), &request);
    let request_id = request.id();
    let delivered = ctx.bridge.completed(Completion {
        request,
        outcome,
        batch: ctx.batch,
        finished_at: Utc::now(),
    });
    if !delivered {
        tracing::warn!(%request_id, "dispatcher dropped, result not delivered");
    }
}

fn execute(provider: &dyn OperationProvider, request: &Request) -> RawOutcome {
    let started = Instant::now();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        provider.perform(request.operation(), request.payload().as_slice())
    }))
    .unwrap_or_else(|payload| {
        Err(OperationFailure::Panicked {
            message: panic_message(&*payload),
        })
    });

    tracing::debug!(
        operation = %request.operation(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        ok = outcome.is_ok(),
        "operation finished"
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::bridge::{self, BridgeMessage};
    use crate::domain::{IdSequence, Operation, Payload};
    use std::sync::Mutex;

    /// Records the user of every call; fails for "bad", panics for "boom".
    #[derive(Default)]
    struct Recording {
        calls: Mutex<Vec<String>>,
    }

    impl OperationProvider for Recording {
        fn perform(&self, _operation: Operation, args: &[String]) -> RawOutcome {
            self.calls.lock().unwrap().push(args[0].clone());
            match args[0].as_str() {
                "bad" => Err(OperationFailure::status(-5)),
                "boom" => panic!("provider exploded"),
                _ => Ok(args[0].len() as u64),
            }
        }
    }

    fn request(ids: &mut IdSequence, user: &str) -> Request {
        Request::new(ids.next_id(), Operation::CreateAccount, Payload::new([user, "pw"])).unwrap()
    }

    fn context(ids: &mut IdSequence, provider: &Arc<Recording>, bridge: BridgeSender) -> WorkerContext {
        WorkerContext {
            batch: ids.next_id(),
            dispatcher: Arc::from("test"),
            provider: provider.clone(),
            bridge,
        }
    }

    fn run_one(user: &str) -> (Arc<Recording>, RequestId, Vec<BridgeMessage>) {
        let mut ids = IdSequence::new();
        let provider = Arc::new(Recording::default());
        let (tx, mut rx) = bridge::channel();
        let request = request(&mut ids, user);
        let id = request.id();

        run(request, context(&mut ids, &provider, tx));

        let mut messages = Vec::new();
        while let Ok(message) = rx.try_recv() {
            messages.push(message);
        }
        (provider, id, messages)
    }

    fn only_completion(messages: Vec<BridgeMessage>) -> Completion {
        let mut messages = messages.into_iter();
        match (messages.next(), messages.next()) {
            (Some(BridgeMessage::Completed(c)), None) => c,
            other => panic!("expected exactly one completion, got {other:?}"),
        }
    }

    #[test]
    fn runs_exactly_one_request_and_reports_it() {
        let (provider, id, messages) = run_one("user1");

        let completion = only_completion(messages);
        assert_eq!(completion.request.id(), id);
        assert_eq!(completion.outcome, Ok(5));
        assert_eq!(*provider.calls.lock().unwrap(), ["user1"]);
    }

    #[test]
    fn status_failure_is_reported_as_the_outcome() {
        let (_, _, messages) = run_one("bad");
        assert_eq!(only_completion(messages).outcome, Err(OperationFailure::status(-5)));
    }

    #[test]
    fn provider_panic_becomes_a_failure_for_that_request_only() {
        let (provider, _, messages) = run_one("boom");

        assert_eq!(
            only_completion(messages).outcome,
            Err(OperationFailure::Panicked {
                message: "provider exploded".to_string()
            })
        );
        assert_eq!(provider.calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn keeps_running_after_the_caller_side_is_gone() {
        let mut ids = IdSequence::new();
        let provider = Arc::new(Recording::default());
        let (tx, rx) = bridge::channel();
        drop(rx);

        let request = request(&mut ids, "user1");
        run(request, context(&mut ids, &provider, tx));

        assert_eq!(provider.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn dead_worker_thread_is_reported_as_abandoned() {
        let mut ids = IdSequence::new();
        let (tx, mut rx) = bridge::channel();
        let request_id: RequestId = ids.next_id();
        let batch: BatchId = ids.next_id();

        let worker: JoinHandle<()> = tokio::task::spawn_blocking(|| panic!("worker thread lost"));
        watch(worker, request_id, batch, tx).await;

        match rx.try_recv() {
            Ok(BridgeMessage::Abandoned {
                request,
                batch: b,
                message,
            }) => {
                assert_eq!(request, request_id);
                assert_eq!(b, batch);
                assert!(message.contains("panic"), "{message}");
            }
            other => panic!("expected an abandoned notice, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn finished_worker_sends_nothing_extra() {
        let mut ids = IdSequence::new();
        let (tx, mut rx) = bridge::channel();

        let worker = tokio::task::spawn_blocking(|| {});
        watch(worker, ids.next_id(), ids.next_id(), tx).await;

        assert!(rx.try_recv().is_err());
    }
}
