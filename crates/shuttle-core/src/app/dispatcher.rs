//! Dispatcher - 呼び出し側スレッドの窓口
//!
//! submission path と result delivery の両方がここに入る。どちらも
//! 呼び出し側スレッドでしか走らない。`Dispatcher` は `Rc` を内部に持つので
//! `Send` ではなく、dispatch flag を別スレッドから触るコードは書けない。
//!
//! # 状態
//! - `active` (dispatch flag): request を実行中か、結果の配送待ち
//! - `batch`: flag が立ってから下りるまでの区間の ID（ログ用）
//! - `queue`: ワーカーと共有する唯一の可変状態（Mutex）
//! - `continuations`: request ごとの callback。呼び出し側スレッドから出ない
//!
//! # 直列化
//! ワーカーは 1 request だけ実行して結果を返す。次の request を pop して
//! ワーカーを起動するのは `advance` で、continuation を呼び終えた後に限る。
//! そのため provider の呼び出しと continuation が同時に走ることはない。
//!
//! # 使用例
//! ```ignore
//! let dispatcher = Dispatcher::new(provider, DispatcherConfig::default())?;
//! dispatcher.submit_operation("create_account", vec!["user1".into(), "pw1".into()], |outcome| {
//!     println!("{outcome:?}");
//! })?;
//! dispatcher.run_until_idle().await?;
//! ```

use chrono::Utc;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;
use tokio::runtime::Handle;

use super::bridge::{self, BridgeMessage, BridgeReceiver, BridgeSender, Completion, ContinuationArena};
use super::config::DispatcherConfig;
use super::status::DispatchStats;
use super::worker_loop::{self, WorkerContext};
use crate::domain::{
    BatchId, IdSequence, Operation, OperationFailure, Outcome, Payload, Request, RequestId,
    into_outcome,
};
use crate::error::DispatchError;
use crate::ports::OperationProvider;
use crate::queue::PendingQueue;

/// Single-worker dispatcher. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Rc<Inner>,
}

struct Inner {
    config: DispatcherConfig,
    name: Arc<str>,
    runtime: Handle,
    provider: Arc<dyn OperationProvider>,
    queue: PendingQueue,
    active: Cell<bool>,
    batch: Cell<Option<BatchId>>,
    ids: RefCell<IdSequence>,
    continuations: RefCell<ContinuationArena>,
    bridge_tx: BridgeSender,
    bridge_rx: RefCell<BridgeReceiver>,
    stats: RefCell<DispatchStats>,
}

impl Dispatcher {
    /// Create a dispatcher bound to the current tokio runtime.
    ///
    /// Workers run on that runtime's blocking pool; the thread calling this
    /// becomes the caller thread.
    pub fn new(
        provider: Arc<dyn OperationProvider>,
        config: DispatcherConfig,
    ) -> Result<Self, DispatchError> {
        let runtime = Handle::try_current().map_err(|_| DispatchError::NoRuntime)?;
        let (bridge_tx, bridge_rx) = bridge::channel();
        let name: Arc<str> = Arc::from(config.name.as_str());

        Ok(Self {
            inner: Rc::new(Inner {
                config,
                name,
                runtime,
                provider,
                queue: PendingQueue::new(),
                active: Cell::new(false),
                batch: Cell::new(None),
                ids: RefCell::new(IdSequence::new()),
                continuations: RefCell::new(ContinuationArena::default()),
                bridge_tx,
                bridge_rx: RefCell::new(bridge_rx),
                stats: RefCell::new(DispatchStats::default()),
            }),
        })
    }

    /// Inbound boundary: submit by operation name.
    pub fn submit_operation<F>(
        &self,
        operation_name: &str,
        arguments: Vec<String>,
        on_complete: F,
    ) -> Result<RequestId, DispatchError>
    where
        F: FnOnce(Outcome) + 'static,
    {
        let operation = operation_name
            .parse::<Operation>()
            .map_err(|err| self.reject(err))?;
        self.submit(operation, arguments, on_complete)
    }

    /// Submit a request. Never blocks.
    ///
    /// On `Ok`, `continuation` runs exactly once, on this thread, from
    /// [`pump`](Self::pump) or [`run_until_idle`](Self::run_until_idle).
    /// On `Err`, nothing was queued and `continuation` is dropped unused.
    pub fn submit<F>(
        &self,
        operation: Operation,
        payload: impl Into<Payload>,
        continuation: F,
    ) -> Result<RequestId, DispatchError>
    where
        F: FnOnce(Outcome) + 'static,
    {
        let inner = &self.inner;
        let id: RequestId = inner.ids.borrow_mut().next_id();
        let request = Request::new(id, operation, payload.into()).map_err(|err| self.reject(err))?;

        let active = inner.active.get();
        if active
            && let Some(capacity) = inner.config.max_pending
            && inner.queue.len() >= capacity
        {
            return Err(self.reject(DispatchError::QueueFull { capacity }));
        }

        inner
            .continuations
            .borrow_mut()
            .insert(id, Box::new(continuation));
        inner.stats.borrow_mut().submitted += 1;

        if active {
            inner.queue.push_back(request);
            tracing::debug!(
                dispatcher = %inner.name,
                request_id = %id,
                %operation,
                pending = inner.queue.len(),
                "request queued behind active worker"
            );
        } else {
            inner.active.set(true);
            let batch = self.begin_batch();
            self.start_worker(batch, request);
        }
        Ok(id)
    }

    /// Deliver every result that has already arrived, without waiting.
    ///
    /// Returns the number of bridge messages handled.
    pub fn pump(&self) -> Result<usize, DispatchError> {
        let mut handled = 0;
        loop {
            let message = {
                let mut rx = self
                    .inner
                    .bridge_rx
                    .try_borrow_mut()
                    .map_err(|_| DispatchError::BridgeBusy)?;
                match rx.try_recv() {
                    Ok(message) => message,
                    Err(_) => break,
                }
            };
            self.handle(message);
            handled += 1;
        }
        Ok(handled)
    }

    /// Wait for results and deliver them until the dispatcher is idle.
    ///
    /// Continuations that submit more work keep this running.
    #[allow(clippy::await_holding_refcell_ref)]
    pub async fn run_until_idle(&self) -> Result<(), DispatchError> {
        while !self.is_idle() {
            let message = {
                // held across the await on purpose: a second driver gets BridgeBusy
                let mut rx = self
                    .inner
                    .bridge_rx
                    .try_borrow_mut()
                    .map_err(|_| DispatchError::BridgeBusy)?;
                rx.recv().await
            };
            match message {
                Some(message) => self.handle(message),
                // unreachable while `inner` holds a sender
                None => break,
            }
        }
        Ok(())
    }

    /// Dispatch flag.
    pub fn is_active(&self) -> bool {
        self.inner.active.get()
    }

    /// No worker and no continuation waiting.
    pub fn is_idle(&self) -> bool {
        !self.inner.active.get() && self.inner.continuations.borrow().is_empty()
    }

    pub fn pending(&self) -> usize {
        self.inner.queue.len()
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.inner.config
    }

    pub fn stats(&self) -> DispatchStats {
        let mut stats = self.inner.stats.borrow().clone();
        stats.pending = self.inner.queue.len();
        stats.outstanding = self.inner.continuations.borrow().len();
        stats.active = self.inner.active.get();
        stats
    }

    fn reject(&self, err: DispatchError) -> DispatchError {
        self.inner.stats.borrow_mut().rejected += 1;
        tracing::warn!(dispatcher = %self.inner.name, error = %err, "request rejected");
        err
    }

    fn begin_batch(&self) -> BatchId {
        let inner = &self.inner;
        let batch = inner.ids.borrow_mut().next_id();
        inner.batch.set(Some(batch));
        inner.stats.borrow_mut().batches_started += 1;
        batch
    }

    fn start_worker(&self, batch: BatchId, request: Request) {
        let inner = &self.inner;
        inner.stats.borrow_mut().workers_started += 1;
        tracing::debug!(
            dispatcher = %inner.name,
            %batch,
            request_id = %request.id(),
            "starting worker"
        );

        worker_loop::start(
            &inner.runtime,
            request,
            WorkerContext {
                batch,
                dispatcher: Arc::clone(&inner.name),
                provider: Arc::clone(&inner.provider),
                bridge: inner.bridge_tx.clone(),
            },
        );
    }

    fn handle(&self, message: BridgeMessage) {
        let delivered = match message {
            BridgeMessage::Completed(completion) => {
                let Completion {
                    request,
                    outcome,
                    batch,
                    finished_at,
                } = completion;
                let now = Utc::now();
                tracing::debug!(
                    dispatcher = %self.inner.name,
                    request_id = %request.id(),
                    %batch,
                    ok = outcome.is_ok(),
                    latency_ms = (now - request.submitted_at()).num_milliseconds(),
                    bridge_lag_ms = (now - finished_at).num_milliseconds(),
                    "delivering result"
                );
                self.deliver(request.id(), batch, into_outcome(outcome))
            }
            BridgeMessage::Abandoned {
                request,
                batch,
                message,
            } => {
                tracing::error!(
                    dispatcher = %self.inner.name,
                    request_id = %request,
                    %batch,
                    error = %message,
                    "worker ended without a result"
                );
                self.deliver(request, batch, Err(OperationFailure::Panicked { message }))
            }
        };
        // nothing was outstanding: the queue already moved on for this request
        if delivered {
            self.advance();
        }
    }

    /// Run the continuation for `request_id`. Returns `false` if none was waiting.
    fn deliver(&self, request_id: RequestId, batch: BatchId, outcome: Outcome) -> bool {
        let inner = &self.inner;

        // take the continuation before calling it: it may call `submit`
        let continuation = inner.continuations.borrow_mut().take(request_id);
        let Some(continuation) = continuation else {
            tracing::error!(
                dispatcher = %inner.name,
                %request_id,
                %batch,
                "no continuation registered, result dropped"
            );
            return false;
        };

        {
            let mut stats = inner.stats.borrow_mut();
            stats.delivered += 1;
            if outcome.is_ok() {
                stats.succeeded += 1;
            } else {
                stats.failed += 1;
            }
            stats.last_delivered_at = Some(Utc::now());
        }

        if let Err(message) = bridge::invoke(continuation, outcome) {
            tracing::error!(dispatcher = %inner.name, %request_id, error = %message, "continuation panicked");
        }
        true
    }

    /// Start the next queued request, or clear the dispatch flag.
    fn advance(&self) {
        let inner = &self.inner;
        match inner.queue.pop_front() {
            Some(next) => {
                let batch = match inner.batch.get() {
                    Some(batch) => batch,
                    None => self.begin_batch(),
                };
                self.start_worker(batch, next);
            }
            None => {
                inner.active.set(false);
                if let Some(batch) = inner.batch.take() {
                    tracing::debug!(dispatcher = %inner.name, %batch, "dispatcher idle");
                }
            }
        }
    }
}
