//! shuttle-core
//!
//! Single-worker asynchronous dispatch: requests submitted on one caller
//! thread run one at a time on a background worker, and their results come
//! back to the caller thread in submission order.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, operation, request, outcome）
//! - **ports**: 外部の抽象化（OperationProvider, AccountProvider）
//! - **queue**: ワーカーと共有する PendingQueue
//! - **app**: Dispatcher, worker loop, result bridge, config, status
//! - **impls**: 開発用の実装（InMemoryAccountProvider）
//! - **error**: 同期的に返すエラー

pub mod app;
pub mod domain;
pub mod error;
pub mod impls;
pub mod ports;
pub mod queue;

pub use app::{DispatchStats, Dispatcher, DispatcherConfig};
pub use domain::{Operation, OperationFailure, Outcome, Payload, RequestId, ResourceHandle};
pub use error::{ConfigError, DispatchError};
pub use ports::{AccountOperations, AccountProvider, OperationProvider};
