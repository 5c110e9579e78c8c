//! App - ディスパッチャ本体
//!
//! # 主要コンポーネント
//! - **Dispatcher**: submission path と dispatch flag（呼び出し側スレッド）
//! - **WorkerLoop**: 1 request ずつのバックグラウンド実行
//! - **Bridge**: 結果を呼び出し側スレッドへ戻すチャネルと continuation arena
//! - **DispatcherConfig** / **DispatchStats**: 設定と状態スナップショット

pub mod bridge;
pub mod config;
pub mod dispatcher;
pub mod status;
pub mod worker_loop;

pub use self::bridge::{Continuation, ContinuationArena};
pub use self::config::DispatcherConfig;
pub use self::dispatcher::Dispatcher;
pub use self::status::DispatchStats;
