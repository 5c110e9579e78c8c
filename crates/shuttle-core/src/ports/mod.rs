//! Ports - 外部との境界
//!
//! ディスパッチャが外へ出ていく口は provider の 1 つだけ。
//! 呼び出し側への戻りは `app::bridge` が担う。

pub mod provider;

pub use self::provider::{
    AccountOperations, AccountProvider, OperationProvider, STATUS_BAD_ARGUMENTS,
};
