//! OperationProvider port - ブロッキング操作の抽象化
//!
//! ディスパッチャが直列化して呼び出す外部の処理。
//! 実装はワーカースレッド上で同期的に呼ばれ、時間がかかってよい。
//!
//! # 契約
//! - 1 request につき必ず 1 回だけ呼ばれる（リトライしない）
//! - 同時に 2 つ以上の呼び出しが走ることはない
//! - 呼び出し側スレッドのデータには触れない（引数は owned な String のみ）

use crate::domain::{Operation, OperationFailure, RawOutcome};

/// Status returned when a provider is handed arguments it cannot use.
pub const STATUS_BAD_ARGUMENTS: i32 = -22;

/// The blocking operation the dispatcher exists to serialize.
pub trait OperationProvider: Send + Sync + 'static {
    fn perform(&self, operation: Operation, args: &[String]) -> RawOutcome;
}

/// Account backend in the shape of a C account library:
/// a handle on success, a non-zero status code on failure.
pub trait AccountProvider: Send + Sync + 'static {
    fn create_account(&self, locator: &str, password: &str) -> Result<u64, i32>;
}

/// Adapts an [`AccountProvider`] to the [`OperationProvider`] port.
pub struct AccountOperations<A> {
    accounts: A,
}

impl<A: AccountProvider> AccountOperations<A> {
    pub fn new(accounts: A) -> Self {
        Self { accounts }
    }

    pub fn accounts(&self) -> &A {
        &self.accounts
    }
}

impl<A: AccountProvider> OperationProvider for AccountOperations<A> {
    fn perform(&self, operation: Operation, args: &[String]) -> RawOutcome {
        match operation {
            Operation::CreateAccount => {
                let [locator, password] = args else {
                    return Err(OperationFailure::status(STATUS_BAD_ARGUMENTS));
                };
                self.accounts
                    .create_account(locator, password)
                    .map_err(OperationFailure::status)
            }
        }
    }
}
