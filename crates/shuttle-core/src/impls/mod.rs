//! Impls - 開発用・テスト用の実装
//!
//! # 含まれる実装
//! - **InMemoryAccountProvider**: HashMap に積むだけのアカウントバックエンド
//!
//! 本番のアカウントライブラリへのバインディングはこの crate の外に置く。

pub mod inmem_accounts;

pub use self::inmem_accounts::{
    InMemoryAccountProvider, STATUS_ACCOUNT_EXISTS, STATUS_INVALID_CREDENTIALS,
};
