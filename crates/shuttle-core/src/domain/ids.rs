//! Domain identifiers (strongly-typed IDs).
//!
//! ULID ベースの `Id<T>` に Phantom type のマーカーを組み合わせて、
//! `RequestId` と `BatchId` を型レベルで区別します。
//!
//! ## なぜ ULID か
//! - **時刻でソート可能**: 生成順に並ぶので、ログ上で投入順が読める
//! - **ロックなしで生成**: 呼び出し側スレッドだけで採番できる
//!
//! `RequestId` は continuation token も兼ねます。ワーカースレッドへ渡るのは
//! この ID だけで、continuation 本体は呼び出し側スレッドに残ります。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::{Generator, Ulid};

/// Marker trait for id kinds. Provides the Display prefix.
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// ジェネリック ID 型
///
/// `T` は PhantomData なので実行時のサイズは `Ulid` と同じ 16 bytes。
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

// ========================================
// マーカー型の定義
// ========================================

/// Request のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RequestMarker {}

impl IdMarker for RequestMarker {
    fn prefix() -> &'static str {
        "req-"
    }
}

/// Batch (dispatch flag が立っている区間) のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BatchMarker {}

impl IdMarker for BatchMarker {
    fn prefix() -> &'static str {
        "batch-"
    }
}

/// Identifier of a submitted request. Also the continuation token.
pub type RequestId = Id<RequestMarker>;

/// Identifier of one active period: dispatch flag set until it is cleared.
pub type BatchId = Id<BatchMarker>;

/// Monotonic id source.
///
/// 同一ミリ秒内でも単調増加する `ulid::Generator` を包みます。
/// 呼び出し側スレッド専用（`&mut self`）。
pub struct IdSequence {
    generator: Generator,
}

impl Default for IdSequence {
    fn default() -> Self {
        Self::new()
    }
}

impl IdSequence {
    pub fn new() -> Self {
        Self {
            generator: Generator::new(),
        }
    }

    pub fn next_id<T: IdMarker>(&mut self) -> Id<T> {
        // overflow only happens after 2^80 ids in one millisecond
        let ulid = self.generator.generate().unwrap_or_else(|_| Ulid::new());
        Id::from_ulid(ulid)
    }
}
