//! InMemoryAccountProvider - 開発用のアカウントバックエンド
//!
//! 本物のアカウントライブラリの代わりに、Mutex で守った HashMap に
//! アカウントを積む。遅延（latency + jitter）を入れて「時間のかかる
//! ブロッキング呼び出し」を再現できる。
//!
//! # ステータスコード
//! - `STATUS_ACCOUNT_EXISTS` (-1): 同じ locator が登録済み
//! - `STATUS_INVALID_CREDENTIALS` (-2): locator か password が空

use rand::Rng;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::ports::AccountProvider;

pub const STATUS_ACCOUNT_EXISTS: i32 = -1;
pub const STATUS_INVALID_CREDENTIALS: i32 = -2;

pub struct InMemoryAccountProvider {
    accounts: Mutex<HashMap<String, u64>>,
    next_handle: AtomicU64,
    latency: Duration,
    jitter: Duration,
}

impl InMemoryAccountProvider {
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
            latency: Duration::ZERO,
            jitter: Duration::ZERO,
        }
    }

    /// Sleep `latency` plus up to `jitter` on every call.
    pub fn with_latency(mut self, latency: Duration, jitter: Duration) -> Self {
        self.latency = latency;
        self.jitter = jitter;
        self
    }

    pub fn account_count(&self) -> usize {
        self.accounts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn handle_of(&self, locator: &str) -> Option<u64> {
        self.accounts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(locator)
            .copied()
    }

    fn simulate_latency(&self) {
        let jitter_ms = self.jitter.as_millis() as u64;
        let extra = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
        };
        let total = self.latency + extra;
        if !total.is_zero() {
            std::thread::sleep(total);
        }
    }
}

impl Default for InMemoryAccountProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountProvider for InMemoryAccountProvider {
    fn create_account(&self, locator: &str, password: &str) -> Result<u64, i32> {
        self.simulate_latency();

        if locator.is_empty() || password.is_empty() {
            return Err(STATUS_INVALID_CREDENTIALS);
        }

        let mut accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
        if accounts.contains_key(locator) {
            return Err(STATUS_ACCOUNT_EXISTS);
        }
        let handle = self.next_handle.fetch_add(1, Ordering::Relaxed);
        accounts.insert(locator.to_string(), handle);
        Ok(handle)
    }
}
