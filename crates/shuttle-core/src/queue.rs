//! PendingQueue - 実行待ちの request の FIFO
//!
//! # 実装詳細
//! - `Arc<Mutex<VecDeque<Request>>>` を 1 本だけ持つ。clone は同じ deque を共有する
//! - push は `submit`、pop は結果配送後の `advance`。どちらも呼び出し側スレッド
//! - ロック区間は push / pop / len の 1 操作だけ。provider の実行中には取らない
//!
//! 容量制限はここでは持たない。`Dispatcher` が push 前に `len()` を見る。
//! push するのは呼び出し側スレッドだけなので、確認と push の間に件数が
//! 増えることはない。

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::domain::Request;

#[derive(Clone, Default)]
pub struct PendingQueue {
    requests: Arc<Mutex<VecDeque<Request>>>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_back(&self, request: Request) {
        self.lock().push_back(request);
    }

    pub fn pop_front(&self) -> Option<Request> {
        self.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // Every critical section is a single VecDeque call, so a poisoned
    // lock still guards a consistent deque.
    fn lock(&self) -> MutexGuard<'_, VecDeque<Request>> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{IdSequence, Operation, Payload, RequestId};

    fn request(ids: &mut IdSequence, user: &str) -> Request {
        Request::new(ids.next_id(), Operation::CreateAccount, Payload::new([user, "pw"])).unwrap()
    }

    #[test]
    fn pops_in_push_order() {
        let mut ids = IdSequence::new();
        let queue = PendingQueue::new();
        let first = request(&mut ids, "a");
        let second = request(&mut ids, "b");
        let (id1, id2) = (first.id(), second.id());

        queue.push_back(first);
        queue.push_back(second);

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop_front().map(|r| r.id()), Some(id1));
        assert_eq!(queue.pop_front().map(|r| r.id()), Some(id2));
        assert!(queue.pop_front().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn clones_share_the_same_deque() {
        let mut ids = IdSequence::new();
        let queue = PendingQueue::new();
        let worker_side = queue.clone();

        queue.push_back(request(&mut ids, "a"));

        let popped: Option<RequestId> = std::thread::spawn(move || worker_side.pop_front().map(|r| r.id()))
            .join()
            .unwrap();
        assert!(popped.is_some());
        assert!(queue.is_empty());
    }

    #[test]
    fn survives_a_poisoned_lock() {
        let mut ids = IdSequence::new();
        let queue = PendingQueue::new();
        queue.push_back(request(&mut ids, "a"));

        let poisoner = queue.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.requests.lock().unwrap();
            panic!("poison the queue lock");
        })
        .join();

        assert_eq!(queue.len(), 1);
        assert!(queue.pop_front().is_some());
    }
}
