// SPDX-License-Identifier: MIT

//! The input gate (spec §4.8.3): a single-writer serial queue. At most one
//! call runs at a time and calls execute in receipt order.
//!
//! `allowConcurrency`/`allowUnconfirmed`/`noCache` are accepted by callers
//! but have no effect — every call goes through this gate regardless.

use std::future::Future;
use tokio::sync::Mutex;

/// `tokio::sync::Mutex` queues waiters FIFO, which is exactly the ordering
/// the input gate promises — no extra bookkeeping needed.
pub struct InputGate {
    lock: Mutex<()>,
}

impl InputGate {
    pub fn new() -> Self {
        Self { lock: Mutex::new(()) }
    }

    pub async fn run<F, Fut, T>(&self, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _permit = self.lock.lock().await;
        f().await
    }

    /// Best-effort point-in-time check: true if no call currently holds the
    /// gate. Used by eviction to avoid dropping an instance mid-call.
    pub fn try_lock_available(&self) -> bool {
        self.lock.try_lock().is_ok()
    }
}

impl Default for InputGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn serializes_concurrent_callers() {
        let gate = Arc::new(InputGate::new());
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut handles = Vec::new();
        for i in 0..5 {
            let gate = gate.clone();
            let order = order.clone();
            handles.push(tokio::spawn(async move {
                gate.run(|| async move {
                    order.lock().unwrap().push(i);
                })
                .await;
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(order.lock().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn runs_do_not_overlap() {
        let gate = Arc::new(InputGate::new());
        let active = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();
        for _ in 0..10 {
            let gate = gate.clone();
            let active = active.clone();
            let max_seen = max_seen.clone();
            handles.push(tokio::spawn(async move {
                gate.run(|| async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen.fetch_max(now, Ordering::SeqCst);
                    tokio::task::yield_now().await;
                    active.fetch_sub(1, Ordering::SeqCst);
                })
                .await;
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }
}
