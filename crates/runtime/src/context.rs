// SPDX-License-Identifier: MIT

//! The execution context passed alongside `env` into every handler
//! invocation: `waitUntil` for background work that outlives the response,
//! `passThroughOnException` to opt a fetch handler out of error trapping
//! (spec §4.11, §5 cancellation policy).

use std::future::Future;
use tokio::task::JoinHandle;

/// Collects `waitUntil` futures so a generation drain can await them before
/// the generation is dropped (spec: "Background work registered through the
/// execution context completes independently").
pub struct ExecutionContext {
    background: parking_lot::Mutex<Vec<JoinHandle<()>>>,
    pass_through: std::sync::atomic::AtomicBool,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self { background: parking_lot::Mutex::new(Vec::new()), pass_through: std::sync::atomic::AtomicBool::new(false) }
    }

    /// Registers background work that must complete independently of the
    /// handler's response; errors are logged, never surfaced to the caller.
    pub fn wait_until<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            fut.await;
        });
        self.background.lock().push(handle);
    }

    pub fn pass_through_on_exception(&self) {
        self.pass_through.store(true, std::sync::atomic::Ordering::Relaxed);
    }

    pub fn passes_through_on_exception(&self) -> bool {
        self.pass_through.load(std::sync::atomic::Ordering::Relaxed)
    }

    /// Awaits every background task registered via `wait_until`. Called when
    /// draining a generation on hot-reload, or at the end of a test.
    pub async fn drain(&self) {
        let handles: Vec<_> = self.background.lock().drain(..).collect();
        for handle in handles {
            if let Err(err) = handle.await {
                tracing::error!(error = %err, "waitUntil task panicked");
            }
        }
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn wait_until_runs_to_completion_on_drain() {
        let ctx = ExecutionContext::new();
        let ran = Arc::new(AtomicBool::new(false));
        let ran_clone = ran.clone();
        ctx.wait_until(async move {
            ran_clone.store(true, Ordering::SeqCst);
        });
        ctx.drain().await;
        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn pass_through_on_exception_defaults_to_false() {
        let ctx = ExecutionContext::new();
        assert!(!ctx.passes_through_on_exception());
        ctx.pass_through_on_exception();
        assert!(ctx.passes_through_on_exception());
    }
}
