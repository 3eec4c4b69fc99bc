// SPDX-License-Identifier: MIT

//! Ambient per-task tracing context.
//!
//! Propagated across `.await` points with a `tokio::task_local`, not a
//! thread-local, so it survives a handler being polled on different
//! executor threads between suspensions.

use crate::ids::new_entity_id;
use std::future::Future;

tokio::task_local! {
    static CURRENT: SpanContext;
}

/// Identifies the active span for the currently-running logical task.
#[derive(Debug, Clone)]
pub struct SpanContext {
    pub trace_id: String,
    pub span_id: String,
    pub parent_span_id: Option<String>,
}

impl SpanContext {
    /// Starts a new root span context with a fresh trace id.
    pub fn root() -> Self {
        Self { trace_id: new_entity_id(), span_id: new_entity_id(), parent_span_id: None }
    }

    /// Derives a child context: same trace, new span id, parent set to self.
    pub fn child(&self) -> Self {
        Self {
            trace_id: self.trace_id.clone(),
            span_id: new_entity_id(),
            parent_span_id: Some(self.span_id.clone()),
        }
    }

    /// Returns the context for the currently-running task, if any is scoped.
    pub fn current() -> Option<SpanContext> {
        CURRENT.try_with(|ctx| ctx.clone()).ok()
    }

    /// Runs `fut` with `self` installed as the ambient context.
    pub async fn scope<F: Future>(self, fut: F) -> F::Output {
        CURRENT.scope(self, fut).await
    }
}

/// RAII-ish marker returned by helpers that want to document they opened a
/// scope; the real propagation lives in `SpanContext::scope`'s task-local.
pub struct SpanGuard;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn context_propagates_across_await_points() {
        let root = SpanContext::root();
        let trace_id = root.trace_id.clone();
        root.scope(async move {
            tokio::task::yield_now().await;
            let current = SpanContext::current().expect("scoped context");
            assert_eq!(current.trace_id, trace_id);
        })
        .await;
    }

    #[tokio::test]
    async fn child_shares_trace_but_not_span_id() {
        let root = SpanContext::root();
        let child = root.child();
        assert_eq!(root.trace_id, child.trace_id);
        assert_ne!(root.span_id, child.span_id);
        assert_eq!(child.parent_span_id, Some(root.span_id.clone()));
    }

    #[tokio::test]
    async fn no_context_outside_scope() {
        assert!(SpanContext::current().is_none());
    }
}
