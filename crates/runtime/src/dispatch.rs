// SPDX-License-Identifier: MIT

//! Entry points for each trigger kind: open a root span, call into the
//! worker module, persist the span's terminal status, and on failure
//! record a `user_errors` row (spec §4.11's per-invocation span tree).

use crate::context::ExecutionContext;
use crate::generation::Generation;
use crate::http::{HttpRequest, HttpResponse};
use crate::queue_batch::MessageBatch;
use crate::scheduled::ScheduledController;
use crate::worker::EmailMessage;
use es_core::ids::new_entity_id;
use es_core::Clock;
use es_core::SpanContext;
use es_store::{spans, Store};
use serde_json::Value;
use std::sync::Arc;

async fn persist_span_start(store: &Store, ctx: &SpanContext, name: &str, kind: &str) {
    let store = store.clone();
    let ctx = ctx.clone();
    let name = name.to_string();
    let kind = kind.to_string();
    let outcome = tokio::task::spawn_blocking(move || {
        let conn = store.conn()?;
        spans::start_span(&conn, &ctx.span_id, &ctx.trace_id, ctx.parent_span_id.as_deref(), &name, &kind, now_ms(), &Value::Null)
    })
    .await;
    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(err)) => tracing::warn!(error = %err, "failed to persist span start"),
        Err(err) => tracing::warn!(error = %err, "span-start task panicked"),
    }
}

async fn persist_span_end(store: &Store, span_id: &str, status: &str) {
    let store = store.clone();
    let span_id = span_id.to_string();
    let status = status.to_string();
    let outcome = tokio::task::spawn_blocking(move || {
        let conn = store.conn()?;
        spans::end_span(&conn, &span_id, &status, now_ms())
    })
    .await;
    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(err)) => tracing::warn!(error = %err, "failed to persist span end"),
        Err(err) => tracing::warn!(error = %err, "span-end task panicked"),
    }
}

async fn record_user_error(store: &Store, ctx: &SpanContext, message: &str) {
    let store = store.clone();
    let trace_id = ctx.trace_id.clone();
    let span_id = ctx.span_id.clone();
    let message = message.to_string();
    let id = new_entity_id();
    let outcome = tokio::task::spawn_blocking(move || {
        let conn = store.conn()?;
        spans::record_user_error(&conn, &id, Some(&trace_id), Some(&span_id), &message, now_ms())
    })
    .await;
    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(err)) => tracing::warn!(error = %err, "failed to record user error"),
        Err(err) => tracing::warn!(error = %err, "user-error task panicked"),
    }
}

fn now_ms() -> i64 {
    es_core::SystemClock.epoch_ms() as i64
}

pub async fn invoke_fetch(store: &Store, generation: &Generation, request: HttpRequest) -> HttpResponse {
    let span = SpanContext::root();
    persist_span_start(store, &span, "fetch", "server").await;
    let ctx = Arc::new(ExecutionContext::new());
    let env = generation.env.clone();
    let module = generation.module.clone();

    let outcome = span
        .clone()
        .scope(async move { module.fetch(request, env, ctx.clone()).await.map(|resp| (resp, ctx)) })
        .await;

    match outcome {
        Ok((response, ctx)) => {
            persist_span_end(store, &span.span_id, "ok").await;
            ctx.drain().await;
            response
        }
        Err(message) => {
            persist_span_end(store, &span.span_id, "error").await;
            record_user_error(store, &span, &message).await;
            HttpResponse { status: 500, headers: Vec::new(), body: format!("internal error: {message}").into_bytes() }
        }
    }
}

pub async fn invoke_scheduled(store: &Store, generation: &Generation, scheduled_time_ms: u64, cron: &str) -> Result<(), String> {
    let span = SpanContext::root();
    persist_span_start(store, &span, "scheduled", "consumer").await;
    let ctx = Arc::new(ExecutionContext::new());
    let controller = Arc::new(ScheduledController::new(scheduled_time_ms, cron));
    let env = generation.env.clone();
    let module = generation.module.clone();

    let result = span.clone().scope(module.scheduled(controller, env, ctx.clone())).await;
    ctx.drain().await;

    match &result {
        Ok(()) => persist_span_end(store, &span.span_id, "ok").await,
        Err(message) => {
            persist_span_end(store, &span.span_id, "error").await;
            record_user_error(store, &span, message).await;
        }
    }
    result
}

pub async fn invoke_queue(store: &Store, generation: &Generation, batch: Arc<MessageBatch>) -> Result<(), String> {
    let span = SpanContext::root();
    persist_span_start(store, &span, "queue", "consumer").await;
    let ctx = Arc::new(ExecutionContext::new());
    let env = generation.env.clone();
    let module = generation.module.clone();

    let result = span.clone().scope(module.queue(batch, env, ctx.clone())).await;
    ctx.drain().await;

    match &result {
        Ok(()) => persist_span_end(store, &span.span_id, "ok").await,
        Err(message) => {
            persist_span_end(store, &span.span_id, "error").await;
            record_user_error(store, &span, message).await;
        }
    }
    result
}

pub async fn invoke_email(store: &Store, generation: &Generation, message: EmailMessage) -> Result<(), String> {
    let span = SpanContext::root();
    persist_span_start(store, &span, "email", "consumer").await;
    let ctx = Arc::new(ExecutionContext::new());
    let env = generation.env.clone();
    let module = generation.module.clone();

    let result = span.clone().scope(module.email(message, env, ctx.clone())).await;
    ctx.drain().await;

    match &result {
        Ok(()) => persist_span_end(store, &span.span_id, "ok").await,
        Err(message) => {
            persist_span_end(store, &span.span_id, "error").await;
            record_user_error(store, &span, message).await;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::Generation;
    use crate::worker::WorkerModule;
    use async_trait::async_trait;
    use tempfile::tempdir;

    struct Echo;

    #[async_trait]
    impl WorkerModule for Echo {
        async fn fetch(&self, request: HttpRequest, _env: Arc<crate::env::Env>, _ctx: Arc<ExecutionContext>) -> Result<HttpResponse, String> {
            Ok(HttpResponse::text(200, request.url))
        }

        async fn scheduled(&self, _controller: Arc<ScheduledController>, _env: Arc<crate::env::Env>, _ctx: Arc<ExecutionContext>) -> Result<(), String> {
            Err("scheduled handler failed".to_string())
        }
    }

    #[tokio::test]
    async fn invoke_fetch_returns_the_handlers_response() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let env = crate::tests_support::empty_env().await;
        let generation = Generation::new(env, Arc::new(Echo));
        let request = HttpRequest { method: "GET".to_string(), url: "/hello".to_string(), headers: vec![], body: vec![] };

        let response = invoke_fetch(&store, &generation, request).await;
        assert_eq!(response.status, 200);
        assert_eq!(response.body, b"/hello");
    }

    #[tokio::test]
    async fn invoke_scheduled_propagates_the_handlers_error() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let env = crate::tests_support::empty_env().await;
        let generation = Generation::new(env, Arc::new(Echo));

        let result = invoke_scheduled(&store, &generation, 0, "* * * * *").await;
        assert_eq!(result, Err("scheduled handler failed".to_string()));
    }
}
