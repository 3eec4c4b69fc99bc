// SPDX-License-Identifier: MIT

//! Inspector IPC listener (spec §6): accepts connections on the daemon's
//! Unix socket and serves `es_wire::Request`/`Response` pairs, one
//! connection-handling task per accepted socket so a slow CLI client never
//! blocks another.

use es_core::Clock;
use es_runtime::GenerationSlot;
use es_store::error::StoreResult;
use es_store::Store;
use es_wire::{Query, Request, Response};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::{UnixListener, UnixStream};

const PROTOCOL_VERSION: &str = "1";

pub struct ListenCtx {
    pub store: Store,
    pub generations: Arc<GenerationSlot>,
    pub started_at: Instant,
    pub queue_names: Vec<String>,
    pub crons: Vec<String>,
    pub shutting_down: Arc<AtomicBool>,
}

/// Binds the inspector socket and serves connections until `shutting_down`
/// is observed after a connection closes. Does not itself watch for
/// external shutdown signals; that's `main`'s job via `ctrl_c`.
pub async fn run(socket_path: &Path, ctx: Arc<ListenCtx>) -> StoreResult<()> {
    if socket_path.exists() {
        let _ = std::fs::remove_file(socket_path);
    }
    let listener = UnixListener::bind(socket_path)?;
    tracing::info!(socket = %socket_path.display(), "inspector listener bound");

    loop {
        let (stream, _) = listener.accept().await?;
        let conn_ctx = ctx.clone();
        tokio::spawn(async move {
            if let Err(err) = handle_connection(stream, &conn_ctx).await {
                tracing::debug!(error = %err, "inspector connection closed with an error");
            }
        });
        if ctx.shutting_down.load(Ordering::SeqCst) {
            return Ok(());
        }
    }
}

async fn handle_connection(mut stream: UnixStream, ctx: &ListenCtx) -> Result<(), es_wire::ProtocolError> {
    loop {
        let request = match es_wire::read_request(&mut stream).await {
            Ok(request) => request,
            Err(es_wire::ProtocolError::Io(_)) => return Ok(()),
            Err(err) => return Err(err),
        };
        let response = handle_request(ctx, request).await;
        let shutting_down = matches!(response, Response::ShuttingDown);
        es_wire::write_response(&mut stream, &response).await?;
        if shutting_down {
            return Ok(());
        }
    }
}

async fn handle_request(ctx: &ListenCtx, request: Request) -> Response {
    match request {
        Request::Hello { version: _ } => Response::Hello { version: PROTOCOL_VERSION.to_string() },
        Request::Ping => Response::Pong,
        Request::Shutdown => {
            ctx.shutting_down.store(true, Ordering::SeqCst);
            Response::ShuttingDown
        }
        Request::TriggerScheduled { cron } => {
            let generation = ctx.generations.current();
            let scheduled_time_ms = es_core::SystemClock.epoch_ms();
            match es_runtime::dispatch::invoke_scheduled(&ctx.store, &generation, scheduled_time_ms, &cron).await {
                Ok(()) => Response::Scheduled { invoked: true },
                Err(err) => {
                    tracing::warn!(cron = %cron, error = %err, "triggered scheduled handler failed");
                    Response::Scheduled { invoked: false }
                }
            }
        }
        Request::Query(query) => match run_query(ctx, query) {
            Ok(response) => response,
            Err(err) => Response::Error { message: err.to_string() },
        },
    }
}

fn run_query(ctx: &ListenCtx, query: Query) -> StoreResult<Response> {
    use es_wire::{
        ActorAlarmSummary, ActorStorageEntrySummary, ActorSummary, AiProxyLogSummary,
        AnalyticsDataPointSummary, CacheEntrySummary, CronSummary, EmailMessageSummary,
        KvEntryDetail, KvEntrySummary, ObjectEntryDetail, ObjectEntrySummary, QueueMessageSummary,
        SpanEventSummary, SpanSummary, WorkflowEventSummary, WorkflowInstanceDetail,
        WorkflowInstanceSummary, WorkflowStepSummary,
    };

    let conn = ctx.store.conn()?;
    let now_secs = es_core::SystemClock.epoch_seconds() as i64;

    Ok(match query {
        Query::ListKvEntries { namespace, prefix } => {
            let (rows, _more) = es_store::kv::list(&conn, &namespace, prefix.as_deref().unwrap_or(""), None, 1000, now_secs)?;
            let entries = rows
                .into_iter()
                .map(|r| KvEntrySummary { namespace: namespace.clone(), key: r.key, size: r.value.len() as u64, metadata: r.metadata, expiration: r.expiration })
                .collect();
            Response::KvEntries { entries }
        }
        Query::GetKvEntry { namespace, key } => {
            let row = es_store::kv::get(&conn, &namespace, &key, now_secs)?;
            let entry = row.map(|r| Box::new(KvEntryDetail { namespace, key, value: r.value, metadata: r.metadata, expiration: r.expiration }));
            Response::KvEntry { entry }
        }
        Query::ListObjectEntries { bucket, prefix } => {
            let result = es_store::objects::list(&conn, &bucket, prefix.as_deref().unwrap_or(""), None, 1000)?;
            let entries = result
                .entries
                .into_iter()
                .map(|r| ObjectEntrySummary { bucket: r.bucket, key: r.key, size: r.size as u64, etag: r.etag, version: r.version, uploaded: r.uploaded, storage_class: r.storage_class })
                .collect();
            Response::ObjectEntries { entries }
        }
        Query::GetObjectEntry { bucket, key } => {
            let row = es_store::objects::head(&conn, &bucket, &key)?;
            let entry = row.map(|r| {
                Box::new(ObjectEntryDetail {
                    bucket: r.bucket,
                    key: r.key,
                    size: r.size as u64,
                    etag: r.etag,
                    version: r.version,
                    uploaded: r.uploaded,
                    http_metadata: r.http_metadata,
                    custom_metadata: r.custom_metadata,
                    storage_class: r.storage_class,
                })
            });
            Response::ObjectEntry { entry }
        }
        Query::ListActors { class } => {
            let rows = es_store::actors::list_actors(&conn, class.as_deref())?;
            let generation = ctx.generations.current();
            let actors = rows
                .into_iter()
                .map(|r| {
                    let resident = generation
                        .env
                        .actors
                        .values()
                        .find(|ns| ns.class_name() == r.class)
                        .map(|ns| ns.is_resident(&es_actors::ActorId::from_string(r.id.clone())))
                        .unwrap_or(false);
                    ActorSummary { class: r.class, id: r.id, name: r.name, created_at: r.created_at, resident }
                })
                .collect();
            Response::Actors { actors }
        }
        Query::GetActor { class, id } => {
            let row = es_store::actors::get_actor(&conn, &class, &id)?;
            let generation = ctx.generations.current();
            let actor = row.map(|r| {
                let resident = generation
                    .env
                    .actors
                    .values()
                    .find(|ns| ns.class_name() == r.class)
                    .map(|ns| ns.is_resident(&es_actors::ActorId::from_string(r.id.clone())))
                    .unwrap_or(false);
                Box::new(ActorSummary { class: r.class, id: r.id, name: r.name, created_at: r.created_at, resident })
            });
            Response::Actor { actor }
        }
        Query::ListActorStorage { class, id } => {
            let rows = es_store::actors::storage_list(&conn, &class, &id, &es_store::actors::ListOpts::default())?;
            let entries = rows.into_iter().map(|r| ActorStorageEntrySummary { key: r.key, value: r.value }).collect();
            Response::ActorStorageEntries { entries }
        }
        Query::ListActorAlarms => {
            let rows = es_store::actors::list_alarms(&conn)?;
            let alarms = rows.into_iter().map(|r| ActorAlarmSummary { class: r.class, id: r.id, alarm_time: r.alarm_time }).collect();
            Response::ActorAlarms { alarms }
        }
        Query::ListQueueMessages { queue, status } => {
            let status = status.as_deref().map(status_from_str);
            let rows = es_store::queue::list_messages(&conn, &queue, status)?;
            let messages = rows
                .into_iter()
                .map(|r| QueueMessageSummary {
                    queue: r.queue,
                    id: r.id,
                    content_type: r.content_type,
                    status: r.status.as_str().to_string(),
                    attempts: r.attempts,
                    visible_at: r.visible_at,
                    created_at: r.created_at,
                    completed_at: None,
                })
                .collect();
            Response::QueueMessages { messages }
        }
        Query::ListWorkflowInstances { workflow_name } => {
            let rows = es_store::workflow::list_instances(&conn, workflow_name.as_deref())?;
            let instances = rows
                .into_iter()
                .map(|r| WorkflowInstanceSummary { workflow_name: r.workflow_name, id: r.id, status: r.status.as_str().to_string(), created_at: r.created_at, updated_at: r.updated_at })
                .collect();
            Response::WorkflowInstances { instances }
        }
        Query::GetWorkflowInstance { id } => {
            let row = es_store::workflow::get_instance(&conn, &id)?;
            let instance = row.map(|r| {
                Box::new(WorkflowInstanceDetail {
                    workflow_name: r.workflow_name,
                    id: r.id,
                    status: r.status.as_str().to_string(),
                    params: r.params,
                    output: r.output,
                    error: r.error,
                    created_at: r.created_at,
                    updated_at: r.updated_at,
                })
            });
            Response::WorkflowInstance { instance }
        }
        Query::ListWorkflowSteps { instance_id } => {
            let rows = es_store::workflow::list_steps(&conn, &instance_id)?;
            let steps = rows
                .into_iter()
                .map(|r| WorkflowStepSummary { instance_id: instance_id.clone(), step_name: r.step_name, output: r.output, completed_at: r.completed_at })
                .collect();
            Response::WorkflowSteps { steps }
        }
        Query::ListWorkflowEvents { instance_id } => {
            let rows = es_store::workflow::list_events(&conn, &instance_id)?;
            let events = rows
                .into_iter()
                .map(|r| WorkflowEventSummary { id: r.id, instance_id: r.instance_id, event_type: r.event_type, payload: r.payload, created_at: r.created_at })
                .collect();
            Response::WorkflowEvents { events }
        }
        Query::ListCacheEntries { cache_name } => {
            let rows = es_store::cache::list_entries(&conn, &cache_name)?;
            let entries = rows
                .into_iter()
                .map(|r| CacheEntrySummary { cache_name: cache_name.clone(), url: r.url, status: r.status, size: r.size, expires_at: r.expires_at })
                .collect();
            Response::CacheEntries { entries }
        }
        Query::ListSpans { trace_id } => {
            let rows = es_store::spans::list_spans(&conn, trace_id.as_deref())?;
            let spans = rows
                .into_iter()
                .map(|r| SpanSummary {
                    span_id: r.span_id,
                    trace_id: r.trace_id,
                    parent_span_id: r.parent_span_id,
                    name: r.name,
                    kind: r.kind,
                    status: r.status,
                    start_time: r.start_time,
                    end_time: r.end_time,
                    attributes: r.attributes,
                })
                .collect();
            Response::Spans { spans }
        }
        Query::ListSpanEvents { span_id } => {
            let rows = es_store::spans::list_span_events(&conn, &span_id)?;
            let events = rows.into_iter().map(|r| SpanEventSummary { span_id: r.span_id, name: r.name, time: r.time, attributes: r.attributes }).collect();
            Response::SpanEvents { events }
        }
        Query::ListCrons => {
            let crons = ctx.crons.iter().map(|expr| CronSummary { expression: expr.clone(), last_fired_at: None }).collect();
            Response::Crons { crons }
        }
        Query::ListAiProxyLogs => {
            let rows = es_store::inspect::list_ai_proxy_logs(&conn)?;
            let logs = rows.into_iter().map(|r| AiProxyLogSummary { id: r.id, created_at: r.created_at, model: r.model, status: r.status }).collect();
            Response::AiProxyLogs { logs }
        }
        Query::ListEmailMessages => {
            let rows = es_store::inspect::list_email_messages(&conn)?;
            let messages = rows
                .into_iter()
                .map(|r| EmailMessageSummary { id: r.id, created_at: r.created_at, from_addr: r.from_addr, to_addr: r.to_addr, subject: r.subject, raw_size: r.raw_size })
                .collect();
            Response::EmailMessages { messages }
        }
        Query::ListAnalyticsDataPoints { dataset } => {
            let rows = es_store::inspect::list_analytics_data_points(&conn, &dataset)?;
            let points = rows
                .into_iter()
                .map(|r| AnalyticsDataPointSummary { id: r.id, created_at: r.created_at, dataset: r.dataset, blobs: r.blobs, doubles: r.doubles, indexes: r.indexes })
                .collect();
            Response::AnalyticsDataPoints { points }
        }
        Query::StatusOverview => {
            let generation = ctx.generations.current();
            drop(conn);
            let overview = crate::status::overview(&ctx.store, &generation, ctx.started_at, &ctx.queue_names, &ctx.crons)?;
            Response::StatusOverview(overview)
        }
    })
}

fn status_from_str(s: &str) -> es_store::queue::MessageStatus {
    match s {
        "acked" => es_store::queue::MessageStatus::Acked,
        "failed" => es_store::queue::MessageStatus::Failed,
        _ => es_store::queue::MessageStatus::Pending,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use es_config::WorkerConfig;
    use es_runtime::{Env, Generation, WorkerModule};
    use tempfile::tempdir;

    struct Noop;

    #[async_trait]
    impl WorkerModule for Noop {}

    async fn ctx(store: &Store) -> Arc<ListenCtx> {
        let config = WorkerConfig { name: "demo".to_string(), main: "src/index.js".to_string(), ..Default::default() };
        let env = Env::from_config(store, &config).await.unwrap();
        let generations = Arc::new(GenerationSlot::new(Generation::new(env, Arc::new(Noop))));
        Arc::new(ListenCtx {
            store: store.clone(),
            generations,
            started_at: Instant::now(),
            queue_names: vec![],
            crons: vec![],
            shutting_down: Arc::new(AtomicBool::new(false)),
        })
    }

    #[tokio::test]
    async fn ping_is_answered_with_pong() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let ctx = ctx(&store).await;
        let response = handle_request(&ctx, Request::Ping).await;
        assert_eq!(response, Response::Pong);
    }

    #[tokio::test]
    async fn status_overview_query_reports_zero_namespaces_for_an_empty_env() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let ctx = ctx(&store).await;
        let response = handle_request(&ctx, Request::Query(Query::StatusOverview)).await;
        match response {
            Response::StatusOverview(overview) => assert!(overview.namespaces.is_empty()),
            other => panic!("expected StatusOverview, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn shutdown_request_flips_the_shutting_down_flag() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let ctx = ctx(&store).await;
        let response = handle_request(&ctx, Request::Shutdown).await;
        assert_eq!(response, Response::ShuttingDown);
        assert!(ctx.shutting_down.load(Ordering::SeqCst));
    }
}
