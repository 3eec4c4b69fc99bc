// SPDX-License-Identifier: MIT

//! `esd`: the emulator daemon binary. Loads a worker config, starts the
//! shared store and the first generation, then spawns the cron runner, one
//! consumer task per configured queue, the alarm scheduler, and the
//! inspector listener, running until `SIGINT`/`SIGTERM`.
//!
//! The module-loader mechanism — actually executing a worker's JS/Wasm
//! source — is out of scope here (spec Non-goals); this binary runs an
//! empty `WorkerModule` so the ambient stack (store, bindings, background
//! loops, inspector protocol) can be exercised end to end against whatever
//! `WorkerModule` an embedder later plugs in.

use anyhow::Context;
use async_trait::async_trait;
use es_core::Clock;
use es_daemon::{lifecycle, listener};
use es_runtime::WorkerModule;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

struct EmptyWorker;

#[async_trait]
impl WorkerModule for EmptyWorker {}

fn init_tracing(state_dir: &std::path::Path) -> anyhow::Result<tracing_appender::non_blocking::WorkerGuard> {
    std::fs::create_dir_all(state_dir)?;
    let file_appender = tracing_appender::rolling::daily(state_dir, "esd.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(non_blocking)
        .with_ansi(false)
        .init();
    Ok(guard)
}

fn config_path() -> PathBuf {
    std::env::var("ES_CONFIG").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("edge-runtime.toml"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let state_dir = lifecycle::state_dir().context("resolving state dir")?;
    let _guard = init_tracing(&state_dir)?;

    let config_path = config_path();
    let mut config = es_config::load_config(&config_path).with_context(|| format!("loading {}", config_path.display()))?;
    if let Ok(env_name) = std::env::var("ES_ENV") {
        config = config.for_environment(&env_name)?;
    }
    let dev_vars = es_config::load_dev_vars(std::path::Path::new(".dev.vars")).context("loading .dev.vars")?;
    config.apply_dev_vars(dev_vars);

    let daemon = lifecycle::startup(state_dir.clone(), config.clone(), Arc::new(EmptyWorker)).await.context("starting daemon")?;
    let started_at = Instant::now();

    let queue_names: Vec<String> = config.queues.producers.iter().map(|b| b.queue.clone()).chain(config.queues.consumers.iter().map(|c| c.queue.clone())).collect();
    let crons = config.triggers.crons.clone();

    let cron_runner = es_daemon::cron_loop::build(daemon.store.clone(), daemon.generations.clone(), &crons).context("registering cron triggers")?;
    let cron_handle = tokio::spawn(async move { cron_runner.run().await });

    let mut consumer_handles = Vec::new();
    for consumer in config.queues.consumers.clone() {
        let store = daemon.store.clone();
        let generations = daemon.generations.clone();
        consumer_handles.push(tokio::spawn(async move {
            es_daemon::queue_consumer::run(store, generations, consumer, || es_core::SystemClock.epoch_seconds() as i64).await
        }));
    }

    let alarm_scheduler = es_daemon::alarm_loop::build(daemon.store.clone(), daemon.generations.clone());
    let alarm_handle = tokio::spawn(async move { alarm_scheduler.run(|| es_core::SystemClock.epoch_ms() as i64).await });

    let listen_ctx = Arc::new(listener::ListenCtx {
        store: daemon.store.clone(),
        generations: daemon.generations.clone(),
        started_at,
        queue_names,
        crons,
        shutting_down: Arc::new(AtomicBool::new(false)),
    });
    let socket_path = lifecycle::socket_path(&daemon.state_dir);
    let listener_handle = tokio::spawn(async move { listener::run(&socket_path, listen_ctx).await });

    tracing::info!(worker = %config.name, "esd ready");
    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    tracing::info!("received shutdown signal");

    cron_handle.abort();
    for handle in consumer_handles {
        handle.abort();
    }
    alarm_handle.abort();
    listener_handle.abort();

    daemon.shutdown().await;
    Ok(())
}
