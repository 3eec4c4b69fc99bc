// SPDX-License-Identifier: MIT

//! Wires `es_cron::CronRunner` to `es_runtime::dispatch::invoke_scheduled`
//! (spec §4.9): one registered callback per configured cron expression,
//! each ticking against the daemon's current generation.

use es_cron::CronRunner;
use es_runtime::GenerationSlot;
use es_store::Store;
use std::sync::Arc;

pub fn build(store: Store, generations: Arc<GenerationSlot>, expressions: &[String]) -> Result<CronRunner, es_cron::CronParseError> {
    let mut runner = CronRunner::new();
    for expr in expressions {
        let store = store.clone();
        let generations = generations.clone();
        let expr_owned = expr.clone();
        runner.register(
            expr,
            Box::new(move |now, cron| {
                let store = store.clone();
                let generations = generations.clone();
                let cron = cron.to_string();
                let scheduled_time_ms = now.timestamp_millis() as u64;
                Box::pin(async move {
                    let generation = generations.current();
                    if let Err(err) = es_runtime::dispatch::invoke_scheduled(&store, &generation, scheduled_time_ms, &cron).await {
                        tracing::warn!(cron = %cron, error = %err, "scheduled handler failed");
                    }
                })
            }),
        )?;
        tracing::info!(cron = %expr_owned, "registered cron trigger");
    }
    Ok(runner)
}
