// SPDX-License-Identifier: MIT

//! Builds the `StatusOverview` response served over the inspector
//! protocol: per-namespace resident counts, per-queue depths, and the
//! configured cron expressions (spec §6).

use es_runtime::Generation;
use es_store::error::StoreResult;
use es_store::Store;
use es_wire::{CronSummary, NamespaceStatus, QueueDepth, RuntimeStatusOverview};
use std::time::Instant;

pub fn overview(store: &Store, generation: &Generation, started_at: Instant, queue_names: &[String], crons: &[String]) -> StoreResult<RuntimeStatusOverview> {
    let namespaces = generation
        .env
        .actors
        .iter()
        .map(|(binding, ns)| NamespaceStatus { class: binding.clone(), resident_count: ns.resident_count() })
        .collect();

    let conn = store.conn()?;
    let mut queues = Vec::new();
    for queue in queue_names {
        let pending = es_store::queue::count_by_status(&conn, queue, es_store::queue::MessageStatus::Pending)?;
        let failed = es_store::queue::count_by_status(&conn, queue, es_store::queue::MessageStatus::Failed)?;
        queues.push(QueueDepth { queue: queue.clone(), pending, failed });
    }

    let crons = crons.iter().map(|expr| CronSummary { expression: expr.clone(), last_fired_at: None }).collect();

    Ok(RuntimeStatusOverview { uptime_secs: started_at.elapsed().as_secs(), namespaces, queues, crons })
}
