// SPDX-License-Identifier: MIT

//! The per-queue consumer loop (spec §4.6): polls visible pending messages
//! in batches, hands them to the worker module's `queue` handler through a
//! `MessageBatch`, then applies each message's resolved ack/retry outcome
//! back to the store — retrying at the caller's explicit `delaySeconds` (no
//! implicit visibility timeout per message) up to the consumer's configured
//! `max_retries` before moving a message to its dead-letter queue, if one is
//! configured.

use es_config::QueueConsumerBinding;
use es_runtime::{GenerationSlot, MessageBatch, MessageOutcome, QueueMessage};
use es_store::queue;
use es_store::Store;
use std::sync::Arc;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Runs forever, polling `consumer.queue` and dispatching batches of up to
/// `consumer.max_batch_size` messages.
pub async fn run(store: Store, generations: Arc<GenerationSlot>, consumer: QueueConsumerBinding, clock: impl Fn() -> i64) -> ! {
    loop {
        tokio::time::sleep(POLL_INTERVAL).await;
        if let Err(err) = poll_once(&store, &generations, &consumer, clock()).await {
            tracing::error!(queue = %consumer.queue, error = %err, "queue consumer poll failed");
        }
    }
}

async fn poll_once(store: &Store, generations: &GenerationSlot, consumer: &QueueConsumerBinding, now: i64) -> es_store::error::StoreResult<()> {
    let rows = {
        let conn = store.conn()?;
        queue::poll_visible(&conn, &consumer.queue, now, consumer.max_batch_size)?
    };
    if rows.is_empty() {
        return Ok(());
    }

    let messages = rows
        .iter()
        .map(|row| QueueMessage { id: row.id.clone(), body: row.body.clone(), content_type: row.content_type.clone(), attempts: row.attempts })
        .collect();
    let batch = Arc::new(MessageBatch::new(consumer.queue.clone(), messages));

    let generation = generations.current();
    if let Err(err) = es_runtime::dispatch::invoke_queue(store, &generation, batch.clone()).await {
        tracing::warn!(queue = %consumer.queue, error = %err, "queue handler failed; retrying every message in the batch");
        batch.retry_all(0);
    }

    let outcomes = batch.resolve();
    let conn = store.conn()?;
    for row in &rows {
        match outcomes.get(&row.id).copied().unwrap_or(MessageOutcome::Retry { delay_seconds: 0 }) {
            MessageOutcome::Ack => queue::ack(&conn, &row.id, now)?,
            MessageOutcome::Retry { delay_seconds } => {
                if row.attempts >= consumer.max_retries {
                    queue::mark_failed(&conn, &row.id)?;
                    if let Some(dlq) = &consumer.dead_letter_queue {
                        let id = es_core::ids::new_entity_id();
                        queue::enqueue(&conn, dlq, &id, &row.body, &row.content_type, now, now)?;
                    }
                } else {
                    queue::retry(&conn, &row.id, now + delay_seconds as i64)?;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use es_config::WorkerConfig;
    use es_runtime::{Env, Generation, WorkerModule};
    use tempfile::tempdir;

    struct AckAll;

    #[async_trait]
    impl WorkerModule for AckAll {
        async fn queue(&self, batch: Arc<MessageBatch>, _env: Arc<Env>, _ctx: Arc<es_runtime::ExecutionContext>) -> Result<(), String> {
            batch.ack_all();
            Ok(())
        }
    }

    struct RetryWithExplicitDelay(u32);

    #[async_trait]
    impl WorkerModule for RetryWithExplicitDelay {
        async fn queue(&self, batch: Arc<MessageBatch>, _env: Arc<Env>, _ctx: Arc<es_runtime::ExecutionContext>) -> Result<(), String> {
            for message in &batch.messages {
                batch.retry(&message.id, self.0);
            }
            Ok(())
        }
    }

    struct AlwaysFails;

    #[async_trait]
    impl WorkerModule for AlwaysFails {
        async fn queue(&self, _batch: Arc<MessageBatch>, _env: Arc<Env>, _ctx: Arc<es_runtime::ExecutionContext>) -> Result<(), String> {
            Err("boom".to_string())
        }
    }

    fn consumer(max_retries: u32, dlq: Option<&str>) -> QueueConsumerBinding {
        QueueConsumerBinding {
            queue: "emails".to_string(),
            max_batch_size: 10,
            max_batch_timeout_secs: 5,
            max_retries,
            dead_letter_queue: dlq.map(str::to_string),
        }
    }

    async fn generations(store: &Store, module: Arc<dyn WorkerModule>) -> Arc<GenerationSlot> {
        let config = WorkerConfig { name: "demo".to_string(), main: "src/index.js".to_string(), ..Default::default() };
        let env = Env::from_config(store, &config).await.unwrap();
        Arc::new(GenerationSlot::new(Generation::new(env, module)))
    }

    #[tokio::test]
    async fn acked_messages_are_removed_from_pending() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        {
            let conn = store.conn().unwrap();
            queue::enqueue(&conn, "emails", "m1", b"hi", "text/plain", 0, 0).unwrap();
        }
        let generations = generations(&store, Arc::new(AckAll)).await;
        poll_once(&store, &generations, &consumer(3, None), 0).await.unwrap();

        let conn = store.conn().unwrap();
        assert_eq!(queue::count_by_status(&conn, "emails", queue::MessageStatus::Acked).unwrap(), 1);
    }

    #[tokio::test]
    async fn retry_honors_the_handlers_explicit_delay_with_no_implicit_backoff() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        {
            let conn = store.conn().unwrap();
            queue::enqueue(&conn, "emails", "m1", b"hi", "text/plain", 0, 0).unwrap();
        }
        let generations = generations(&store, Arc::new(RetryWithExplicitDelay(0))).await;
        poll_once(&store, &generations, &consumer(3, None), 100).await.unwrap();

        let conn = store.conn().unwrap();
        let row = queue::get(&conn, "m1").unwrap().unwrap();
        assert_eq!(row.visible_at, 100);
    }

    #[tokio::test]
    async fn exhausted_retries_move_the_message_to_the_dead_letter_queue() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        {
            let conn = store.conn().unwrap();
            queue::enqueue(&conn, "emails", "m1", b"hi", "text/plain", 0, 0).unwrap();
            // simulate this being the message's last allowed attempt
            for _ in 0..2 {
                queue::retry(&conn, "m1", 0).unwrap();
            }
        }
        let generations = generations(&store, Arc::new(AlwaysFails)).await;
        poll_once(&store, &generations, &consumer(3, Some("emails-dlq")), 0).await.unwrap();

        let conn = store.conn().unwrap();
        assert_eq!(queue::count_by_status(&conn, "emails", queue::MessageStatus::Failed).unwrap(), 1);
        assert_eq!(queue::poll_visible(&conn, "emails-dlq", 0, 10).unwrap().len(), 1);
    }
}
