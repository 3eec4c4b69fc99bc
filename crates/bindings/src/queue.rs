// SPDX-License-Identifier: MIT

//! Queue producer binding: `send`/`sendBatch` (spec §4.6). The consumer
//! poll loop that drains `queue_messages` lives in the daemon, not here.

use crate::error::{BindingError, BindingResult};
use es_core::{ids, Clock};
use es_store::Store;
use std::sync::Arc;

pub const MAX_MESSAGE_SIZE: usize = 128 * 1024;
pub const MAX_BATCH_MESSAGES: usize = 100;
pub const MAX_BATCH_TOTAL_SIZE: usize = 256 * 1024;
pub const MAX_DELAY_SECONDS: i64 = 43_200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Json,
    Text,
    Bytes,
}

impl ContentType {
    fn as_str(self) -> &'static str {
        match self {
            ContentType::Json => "json",
            ContentType::Text => "text",
            ContentType::Bytes => "bytes",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SendOptions {
    pub content_type: ContentType,
    pub delay_seconds: i64,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self { content_type: ContentType::Json, delay_seconds: 0 }
    }
}

fn validate_options(opts: &SendOptions) -> BindingResult<()> {
    if !(0..=MAX_DELAY_SECONDS).contains(&opts.delay_seconds) {
        return Err(BindingError::Validation(format!("delaySeconds must be within [0, {MAX_DELAY_SECONDS}]")));
    }
    Ok(())
}

#[derive(Clone)]
pub struct Queue<C: Clock> {
    store: Store,
    name: String,
    clock: Arc<C>,
}

impl<C: Clock> Queue<C> {
    pub fn new(store: Store, name: impl Into<String>, clock: Arc<C>) -> Self {
        Self { store, name: name.into(), clock }
    }

    pub async fn send(&self, body: Vec<u8>, opts: SendOptions) -> BindingResult<()> {
        if body.len() > MAX_MESSAGE_SIZE {
            return Err(BindingError::Validation(format!("message exceeds {MAX_MESSAGE_SIZE} bytes")));
        }
        validate_options(&opts)?;
        self.enqueue_one(body, opts).await
    }

    pub async fn send_batch(&self, messages: Vec<(Vec<u8>, SendOptions)>) -> BindingResult<()> {
        if messages.len() > MAX_BATCH_MESSAGES {
            return Err(BindingError::Validation(format!("batch exceeds {MAX_BATCH_MESSAGES} messages")));
        }
        let total: usize = messages.iter().map(|(b, _)| b.len()).sum();
        if total > MAX_BATCH_TOTAL_SIZE {
            return Err(BindingError::Validation(format!("batch exceeds {MAX_BATCH_TOTAL_SIZE} bytes total")));
        }
        for (body, opts) in &messages {
            if body.len() > MAX_MESSAGE_SIZE {
                return Err(BindingError::Validation(format!("message exceeds {MAX_MESSAGE_SIZE} bytes")));
            }
            validate_options(opts)?;
        }
        for (body, opts) in messages {
            self.enqueue_one(body, opts).await?;
        }
        Ok(())
    }

    async fn enqueue_one(&self, body: Vec<u8>, opts: SendOptions) -> BindingResult<()> {
        let now = self.clock.epoch_seconds() as i64;
        let visible_at = now + opts.delay_seconds;
        let store = self.store.clone();
        let queue = self.name.clone();
        let id = ids::new_entity_id();
        let content_type = opts.content_type.as_str();
        tokio::task::spawn_blocking(move || {
            let conn = store.conn()?;
            es_store::queue::enqueue(&conn, &queue, &id, &body, content_type, visible_at, now)?;
            Ok::<_, BindingError>(())
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use es_core::FakeClock;

    fn queue() -> (tempfile::TempDir, Queue<FakeClock>) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let clock = Arc::new(FakeClock::new());
        (dir, Queue::new(store, "q", clock))
    }

    #[tokio::test]
    async fn rejects_oversized_message() {
        let (_dir, queue) = queue();
        let body = vec![0u8; MAX_MESSAGE_SIZE + 1];
        let result = queue.send(body, SendOptions::default()).await;
        assert!(matches!(result, Err(BindingError::Validation(_))));
    }

    #[tokio::test]
    async fn rejects_delay_outside_range() {
        let (_dir, queue) = queue();
        let result = queue.send(b"hi".to_vec(), SendOptions { delay_seconds: -1, ..Default::default() }).await;
        assert!(matches!(result, Err(BindingError::Validation(_))));
        let result = queue.send(b"hi".to_vec(), SendOptions { delay_seconds: MAX_DELAY_SECONDS + 1, ..Default::default() }).await;
        assert!(matches!(result, Err(BindingError::Validation(_))));
    }

    #[tokio::test]
    async fn batch_rejects_when_total_size_exceeded() {
        let (_dir, queue) = queue();
        let messages = vec![(vec![0u8; MAX_BATCH_TOTAL_SIZE], SendOptions::default()); 2];
        let result = queue.send_batch(messages).await;
        assert!(matches!(result, Err(BindingError::Validation(_))));
    }

    #[tokio::test]
    async fn send_enqueues_a_visible_message() {
        let (_dir, queue) = queue();
        queue.send(b"hi".to_vec(), SendOptions::default()).await.unwrap();
        let conn = queue.store.conn().unwrap();
        let rows = es_store::queue::poll_visible(&conn, "q", i64::MAX, 10).unwrap();
        assert_eq!(rows.len(), 1);
    }
}
