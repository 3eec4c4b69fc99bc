// SPDX-License-Identifier: MIT

//! The batch handle passed to a queue consumer invocation (spec §4.6):
//! per-message `ack`/`retry` plus batch-level `ackAll`/`retryAll`, with
//! last-write-wins between the two — whichever call happened most recently
//! for a given message decides its outcome.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    Ack,
    Retry { delay_seconds: u32 },
}

#[derive(Debug, Clone)]
pub struct QueueMessage {
    pub id: String,
    pub body: Vec<u8>,
    pub content_type: String,
    pub attempts: u32,
}

struct Decision {
    seq: u64,
    outcome: MessageOutcome,
}

pub struct MessageBatch {
    pub queue: String,
    pub messages: Vec<QueueMessage>,
    seq: AtomicU64,
    default: parking_lot::Mutex<Option<Decision>>,
    overrides: parking_lot::Mutex<HashMap<String, Decision>>,
}

impl MessageBatch {
    pub fn new(queue: impl Into<String>, messages: Vec<QueueMessage>) -> Self {
        Self {
            queue: queue.into(),
            messages,
            seq: AtomicU64::new(0),
            default: parking_lot::Mutex::new(None),
            overrides: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    pub fn ack(&self, message_id: &str) {
        let seq = self.next_seq();
        self.overrides.lock().insert(message_id.to_string(), Decision { seq, outcome: MessageOutcome::Ack });
    }

    pub fn retry(&self, message_id: &str, delay_seconds: u32) {
        let seq = self.next_seq();
        self.overrides
            .lock()
            .insert(message_id.to_string(), Decision { seq, outcome: MessageOutcome::Retry { delay_seconds } });
    }

    pub fn ack_all(&self) {
        let seq = self.next_seq();
        *self.default.lock() = Some(Decision { seq, outcome: MessageOutcome::Ack });
    }

    pub fn retry_all(&self, delay_seconds: u32) {
        let seq = self.next_seq();
        *self.default.lock() = Some(Decision { seq, outcome: MessageOutcome::Retry { delay_seconds } });
    }

    /// Resolves the final outcome for every message in the batch. A message
    /// with neither an explicit nor a batch-level decision stays pending —
    /// modeled as an immediate retry, matching the resolved Open Question
    /// that an unqualified retry carries no implicit delay.
    pub fn resolve(&self) -> HashMap<String, MessageOutcome> {
        let default = self.default.lock();
        let overrides = self.overrides.lock();
        self.messages
            .iter()
            .map(|message| {
                let outcome = match (overrides.get(&message.id), default.as_ref()) {
                    (Some(o), Some(d)) if o.seq >= d.seq => o.outcome,
                    (Some(o), None) => o.outcome,
                    (_, Some(d)) => d.outcome,
                    (None, None) => MessageOutcome::Retry { delay_seconds: 0 },
                };
                (message.id.clone(), outcome)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch() -> MessageBatch {
        MessageBatch::new(
            "emails",
            vec![
                QueueMessage { id: "m1".to_string(), body: vec![], content_type: "text/plain".to_string(), attempts: 0 },
                QueueMessage { id: "m2".to_string(), body: vec![], content_type: "text/plain".to_string(), attempts: 0 },
            ],
        )
    }

    #[test]
    fn undecided_messages_resolve_to_an_immediate_retry() {
        let batch = batch();
        let outcomes = batch.resolve();
        assert_eq!(outcomes["m1"], MessageOutcome::Retry { delay_seconds: 0 });
    }

    #[test]
    fn ack_all_applies_to_every_message() {
        let batch = batch();
        batch.ack_all();
        let outcomes = batch.resolve();
        assert_eq!(outcomes["m1"], MessageOutcome::Ack);
        assert_eq!(outcomes["m2"], MessageOutcome::Ack);
    }

    #[test]
    fn a_later_per_message_retry_overrides_an_earlier_ack_all() {
        let batch = batch();
        batch.ack_all();
        batch.retry("m1", 30);
        let outcomes = batch.resolve();
        assert_eq!(outcomes["m1"], MessageOutcome::Retry { delay_seconds: 30 });
        assert_eq!(outcomes["m2"], MessageOutcome::Ack);
    }

    #[test]
    fn a_later_ack_all_overrides_an_earlier_per_message_retry() {
        let batch = batch();
        batch.retry("m1", 30);
        batch.ack_all();
        let outcomes = batch.resolve();
        assert_eq!(outcomes["m1"], MessageOutcome::Ack);
    }
}
