// SPDX-License-Identifier: MIT

//! `ctx.acceptWebSocket`/hibernation bookkeeping (spec §4.8.7). Hibernation
//! itself is a no-op locally: accepted sockets simply stay resident with
//! their owning instance, so this module is the registry, tag index, and
//! auto-response table, not a real suspend/resume mechanism.
//!
//! Generic over the socket handle type so this crate does not need to
//! depend on the WebSocket pair implementation — callers register whatever
//! identifies a socket to them (e.g. a pair-side index).

use crate::error::{ActorError, ActorResult};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

pub const MAX_SOCKETS: usize = 32_768;
pub const MAX_TAGS: usize = 10;
pub const MAX_TAG_LEN: usize = 256;

struct Accepted {
    tags: Vec<String>,
    attachment: Option<serde_json::Value>,
}

pub struct WebSocketRegistry<S: Eq + Hash + Clone> {
    sockets: HashMap<S, Accepted>,
    auto_responses: Vec<(String, String)>,
    last_auto_response_at: HashMap<S, u64>,
}

impl<S: Eq + Hash + Clone> WebSocketRegistry<S> {
    pub fn new() -> Self {
        Self { sockets: HashMap::new(), auto_responses: Vec::new(), last_auto_response_at: HashMap::new() }
    }

    pub fn accept(&mut self, socket: S, tags: &[String]) -> ActorResult<()> {
        if self.sockets.len() >= MAX_SOCKETS {
            return Err(ActorError::Validation(format!("at most {MAX_SOCKETS} hibernatable sockets per instance")));
        }
        if tags.len() > MAX_TAGS {
            return Err(ActorError::Validation(format!("at most {MAX_TAGS} tags per socket")));
        }
        for tag in tags {
            if tag.len() > MAX_TAG_LEN {
                return Err(ActorError::Validation(format!("tag exceeds {MAX_TAG_LEN} characters")));
            }
        }
        self.sockets.insert(socket, Accepted { tags: tags.to_vec(), attachment: None });
        Ok(())
    }

    pub fn remove(&mut self, socket: &S) {
        self.sockets.remove(socket);
        self.last_auto_response_at.remove(socket);
    }

    pub fn get_websockets(&self, tag: Option<&str>) -> Vec<S> {
        self.sockets
            .iter()
            .filter(|(_, accepted)| tag.map(|t| accepted.tags.iter().any(|x| x == t)).unwrap_or(true))
            .map(|(s, _)| s.clone())
            .collect()
    }

    pub fn get_tags(&self, socket: &S) -> Vec<String> {
        self.sockets.get(socket).map(|a| a.tags.clone()).unwrap_or_default()
    }

    pub fn serialize_attachment(&mut self, socket: &S, value: serde_json::Value) {
        if let Some(accepted) = self.sockets.get_mut(socket) {
            accepted.attachment = Some(value);
        }
    }

    pub fn deserialize_attachment(&self, socket: &S) -> Option<serde_json::Value> {
        self.sockets.get(socket).and_then(|a| a.attachment.clone())
    }

    pub fn set_auto_response(&mut self, request: impl Into<String>, response: impl Into<String>) {
        self.auto_responses.push((request.into(), response.into()));
    }

    /// Returns the configured auto-response for `incoming_text`, if any,
    /// recording that this socket last auto-responded at `now_ms`.
    pub fn try_auto_response(&mut self, socket: &S, incoming_text: &str, now_ms: u64) -> Option<String> {
        let response = self.auto_responses.iter().find(|(req, _)| req == incoming_text).map(|(_, resp)| resp.clone());
        if response.is_some() {
            self.last_auto_response_at.insert(socket.clone(), now_ms);
        }
        response
    }

    pub fn last_auto_response_at(&self, socket: &S) -> Option<u64> {
        self.last_auto_response_at.get(socket).copied()
    }

    pub fn accepted_sockets(&self) -> HashSet<S> {
        self.sockets.keys().cloned().collect()
    }
}

impl<S: Eq + Hash + Clone> Default for WebSocketRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_then_get_websockets_filters_by_tag() {
        let mut registry: WebSocketRegistry<u32> = WebSocketRegistry::new();
        registry.accept(1, &["room:a".to_string()]).unwrap();
        registry.accept(2, &["room:b".to_string()]).unwrap();
        assert_eq!(registry.get_websockets(Some("room:a")), vec![1]);
        let mut all = registry.get_websockets(None);
        all.sort();
        assert_eq!(all, vec![1, 2]);
    }

    #[test]
    fn rejects_too_many_tags() {
        let mut registry: WebSocketRegistry<u32> = WebSocketRegistry::new();
        let tags: Vec<String> = (0..20).map(|i| i.to_string()).collect();
        assert!(registry.accept(1, &tags).is_err());
    }

    #[test]
    fn auto_response_matches_exact_text_and_records_timestamp() {
        let mut registry: WebSocketRegistry<u32> = WebSocketRegistry::new();
        registry.accept(1, &[]).unwrap();
        registry.set_auto_response("ping", "pong");
        assert_eq!(registry.try_auto_response(&1, "ping", 1000), Some("pong".to_string()));
        assert_eq!(registry.last_auto_response_at(&1), Some(1000));
        assert_eq!(registry.try_auto_response(&1, "other", 2000), None);
    }

    #[test]
    fn attachment_round_trips() {
        let mut registry: WebSocketRegistry<u32> = WebSocketRegistry::new();
        registry.accept(1, &[]).unwrap();
        registry.serialize_attachment(&1, serde_json::json!({"user": "a"}));
        assert_eq!(registry.deserialize_attachment(&1), Some(serde_json::json!({"user": "a"})));
    }
}
