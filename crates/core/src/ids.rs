// SPDX-License-Identifier: MIT

//! Id generation: short nanoid-style entity ids for queue messages, workflow
//! instances, and cache tokens; hex actor ids for Durable Objects.

use rand::RngCore;
use sha2::{Digest, Sha256};

/// A short, URL-safe unique id for non-actor entities (queue messages,
/// workflow instances, object-store version tokens, span ids).
pub fn new_entity_id() -> String {
    nanoid::nanoid!(21)
}

/// Derives a deterministic 64-hex-char actor id from `(class, name)`.
///
/// Matches across process restarts: the same `(class, name)` pair always
/// derives the same id, the way `idFromName` must behave.
pub fn name_derived_actor_id(class: &str, name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(class.as_bytes());
    hasher.update([0u8]);
    hasher.update(name.as_bytes());
    hex::encode(hasher.finalize())
}

/// A fresh random 256-bit hex actor id with no associated name.
pub fn new_actor_id() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_derivation_is_deterministic() {
        let a = name_derived_actor_id("Counter", "room-42");
        let b = name_derived_actor_id("Counter", "room-42");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn different_classes_derive_different_ids() {
        let a = name_derived_actor_id("Counter", "room-42");
        let b = name_derived_actor_id("Chatroom", "room-42");
        assert_ne!(a, b);
    }

    #[test]
    fn unique_ids_are_random_and_distinct() {
        let a = new_actor_id();
        let b = new_actor_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn entity_ids_are_distinct() {
        assert_ne!(new_entity_id(), new_entity_id());
    }
}
