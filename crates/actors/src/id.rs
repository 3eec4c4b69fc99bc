// SPDX-License-Identifier: MIT

//! Durable Object identity (spec §4.8.1): deterministic name-derived ids,
//! random unique ids, and the string round trip the stub-lookup path needs.

use es_core::ids::{name_derived_actor_id, new_actor_id};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActorId {
    hex: String,
    name: Option<String>,
}

impl ActorId {
    pub fn from_name(class: &str, name: &str) -> Self {
        Self { hex: name_derived_actor_id(class, name), name: Some(name.to_string()) }
    }

    pub fn new_unique() -> Self {
        Self { hex: new_actor_id(), name: None }
    }

    pub fn from_string(hex: impl Into<String>) -> Self {
        Self { hex: hex.into(), name: None }
    }

    pub fn hex(&self) -> &str {
        &self.hex
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn equals(&self, other: &ActorId) -> bool {
        self.hex == other.hex
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.hex)
    }
}
