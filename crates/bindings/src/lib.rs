// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

//! es-bindings: the async binding surface exposed to worker handlers — KV,
//! object storage, the relational database, the HTTP response cache, and
//! the queue producer side.
//!
//! Every binding wraps synchronous `es-store` row operations in
//! `tokio::task::spawn_blocking`; validation and the binding-specific
//! contract (size limits, conditional requests, statement splitting, …)
//! live here, not in `es-store`.

pub mod cache;
pub mod d1;
pub mod error;
pub mod kv;
pub mod objects;
pub mod queue;

pub use error::{BindingError, BindingResult};
