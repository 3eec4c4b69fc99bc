// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

//! es-actors: the Durable Object subsystem — identification, namespaces,
//! stubs, the input gate, per-instance storage and SQL, alarms, and
//! WebSocket hibernation bookkeeping.

pub mod alarms;
pub mod error;
pub mod gate;
pub mod id;
pub mod instance;
pub mod namespace;
pub mod rpc_value;
pub mod sql;
pub mod stub;
pub mod storage;
pub mod websocket_hibernation;

pub use error::{ActorError, ActorResult};
pub use id::ActorId;
pub use instance::{ActorClass, ActorContext, Instance};
pub use namespace::Namespace;
pub use stub::Stub;
