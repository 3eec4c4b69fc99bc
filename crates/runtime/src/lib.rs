// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

//! es-runtime: the dispatch layer that turns a loaded worker module plus
//! its bindings into something the daemon can invoke per trigger —
//! fetch, scheduled, queue, and email — with span tracking, background
//! `waitUntil` work, and hot-reload generation swaps (spec §4.11, §5).

pub mod actor_binding;
pub mod context;
pub mod dispatch;
pub mod env;
pub mod error;
pub mod generation;
pub mod http;
pub mod queue_batch;
pub mod scheduled;
pub mod worker;
pub mod workflow_binding;

#[cfg(test)]
mod tests_support;

pub use actor_binding::ActorBinding;
pub use context::ExecutionContext;
pub use env::Env;
pub use error::{RuntimeError, RuntimeResult};
pub use generation::{Generation, GenerationSlot};
pub use http::{HttpRequest, HttpResponse};
pub use queue_batch::{MessageBatch, MessageOutcome, QueueMessage};
pub use scheduled::ScheduledController;
pub use worker::{EmailMessage, WorkerModule};
pub use workflow_binding::{WorkflowBinding, WorkflowHandler};
