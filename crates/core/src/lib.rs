// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

//! es-core: shared primitives for the local edge runtime emulator —
//! clocks, ids, time/TTL parsing, and the scoped tracing context.

pub mod clock;
pub mod ids;
pub mod span_ctx;
pub mod time;

pub use clock::{Clock, FakeClock, SystemClock};
pub use ids::{new_actor_id, new_entity_id, name_derived_actor_id};
pub use span_ctx::{SpanContext, SpanGuard};
pub use time::{format_duration, parse_duration, ParseDurationError};
