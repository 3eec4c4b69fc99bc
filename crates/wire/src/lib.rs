// SPDX-License-Identifier: MIT

//! es-wire: length-prefixed JSON IPC between the CLI and the daemon's
//! inspector listener.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod query;
mod request;
mod response;
mod status;
mod types;
mod wire;

pub use query::Query;
pub use request::Request;
pub use response::Response;
pub use status::{NamespaceStatus, QueueDepth, RuntimeStatusOverview};
pub use types::{
    ActorAlarmSummary, ActorStorageEntrySummary, ActorSummary, AiProxyLogSummary,
    AnalyticsDataPointSummary, CacheEntrySummary, CronSummary, EmailMessageSummary,
    KvEntryDetail, KvEntrySummary, ObjectEntryDetail, ObjectEntrySummary, QueueMessageSummary,
    SpanEventSummary, SpanSummary, WorkflowEventSummary, WorkflowInstanceDetail,
    WorkflowInstanceSummary, WorkflowStepSummary,
};
pub use wire::{
    decode, encode, read_message, read_request, read_response, write_message, write_request,
    write_response, ProtocolError,
};

#[cfg(test)]
mod property_tests;
