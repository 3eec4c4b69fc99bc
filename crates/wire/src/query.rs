// SPDX-License-Identifier: MIT

//! Query types for reading emulator state over the inspector connection.
//! One variant per observable table (spec §3/§6); field names mirror the
//! shared database schema verbatim since they are part of the contract.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Query {
    ListKvEntries {
        namespace: String,
        #[serde(default)]
        prefix: Option<String>,
    },
    GetKvEntry {
        namespace: String,
        key: String,
    },
    ListObjectEntries {
        bucket: String,
        #[serde(default)]
        prefix: Option<String>,
    },
    GetObjectEntry {
        bucket: String,
        key: String,
    },
    /// Lists known actor instances, optionally narrowed to one class.
    ListActors {
        #[serde(default)]
        class: Option<String>,
    },
    GetActor {
        class: String,
        id: String,
    },
    ListActorStorage {
        class: String,
        id: String,
    },
    ListActorAlarms,
    ListQueueMessages {
        queue: String,
        /// Filter by `status` column (`pending`, `acked`, `failed`); omit for all.
        #[serde(default)]
        status: Option<String>,
    },
    ListWorkflowInstances {
        #[serde(default)]
        workflow_name: Option<String>,
    },
    GetWorkflowInstance {
        id: String,
    },
    ListWorkflowSteps {
        instance_id: String,
    },
    ListWorkflowEvents {
        instance_id: String,
    },
    ListCacheEntries {
        cache_name: String,
    },
    ListSpans {
        #[serde(default)]
        trace_id: Option<String>,
    },
    ListSpanEvents {
        span_id: String,
    },
    ListCrons,
    ListAiProxyLogs,
    ListEmailMessages,
    ListAnalyticsDataPoints {
        dataset: String,
    },
    /// Cross-binding summary: resident actor counts, queue depths, cron
    /// schedule, uptime.
    StatusOverview,
}
