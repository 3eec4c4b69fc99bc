// SPDX-License-Identifier: MIT

//! Row-summary types returned by inspector queries. Field names mirror the
//! shared database schema (spec §3) column-for-column since they are part
//! of the observable contract.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KvEntrySummary {
    pub namespace: String,
    pub key: String,
    pub size: u64,
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub expiration: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KvEntryDetail {
    pub namespace: String,
    pub key: String,
    pub value: Vec<u8>,
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub expiration: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObjectEntrySummary {
    pub bucket: String,
    pub key: String,
    pub size: u64,
    pub etag: String,
    pub version: String,
    pub uploaded: i64,
    pub storage_class: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObjectEntryDetail {
    pub bucket: String,
    pub key: String,
    pub size: u64,
    pub etag: String,
    pub version: String,
    pub uploaded: i64,
    pub http_metadata: Value,
    pub custom_metadata: Value,
    pub storage_class: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActorSummary {
    pub class: String,
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub created_at: i64,
    /// Whether the instance currently has a resident `Namespace` entry.
    pub resident: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActorStorageEntrySummary {
    pub key: String,
    pub value: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActorAlarmSummary {
    pub class: String,
    pub id: String,
    pub alarm_time: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueueMessageSummary {
    pub queue: String,
    pub id: String,
    pub content_type: String,
    pub status: String,
    pub attempts: u32,
    pub visible_at: i64,
    pub created_at: i64,
    #[serde(default)]
    pub completed_at: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowInstanceSummary {
    pub workflow_name: String,
    pub id: String,
    pub status: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowInstanceDetail {
    pub workflow_name: String,
    pub id: String,
    pub status: String,
    pub params: Value,
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowStepSummary {
    pub instance_id: String,
    pub step_name: String,
    #[serde(default)]
    pub output: Option<Value>,
    pub completed_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowEventSummary {
    pub id: String,
    pub instance_id: String,
    pub event_type: String,
    #[serde(default)]
    pub payload: Option<Value>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntrySummary {
    pub cache_name: String,
    pub url: String,
    pub status: u16,
    pub size: u64,
    #[serde(default)]
    pub expires_at: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpanSummary {
    pub span_id: String,
    pub trace_id: String,
    #[serde(default)]
    pub parent_span_id: Option<String>,
    pub name: String,
    pub kind: String,
    pub status: String,
    pub start_time: i64,
    #[serde(default)]
    pub end_time: Option<i64>,
    pub attributes: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpanEventSummary {
    pub span_id: String,
    pub name: String,
    pub time: i64,
    pub attributes: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CronSummary {
    pub expression: String,
    /// Epoch ms of the most recent tick that matched this expression, if any.
    #[serde(default)]
    pub last_fired_at: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AiProxyLogSummary {
    pub id: String,
    pub created_at: i64,
    pub model: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmailMessageSummary {
    pub id: String,
    pub created_at: i64,
    pub from_addr: String,
    pub to_addr: String,
    pub subject: String,
    pub raw_size: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalyticsDataPointSummary {
    pub id: String,
    pub created_at: i64,
    pub dataset: String,
    pub blobs: Value,
    pub doubles: Value,
    pub indexes: Value,
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
