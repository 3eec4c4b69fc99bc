// SPDX-License-Identifier: MIT

//! Responses sent from the daemon back to an inspector connection.

use serde::{Deserialize, Serialize};

use crate::status::RuntimeStatusOverview;
use crate::types::{
    ActorAlarmSummary, ActorStorageEntrySummary, ActorSummary, AiProxyLogSummary,
    AnalyticsDataPointSummary, CacheEntrySummary, CronSummary, EmailMessageSummary,
    KvEntryDetail, KvEntrySummary, ObjectEntryDetail, ObjectEntrySummary, QueueMessageSummary,
    SpanEventSummary, SpanSummary, WorkflowEventSummary, WorkflowInstanceDetail,
    WorkflowInstanceSummary, WorkflowStepSummary,
};

/// Response from the daemon to an inspector connection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Response {
    /// Generic success, for requests with no payload to return.
    Ok,

    /// Health check response.
    Pong,

    /// Version handshake response.
    Hello { version: String },

    /// The daemon is shutting down; no further requests will be served.
    ShuttingDown,

    /// The scheduled handler ran for the requested expression.
    Scheduled { invoked: bool },

    /// Error response.
    Error { message: String },

    KvEntries { entries: Vec<KvEntrySummary> },
    KvEntry { entry: Option<Box<KvEntryDetail>> },

    ObjectEntries { entries: Vec<ObjectEntrySummary> },
    ObjectEntry { entry: Option<Box<ObjectEntryDetail>> },

    Actors { actors: Vec<ActorSummary> },
    Actor { actor: Option<Box<ActorSummary>> },
    ActorStorageEntries { entries: Vec<ActorStorageEntrySummary> },
    ActorAlarms { alarms: Vec<ActorAlarmSummary> },

    QueueMessages { messages: Vec<QueueMessageSummary> },

    WorkflowInstances { instances: Vec<WorkflowInstanceSummary> },
    WorkflowInstance { instance: Option<Box<WorkflowInstanceDetail>> },
    WorkflowSteps { steps: Vec<WorkflowStepSummary> },
    WorkflowEvents { events: Vec<WorkflowEventSummary> },

    CacheEntries { entries: Vec<CacheEntrySummary> },

    Spans { spans: Vec<SpanSummary> },
    SpanEvents { events: Vec<SpanEventSummary> },

    Crons { crons: Vec<CronSummary> },

    AiProxyLogs { logs: Vec<AiProxyLogSummary> },
    EmailMessages { messages: Vec<EmailMessageSummary> },
    AnalyticsDataPoints { points: Vec<AnalyticsDataPointSummary> },

    StatusOverview(RuntimeStatusOverview),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_response_round_trips_through_json() {
        let response = Response::Error { message: "not found".to_string() };
        let json = serde_json::to_string(&response).expect("serialize failed");
        let back: Response = serde_json::from_str(&json).expect("deserialize failed");
        assert_eq!(back, response);
    }
}
