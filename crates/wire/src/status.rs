// SPDX-License-Identifier: MIT

//! The cross-binding status overview served by `Query::StatusOverview`.

use serde::{Deserialize, Serialize};

use crate::types::CronSummary;

/// Resident-instance count for one actor class, as tracked by its `Namespace`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NamespaceStatus {
    pub class: String,
    pub resident_count: usize,
}

/// Pending/failed counts for one queue, read from `queue_messages`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueueDepth {
    pub queue: String,
    pub pending: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuntimeStatusOverview {
    pub uptime_secs: u64,
    pub namespaces: Vec<NamespaceStatus>,
    pub queues: Vec<QueueDepth>,
    pub crons: Vec<CronSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_overview_round_trips_through_json() {
        let overview = RuntimeStatusOverview {
            uptime_secs: 42,
            namespaces: vec![NamespaceStatus { class: "Counter".to_string(), resident_count: 3 }],
            queues: vec![QueueDepth { queue: "emails".to_string(), pending: 1, failed: 0 }],
            crons: vec![CronSummary { expression: "*/5 * * * *".to_string(), last_fired_at: None }],
        };
        let json = serde_json::to_string(&overview).expect("serialize failed");
        let back: RuntimeStatusOverview = serde_json::from_str(&json).expect("deserialize failed");
        assert_eq!(back, overview);
    }
}
