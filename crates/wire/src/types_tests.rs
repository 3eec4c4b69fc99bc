// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn kv_entry_summary_deserializes_without_metadata() {
    let json = r#"{"namespace":"CACHE","key":"k1","size":4,"expiration":null}"#;
    let summary: KvEntrySummary = serde_json::from_str(json).expect("deserialize failed");
    assert_eq!(summary.namespace, "CACHE");
    assert!(summary.metadata.is_none());
}

#[test]
fn workflow_instance_detail_round_trips_through_json() {
    let detail = WorkflowInstanceDetail {
        workflow_name: "onboarding".to_string(),
        id: "wf-1".to_string(),
        status: "running".to_string(),
        params: serde_json::json!({"userId": "u1"}),
        output: None,
        error: None,
        created_at: 1,
        updated_at: 2,
    };
    let json = serde_json::to_string(&detail).expect("serialize failed");
    let back: WorkflowInstanceDetail = serde_json::from_str(&json).expect("deserialize failed");
    assert_eq!(back, detail);
}
