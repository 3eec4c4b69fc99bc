// SPDX-License-Identifier: MIT

//! Instance control operations: `create`, `pause`, `resume`, `terminate`,
//! `restart`, `status`, `sendEvent` (spec §4.7).

use crate::error::{WorkflowError, WorkflowResult};
use es_core::{ids, Clock};
use es_store::workflow::InstanceStatus;
use es_store::Store;
use serde_json::Value;
use std::sync::Arc;

pub const MAX_INSTANCE_ID_LEN: usize = 100;
pub const MAX_BATCH_CREATE: usize = 100;

fn validate_instance_id(id: &str) -> WorkflowResult<()> {
    if id.is_empty() || id.len() > MAX_INSTANCE_ID_LEN {
        return Err(WorkflowError::Validation(format!("invalid instance id: {id:?}")));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct InstanceStatusView {
    pub status: InstanceStatus,
    pub error: Option<String>,
    pub output: Option<Value>,
}

#[derive(Clone)]
pub struct Workflows<C: Clock> {
    store: Store,
    workflow_name: String,
    clock: Arc<C>,
    max_concurrent_instances: Option<u32>,
}

impl<C: Clock> Workflows<C> {
    pub fn new(store: Store, workflow_name: impl Into<String>, clock: Arc<C>, max_concurrent_instances: Option<u32>) -> Self {
        Self { store, workflow_name: workflow_name.into(), clock, max_concurrent_instances }
    }

    pub async fn create(&self, id: &str, params: Value) -> WorkflowResult<()> {
        validate_instance_id(id)?;
        if let Some(limit) = self.max_concurrent_instances {
            let running = self.count_running().await?;
            if running >= limit {
                return Err(WorkflowError::Exhausted(running));
            }
        }
        let store = self.store.clone();
        let workflow_name = self.workflow_name.clone();
        let id = id.to_string();
        let now = self.clock.epoch_seconds() as i64;
        tokio::task::spawn_blocking(move || {
            let conn = store.conn()?;
            es_store::workflow::create_instance(&conn, &workflow_name, &id, &params, now)?;
            es_store::workflow::set_status(&conn, &id, InstanceStatus::Running, now)?;
            Ok::<_, WorkflowError>(())
        })
        .await?
    }

    pub async fn create_batch(&self, instances: Vec<(String, Value)>) -> WorkflowResult<()> {
        if instances.len() > MAX_BATCH_CREATE {
            return Err(WorkflowError::Validation(format!("batch create exceeds {MAX_BATCH_CREATE} instances")));
        }
        for (id, params) in instances {
            self.create(&id, params).await?;
        }
        Ok(())
    }

    async fn count_running(&self) -> WorkflowResult<u32> {
        let store = self.store.clone();
        let workflow_name = self.workflow_name.clone();
        tokio::task::spawn_blocking(move || {
            let conn = store.conn()?;
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM workflow_instances WHERE workflow_name = ?1 AND status = 'running'",
                rusqlite::params![workflow_name],
                |r| r.get(0),
            )?;
            Ok::<_, es_store::error::StoreError>(count as u32)
        })
        .await?
        .map_err(WorkflowError::from)
    }

    pub async fn pause(&self, id: &str) -> WorkflowResult<()> {
        self.set_status(id, InstanceStatus::Paused).await
    }

    pub async fn resume(&self, id: &str) -> WorkflowResult<()> {
        self.set_status(id, InstanceStatus::Running).await
    }

    pub async fn terminate(&self, id: &str) -> WorkflowResult<()> {
        self.set_status(id, InstanceStatus::Terminated).await
    }

    /// Clears all step outputs and re-enters `running`, so the `run`
    /// function replays from the beginning.
    pub async fn restart(&self, id: &str) -> WorkflowResult<()> {
        let store = self.store.clone();
        let id_owned = id.to_string();
        let now = self.clock.epoch_seconds() as i64;
        tokio::task::spawn_blocking(move || {
            let conn = store.conn()?;
            es_store::workflow::clear_steps(&conn, &id_owned)?;
            es_store::workflow::set_status(&conn, &id_owned, InstanceStatus::Running, now)?;
            Ok::<_, WorkflowError>(())
        })
        .await?
    }

    async fn set_status(&self, id: &str, status: InstanceStatus) -> WorkflowResult<()> {
        let store = self.store.clone();
        let id = id.to_string();
        let now = self.clock.epoch_seconds() as i64;
        tokio::task::spawn_blocking(move || {
            let conn = store.conn()?;
            es_store::workflow::set_status(&conn, &id, status, now)?;
            Ok::<_, WorkflowError>(())
        })
        .await?
    }

    pub async fn status(&self, id: &str) -> WorkflowResult<InstanceStatusView> {
        let store = self.store.clone();
        let id = id.to_string();
        let row = tokio::task::spawn_blocking(move || {
            let conn = store.conn()?;
            es_store::workflow::get_instance(&conn, &id).map_err(WorkflowError::from)
        })
        .await??
        .ok_or_else(|| WorkflowError::Validation("unknown instance id".into()))?;
        Ok(InstanceStatusView { status: row.status, error: row.error, output: row.output })
    }

    pub async fn send_event(&self, id: &str, event_type: &str, payload: Option<Value>) -> WorkflowResult<()> {
        let store = self.store.clone();
        let instance_id = id.to_string();
        let event_id = ids::new_entity_id();
        let event_type = event_type.to_string();
        let now = self.clock.epoch_seconds() as i64;
        tokio::task::spawn_blocking(move || {
            let conn = store.conn()?;
            es_store::workflow::record_event(&conn, &event_id, &instance_id, &event_type, payload.as_ref(), now)?;
            Ok::<_, WorkflowError>(())
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use es_core::FakeClock;

    fn workflows() -> (tempfile::TempDir, Workflows<FakeClock>) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let clock = Arc::new(FakeClock::new());
        (dir, Workflows::new(store, "wf", clock, None))
    }

    #[tokio::test]
    async fn create_then_status_reports_running() {
        let (_dir, wf) = workflows();
        wf.create("i1", Value::Null).await.unwrap();
        let status = wf.status("i1").await.unwrap();
        assert_eq!(status.status, InstanceStatus::Running);
    }

    #[tokio::test]
    async fn restart_clears_steps_and_resumes_running() {
        let (_dir, wf) = workflows();
        wf.create("i1", Value::Null).await.unwrap();
        wf.pause("i1").await.unwrap();
        wf.restart("i1").await.unwrap();
        let status = wf.status("i1").await.unwrap();
        assert_eq!(status.status, InstanceStatus::Running);
    }

    #[tokio::test]
    async fn max_concurrent_instances_is_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let clock = Arc::new(FakeClock::new());
        let wf = Workflows::new(store, "wf", clock, Some(1));
        wf.create("i1", Value::Null).await.unwrap();
        let result = wf.create("i2", Value::Null).await;
        assert!(matches!(result, Err(WorkflowError::Exhausted(_))));
    }
}
