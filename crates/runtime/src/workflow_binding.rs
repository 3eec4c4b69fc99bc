// SPDX-License-Identifier: MIT

//! Drives one registered workflow class's `run` entry point against an
//! instance's checkpointed `StepContext`, persisting the terminal status —
//! the piece spec §4.7 describes as the instance's `run` function, which
//! `es_workflows::instance::Workflows` itself only exposes control
//! operations for (create/pause/resume/terminate/restart/status/sendEvent).

use async_trait::async_trait;
use es_core::{Clock, SystemClock};
use es_store::workflow;
use es_store::Store;
use es_workflows::{StepContext, WorkflowError, WorkflowResult, Workflows};
use serde_json::Value;
use std::sync::Arc;

#[async_trait]
pub trait WorkflowHandler: Send + Sync {
    async fn run(&self, step: StepContext<SystemClock>, params: Value) -> Result<Value, String>;
}

pub struct WorkflowBinding {
    store: Store,
    workflow_name: String,
    clock: Arc<SystemClock>,
    control: Workflows<SystemClock>,
    handler: Arc<dyn WorkflowHandler>,
}

impl WorkflowBinding {
    pub fn new(
        store: Store,
        workflow_name: impl Into<String>,
        max_concurrent_instances: Option<u32>,
        handler: Arc<dyn WorkflowHandler>,
    ) -> Self {
        let workflow_name = workflow_name.into();
        let clock = Arc::new(SystemClock);
        let control = Workflows::new(store.clone(), workflow_name.clone(), clock.clone(), max_concurrent_instances);
        Self { store, workflow_name, clock, control, handler }
    }

    pub fn control(&self) -> &Workflows<SystemClock> {
        &self.control
    }

    /// Runs the handler for `instance_id` to completion, recording its
    /// terminal status. Re-entrant: already-checkpointed steps short-circuit
    /// inside `StepContext::do_step`, so calling this again after a process
    /// restart resumes rather than redoing finished work.
    pub async fn drive(&self, instance_id: &str) -> WorkflowResult<()> {
        let conn_store = self.store.clone();
        let id = instance_id.to_string();
        let params = {
            let conn_store = conn_store.clone();
            let id = id.clone();
            tokio::task::spawn_blocking(move || {
                let conn = conn_store.conn()?;
                let row = workflow::get_instance(&conn, &id)?
                    .ok_or_else(|| WorkflowError::Validation(format!("no such instance: {id:?}")))?;
                Ok::<_, WorkflowError>(row.params)
            })
            .await??
        };

        let step = StepContext::new(self.store.clone(), instance_id, self.clock.clone());
        let outcome = self.handler.run(step, params).await;

        let now = self.clock.epoch_seconds() as i64;
        let store = self.store.clone();
        let id = instance_id.to_string();
        match outcome {
            Ok(output) => {
                tokio::task::spawn_blocking(move || {
                    let conn = store.conn()?;
                    workflow::complete_instance(&conn, &id, &output, now)
                })
                .await??;
            }
            Err(message) => {
                tokio::task::spawn_blocking(move || {
                    let conn = store.conn()?;
                    workflow::error_instance(&conn, &id, &message, now)
                })
                .await??;
            }
        }
        Ok(())
    }

    pub fn workflow_name(&self) -> &str {
        &self.workflow_name
    }
}
