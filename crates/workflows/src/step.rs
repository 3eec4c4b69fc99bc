// SPDX-License-Identifier: MIT

//! The `step` context passed into a workflow instance's `run` function:
//! `do`, `sleep`, `sleepUntil`, `waitForEvent` (spec §4.7).

use crate::error::{WorkflowError, WorkflowResult};
use crate::retry::RetryPolicy;
use es_core::Clock;
use es_store::Store;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub const MAX_STEP_NAME_LEN: usize = 256;
pub const MAX_STEP_OUTPUT_SIZE: usize = 1024 * 1024;
pub const MAX_STEPS_PER_INSTANCE: u32 = 1024;
pub const MAX_SLEEP: Duration = Duration::from_secs(365 * 24 * 60 * 60);

const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(200);

fn validate_step_name(name: &str) -> WorkflowResult<()> {
    if name.is_empty() || name.len() > MAX_STEP_NAME_LEN {
        return Err(WorkflowError::Validation(format!("invalid step name: {name:?}")));
    }
    Ok(())
}

#[derive(Clone)]
pub struct StepContext<C: Clock> {
    store: Store,
    instance_id: String,
    clock: Arc<C>,
}

impl<C: Clock> StepContext<C> {
    pub fn new(store: Store, instance_id: impl Into<String>, clock: Arc<C>) -> Self {
        Self { store, instance_id: instance_id.into(), clock }
    }

    /// Idempotent step execution with retry. `f` must be safely re-callable:
    /// it runs again on every retry attempt.
    pub async fn do_step<T, F, Fut>(&self, name: &str, policy: RetryPolicy, f: F) -> WorkflowResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: Fn() -> Fut,
        Fut: Future<Output = WorkflowResult<T>>,
    {
        validate_step_name(name)?;
        if let Some(cached) = self.cached_output::<T>(name).await? {
            return Ok(cached);
        }
        self.check_step_budget().await?;

        let mut attempt = 0u32;
        loop {
            let outcome = tokio::time::timeout(policy.per_attempt_timeout, f()).await;
            match outcome {
                Ok(Ok(value)) => {
                    self.persist_step(name, &value).await?;
                    return Ok(value);
                }
                Ok(Err(WorkflowError::NonRetryable(msg))) => return Err(WorkflowError::NonRetryable(msg)),
                Ok(Err(_)) | Err(_) => {
                    attempt += 1;
                    if policy.exhausted(attempt) {
                        return Err(WorkflowError::Exhausted(attempt));
                    }
                    tokio::time::sleep(policy.delay_for(attempt)).await;
                }
            }
        }
    }

    /// A step that resolves once the wall-clock reaches `now + duration`,
    /// replaying instantly if the deadline has already passed (e.g. the
    /// instance resumed after a restart).
    pub async fn sleep(&self, name: &str, duration: Duration) -> WorkflowResult<()> {
        if duration > MAX_SLEEP {
            return Err(WorkflowError::Validation("sleep duration exceeds 365 days".into()));
        }
        let wake_at = self.clock.epoch_ms() + duration.as_millis() as u64;
        self.sleep_until_epoch_ms(name, wake_at).await
    }

    pub async fn sleep_until(&self, name: &str, epoch_ms: u64) -> WorkflowResult<()> {
        self.sleep_until_epoch_ms(name, epoch_ms).await
    }

    async fn sleep_until_epoch_ms(&self, name: &str, wake_at: u64) -> WorkflowResult<()> {
        validate_step_name(name)?;
        let deadline = self
            .do_step(name, RetryPolicy { limit: Some(0), ..RetryPolicy::default() }, || async move { Ok(wake_at) })
            .await?;

        let now = self.clock.epoch_ms();
        if deadline > now {
            tokio::time::sleep(Duration::from_millis(deadline - now)).await;
        }
        Ok(())
    }

    /// Persists a marker on first call, then polls for a matching event
    /// until one arrives or `timeout` elapses.
    pub async fn wait_for_event(&self, name: &str, event_type: &str, timeout: Option<Duration>) -> WorkflowResult<Value> {
        validate_step_name(name)?;
        if let Some(cached) = self.cached_output::<Value>(name).await? {
            return Ok(cached);
        }
        self.check_step_budget().await?;

        let deadline = timeout.map(|t| self.clock.epoch_ms() + t.as_millis() as u64);
        loop {
            if let Some(payload) = self.poll_event(event_type).await? {
                self.persist_step(name, &payload).await?;
                return Ok(payload);
            }
            if let Some(deadline) = deadline {
                if self.clock.epoch_ms() >= deadline {
                    return Err(WorkflowError::Timeout);
                }
            }
            tokio::time::sleep(EVENT_POLL_INTERVAL).await;
        }
    }

    async fn poll_event(&self, event_type: &str) -> WorkflowResult<Option<Value>> {
        let store = self.store.clone();
        let instance_id = self.instance_id.clone();
        let event_type = event_type.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = store.conn()?;
            es_store::workflow::find_event(&conn, &instance_id, &event_type, 0).map_err(WorkflowError::from)
        })
        .await?
    }

    async fn cached_output<T: DeserializeOwned>(&self, name: &str) -> WorkflowResult<Option<T>> {
        let store = self.store.clone();
        let instance_id = self.instance_id.clone();
        let name = name.to_string();
        let value = tokio::task::spawn_blocking(move || {
            let conn = store.conn()?;
            es_store::workflow::get_step_output(&conn, &instance_id, &name).map_err(WorkflowError::from)
        })
        .await??;
        value.map(|v| serde_json::from_value(v).map_err(|e| WorkflowError::Validation(e.to_string()))).transpose()
    }

    async fn check_step_budget(&self) -> WorkflowResult<()> {
        let store = self.store.clone();
        let instance_id = self.instance_id.clone();
        let count = tokio::task::spawn_blocking(move || {
            let conn = store.conn()?;
            es_store::workflow::step_count(&conn, &instance_id).map_err(WorkflowError::from)
        })
        .await??;
        if count >= MAX_STEPS_PER_INSTANCE {
            return Err(WorkflowError::Validation(format!("instance exceeds {MAX_STEPS_PER_INSTANCE} steps")));
        }
        Ok(())
    }

    async fn persist_step<T: Serialize>(&self, name: &str, value: &T) -> WorkflowResult<()> {
        let json = serde_json::to_value(value).map_err(|e| WorkflowError::Validation(e.to_string()))?;
        if json.to_string().len() > MAX_STEP_OUTPUT_SIZE {
            return Err(WorkflowError::Validation(format!("step output exceeds {MAX_STEP_OUTPUT_SIZE} bytes")));
        }
        let store = self.store.clone();
        let instance_id = self.instance_id.clone();
        let name = name.to_string();
        let now = self.clock.epoch_seconds() as i64;
        tokio::task::spawn_blocking(move || {
            let conn = store.conn()?;
            es_store::workflow::record_step(&conn, &instance_id, &name, &json, now)?;
            Ok::<_, WorkflowError>(())
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use es_core::FakeClock;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn ctx() -> (tempfile::TempDir, StepContext<FakeClock>) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        {
            let conn = store.conn().unwrap();
            es_store::workflow::create_instance(&conn, "wf", "i1", &Value::Null, 0).unwrap();
        }
        let clock = Arc::new(FakeClock::new());
        (dir, StepContext::new(store, "i1", clock))
    }

    #[tokio::test]
    async fn do_step_runs_once_then_replays_cached_output() {
        let (_dir, ctx) = ctx();
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = calls.clone();
        let result: u32 = ctx
            .do_step("s1", RetryPolicy::default(), move || {
                let calls = calls2.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(42)
                }
            })
            .await
            .unwrap();
        assert_eq!(result, 42);

        let second: u32 = ctx.do_step("s1", RetryPolicy::default(), || async { Ok(0) }).await.unwrap();
        assert_eq!(second, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn non_retryable_error_stops_immediately() {
        let (_dir, ctx) = ctx();
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = calls.clone();
        let result: WorkflowResult<u32> = ctx
            .do_step("s1", RetryPolicy::default(), move || {
                let calls = calls2.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(WorkflowError::NonRetryable("boom".into()))
                }
            })
            .await;
        assert!(matches!(result, Err(WorkflowError::NonRetryable(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retry_budget_exhausts_after_limit() {
        let (_dir, ctx) = ctx();
        let policy = RetryPolicy { limit: Some(2), delay: Duration::from_millis(1), ..RetryPolicy::default() };
        let result: WorkflowResult<u32> =
            ctx.do_step("s1", policy, || async { Err(WorkflowError::Validation("nope".into())) }).await;
        assert!(matches!(result, Err(WorkflowError::Exhausted(3))));
    }

    #[tokio::test]
    async fn sleep_past_deadline_resolves_immediately_on_replay() {
        let (_dir, ctx) = ctx();
        ctx.clock.set_epoch_ms(2_000);
        ctx.sleep("s1", Duration::from_millis(100)).await.unwrap();
    }
}
