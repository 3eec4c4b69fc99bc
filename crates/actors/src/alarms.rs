// SPDX-License-Identifier: MIT

//! The alarm scheduler thread (spec §4.8.6): wakes at each due alarm time,
//! invokes the owning instance's `alarm({retryCount, isRetry})` handler
//! inside its input gate, and retries failures with exponential backoff
//! starting at 2s, up to 6 retries, at-least-once.

use async_trait::async_trait;
use es_store::actors::{delete_alarm, due_alarms, get_alarm, set_alarm};
use es_store::Store;
use std::time::Duration;
use tokio::time::sleep;

pub const INITIAL_BACKOFF: Duration = Duration::from_secs(2);
pub const MAX_RETRIES: u32 = 6;
const POLL_INTERVAL: Duration = Duration::from_millis(500);

#[async_trait]
pub trait AlarmDispatcher: Send + Sync + 'static {
    /// Invokes `(class, id)`'s alarm handler inside its input gate. A
    /// returned `Err` triggers a retry per the backoff schedule above.
    async fn fire(&self, class: &str, id: &str, retry_count: u32, is_retry: bool) -> Result<(), String>;
}

pub struct AlarmScheduler<D: AlarmDispatcher> {
    store: Store,
    dispatcher: D,
}

impl<D: AlarmDispatcher> AlarmScheduler<D> {
    pub fn new(store: Store, dispatcher: D) -> Self {
        Self { store, dispatcher }
    }

    pub fn get_alarm(&self, class: &str, id: &str) -> es_store::error::StoreResult<Option<i64>> {
        let conn = self.store.conn()?;
        get_alarm(&conn, class, id)
    }

    pub fn set_alarm(&self, class: &str, id: &str, time_ms: i64) -> es_store::error::StoreResult<()> {
        let conn = self.store.conn()?;
        set_alarm(&conn, class, id, time_ms)
    }

    pub fn delete_alarm(&self, class: &str, id: &str) -> es_store::error::StoreResult<()> {
        let conn = self.store.conn()?;
        delete_alarm(&conn, class, id)
    }

    /// Fires every alarm due at or before `now_ms`, clearing each one before
    /// invoking its handler so a crash mid-handler does not wedge the
    /// schedule — at-least-once, not exactly-once, by design.
    pub async fn tick(&self, now_ms: i64) -> es_store::error::StoreResult<()> {
        let due = {
            let conn = self.store.conn()?;
            due_alarms(&conn, now_ms)?
        };
        for alarm in due {
            {
                let conn = self.store.conn()?;
                delete_alarm(&conn, &alarm.class, &alarm.id)?;
            }
            self.dispatch_with_retry(&alarm.class, &alarm.id).await;
        }
        Ok(())
    }

    async fn dispatch_with_retry(&self, class: &str, id: &str) {
        let mut retry_count = 0;
        loop {
            let is_retry = retry_count > 0;
            match self.dispatcher.fire(class, id, retry_count, is_retry).await {
                Ok(()) => return,
                Err(err) => {
                    if retry_count >= MAX_RETRIES {
                        tracing::warn!(class, id, retry_count, %err, "alarm handler exhausted retries");
                        return;
                    }
                    let delay = INITIAL_BACKOFF * 2u32.pow(retry_count);
                    tracing::warn!(class, id, retry_count, %err, ?delay, "alarm handler failed, retrying");
                    sleep(delay).await;
                    retry_count += 1;
                }
            }
        }
    }

    /// Runs forever, polling for due alarms at a fixed interval.
    pub async fn run(&self, clock: impl Fn() -> i64) -> ! {
        loop {
            sleep(POLL_INTERVAL).await;
            if let Err(err) = self.tick(clock()).await {
                tracing::error!(%err, "alarm scheduler tick failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tempfile::tempdir;

    struct CountingDispatcher {
        calls: Arc<AtomicU32>,
        fail_first_n: u32,
    }

    #[async_trait]
    impl AlarmDispatcher for CountingDispatcher {
        async fn fire(&self, _class: &str, _id: &str, retry_count: u32, _is_retry: bool) -> Result<(), String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if retry_count < self.fail_first_n {
                Err("simulated failure".to_string())
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn due_alarm_fires_and_is_cleared() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let calls = Arc::new(AtomicU32::new(0));
        let scheduler = AlarmScheduler::new(store.clone(), CountingDispatcher { calls: calls.clone(), fail_first_n: 0 });
        scheduler.set_alarm("Counter", "id1", 1000).unwrap();

        scheduler.tick(1000).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.get_alarm("Counter", "id1").unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn failing_handler_retries_with_backoff() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let calls = Arc::new(AtomicU32::new(0));
        let scheduler = AlarmScheduler::new(store.clone(), CountingDispatcher { calls: calls.clone(), fail_first_n: 2 });
        scheduler.set_alarm("Counter", "id1", 1000).unwrap();

        scheduler.tick(1000).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausting_retries_stops_after_max_plus_one_attempts() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let calls = Arc::new(AtomicU32::new(0));
        let scheduler = AlarmScheduler::new(store.clone(), CountingDispatcher { calls: calls.clone(), fail_first_n: 100 });
        scheduler.set_alarm("Counter", "id1", 1000).unwrap();

        scheduler.tick(1000).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), MAX_RETRIES + 1);
    }

    #[test]
    fn setting_alarm_twice_overrides() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let scheduler = AlarmScheduler::new(store, CountingDispatcher { calls: Arc::new(AtomicU32::new(0)), fail_first_n: 0 });
        scheduler.set_alarm("Counter", "id1", 1000).unwrap();
        scheduler.set_alarm("Counter", "id1", 2000).unwrap();
        assert_eq!(scheduler.get_alarm("Counter", "id1").unwrap(), Some(2000));
    }
}
