// SPDX-License-Identifier: MIT

//! Minute-tick scheduler: parses every configured expression at startup,
//! wakes once a minute (aligned to the minute boundary where possible),
//! and invokes a callback for each expression that matches `now` (spec §4.9).

use crate::expr::{parse, CronParseError, CronSchedule};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

pub type ScheduledCallback = Box<dyn Fn(DateTime<Utc>, &str) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

struct Entry {
    expr: String,
    schedule: CronSchedule,
    callback: ScheduledCallback,
}

/// Owns a set of cron expressions and dispatches their callbacks on match.
/// An error from a callback is swallowed here — the caller's callback is
/// responsible for recording it; a scheduler failure must never halt the
/// whole runner.
pub struct CronRunner {
    entries: Vec<Entry>,
}

impl CronRunner {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn register(&mut self, expr: &str, callback: ScheduledCallback) -> Result<(), CronParseError> {
        let schedule = parse(expr)?;
        self.entries.push(Entry { expr: expr.to_string(), schedule, callback });
        Ok(())
    }

    /// Evaluates every registered expression against `now`, invoking the
    /// matching callbacks concurrently and waiting for them to finish.
    pub async fn tick(&self, now: DateTime<Utc>) {
        let matching: Vec<&Entry> = self.entries.iter().filter(|e| e.schedule.matches(now)).collect();
        let mut futures = Vec::with_capacity(matching.len());
        for entry in matching {
            futures.push((entry.callback)(now, &entry.expr));
        }
        futures_join_all(futures).await;
    }

    /// Runs forever, ticking once a minute. Sleeps to the next minute
    /// boundary first so ticks land close to `:00`.
    pub async fn run(&self) -> ! {
        let now = Utc::now();
        let until_boundary = 60 - now.timestamp() % 60;
        tokio::time::sleep(Duration::from_secs(until_boundary as u64)).await;

        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            self.tick(Utc::now()).await;
        }
    }
}

impl Default for CronRunner {
    fn default() -> Self {
        Self::new()
    }
}

async fn futures_join_all<I>(futures: I)
where
    I: IntoIterator,
    I::Item: Future<Output = ()>,
{
    let handles: Vec<_> = futures.into_iter().collect();
    for handle in handles {
        handle.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn tick_invokes_only_matching_expressions() {
        let mut runner = CronRunner::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let fired2 = fired.clone();
        runner
            .register(
                "0 0 * * *",
                Box::new(move |_now, _expr| {
                    let fired = fired2.clone();
                    Box::pin(async move {
                        fired.fetch_add(1, Ordering::SeqCst);
                    })
                }),
            )
            .unwrap();
        runner
            .register("0 5 * * *", Box::new(|_now, _expr| Box::pin(async move {})))
            .unwrap();

        runner.tick(Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        runner.tick(Utc.with_ymd_and_hms(2026, 3, 1, 1, 0, 0).unwrap()).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn register_rejects_an_invalid_expression() {
        let mut runner = CronRunner::new();
        let result = runner.register("not a cron expr", Box::new(|_now, _expr| Box::pin(async move {})));
        assert!(result.is_err());
    }
}
