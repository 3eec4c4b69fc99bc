// SPDX-License-Identifier: MIT

//! The controller object passed to a scheduled handler invocation (spec
//! §4.9 runner description): `scheduledTime`, `cron`, `type`, `noRetry()`.

use std::sync::atomic::{AtomicBool, Ordering};

pub struct ScheduledController {
    pub scheduled_time_ms: u64,
    pub cron: String,
    pub kind: &'static str,
    no_retry: AtomicBool,
}

impl ScheduledController {
    pub fn new(scheduled_time_ms: u64, cron: impl Into<String>) -> Self {
        Self { scheduled_time_ms, cron: cron.into(), kind: "scheduled", no_retry: AtomicBool::new(false) }
    }

    /// Opts the current invocation out of the scheduler's error-driven retry.
    pub fn no_retry(&self) {
        self.no_retry.store(true, Ordering::Relaxed);
    }

    pub fn retry_suppressed(&self) -> bool {
        self.no_retry.load(Ordering::Relaxed)
    }
}
