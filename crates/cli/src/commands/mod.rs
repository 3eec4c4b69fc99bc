// SPDX-License-Identifier: MIT

//! CLI command implementations.

pub mod actors;
pub mod cache;
pub mod crons;
pub mod dev;
pub mod kv;
pub mod logs;
pub mod objects;
pub mod queues;
pub mod spans;
pub mod status;
pub mod tail;
pub mod workflows;

use crate::client::DaemonClient;
use anyhow::{anyhow, Result};

/// Connect to the daemon's inspector socket, or fail with a friendly hint.
pub async fn connect() -> Result<DaemonClient> {
    DaemonClient::connect().await.map_err(|err| {
        if err.is_not_running() {
            anyhow!("daemon is not running — start it with `esd` or `es dev`")
        } else {
            anyhow!("{err}")
        }
    })
}
