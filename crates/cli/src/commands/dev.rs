// SPDX-License-Identifier: MIT

//! `es dev` — start the daemon for local development.
//!
//! Unlike `oj daemon start`, this does not background-fork and parse a
//! startup log for errors: the emulator daemon's own `tracing-appender`
//! file sink is the source of truth for startup failures, and `es dev`'s
//! job is just to get one running and hand control back (or stay attached
//! in the foreground).

use std::process::Command;
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::client::DaemonClient;

pub async fn handle(foreground: bool) -> Result<()> {
    if foreground {
        let esd_path = find_esd_binary();
        let status = Command::new(&esd_path).status().map_err(|err| {
            anyhow!("failed to launch {}: {err}", esd_path.display())
        })?;
        if !status.success() {
            return Err(anyhow!("daemon exited with status: {status}"));
        }
        return Ok(());
    }

    if let Ok(mut client) = DaemonClient::connect().await {
        if client.ping().await.is_ok() {
            println!("daemon already running");
            return Ok(());
        }
    }

    let esd_path = find_esd_binary();
    std::process::Command::new(&esd_path)
        .spawn()
        .map_err(|err| anyhow!("failed to launch {}: {err}", esd_path.display()))?;

    for _ in 0..50 {
        if let Ok(mut client) = DaemonClient::connect().await {
            if client.ping().await.is_ok() {
                println!("daemon started");
                return Ok(());
            }
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    Err(anyhow!("daemon did not become ready in time"))
}

fn find_esd_binary() -> std::path::PathBuf {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join("esd");
            if sibling.exists() {
                return sibling;
            }
        }
    }
    std::path::PathBuf::from("esd")
}
