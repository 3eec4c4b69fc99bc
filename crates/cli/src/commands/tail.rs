// SPDX-License-Identifier: MIT

//! `es tail` — show and optionally follow the daemon's log file.

use anyhow::{anyhow, Result};

use crate::output::display_then_follow;

pub async fn handle(lines: usize, follow: bool) -> Result<()> {
    let state_dir = es_daemon::state_dir()?;
    let log_path = latest_log_file(&state_dir)?;
    display_then_follow(&log_path, lines, follow).await
}

/// `tracing_appender::rolling::daily` rotates `esd.log.<date>` files under
/// the state dir; pick the most recently modified one.
fn latest_log_file(state_dir: &std::path::Path) -> Result<std::path::PathBuf> {
    let mut candidates: Vec<(std::time::SystemTime, std::path::PathBuf)> = Vec::new();
    if let Ok(entries) = std::fs::read_dir(state_dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.file_name().and_then(|n| n.to_str()).is_some_and(|n| n.starts_with("esd.log")) {
                if let Ok(metadata) = entry.metadata() {
                    if let Ok(modified) = metadata.modified() {
                        candidates.push((modified, path));
                    }
                }
            }
        }
    }
    candidates.sort_by_key(|(modified, _)| *modified);
    candidates
        .pop()
        .map(|(_, path)| path)
        .ok_or_else(|| anyhow!("no daemon log file found under {}", state_dir.display()))
}
