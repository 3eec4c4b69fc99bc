// SPDX-License-Identifier: MIT

//! Process init/teardown (spec §4.11's ambient stack, expanded): resolves
//! the state directory, takes an exclusive lock so at most one daemon runs
//! against a given data directory, opens the shared store, loads the
//! worker config, and builds the first `Generation`.

use crate::error::{LifecycleError, LifecycleResult};
use es_config::WorkerConfig;
use es_runtime::{Env, Generation, GenerationSlot, WorkerModule};
use es_store::Store;
use fs2::FileExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

pub const DEFAULT_STATE_DIR_NAME: &str = "edge-runtime";

/// Resolves the daemon's state directory: `ES_STATE_DIR` >
/// `XDG_STATE_HOME/edge-runtime` > `~/.local/state/edge-runtime`.
pub fn state_dir() -> LifecycleResult<PathBuf> {
    if let Ok(dir) = std::env::var("ES_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join(DEFAULT_STATE_DIR_NAME));
    }
    let home = dirs::home_dir().ok_or(LifecycleError::NoStateDir)?;
    Ok(home.join(".local/state").join(DEFAULT_STATE_DIR_NAME))
}

pub fn socket_path(state_dir: &Path) -> PathBuf {
    state_dir.join("inspector.sock")
}

struct LockGuard {
    file: std::fs::File,
    path: PathBuf,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
        let _ = std::fs::remove_file(&self.path);
    }
}

/// A running daemon's long-lived state: the store, the current generation,
/// and the exclusive lock keeping a second daemon from starting against the
/// same data directory.
pub struct Daemon {
    pub store: Store,
    pub generations: Arc<GenerationSlot>,
    pub state_dir: PathBuf,
    lock: LockGuard,
}

/// Starts the daemon: acquires the lock, opens the store, builds the first
/// generation from `config` and `module`. Fails if another daemon already
/// holds the lock for `state_dir`.
pub async fn startup(state_dir: PathBuf, config: WorkerConfig, module: Arc<dyn WorkerModule>) -> LifecycleResult<Daemon> {
    std::fs::create_dir_all(&state_dir)?;

    let lock_path = state_dir.join("daemon.lock");
    let lock_file = std::fs::OpenOptions::new().write(true).create(true).truncate(false).open(&lock_path)?;
    lock_file.try_lock_exclusive().map_err(LifecycleError::AlreadyRunning)?;
    use std::io::Write;
    let mut pid_file = &lock_file;
    pid_file.set_len(0)?;
    writeln!(pid_file, "{}", std::process::id())?;

    let store = Store::open(state_dir.join("data"))?;
    let env = Env::from_config(&store, &config).await?;
    let generation = Generation::new(env, module);
    let generations = Arc::new(GenerationSlot::new(generation));

    info!(state_dir = %state_dir.display(), worker = %config.name, "daemon started");
    Ok(Daemon { store, generations, state_dir, lock: LockGuard { file: lock_file, path: lock_path } })
}

impl Daemon {
    /// Hot-swaps in a newly built generation, returning the outgoing one so
    /// the caller can drain its in-flight `ExecutionContext`s before it is
    /// dropped (spec GLOSSARY's generation-swap boundary).
    pub async fn reload(&self, config: &WorkerConfig, module: Arc<dyn WorkerModule>) -> LifecycleResult<Arc<Generation>> {
        let env = Env::from_config(&self.store, config).await?;
        Ok(self.generations.swap(Generation::new(env, module)))
    }

    pub async fn shutdown(self) {
        info!(state_dir = %self.state_dir.display(), "daemon shutting down");
        drop(self.lock);
    }
}
