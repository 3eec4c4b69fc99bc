// SPDX-License-Identifier: MIT

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("daemon already running (pid file locked): {0}")]
    AlreadyRunning(std::io::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not resolve the home directory to derive a default state dir")]
    NoStateDir,
    #[error("config error: {0}")]
    Config(#[from] es_config::ConfigError),
    #[error("store error: {0}")]
    Store(#[from] es_store::error::StoreError),
    #[error("runtime error: {0}")]
    Runtime(#[from] es_runtime::RuntimeError),
}

pub type LifecycleResult<T> = Result<T, LifecycleError>;
