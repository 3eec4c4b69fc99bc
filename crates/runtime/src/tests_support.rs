// SPDX-License-Identifier: MIT

//! Shared fixtures for this crate's own unit tests.

#![cfg(test)]

use crate::env::Env;
use es_config::WorkerConfig;
use es_store::Store;
use tempfile::TempDir;

pub async fn empty_env() -> Env {
    let dir = TempDir::new().unwrap();
    // Leaked deliberately: each test's store only needs to outlive the test
    // process, and leaking a TempDir keeps the directory alive past this
    // function's return without threading ownership through callers.
    let dir = Box::leak(Box::new(dir));
    let store = Store::open(dir.path()).unwrap();
    let config = WorkerConfig { name: "test".to_string(), main: "src/index.js".to_string(), ..Default::default() };
    Env::from_config(&store, &config).await.unwrap()
}
