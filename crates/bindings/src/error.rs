// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Error kinds shared by the KV, object-store, D1, cache, and queue
/// bindings (spec §7).
#[derive(Debug, Error)]
pub enum BindingError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),
    #[error("retry budget exhausted: {0}")]
    Exhausted(String),
    #[error("binding unavailable: {0}")]
    FatalBinding(String),
    #[error("store error: {0}")]
    Store(#[from] es_store::error::StoreError),
    #[error("join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type BindingResult<T> = Result<T, BindingError>;
