// SPDX-License-Identifier: MIT

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("validation error: {0}")]
    Validation(String),
    /// Raised by user step code to skip remaining retries and error the instance.
    #[error("non-retryable step error: {0}")]
    NonRetryable(String),
    #[error("retry budget exhausted after {0} attempts")]
    Exhausted(u32),
    #[error("waitForEvent timed out")]
    Timeout,
    #[error("store error: {0}")]
    Store(#[from] es_store::error::StoreError),
    #[error("join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;
