// SPDX-License-Identifier: MIT
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ActorError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("no such actor class {0:?}")]
    UnknownClass(String),
    #[error("actor threw: {0}")]
    HandlerFailed(String),
    #[error("no fetch handler on this class")]
    NoFetchHandler,
    #[error("store error: {0}")]
    Store(#[from] es_store::error::StoreError),
    #[error("join error: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type ActorResult<T> = Result<T, ActorError>;
