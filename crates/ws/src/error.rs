// SPDX-License-Identifier: MIT
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WsError {
    #[error("cannot send before accept()")]
    NotAccepted,
    #[error("cannot send on a closing or closed socket")]
    NotOpen,
}

pub type WsResult<T> = Result<T, WsError>;
