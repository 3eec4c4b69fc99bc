// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

//! es-ws: the in-process `WebSocketPair` — two linked sockets with
//! accept-buffering, listener dispatch, and idempotent close propagation.

pub mod error;
pub mod pair;

pub use error::{WsError, WsResult};
pub use pair::{CloseEvent, Message, ReadyState, WebSocket, WebSocketPair};
