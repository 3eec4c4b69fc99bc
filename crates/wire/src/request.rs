// SPDX-License-Identifier: MIT

//! Requests sent from the CLI to the daemon's inspector listener.

use serde::{Deserialize, Serialize};

use crate::Query;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Request {
    /// Version handshake, sent once per connection.
    Hello { version: String },
    Ping,
    Query(Query),
    /// Invokes the scheduled handler once for `cron`, as if it had fired on
    /// schedule. Backs the `GET /__scheduled?cron=<expr>` inspector endpoint.
    TriggerScheduled { cron: String },
    Shutdown,
}
