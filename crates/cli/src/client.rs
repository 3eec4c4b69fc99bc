// SPDX-License-Identifier: MIT

//! Unix-socket client for the inspector protocol: connects to the daemon's
//! inspector socket, sends one `es_wire::Request` at a time, and maps the
//! matching `Response` variant back for each command in [`crate::commands`].

use std::path::PathBuf;

use es_wire::{ProtocolError, Request, Response};
use tokio::net::UnixStream;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("daemon is not running (socket not found at {0})")]
    NotRunning(PathBuf),
    #[error("daemon connection error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("unexpected response from daemon: {0}")]
    UnexpectedResponse(String),
    #[error("daemon returned an error: {0}")]
    Daemon(String),
}

impl ClientError {
    pub fn is_not_running(&self) -> bool {
        matches!(self, ClientError::NotRunning(_))
    }
}

#[derive(Debug)]
pub struct DaemonClient {
    stream: UnixStream,
}

impl DaemonClient {
    /// Connect to the inspector socket under the resolved state directory.
    pub async fn connect() -> Result<Self, ClientError> {
        let state_dir = es_daemon::state_dir().map_err(|err| {
            ClientError::UnexpectedResponse(format!("resolving state dir: {err}"))
        })?;
        let socket_path = es_daemon::socket_path(&state_dir);
        Self::connect_to(&socket_path).await
    }

    async fn connect_to(socket_path: &std::path::Path) -> Result<Self, ClientError> {
        let stream = UnixStream::connect(socket_path)
            .await
            .map_err(|_| ClientError::NotRunning(socket_path.to_path_buf()))?;
        Ok(Self { stream })
    }

    async fn send(&mut self, request: &Request) -> Result<Response, ClientError> {
        es_wire::write_request(&mut self.stream, request).await?;
        let response = es_wire::read_response(&mut self.stream).await?;
        Ok(response)
    }

    fn reject<T>(response: Response) -> Result<T, ClientError> {
        match response {
            Response::Error { message } => Err(ClientError::Daemon(message)),
            other => Err(ClientError::UnexpectedResponse(format!("{other:?}"))),
        }
    }

    pub async fn hello(&mut self) -> Result<String, ClientError> {
        let request = Request::Hello {
            version: env!("CARGO_PKG_VERSION").to_string(),
        };
        match self.send(&request).await? {
            Response::Hello { version } => Ok(version),
            other => Self::reject(other),
        }
    }

    pub async fn ping(&mut self) -> Result<(), ClientError> {
        match self.send(&Request::Ping).await? {
            Response::Pong => Ok(()),
            other => Self::reject(other),
        }
    }

    pub async fn shutdown(&mut self) -> Result<(), ClientError> {
        match self.send(&Request::Shutdown).await? {
            Response::ShuttingDown => Ok(()),
            other => Self::reject(other),
        }
    }

    pub async fn trigger_scheduled(&mut self, cron: &str) -> Result<bool, ClientError> {
        let request = Request::TriggerScheduled {
            cron: cron.to_string(),
        };
        match self.send(&request).await? {
            Response::Scheduled { invoked } => Ok(invoked),
            other => Self::reject(other),
        }
    }

    pub async fn query(&mut self, query: es_wire::Query) -> Result<Response, ClientError> {
        let response = self.send(&Request::Query(query)).await?;
        if let Response::Error { message } = response {
            return Err(ClientError::Daemon(message));
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connecting_to_a_missing_socket_reports_not_running() {
        let dir = tempfile::tempdir().unwrap();
        let socket_path = dir.path().join("inspector.sock");
        let err = DaemonClient::connect_to(&socket_path).await.unwrap_err();
        assert!(err.is_not_running());
    }
}
