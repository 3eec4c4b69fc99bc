// SPDX-License-Identifier: MIT

//! The user-code adapter boundary: a `WorkerModule` implementation supplies
//! the `fetch`/`scheduled`/`queue`/`email` handlers a real worker script
//! would export, plus the actor-class factories and workflow handlers a
//! real worker would declare as classes. `es-runtime` drives this trait;
//! it never calls into user code any other way.

use crate::context::ExecutionContext;
use crate::env::Env;
use crate::http::{HttpRequest, HttpResponse};
use crate::queue_batch::MessageBatch;
use crate::scheduled::ScheduledController;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait WorkerModule: Send + Sync {
    async fn fetch(&self, _request: HttpRequest, _env: Arc<Env>, _ctx: Arc<ExecutionContext>) -> Result<HttpResponse, String> {
        Err("worker module has no fetch handler".to_string())
    }

    async fn scheduled(&self, _controller: Arc<ScheduledController>, _env: Arc<Env>, _ctx: Arc<ExecutionContext>) -> Result<(), String> {
        Err("worker module has no scheduled handler".to_string())
    }

    async fn queue(&self, _batch: Arc<MessageBatch>, _env: Arc<Env>, _ctx: Arc<ExecutionContext>) -> Result<(), String> {
        Err("worker module has no queue handler".to_string())
    }

    async fn email(&self, _message: EmailMessage, _env: Arc<Env>, _ctx: Arc<ExecutionContext>) -> Result<(), String> {
        Err("worker module has no email handler".to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub raw: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Defaults;

    #[async_trait]
    impl WorkerModule for Defaults {}

    #[tokio::test]
    async fn unimplemented_handlers_report_which_one_is_missing() {
        let module = Defaults;
        let env = Arc::new(crate::tests_support::empty_env().await);
        let ctx = Arc::new(ExecutionContext::new());
        let request = HttpRequest { method: "GET".to_string(), url: "/".to_string(), headers: vec![], body: vec![] };
        let err = module.fetch(request, env, ctx).await.unwrap_err();
        assert_eq!(err, "worker module has no fetch handler");
    }
}
