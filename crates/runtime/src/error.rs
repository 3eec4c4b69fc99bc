// SPDX-License-Identifier: MIT

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("no binding named {0:?} is registered")]
    UnknownBinding(String),
    #[error("no actor class named {0:?} is registered")]
    UnknownActorClass(String),
    #[error("no workflow named {0:?} is registered")]
    UnknownWorkflow(String),
    #[error("worker module has no {0} handler")]
    NoHandler(&'static str),
    #[error("handler error: {0}")]
    Handler(String),
    #[error(transparent)]
    Store(#[from] es_store::error::StoreError),
    #[error(transparent)]
    Binding(#[from] es_bindings::BindingError),
    #[error(transparent)]
    Actor(#[from] es_actors::ActorError),
    #[error(transparent)]
    Workflow(#[from] es_workflows::WorkflowError),
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;
