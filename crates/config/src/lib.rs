// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

//! es-config: the declarative worker configuration schema, environment
//! overlays, and `.dev.vars` secrets loading.

pub mod error;
pub mod loader;
pub mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load_config, load_dev_vars};
pub use schema::{
    D1DatabaseBinding, DurableObjectBinding, DurableObjectsConfig, EnvironmentOverlay, KvNamespaceBinding, QueueConsumerBinding,
    QueueProducerBinding, QueuesConfig, R2BucketBinding, TriggersConfig, WorkerConfig, WorkflowBinding,
};
