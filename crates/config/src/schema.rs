// SPDX-License-Identifier: MIT

//! The declarative worker configuration (spec §6): name, entry module, and
//! binding declarations, with `env.<name>.*` overlays merged atop the base.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct KvNamespaceBinding {
    pub binding: String,
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct R2BucketBinding {
    pub binding: String,
    pub bucket_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct D1DatabaseBinding {
    pub binding: String,
    pub database_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct QueueProducerBinding {
    pub binding: String,
    pub queue: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct QueueConsumerBinding {
    pub queue: String,
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: u32,
    #[serde(default = "default_max_batch_timeout_secs")]
    pub max_batch_timeout_secs: u32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default)]
    pub dead_letter_queue: Option<String>,
}

fn default_max_batch_size() -> u32 {
    10
}

fn default_max_batch_timeout_secs() -> u32 {
    5
}

fn default_max_retries() -> u32 {
    3
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct QueuesConfig {
    #[serde(default)]
    pub producers: Vec<QueueProducerBinding>,
    #[serde(default)]
    pub consumers: Vec<QueueConsumerBinding>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct DurableObjectBinding {
    pub binding: String,
    pub class_name: String,
    #[serde(default)]
    pub script_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct DurableObjectsConfig {
    #[serde(default)]
    pub bindings: Vec<DurableObjectBinding>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct WorkflowBinding {
    pub binding: String,
    pub name: String,
    pub class_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TriggersConfig {
    #[serde(default)]
    pub crons: Vec<String>,
}

/// Overlay applied atop the base config for one named environment
/// (`env.<name>`, spec §6). Every field is optional — only what's present
/// replaces or extends the base.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct EnvironmentOverlay {
    #[serde(default)]
    pub vars: HashMap<String, String>,
    #[serde(default)]
    pub kv_namespaces: Vec<KvNamespaceBinding>,
    #[serde(default)]
    pub r2_buckets: Vec<R2BucketBinding>,
    #[serde(default)]
    pub d1_databases: Vec<D1DatabaseBinding>,
    #[serde(default)]
    pub queues: Option<QueuesConfig>,
    #[serde(default)]
    pub durable_objects: Option<DurableObjectsConfig>,
    #[serde(default)]
    pub workflows: Vec<WorkflowBinding>,
    #[serde(default)]
    pub triggers: Option<TriggersConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct WorkerConfig {
    pub name: String,
    pub main: String,
    #[serde(default)]
    pub vars: HashMap<String, String>,
    #[serde(default)]
    pub kv_namespaces: Vec<KvNamespaceBinding>,
    #[serde(default)]
    pub r2_buckets: Vec<R2BucketBinding>,
    #[serde(default)]
    pub d1_databases: Vec<D1DatabaseBinding>,
    #[serde(default)]
    pub queues: QueuesConfig,
    #[serde(default)]
    pub durable_objects: DurableObjectsConfig,
    #[serde(default)]
    pub workflows: Vec<WorkflowBinding>,
    #[serde(default)]
    pub triggers: TriggersConfig,
    #[serde(default, rename = "env")]
    pub environments: HashMap<String, EnvironmentOverlay>,
}

impl WorkerConfig {
    /// Merges the named environment's overlay atop the base config. Binding
    /// lists that are non-empty in the overlay replace the base list
    /// outright (an environment redeclaring `kv_namespaces` means "use
    /// exactly these"), while `vars` merge key-by-key so an environment can
    /// override a handful of values without repeating the rest.
    pub fn for_environment(&self, name: &str) -> crate::error::ConfigResult<WorkerConfig> {
        let overlay = self
            .environments
            .get(name)
            .ok_or_else(|| crate::error::ConfigError::UnknownEnvironment(name.to_string()))?;

        let mut merged = self.clone();
        merged.vars.extend(overlay.vars.clone());
        if !overlay.kv_namespaces.is_empty() {
            merged.kv_namespaces = overlay.kv_namespaces.clone();
        }
        if !overlay.r2_buckets.is_empty() {
            merged.r2_buckets = overlay.r2_buckets.clone();
        }
        if !overlay.d1_databases.is_empty() {
            merged.d1_databases = overlay.d1_databases.clone();
        }
        if let Some(queues) = &overlay.queues {
            merged.queues = queues.clone();
        }
        if let Some(durable_objects) = &overlay.durable_objects {
            merged.durable_objects = durable_objects.clone();
        }
        if !overlay.workflows.is_empty() {
            merged.workflows = overlay.workflows.clone();
        }
        if let Some(triggers) = &overlay.triggers {
            merged.triggers = triggers.clone();
        }
        Ok(merged)
    }

    /// Overlays `.dev.vars`-sourced values atop `vars`, taking precedence
    /// over anything the base/environment config declared — this is the
    /// local-secrets layer, so it always wins.
    pub fn apply_dev_vars(&mut self, dev_vars: HashMap<String, String>) {
        self.vars.extend(dev_vars);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> WorkerConfig {
        let mut vars = HashMap::new();
        vars.insert("LOG_LEVEL".to_string(), "info".to_string());
        let mut environments = HashMap::new();
        environments.insert(
            "staging".to_string(),
            EnvironmentOverlay {
                vars: {
                    let mut v = HashMap::new();
                    v.insert("LOG_LEVEL".to_string(), "debug".to_string());
                    v
                },
                kv_namespaces: vec![KvNamespaceBinding { binding: "CACHE".to_string(), id: "staging-id".to_string() }],
                ..Default::default()
            },
        );
        WorkerConfig {
            name: "my-worker".to_string(),
            main: "src/index.js".to_string(),
            vars,
            kv_namespaces: vec![KvNamespaceBinding { binding: "CACHE".to_string(), id: "prod-id".to_string() }],
            environments,
            ..Default::default()
        }
    }

    #[test]
    fn environment_overlay_replaces_binding_lists_and_merges_vars() {
        let merged = base().for_environment("staging").unwrap();
        assert_eq!(merged.vars.get("LOG_LEVEL"), Some(&"debug".to_string()));
        assert_eq!(merged.kv_namespaces[0].id, "staging-id");
    }

    #[test]
    fn unknown_environment_is_an_error() {
        assert!(base().for_environment("does-not-exist").is_err());
    }

    #[test]
    fn dev_vars_take_precedence_over_base_vars() {
        let mut config = base();
        let mut dev_vars = HashMap::new();
        dev_vars.insert("LOG_LEVEL".to_string(), "trace".to_string());
        config.apply_dev_vars(dev_vars);
        assert_eq!(config.vars.get("LOG_LEVEL"), Some(&"trace".to_string()));
    }
}
