// SPDX-License-Identifier: MIT

//! The bindings registry (spec GLOSSARY: "Env") built from a
//! `es_config::WorkerConfig`: one concrete binding instance per declared
//! `binding` name, reachable by name at handler-invocation time.
//!
//! Durable Object namespaces and workflow bindings aren't constructible
//! from config alone — each needs the worker module's actor-class factory
//! or workflow handler, which only the worker module knows about — so
//! those two maps are populated by [`Env::register_actor_namespace`] and
//! [`Env::register_workflow`] after the data-only bindings are built.

use crate::actor_binding::ActorBinding;
use crate::error::{RuntimeError, RuntimeResult};
use crate::workflow_binding::WorkflowBinding;
use es_bindings::cache::Cache;
use es_bindings::d1::D1Database;
use es_bindings::kv::KvNamespace;
use es_bindings::objects::Bucket;
use es_bindings::queue::Queue;
use es_config::WorkerConfig;
use es_core::SystemClock;
use es_store::Store;
use std::collections::HashMap;
use std::sync::Arc;

pub struct Env {
    pub vars: HashMap<String, String>,
    pub kv_namespaces: HashMap<String, KvNamespace<SystemClock>>,
    pub buckets: HashMap<String, Bucket<SystemClock>>,
    pub databases: HashMap<String, D1Database>,
    pub caches: HashMap<String, Cache<SystemClock>>,
    pub queues: HashMap<String, Queue<SystemClock>>,
    pub actors: HashMap<String, Arc<dyn ActorBinding>>,
    pub workflows: HashMap<String, Arc<WorkflowBinding>>,
}

impl Env {
    /// Builds the data-binding maps (KV, R2, D1, cache, queue producers)
    /// straight from config. `d1` is async because opening a database runs
    /// its migrations.
    pub async fn from_config(store: &Store, config: &WorkerConfig) -> RuntimeResult<Self> {
        let clock = Arc::new(SystemClock);

        let mut kv_namespaces = HashMap::new();
        for binding in &config.kv_namespaces {
            kv_namespaces.insert(binding.binding.clone(), KvNamespace::new(store.clone(), binding.id.clone(), clock.clone()));
        }

        let mut buckets = HashMap::new();
        for binding in &config.r2_buckets {
            buckets.insert(binding.binding.clone(), Bucket::new(store.clone(), binding.bucket_name.clone(), clock.clone()));
        }

        let mut databases = HashMap::new();
        for binding in &config.d1_databases {
            let db = D1Database::open(store, &binding.database_name).await?;
            databases.insert(binding.binding.clone(), db);
        }

        let mut caches = HashMap::new();
        caches.insert("default".to_string(), Cache::new(store.clone(), "default", clock.clone()));

        let mut queues = HashMap::new();
        for binding in &config.queues.producers {
            queues.insert(binding.binding.clone(), Queue::new(store.clone(), binding.queue.clone(), clock.clone()));
        }

        Ok(Self {
            vars: config.vars.clone(),
            kv_namespaces,
            buckets,
            databases,
            caches,
            queues,
            actors: HashMap::new(),
            workflows: HashMap::new(),
        })
    }

    pub fn register_actor_namespace(&mut self, binding: impl Into<String>, namespace: Arc<dyn ActorBinding>) {
        self.actors.insert(binding.into(), namespace);
    }

    pub fn register_workflow(&mut self, binding: impl Into<String>, workflow: Arc<WorkflowBinding>) {
        self.workflows.insert(binding.into(), workflow);
    }

    pub fn kv(&self, binding: &str) -> RuntimeResult<&KvNamespace<SystemClock>> {
        self.kv_namespaces.get(binding).ok_or_else(|| RuntimeError::UnknownBinding(binding.to_string()))
    }

    pub fn bucket(&self, binding: &str) -> RuntimeResult<&Bucket<SystemClock>> {
        self.buckets.get(binding).ok_or_else(|| RuntimeError::UnknownBinding(binding.to_string()))
    }

    pub fn database(&self, binding: &str) -> RuntimeResult<&D1Database> {
        self.databases.get(binding).ok_or_else(|| RuntimeError::UnknownBinding(binding.to_string()))
    }

    pub fn cache(&self, binding: &str) -> RuntimeResult<&Cache<SystemClock>> {
        self.caches.get(binding).ok_or_else(|| RuntimeError::UnknownBinding(binding.to_string()))
    }

    pub fn queue(&self, binding: &str) -> RuntimeResult<&Queue<SystemClock>> {
        self.queues.get(binding).ok_or_else(|| RuntimeError::UnknownBinding(binding.to_string()))
    }

    pub fn actor_namespace(&self, binding: &str) -> RuntimeResult<&Arc<dyn ActorBinding>> {
        self.actors.get(binding).ok_or_else(|| RuntimeError::UnknownBinding(binding.to_string()))
    }

    /// Looks up a namespace by its actor class name rather than its
    /// binding name, for the alarm scheduler, which only knows the class
    /// a due alarm row belongs to.
    pub fn actor_namespace_by_class(&self, class_name: &str) -> RuntimeResult<&Arc<dyn ActorBinding>> {
        self.actors
            .values()
            .find(|namespace| namespace.class_name() == class_name)
            .ok_or_else(|| RuntimeError::UnknownActorClass(class_name.to_string()))
    }

    pub fn workflow(&self, binding: &str) -> RuntimeResult<&Arc<WorkflowBinding>> {
        self.workflows.get(binding).ok_or_else(|| RuntimeError::UnknownBinding(binding.to_string()))
    }
}
