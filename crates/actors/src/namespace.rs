// SPDX-License-Identifier: MIT

//! A namespace bound to one actor class (spec §4.8.2): `get`/`getByName`
//! hand back a `Stub`; idle instances are evicted from `sweep_idle`.

use crate::id::ActorId;
use crate::instance::{ActorClass, Instance};
use crate::stub::Stub;
use es_core::Clock;
use es_store::Store;
use std::collections::HashMap;
use std::sync::Arc;

pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 120_000;

struct Inner<C: ActorClass, CL: Clock> {
    store: Store,
    class_name: String,
    clock: CL,
    factory: Arc<dyn Fn() -> C + Send + Sync>,
    instances: parking_lot::Mutex<HashMap<ActorId, Arc<Instance<C, CL>>>>,
    idle_timeout_ms: u64,
}

/// Bound to exactly one `ActorClass` implementation, constructed once the
/// user-code adapter wires a class in (`_setClass`, spec §4.8.2).
pub struct Namespace<C: ActorClass, CL: Clock> {
    inner: Arc<Inner<C, CL>>,
}

impl<C: ActorClass, CL: Clock> Clone for Namespace<C, CL> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<C: ActorClass, CL: Clock> Namespace<C, CL> {
    pub fn new(store: Store, class_name: impl Into<String>, clock: CL, factory: impl Fn() -> C + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                class_name: class_name.into(),
                clock,
                factory: Arc::new(factory),
                instances: parking_lot::Mutex::new(HashMap::new()),
                idle_timeout_ms: DEFAULT_IDLE_TIMEOUT_MS,
            }),
        }
    }

    pub fn with_idle_timeout_ms(mut self, timeout_ms: u64) -> Self {
        Arc::get_mut(&mut self.inner)
            .map(|inner| inner.idle_timeout_ms = timeout_ms)
            .unwrap_or_else(|| tracing::warn!("idle timeout set after the namespace was cloned; ignoring"));
        self
    }

    pub fn class_name(&self) -> &str {
        &self.inner.class_name
    }

    pub fn id_from_name(&self, name: &str) -> ActorId {
        ActorId::from_name(&self.inner.class_name, name)
    }

    pub fn new_unique_id(&self) -> ActorId {
        ActorId::new_unique()
    }

    pub fn id_from_string(&self, hex: impl Into<String>) -> ActorId {
        ActorId::from_string(hex)
    }

    pub fn get(&self, id: ActorId) -> Stub<C, CL> {
        Stub::new(self.clone(), id)
    }

    pub fn get_by_name(&self, name: &str) -> Stub<C, CL> {
        self.get(self.id_from_name(name))
    }

    /// Returns the resident instance for `id`, lazily constructing its
    /// in-memory record (not the user class itself — that stays lazy until
    /// the first actual call) if it was evicted or never touched.
    pub(crate) fn get_or_create_instance(&self, id: &ActorId) -> Arc<Instance<C, CL>> {
        let mut instances = self.inner.instances.lock();
        instances
            .entry(id.clone())
            .or_insert_with(|| {
                Arc::new(Instance::with_shared_factory(
                    self.inner.store.clone(),
                    &self.inner.class_name,
                    id.clone(),
                    self.inner.clock.clone(),
                    self.inner.factory.clone(),
                ))
            })
            .clone()
    }

    pub fn sweep_idle(&self) {
        let mut instances = self.inner.instances.lock();
        instances.retain(|_, instance| !instance.is_idle(self.inner.idle_timeout_ms));
    }

    pub fn resident_count(&self) -> usize {
        self.inner.instances.lock().len()
    }

    pub fn is_resident(&self, id: &ActorId) -> bool {
        self.inner.instances.lock().contains_key(id)
    }
}
