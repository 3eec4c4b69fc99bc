// SPDX-License-Identifier: MIT

//! A generation is an immutable snapshot of bindings plus the loaded
//! worker module (spec GLOSSARY: "Generation"). Hot-reload swaps the
//! `Arc<Generation>` behind a lock; in-flight calls keep their own
//! reference to the old generation and run to completion against it.

use crate::env::Env;
use crate::worker::WorkerModule;
use std::sync::Arc;

pub struct Generation {
    pub env: Arc<Env>,
    pub module: Arc<dyn WorkerModule>,
}

impl Generation {
    pub fn new(env: Env, module: Arc<dyn WorkerModule>) -> Self {
        Self { env: Arc::new(env), module }
    }
}

/// Holds the current generation behind a lock, swapped wholesale on reload.
/// Readers clone the `Arc<Generation>` out under the lock and release it
/// immediately, so a slow handler never blocks a reload from starting.
pub struct GenerationSlot {
    current: parking_lot::RwLock<Arc<Generation>>,
}

impl GenerationSlot {
    pub fn new(generation: Generation) -> Self {
        Self { current: parking_lot::RwLock::new(Arc::new(generation)) }
    }

    pub fn current(&self) -> Arc<Generation> {
        self.current.read().clone()
    }

    pub fn swap(&self, generation: Generation) -> Arc<Generation> {
        let mut guard = self.current.write();
        std::mem::replace(&mut *guard, Arc::new(generation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Noop;

    #[async_trait]
    impl WorkerModule for Noop {}

    #[tokio::test]
    async fn swap_replaces_the_current_generation_and_returns_the_old_one() {
        let env_a = crate::tests_support::empty_env().await;
        let env_b = crate::tests_support::empty_env().await;
        let slot = GenerationSlot::new(Generation::new(env_a, Arc::new(Noop)));
        let first = slot.current();

        let old = slot.swap(Generation::new(env_b, Arc::new(Noop)));
        assert!(Arc::ptr_eq(&old, &first));
        assert!(!Arc::ptr_eq(&slot.current(), &first));
    }
}
