// SPDX-License-Identifier: MIT

//! Per-`(class, id)` instance lifecycle (spec §4.8.3): lazy construction,
//! `blockConcurrencyWhile` during construction, and the input-gate-serialized
//! call surface. Idle eviction is driven by `Namespace`, not this module.

use crate::error::ActorResult;
use crate::gate::InputGate;
use crate::id::ActorId;
use crate::storage::ActorStorage;
use async_trait::async_trait;
use es_core::Clock;
use es_store::Store;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

/// The user-defined Durable Object class. `call` dispatches an RPC method by
/// name (spec §4.8.8's "invoking a stub method"); `fetch`/`alarm` are the two
/// other entry points the subsystem may invoke directly.
#[async_trait]
pub trait ActorClass: Send + Sync + 'static {
    /// Runs once, during lazy construction, before any stub call is
    /// admitted. The default does nothing — most classes have no
    /// constructor-time async work.
    async fn block_concurrency_while(&self, _ctx: &ActorContext) -> ActorResult<()> {
        Ok(())
    }

    async fn call(&self, ctx: &ActorContext, method: &str, args: Value) -> ActorResult<Value>;

    async fn fetch(&self, _ctx: &ActorContext, _request: Value) -> ActorResult<Value> {
        Err(crate::error::ActorError::NoFetchHandler)
    }

    async fn alarm(&self, _ctx: &ActorContext, _retry_count: u32, _is_retry: bool) -> ActorResult<()> {
        Ok(())
    }
}

#[derive(Clone)]
pub struct ActorContext {
    pub id: ActorId,
    pub storage: Arc<ActorStorage>,
}

impl ActorContext {
    pub fn sql_db_path(&self, store: &Store, class: &str) -> es_store::error::StoreResult<std::path::PathBuf> {
        store.layout().actor_db_path(class, self.id.hex())
    }
}

/// One lazily-constructed, input-gate-serialized actor instance.
pub struct Instance<C: ActorClass, CL: Clock = es_core::SystemClock> {
    id: ActorId,
    gate: InputGate,
    storage: Arc<ActorStorage>,
    actor: tokio::sync::OnceCell<C>,
    factory: Arc<dyn Fn() -> C + Send + Sync>,
    clock: CL,
    last_active: parking_lot::Mutex<Instant>,
}

impl<C: ActorClass, CL: Clock> Instance<C, CL> {
    pub fn new(store: Store, class: &str, id: ActorId, clock: CL, factory: impl Fn() -> C + Send + Sync + 'static) -> Self {
        Self::with_shared_factory(store, class, id, clock, Arc::new(factory))
    }

    pub(crate) fn with_shared_factory(store: Store, class: &str, id: ActorId, clock: CL, factory: Arc<dyn Fn() -> C + Send + Sync>) -> Self {
        let storage = Arc::new(ActorStorage::new(store, class, id.hex()));
        let last_active = clock.now();
        Self {
            id,
            gate: InputGate::new(),
            storage,
            actor: tokio::sync::OnceCell::new(),
            factory,
            clock,
            last_active: parking_lot::Mutex::new(last_active),
        }
    }

    pub fn id(&self) -> &ActorId {
        &self.id
    }

    fn touch(&self) {
        *self.last_active.lock() = self.clock.now();
    }

    /// Whether this instance may be evicted: idle past `timeout` with no
    /// work in flight. The gate's `try_lock` check stands in for "no active
    /// call and no in-progress `blockConcurrencyWhile`" — both hold the gate.
    pub fn is_idle(&self, timeout_ms: u64) -> bool {
        let idle_ms = self.clock.now().saturating_duration_since(*self.last_active.lock()).as_millis() as u64;
        idle_ms >= timeout_ms && self.gate.try_lock_available()
    }

    fn context(&self) -> ActorContext {
        ActorContext { id: self.id.clone(), storage: self.storage.clone() }
    }

    /// Constructs the actor on first call and returns a reference to it,
    /// running `blockConcurrencyWhile` exactly once regardless of how many
    /// callers race to initialize it.
    async fn ensure_constructed(&self) -> ActorResult<&C> {
        self.actor
            .get_or_try_init(|| async {
                let actor = (self.factory)();
                let ctx = self.context();
                actor.block_concurrency_while(&ctx).await?;
                Ok(actor)
            })
            .await
    }

    pub async fn call(&self, method: &str, args: Value) -> ActorResult<Value> {
        self.touch();
        self.gate
            .run(|| async {
                let actor = self.ensure_constructed().await?;
                let ctx = self.context();
                let result = actor.call(&ctx, method, args).await;
                self.storage.flush().await?;
                result
            })
            .await
    }

    pub async fn fetch(&self, request: Value) -> ActorResult<Value> {
        self.touch();
        self.gate
            .run(|| async {
                let actor = self.ensure_constructed().await?;
                let ctx = self.context();
                let result = actor.fetch(&ctx, request).await;
                self.storage.flush().await?;
                result
            })
            .await
    }

    pub async fn alarm(&self, retry_count: u32, is_retry: bool) -> ActorResult<()> {
        self.touch();
        self.gate
            .run(|| async {
                let actor = self.ensure_constructed().await?;
                let ctx = self.context();
                let result = actor.alarm(&ctx, retry_count, is_retry).await;
                self.storage.flush().await?;
                result
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use es_core::FakeClock;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::tempdir;

    struct Counter {
        constructs: Arc<AtomicU32>,
    }

    #[async_trait]
    impl ActorClass for Counter {
        async fn block_concurrency_while(&self, _ctx: &ActorContext) -> ActorResult<()> {
            self.constructs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn call(&self, ctx: &ActorContext, method: &str, _args: Value) -> ActorResult<Value> {
            match method {
                "increment" => {
                    let current = ctx.storage.get("count").await?.and_then(|v| v.as_i64()).unwrap_or(0);
                    ctx.storage.put("count", Value::from(current + 1));
                    Ok(Value::from(current + 1))
                }
                _ => Ok(Value::Null),
            }
        }
    }

    fn instance() -> (Instance<Counter, FakeClock>, Arc<AtomicU32>) {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let constructs = Arc::new(AtomicU32::new(0));
        let constructs2 = constructs.clone();
        let id = ActorId::from_name("Counter", "a");
        let clock = FakeClock::new();
        (Instance::new(store, "Counter", id, clock, move || Counter { constructs: constructs2.clone() }), constructs)
    }

    #[tokio::test]
    async fn construction_happens_once_across_many_calls() {
        let (instance, constructs) = instance();
        for _ in 0..3 {
            instance.call("increment", Value::Null).await.unwrap();
        }
        assert_eq!(constructs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn increments_persist_across_calls() {
        let (instance, _) = instance();
        let a = instance.call("increment", Value::Null).await.unwrap();
        let b = instance.call("increment", Value::Null).await.unwrap();
        assert_eq!(a, Value::from(1));
        assert_eq!(b, Value::from(2));
    }

    #[test]
    fn is_idle_reflects_the_configured_timeout() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let clock = FakeClock::new();
        let id = ActorId::from_name("Counter", "a");
        let instance = Instance::new(store, "Counter", id, clock.clone(), || Counter { constructs: Arc::new(AtomicU32::new(0)) });

        assert!(!instance.is_idle(120_000));
        clock.advance(std::time::Duration::from_secs(121));
        assert!(instance.is_idle(120_000));
    }
}
