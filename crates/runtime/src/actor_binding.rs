// SPDX-License-Identifier: MIT

//! Type-erased handle to one `es_actors::Namespace<C, CL>` so the registry
//! can hold namespaces for differently-typed actor classes in one map —
//! every class implements `ActorClass`, but each is a distinct concrete
//! type, so the registry can only speak to them through `call`/`fetch`,
//! exactly the surface a `Stub` already exposes.

use async_trait::async_trait;
use es_actors::{ActorClass, ActorId, ActorResult, Namespace};
use es_core::Clock;
use serde_json::Value;

#[async_trait]
pub trait ActorBinding: Send + Sync {
    fn class_name(&self) -> &str;
    fn id_from_name(&self, name: &str) -> ActorId;
    fn new_unique_id(&self) -> ActorId;
    fn id_from_string(&self, hex: &str) -> ActorId;
    async fn call(&self, id: &ActorId, method: &str, args: Value) -> ActorResult<Value>;
    async fn fetch(&self, id: &ActorId, request: Value) -> ActorResult<Value>;
    async fn alarm(&self, id: &ActorId, retry_count: u32, is_retry: bool) -> ActorResult<()>;
    fn resident_count(&self) -> usize;
    fn is_resident(&self, id: &ActorId) -> bool;
    fn sweep_idle(&self);
}

#[async_trait]
impl<C: ActorClass, CL: Clock> ActorBinding for Namespace<C, CL> {
    fn class_name(&self) -> &str {
        Namespace::class_name(self)
    }

    fn id_from_name(&self, name: &str) -> ActorId {
        Namespace::id_from_name(self, name)
    }

    fn new_unique_id(&self) -> ActorId {
        Namespace::new_unique_id(self)
    }

    fn id_from_string(&self, hex: &str) -> ActorId {
        Namespace::id_from_string(self, hex.to_string())
    }

    async fn call(&self, id: &ActorId, method: &str, args: Value) -> ActorResult<Value> {
        self.get(id.clone()).call(method, args).await
    }

    async fn fetch(&self, id: &ActorId, request: Value) -> ActorResult<Value> {
        self.get(id.clone()).fetch(request).await
    }

    async fn alarm(&self, id: &ActorId, retry_count: u32, is_retry: bool) -> ActorResult<()> {
        self.get(id.clone()).alarm(retry_count, is_retry).await
    }

    fn resident_count(&self) -> usize {
        Namespace::resident_count(self)
    }

    fn is_resident(&self, id: &ActorId) -> bool {
        Namespace::is_resident(self, id)
    }

    fn sweep_idle(&self) {
        Namespace::sweep_idle(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait as at;
    use es_actors::ActorContext;
    use es_core::FakeClock;
    use es_store::Store;
    use std::sync::Arc;
    use tempfile::tempdir;

    struct Echo;

    #[at]
    impl ActorClass for Echo {
        async fn call(&self, _ctx: &ActorContext, method: &str, args: Value) -> ActorResult<Value> {
            Ok(serde_json::json!({"method": method, "args": args}))
        }
    }

    #[tokio::test]
    async fn a_namespace_is_usable_behind_the_type_erased_trait() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let namespace = Namespace::new(store, "Echo", FakeClock::new(), || Echo);
        let binding: Arc<dyn ActorBinding> = Arc::new(namespace);

        let id = binding.id_from_name("room-1");
        let result = binding.call(&id, "ping", Value::Null).await.unwrap();
        assert_eq!(result["method"], "ping");
        assert_eq!(binding.resident_count(), 1);
        assert!(binding.is_resident(&id));
        binding.alarm(&id, 0, false).await.unwrap();
    }
}
