// SPDX-License-Identifier: MIT

//! A stub (spec §4.8.2, §4.8.8): a handle bound to one `ActorId` that
//! re-materializes its instance lazily on each call, so eviction never
//! invalidates a previously obtained stub.

use crate::error::ActorResult;
use crate::id::ActorId;
use crate::instance::ActorClass;
use crate::namespace::Namespace;
use es_core::Clock;
use serde_json::Value;

pub struct Stub<C: ActorClass, CL: Clock> {
    namespace: Namespace<C, CL>,
    id: ActorId,
}

impl<C: ActorClass, CL: Clock> Stub<C, CL> {
    pub(crate) fn new(namespace: Namespace<C, CL>, id: ActorId) -> Self {
        Self { namespace, id }
    }

    pub fn id(&self) -> &ActorId {
        &self.id
    }

    pub async fn call(&self, method: &str, args: Value) -> ActorResult<Value> {
        let instance = self.namespace.get_or_create_instance(&self.id);
        instance.call(method, args).await
    }

    pub async fn fetch(&self, request: Value) -> ActorResult<Value> {
        let instance = self.namespace.get_or_create_instance(&self.id);
        instance.fetch(request).await
    }

    pub async fn alarm(&self, retry_count: u32, is_retry: bool) -> ActorResult<()> {
        let instance = self.namespace.get_or_create_instance(&self.id);
        instance.alarm(retry_count, is_retry).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::ActorContext;
    use async_trait::async_trait;
    use es_core::FakeClock;
    use es_store::Store;
    use tempfile::tempdir;

    struct Echo;

    #[async_trait]
    impl ActorClass for Echo {
        async fn call(&self, _ctx: &ActorContext, method: &str, args: Value) -> ActorResult<Value> {
            Ok(serde_json::json!({"method": method, "args": args}))
        }
    }

    #[tokio::test]
    async fn stub_survives_eviction_and_rematerializes() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let namespace = Namespace::new(store, "Echo", FakeClock::new(), || Echo).with_idle_timeout_ms(0);
        let stub = namespace.get_by_name("room-1");

        stub.call("ping", Value::Null).await.unwrap();
        assert_eq!(namespace.resident_count(), 1);

        namespace.sweep_idle();
        assert_eq!(namespace.resident_count(), 0);

        let result = stub.call("ping", Value::Null).await.unwrap();
        assert_eq!(result["method"], "ping");
    }

    #[tokio::test]
    async fn get_by_name_derives_a_stable_id() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let namespace = Namespace::new(store, "Echo", FakeClock::new(), || Echo);
        let a = namespace.get_by_name("room-1");
        let b = namespace.get_by_name("room-1");
        assert!(a.id().equals(b.id()));
    }
}
