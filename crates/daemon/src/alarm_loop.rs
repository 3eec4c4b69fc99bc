// SPDX-License-Identifier: MIT

//! Wires `es_actors::alarms::AlarmScheduler` to the daemon's current
//! generation: firing a due alarm means looking its actor class up in the
//! generation's bindings and invoking that namespace's stub `alarm` method
//! (spec §4.8.6).

use async_trait::async_trait;
use es_actors::alarms::{AlarmDispatcher, AlarmScheduler};
use es_actors::ActorId;
use es_runtime::GenerationSlot;
use es_store::Store;
use std::sync::Arc;

pub struct GenerationAlarmDispatcher {
    generations: Arc<GenerationSlot>,
}

#[async_trait]
impl AlarmDispatcher for GenerationAlarmDispatcher {
    async fn fire(&self, class: &str, id: &str, retry_count: u32, is_retry: bool) -> Result<(), String> {
        let generation = self.generations.current();
        let namespace = generation.env.actor_namespace_by_class(class).map_err(|err| err.to_string())?;
        let actor_id = ActorId::from_string(id.to_string());
        namespace.alarm(&actor_id, retry_count, is_retry).await.map_err(|err| err.to_string())
    }
}

pub fn build(store: Store, generations: Arc<GenerationSlot>) -> AlarmScheduler<GenerationAlarmDispatcher> {
    AlarmScheduler::new(store, GenerationAlarmDispatcher { generations })
}

#[cfg(test)]
mod tests {
    use super::*;
    use es_actors::{ActorClass, ActorContext, ActorResult, Namespace};
    use es_config::WorkerConfig;
    use es_core::SystemClock;
    use es_runtime::Env;
    use serde_json::Value;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::tempdir;

    struct CountingActor {
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl ActorClass for CountingActor {
        async fn call(&self, _ctx: &ActorContext, _method: &str, _args: Value) -> ActorResult<Value> {
            unreachable!()
        }

        async fn alarm(&self, _ctx: &ActorContext, _retry_count: u32, _is_retry: bool) -> ActorResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn fire_reaches_the_due_instance_through_its_class_namespace() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let calls = Arc::new(AtomicU32::new(0));
        let calls_for_factory = calls.clone();
        let namespace = Namespace::new(store.clone(), "Counter", SystemClock, move || CountingActor { calls: calls_for_factory.clone() });
        let id = namespace.id_from_name("room-1");

        let config = WorkerConfig { name: "demo".to_string(), main: "src/index.js".to_string(), ..Default::default() };
        let mut env = Env::from_config(&store, &config).await.unwrap();
        env.register_actor_namespace("COUNTER", Arc::new(namespace));
        let generations = Arc::new(GenerationSlot::new(es_runtime::Generation::new(env, Arc::new(NoopWorker))));

        let dispatcher = GenerationAlarmDispatcher { generations };
        dispatcher.fire("Counter", id.hex(), 0, false).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    struct NoopWorker;

    #[async_trait]
    impl es_runtime::WorkerModule for NoopWorker {}
}
