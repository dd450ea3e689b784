//! Process-wide trigger state.
//!
//! One [`ProcessRuntime`] is built at startup and shared by the registrar
//! and anything that feeds events in. It owns the bus, the running producers
//! and the subscriptions made on behalf of workflows, so shutdown can undo
//! all of them.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span, warn};

use crate::bus::{EventBus, EventHandler, SubscriptionId};
use crate::error::TriggerError;
use crate::producer::{ProducerFactory, ProducerSpec};

pub struct ProcessRuntime {
  bus: EventBus,
  factory: Arc<dyn ProducerFactory>,
  /// Identity to the producer task. `None` marks an externally fed source.
  producers: Mutex<HashMap<String, Option<JoinHandle<()>>>>,
  subscriptions: Mutex<Vec<(String, SubscriptionId)>>,
  cancel: CancellationToken,
}

impl ProcessRuntime {
  pub fn new(bus: EventBus, factory: Arc<dyn ProducerFactory>) -> Self {
    Self {
      bus,
      factory,
      producers: Mutex::new(HashMap::new()),
      subscriptions: Mutex::new(Vec::new()),
      cancel: CancellationToken::new(),
    }
  }

  pub fn bus(&self) -> &EventBus {
    &self.bus
  }

  /// Start the producer for `spec` unless one with the same identity is active.
  ///
  /// Returns `true` when this call started it.
  pub async fn ensure_producer(&self, spec: &ProducerSpec) -> Result<bool, TriggerError> {
    let mut producers = self.producers.lock().await;
    if producers.contains_key(&spec.identity) {
      return Ok(false);
    }

    let task = self.factory.create(spec)?.map(|producer| {
      let bus = self.bus.clone();
      let cancel = self.cancel.child_token();
      let identity = spec.identity.clone();
      tokio::spawn(
        async move {
          if let Err(e) = producer.run(bus, cancel).await {
            error!(identity = %identity, error = %e, "producer stopped with error");
          }
        }
        .instrument(info_span!("producer", identity = %spec.identity)),
      )
    });

    info!(identity = %spec.identity, bundled = task.is_some(), "producer started");
    producers.insert(spec.identity.clone(), task);
    Ok(true)
  }

  pub async fn has_producer(&self, identity: &str) -> bool {
    self.producers.lock().await.contains_key(identity)
  }

  pub async fn producer_count(&self) -> usize {
    self.producers.lock().await.len()
  }

  /// Subscribe `handler` and remember it for [`shutdown`](Self::shutdown).
  pub async fn subscribe(&self, event: &str, handler: Arc<dyn EventHandler>) -> SubscriptionId {
    let id = self.bus.on(event, handler).await;
    self.subscriptions.lock().await.push((event.to_string(), id));
    id
  }

  pub async fn subscription_count(&self) -> usize {
    self.subscriptions.lock().await.len()
  }

  /// Unsubscribe every tracked handler and stop every producer.
  ///
  /// Workflow runs already in flight are left to finish.
  pub async fn shutdown(&self) {
    let subscriptions: Vec<_> = self.subscriptions.lock().await.drain(..).collect();
    for (event, id) in &subscriptions {
      self.bus.off(event, *id).await;
    }

    self.cancel.cancel();
    let producers: Vec<_> = self.producers.lock().await.drain().collect();
    for (identity, task) in producers {
      if let Some(task) = task
        && let Err(e) = task.await
      {
        warn!(identity = %identity, error = %e, "producer task did not exit cleanly");
      }
    }

    info!(subscriptions = subscriptions.len(), "trigger runtime stopped");
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};

  use async_trait::async_trait;
  use autoflow_config::EventSource;
  use serde_json::{Value, json};

  use super::*;
  use crate::producer::EventProducer;

  /// Emits one event, then waits for cancellation.
  struct OneShot;

  #[async_trait]
  impl EventProducer for OneShot {
    async fn run(&self, bus: EventBus, cancel: CancellationToken) -> Result<(), TriggerError> {
      bus.emit("tick", json!({ "n": 1 })).await;
      cancel.cancelled().await;
      Ok(())
    }
  }

  #[derive(Default)]
  struct CountingFactory {
    created: AtomicUsize,
  }

  impl ProducerFactory for CountingFactory {
    fn create(&self, _spec: &ProducerSpec) -> Result<Option<Arc<dyn EventProducer>>, TriggerError> {
      self.created.fetch_add(1, Ordering::SeqCst);
      Ok(Some(Arc::new(OneShot)))
    }
  }

  struct Noop;

  #[async_trait]
  impl EventHandler for Noop {
    async fn handle(&self, _event: &str, _payload: Value) {}
  }

  fn spec(workflow: &str) -> ProducerSpec {
    let source: EventSource =
      serde_json::from_value(json!({ "type": "watchEmail", "emailAccount": "GMAIL_1" })).unwrap();
    ProducerSpec::new(workflow, source)
  }

  #[tokio::test]
  async fn test_ensure_producer_is_idempotent() {
    let factory = Arc::new(CountingFactory::default());
    let process = ProcessRuntime::new(EventBus::new(), factory.clone());

    assert!(process.ensure_producer(&spec("a")).await.unwrap());
    assert!(!process.ensure_producer(&spec("b")).await.unwrap());

    assert_eq!(factory.created.load(Ordering::SeqCst), 1);
    assert_eq!(process.producer_count().await, 1);
    assert!(process.has_producer("watchEmail:GMAIL_1").await);

    process.shutdown().await;
  }

  #[tokio::test]
  async fn test_shutdown_unsubscribes_and_stops_producers() {
    let process = ProcessRuntime::new(EventBus::new(), Arc::new(CountingFactory::default()));
    process.ensure_producer(&spec("a")).await.unwrap();
    process.subscribe("newEmail", Arc::new(Noop)).await;
    process.subscribe("fileChange", Arc::new(Noop)).await;
    assert_eq!(process.subscription_count().await, 2);

    process.shutdown().await;

    assert_eq!(process.subscription_count().await, 0);
    assert_eq!(process.producer_count().await, 0);
    assert_eq!(process.bus().subscriber_count("newEmail").await, 0);
    assert!(process.bus().emit("newEmail", json!({})).await.is_empty());
  }
}
