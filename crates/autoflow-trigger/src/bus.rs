//! In-process publish/subscribe bus for background events.
//!
//! Handlers subscribe by event name. [`EventBus::emit`] spawns every current
//! handler for the event on the tokio runtime and returns without waiting for
//! them, so a slow or failing subscriber never blocks the producer or the
//! other subscribers.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::debug;

/// A subscriber. Handlers own their error reporting.
#[async_trait]
pub trait EventHandler: Send + Sync {
  async fn handle(&self, event: &str, payload: Value);
}

/// Identifies one subscription for [`EventBus::off`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "sub-{}", self.0)
  }
}

type Subscribers = HashMap<String, Vec<(SubscriptionId, Arc<dyn EventHandler>)>>;

/// Cheaply cloneable handle to a shared bus.
#[derive(Clone, Default)]
pub struct EventBus {
  inner: Arc<BusInner>,
}

#[derive(Default)]
struct BusInner {
  next_id: AtomicU64,
  subscribers: RwLock<Subscribers>,
}

impl EventBus {
  pub fn new() -> Self {
    Self::default()
  }

  /// Subscribe `handler` to `event`.
  pub async fn on(&self, event: &str, handler: Arc<dyn EventHandler>) -> SubscriptionId {
    let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
    self
      .inner
      .subscribers
      .write()
      .await
      .entry(event.to_string())
      .or_default()
      .push((id, handler));
    debug!(event = %event, subscription = %id, "subscribed");
    id
  }

  /// Remove a subscription. Returns whether it existed.
  pub async fn off(&self, event: &str, id: SubscriptionId) -> bool {
    let mut subscribers = self.inner.subscribers.write().await;
    let Some(handlers) = subscribers.get_mut(event) else {
      return false;
    };

    let before = handlers.len();
    handlers.retain(|(existing, _)| *existing != id);
    let removed = handlers.len() != before;
    if handlers.is_empty() {
      subscribers.remove(event);
    }
    removed
  }

  /// Deliver `payload` to every subscriber of `event` without waiting.
  ///
  /// The returned handles may be awaited by callers that need to know when
  /// delivery finished; dropping them does not cancel delivery.
  pub async fn emit(&self, event: &str, payload: Value) -> Vec<JoinHandle<()>> {
    let handlers: Vec<Arc<dyn EventHandler>> = self
      .inner
      .subscribers
      .read()
      .await
      .get(event)
      .map(|handlers| handlers.iter().map(|(_, h)| Arc::clone(h)).collect())
      .unwrap_or_default();

    debug!(event = %event, subscribers = handlers.len(), "event emitted");

    handlers
      .into_iter()
      .map(|handler| {
        let event = event.to_string();
        let payload = payload.clone();
        tokio::spawn(async move { handler.handle(&event, payload).await })
      })
      .collect()
  }

  pub async fn subscriber_count(&self, event: &str) -> usize {
    self
      .inner
      .subscribers
      .read()
      .await
      .get(event)
      .map_or(0, Vec::len)
  }
}

impl fmt::Debug for EventBus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("EventBus").finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use tokio::sync::Mutex;

  #[derive(Default)]
  struct Recorder {
    seen: Mutex<Vec<(String, Value)>>,
  }

  #[async_trait]
  impl EventHandler for Recorder {
    async fn handle(&self, event: &str, payload: Value) {
      self.seen.lock().await.push((event.to_string(), payload));
    }
  }

  async fn settle(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
      handle.await.unwrap();
    }
  }

  #[tokio::test]
  async fn test_emit_reaches_only_matching_subscribers() {
    let bus = EventBus::new();
    let email = Arc::new(Recorder::default());
    let files = Arc::new(Recorder::default());
    bus.on("newEmail", email.clone()).await;
    bus.on("fileChange", files.clone()).await;

    settle(bus.emit("newEmail", json!({ "taskId": "t1" })).await).await;

    assert_eq!(
      *email.seen.lock().await,
      vec![("newEmail".to_string(), json!({ "taskId": "t1" }))]
    );
    assert!(files.seen.lock().await.is_empty());
  }

  #[tokio::test]
  async fn test_off_removes_single_subscription() {
    let bus = EventBus::new();
    let first = Arc::new(Recorder::default());
    let second = Arc::new(Recorder::default());
    let id = bus.on("fileChange", first.clone()).await;
    bus.on("fileChange", second.clone()).await;

    assert!(bus.off("fileChange", id).await);
    assert!(!bus.off("fileChange", id).await);
    assert_eq!(bus.subscriber_count("fileChange").await, 1);

    settle(bus.emit("fileChange", json!({})).await).await;
    assert!(first.seen.lock().await.is_empty());
    assert_eq!(second.seen.lock().await.len(), 1);
  }

  #[tokio::test]
  async fn test_emit_without_subscribers() {
    let bus = EventBus::new();
    assert!(bus.emit("nobody", Value::Null).await.is_empty());
  }
}
