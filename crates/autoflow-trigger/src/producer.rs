//! Background event producers.
//!
//! A producer watches some external source and emits events on the bus until
//! cancelled. Producers are identified so that workflows sharing a source
//! share one producer: every workflow watching the same mailbox uses the same
//! `watchEmail:<account>` producer, while file watchers are per workflow and
//! stamp their events with the workflow key.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use autoflow_config::{DEFAULT_POLL_INTERVAL_MS, EventSource};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::bus::EventBus;
use crate::error::TriggerError;
use crate::file_watcher::FileWatcher;

/// What a workflow's trigger needs running.
#[derive(Debug, Clone, PartialEq)]
pub struct ProducerSpec {
  pub identity: String,
  pub workflow_key: String,
  pub source: EventSource,
}

impl ProducerSpec {
  pub fn new(workflow_key: impl Into<String>, source: EventSource) -> Self {
    let workflow_key = workflow_key.into();
    Self {
      identity: producer_identity(&source, &workflow_key),
      workflow_key,
      source,
    }
  }
}

/// Identity under which a producer for `source` is shared.
pub fn producer_identity(source: &EventSource, workflow_key: &str) -> String {
  match source.kind.as_str() {
    EventSource::WATCH_EMAIL => format!(
      "{}:{}",
      source.kind,
      source.param("emailAccount").unwrap_or_default()
    ),
    EventSource::WATCH_FILES => format!(
      "{}:{}:{}",
      source.kind,
      workflow_key,
      source.param("folder").unwrap_or_default()
    ),
    other => format!("{}:{}", other, workflow_key),
  }
}

/// A long-running source of events.
#[async_trait]
pub trait EventProducer: Send + Sync {
  /// Emit events on `bus` until `cancel` fires.
  async fn run(&self, bus: EventBus, cancel: CancellationToken) -> Result<(), TriggerError>;
}

/// Builds producers for event sources.
pub trait ProducerFactory: Send + Sync {
  /// `Ok(None)` means the source is fed from outside the process runtime.
  fn create(&self, spec: &ProducerSpec) -> Result<Option<Arc<dyn EventProducer>>, TriggerError>;
}

/// Provides a polling [`FileWatcher`] for `watchFiles`. Every other source,
/// mail included, is expected to be emitted onto the bus by the host.
#[derive(Debug, Clone)]
pub struct DefaultProducerFactory {
  poll_interval: Duration,
}

impl DefaultProducerFactory {
  pub fn new(poll_interval: Duration) -> Self {
    Self { poll_interval }
  }
}

impl Default for DefaultProducerFactory {
  fn default() -> Self {
    Self::new(Duration::from_millis(DEFAULT_POLL_INTERVAL_MS))
  }
}

impl ProducerFactory for DefaultProducerFactory {
  fn create(&self, spec: &ProducerSpec) -> Result<Option<Arc<dyn EventProducer>>, TriggerError> {
    match spec.source.kind.as_str() {
      EventSource::WATCH_FILES => {
        let folder = spec
          .source
          .param("folder")
          .ok_or_else(|| TriggerError::producer(&spec.identity, "watchFiles requires a 'folder'"))?;
        Ok(Some(Arc::new(FileWatcher::new(
          &spec.workflow_key,
          folder,
          self.poll_interval,
        ))))
      }
      _ => {
        debug!(identity = %spec.identity, "no bundled producer, expecting external events");
        Ok(None)
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn source(value: serde_json::Value) -> EventSource {
    serde_json::from_value(value).unwrap()
  }

  #[test]
  fn test_identities() {
    let email = source(json!({ "type": "watchEmail", "emailAccount": "GMAIL_1" }));
    let files = source(json!({ "type": "watchFiles", "folder": "/in" }));
    let custom = source(json!({ "type": "calendarReminder" }));

    assert_eq!(producer_identity(&email, "a"), "watchEmail:GMAIL_1");
    assert_eq!(producer_identity(&email, "b"), "watchEmail:GMAIL_1");
    assert_eq!(producer_identity(&files, "a"), "watchFiles:a:/in");
    assert_eq!(producer_identity(&custom, "a"), "calendarReminder:a");
  }

  #[test]
  fn test_default_factory() {
    let factory = DefaultProducerFactory::default();

    let files = ProducerSpec::new("a", source(json!({ "type": "watchFiles", "folder": "/in" })));
    assert!(factory.create(&files).unwrap().is_some());

    let email = ProducerSpec::new("a", source(json!({ "type": "watchEmail", "emailAccount": "X" })));
    assert!(factory.create(&email).unwrap().is_none());

    let no_folder = ProducerSpec::new("a", source(json!({ "type": "watchFiles" })));
    assert!(matches!(
      factory.create(&no_folder),
      Err(TriggerError::Producer { .. })
    ));
  }
}
