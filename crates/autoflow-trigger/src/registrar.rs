use std::sync::Arc;

use autoflow_config::HostConfig;
use autoflow_runtime::Runtime;
use autoflow_store::PendingTriggerStore;
use tracing::{info, warn};

use crate::matcher::TriggerHandler;
use crate::process::ProcessRuntime;
use crate::producer::ProducerSpec;

/// Decides which workflows get their event trigger registered.
pub trait TriggerGate: Send + Sync {
  fn enabled(&self, workflow_key: &str) -> bool;
}

impl TriggerGate for HostConfig {
  fn enabled(&self, workflow_key: &str) -> bool {
    self.trigger_enabled(workflow_key)
  }
}

impl<F> TriggerGate for F
where
  F: Fn(&str) -> bool + Send + Sync,
{
  fn enabled(&self, workflow_key: &str) -> bool {
    self(workflow_key)
  }
}

/// Wires every enabled workflow trigger to the event bus.
pub struct TriggerRegistrar {
  runtime: Arc<Runtime>,
  process: Arc<ProcessRuntime>,
  store: Arc<dyn PendingTriggerStore>,
}

impl TriggerRegistrar {
  pub fn new(runtime: Arc<Runtime>, process: Arc<ProcessRuntime>, store: Arc<dyn PendingTriggerStore>) -> Self {
    Self {
      runtime,
      process,
      store,
    }
  }

  /// Register the trigger of every enabled workflow in the catalog.
  ///
  /// Meant to run once per process; a second call subscribes again.
  /// A workflow whose producer cannot start is logged and skipped.
  /// Returns how many triggers were registered.
  pub async fn register_all(&self, gate: &dyn TriggerGate) -> usize {
    let mut registered = 0;

    for workflow in self.runtime.catalog().triggered() {
      let Some(trigger) = &workflow.event_trigger else {
        continue;
      };

      if !gate.enabled(&workflow.key) {
        info!(workflow = %workflow.key, "event trigger disabled");
        continue;
      }

      let spec = ProducerSpec::new(&workflow.key, trigger.event.clone());
      if let Err(e) = self.process.ensure_producer(&spec).await {
        warn!(workflow = %workflow.key, producer = %spec.identity, error = %e, "event trigger not registered");
        continue;
      }

      let event = trigger.event.event_name();
      let handler = TriggerHandler::new(Arc::clone(workflow), Arc::clone(&self.runtime), Arc::clone(&self.store));
      self.process.subscribe(event, Arc::new(handler)).await;

      info!(
        workflow = %workflow.key,
        event = %event,
        producer = %spec.identity,
        composite = trigger.composite_condition.is_some(),
        "event trigger registered"
      );
      registered += 1;
    }

    registered
  }
}
