//! Matching events against a workflow's trigger and invoking the workflow.
//!
//! A [`TriggerHandler`] is subscribed once per triggered workflow. With a
//! single `condition` the workflow runs whenever an event satisfies it. With
//! a `compositeCondition` the handler correlates events by a key extracted
//! from each one, keeping partial progress in the pending trigger store:
//!
//! ```text
//! no record --match--> pending (first condition stored)
//! pending --match, threshold met--> fired, record deleted
//! pending --match, threshold not met--> pending (condition added)
//! ```
//!
//! Reads and writes of a pending record are separate store calls. Two events
//! for the same key arriving together can both read the old record, so the
//! later write wins and one condition may be lost.

use std::sync::Arc;

use async_trait::async_trait;
use autoflow_config::{CompositeConditionDef, CompositeKind, EventTriggerDef, KeyExtractionDef, NamedCondition};
use autoflow_runtime::template::stringify;
use autoflow_runtime::{Context, RunResult, Runtime, RuntimeError};
use autoflow_store::{PendingKey, PendingTrigger, PendingTriggerStore};
use autoflow_workflow::Workflow;
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::bus::EventHandler;
use crate::error::TriggerError;
use crate::extract::{extract, map_inputs};
use crate::predicate::{compile, evaluate};

/// Input key under which the triggering event (or combined events) is passed.
pub const EVENT_DATA_KEY: &str = "eventData";

/// Event field a per-workflow producer stamps on its events.
pub const WORKFLOW_ID_FIELD: &str = "workflowId";

/// What an event did to a trigger.
#[derive(Debug)]
pub enum MatchOutcome {
  /// Not for this workflow, condition false, or no correlation key.
  Ignored,
  /// A composite trigger recorded progress but is not yet complete.
  Pending {
    match_key_value: String,
    triggered: Vec<String>,
  },
  /// The workflow was invoked. Run failures are carried here, not raised.
  Fired(Result<RunResult, RuntimeError>),
}

impl MatchOutcome {
  pub fn fired(&self) -> bool {
    matches!(self, Self::Fired(_))
  }
}

/// Event subscriber for one triggered workflow.
pub struct TriggerHandler {
  workflow: Arc<Workflow>,
  runtime: Arc<Runtime>,
  store: Arc<dyn PendingTriggerStore>,
}

impl TriggerHandler {
  pub fn new(workflow: Arc<Workflow>, runtime: Arc<Runtime>, store: Arc<dyn PendingTriggerStore>) -> Self {
    Self {
      workflow,
      runtime,
      store,
    }
  }

  pub fn workflow_key(&self) -> &str {
    &self.workflow.key
  }

  /// Evaluate one event and run the workflow when the trigger is satisfied.
  pub async fn process(&self, payload: &Value) -> Result<MatchOutcome, TriggerError> {
    let Some(trigger) = &self.workflow.event_trigger else {
      return Ok(MatchOutcome::Ignored);
    };

    if let Some(target) = payload.get(WORKFLOW_ID_FIELD).and_then(Value::as_str)
      && target != self.workflow.key
    {
      return Ok(MatchOutcome::Ignored);
    }

    match &trigger.composite_condition {
      Some(composite) => self.process_composite(trigger, composite, payload).await,
      None => self.process_simple(trigger, payload).await,
    }
  }

  async fn process_simple(&self, trigger: &EventTriggerDef, payload: &Value) -> Result<MatchOutcome, TriggerError> {
    if let Some(condition) = &trigger.condition
      && !evaluate(condition, payload)?
    {
      debug!(workflow = %self.workflow.key, "trigger condition not met");
      return Ok(MatchOutcome::Ignored);
    }

    Ok(self.fire(trigger, payload).await)
  }

  async fn process_composite(
    &self,
    trigger: &EventTriggerDef,
    composite: &CompositeConditionDef,
    payload: &Value,
  ) -> Result<MatchOutcome, TriggerError> {
    let Some(matched) = first_match(&composite.conditions, payload)? else {
      return Ok(MatchOutcome::Ignored);
    };

    let Some(match_key_value) = correlation_value(&matched.extract, payload)? else {
      info!(
        workflow = %self.workflow.key,
        condition = %matched.id,
        "no correlation key in matching event"
      );
      return Ok(MatchOutcome::Ignored);
    };

    let key = PendingKey::new(&self.workflow.key, &composite.match_key, &match_key_value);
    let Some(record) = self.store.find_one(&key).await? else {
      let mut event_data = Map::new();
      event_data.insert(matched.id.clone(), payload.clone());
      return self.record_pending(&key, vec![matched.id.clone()], event_data, composite).await;
    };

    let mut triggered = record.triggered_conditions.0;
    let mut event_data = record.event_data.0;
    if !triggered.contains(&matched.id) {
      triggered.push(matched.id.clone());
    }
    event_data.insert(matched.id.clone(), payload.clone());

    let complete = match composite.kind {
      CompositeKind::Any => true,
      CompositeKind::All => composite
        .conditions
        .iter()
        .all(|condition| triggered.contains(&condition.id)),
    };

    if !complete {
      return self.record_pending(&key, triggered, event_data, composite).await;
    }

    self.store.delete_one(&key).await?;
    info!(
      workflow = %self.workflow.key,
      match_key_value = %match_key_value,
      "composite trigger complete"
    );

    Ok(self.fire(trigger, &Value::Object(event_data)).await)
  }

  async fn record_pending(
    &self,
    key: &PendingKey,
    triggered: Vec<String>,
    event_data: Map<String, Value>,
    composite: &CompositeConditionDef,
  ) -> Result<MatchOutcome, TriggerError> {
    self
      .store
      .upsert(&PendingTrigger::new(key, triggered.clone(), event_data))
      .await?;
    info!(
      workflow = %self.workflow.key,
      match_key_value = %key.match_key_value,
      triggered = triggered.len(),
      required = composite.conditions.len(),
      "composite trigger pending"
    );
    Ok(MatchOutcome::Pending {
      match_key_value: key.match_key_value.clone(),
      triggered,
    })
  }

  async fn fire(&self, trigger: &EventTriggerDef, event: &Value) -> MatchOutcome {
    let mut inputs: Context = map_inputs(&trigger.input_mapping, event);
    inputs.insert(EVENT_DATA_KEY.to_string(), event.clone());

    let result = self.runtime.run_workflow(&self.workflow, inputs).await;
    if let Err(e) = &result {
      error!(workflow = %self.workflow.key, error = %e, "triggered workflow failed");
    }
    MatchOutcome::Fired(result)
  }
}

#[async_trait]
impl EventHandler for TriggerHandler {
  async fn handle(&self, event: &str, payload: Value) {
    match self.process(&payload).await {
      Ok(MatchOutcome::Ignored) => {
        debug!(workflow = %self.workflow.key, event = %event, "event ignored");
      }
      Ok(_) => {}
      Err(e) => {
        warn!(workflow = %self.workflow.key, event = %event, error = %e, "trigger evaluation failed");
      }
    }
  }
}

/// First sub-condition, in declaration order, whose predicate holds.
fn first_match<'a>(conditions: &'a [NamedCondition], payload: &Value) -> Result<Option<&'a NamedCondition>, TriggerError> {
  for condition in conditions {
    if evaluate(&condition.condition, payload)? {
      return Ok(Some(condition));
    }
  }
  Ok(None)
}

/// The correlation key of an event, or `None` when it has none.
pub fn correlation_value(rule: &KeyExtractionDef, payload: &Value) -> Result<Option<String>, TriggerError> {
  let Some(value) = extract(payload, &rule.source).filter(|v| !v.is_null()) else {
    return Ok(None);
  };
  let text = stringify(value);

  let key = match &rule.pattern {
    Some(pattern) => compile(pattern, false)?
      .captures(&text)
      .and_then(|caps| caps.get(1))
      .map(|m| m.as_str().to_string()),
    None => Some(text),
  };

  Ok(key.filter(|k| !k.is_empty()))
}
