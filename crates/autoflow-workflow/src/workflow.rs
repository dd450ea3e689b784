use autoflow_config::{EventTriggerDef, OutputDef, WorkflowInputDef};

use crate::step::Step;

/// A resolved workflow ready for execution.
#[derive(Debug, Clone)]
pub struct Workflow {
  /// Unique key the workflow is registered under.
  pub key: String,
  pub name: String,
  pub category: String,
  pub inputs: Vec<WorkflowInputDef>,
  pub steps: Vec<Step>,
  pub output: Option<OutputDef>,
  pub event_trigger: Option<EventTriggerDef>,
}

impl Workflow {
  /// Names of the declared required inputs.
  pub fn required_inputs(&self) -> impl Iterator<Item = &str> {
    self
      .inputs
      .iter()
      .filter(|input| input.required)
      .map(|input| input.name.as_str())
  }
}
