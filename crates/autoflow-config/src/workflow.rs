use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::step::StepDef;
use crate::trigger::EventTriggerDef;

/// A workflow definition as written in a definitions file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDef {
  pub name: String,

  #[serde(default)]
  pub category: String,

  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub inputs: Vec<WorkflowInputDef>,

  /// Ordered step list. Kept optional so a missing list is reported as a
  /// validation error instead of a parse failure.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub tasks: Option<Vec<StepDef>>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub output: Option<OutputDef>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub event_trigger: Option<EventTriggerDef>,
}

/// A declared workflow input. Only presence is checked at run time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowInputDef {
  pub name: String,
  #[serde(default)]
  pub required: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
}

/// Keys projected out of the final context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutputDef {
  Key(String),
  Keys(Vec<String>),
}

/// Parse a definitions document: a JSON object mapping workflow key to definition.
pub fn parse_definitions(content: &str) -> Result<BTreeMap<String, WorkflowDef>, serde_json::Error> {
  serde_json::from_str(content)
}

/// Read and parse a definitions file.
pub fn load_definitions(path: &Path) -> Result<BTreeMap<String, WorkflowDef>, ConfigError> {
  let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
    path: path.display().to_string(),
    source,
  })?;

  parse_definitions(&content).map_err(|source| ConfigError::Parse {
    path: path.display().to_string(),
    source,
  })
}
