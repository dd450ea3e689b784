//! Step definitions.
//!
//! A step is written as one flat JSON object. Which kind of step it is gets
//! decided when the workflow is resolved, in this order:
//!
//! 1. `condition` (with nested `tasks` and no `forEach`) - conditional block
//! 2. `forEach` - loop over items or files
//! 3. `handler` - compiled-in inline handler
//! 4. `taskName` - task from the registry
//!
//! A `condition` on any other kind of step acts as a guard.
//!
//! # Examples
//!
//! ```json
//! { "taskName": "Send Email", "inputs": { "subject": "re: {{E.subject}}" } }
//! { "condition": "{{E.attachments}}", "tasks": [ ... ] }
//! { "forEach": { "items": "{{files}}", "as": "file" }, "tasks": [ ... ], "combineResults": "flatten" }
//! { "handler": "listFiles", "outputAs": "files" }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDef {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub task_name: Option<String>,

  /// Input values; strings may contain `{{path}}` placeholders.
  #[serde(default, skip_serializing_if = "Map::is_empty")]
  pub inputs: Map<String, Value>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub output_as: Option<String>,

  #[serde(default)]
  pub debug: bool,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub condition: Option<Value>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub tasks: Option<Vec<StepDef>>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub for_each: Option<ForEachDef>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub combine_results: Option<CombineStrategy>,

  /// Name of an inline handler in the compiled-in handler table.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub handler: Option<String>,
}

/// Iteration source and bindings of a `forEach` step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForEachDef {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub items: Option<ItemsDef>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub files_in: Option<FilesInDef>,

  /// Loop variable name, `item` when absent.
  #[serde(rename = "as", default, skip_serializing_if = "Option::is_none")]
  pub as_name: Option<String>,

  /// When iterating files, load each file's text into this variable.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub content_as: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemsDef {
  /// Items produced by an inline handler.
  Handler { handler: String },
  /// A literal array or a templated string resolving to one.
  Value(Value),
}

/// Directory scan source for a `forEach` step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilesInDef {
  /// Folder to scan; may be templated.
  pub folder: String,

  /// Only files with this extension. Without it, image files are selected.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub extension: Option<String>,
}

/// How per-item loop outputs are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CombineStrategy {
  #[default]
  Array,
  Merge,
  Flatten,
  MergeContent,
}
