use autoflow_config::CombineStrategy;
use serde_json::{Map, Value};

use crate::handler::NamedHandler;

/// Extensions selected by a `filesIn` scan when no extension is given.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp", "tiff"];

/// A resolved step.
#[derive(Debug, Clone)]
pub struct Step {
  /// Guard evaluated before the action. A false guard skips the step.
  pub condition: Option<Value>,
  /// Wrap the step's output as `{ <output_as>: output }`.
  pub output_as: Option<String>,
  pub action: Action,
}

#[derive(Debug, Clone)]
pub enum Action {
  Task(TaskStep),
  /// Nested steps run as an independent sub-sequence.
  Block(Vec<Step>),
  ForEach(ForEachStep),
  Handler(NamedHandler),
}

#[derive(Debug, Clone)]
pub struct TaskStep {
  pub task_name: String,
  pub inputs: Map<String, Value>,
  pub debug: bool,
}

#[derive(Debug, Clone)]
pub struct ForEachStep {
  pub source: ItemSource,
  /// Loop variable name.
  pub as_name: String,
  pub content_as: Option<String>,
  pub combine: CombineStrategy,
  pub steps: Vec<Step>,
}

#[derive(Debug, Clone)]
pub enum ItemSource {
  /// Literal array, or a template resolving to one.
  Value(Value),
  Handler(NamedHandler),
  Files {
    folder: String,
    /// Lower-case, without the leading dot.
    extensions: Vec<String>,
  },
}
