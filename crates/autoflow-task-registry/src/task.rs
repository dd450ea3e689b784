use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::TaskError;

/// Executes a task against its resolved inputs.
#[async_trait]
pub trait TaskHandler: Send + Sync {
  async fn run(&self, inputs: Map<String, Value>) -> Result<Value, TaskError>;
}

/// Adapts an async closure into a [`TaskHandler`].
pub struct FnTask<F>(F);

#[async_trait]
impl<F, Fut> TaskHandler for FnTask<F>
where
  F: Fn(Map<String, Value>) -> Fut + Send + Sync,
  Fut: Future<Output = Result<Value, TaskError>> + Send,
{
  async fn run(&self, inputs: Map<String, Value>) -> Result<Value, TaskError> {
    (self.0)(inputs).await
  }
}

/// Wrap an async closure as a shareable task handler.
pub fn task_fn<F, Fut>(f: F) -> Arc<dyn TaskHandler>
where
  F: Fn(Map<String, Value>) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<Value, TaskError>> + Send + 'static,
{
  Arc::new(FnTask(f))
}

/// A declared task input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSpec {
  pub name: String,
  #[serde(default)]
  pub required: bool,
}

impl InputSpec {
  pub fn required(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      required: true,
    }
  }

  pub fn optional(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      required: false,
    }
  }
}

/// A registered task: its declared schema and the handler that runs it.
#[derive(Clone)]
pub struct TaskDef {
  pub name: String,
  pub description: String,
  pub inputs: Vec<InputSpec>,
  /// Names of the top-level keys the handler returns.
  pub outputs: Vec<String>,
  pub handler: Arc<dyn TaskHandler>,
}

impl TaskDef {
  pub fn new(name: impl Into<String>, handler: Arc<dyn TaskHandler>) -> Self {
    Self {
      name: name.into(),
      description: String::new(),
      inputs: Vec::new(),
      outputs: Vec::new(),
      handler,
    }
  }

  pub fn description(mut self, description: impl Into<String>) -> Self {
    self.description = description.into();
    self
  }

  pub fn input(mut self, spec: InputSpec) -> Self {
    self.inputs.push(spec);
    self
  }

  pub fn output(mut self, name: impl Into<String>) -> Self {
    self.outputs.push(name.into());
    self
  }
}

impl fmt::Debug for TaskDef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TaskDef")
      .field("name", &self.name)
      .field("inputs", &self.inputs)
      .field("outputs", &self.outputs)
      .finish_non_exhaustive()
  }
}
