//! Runtime error types.

use autoflow_task_registry::TaskError;

/// Errors that can occur while running a workflow.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
  /// Malformed workflow or run request.
  #[error("validation failed: {message}")]
  Validation { message: String },

  /// A required task input resolved to nothing.
  #[error("validation failed: task '{task}' is missing required input '{input}'")]
  MissingInput { task: String, input: String },

  #[error("task not found: {name}")]
  TaskNotFound { name: String },

  #[error("workflow not found: {key}")]
  WorkflowNotFound { key: String },

  /// A task or inline handler failed. Displays the handler's own message.
  #[error(transparent)]
  TaskExecution(#[from] TaskError),

  /// Failed to read a folder or file for a `forEach` source.
  #[error("failed to read {path}: {source}")]
  Io {
    path: String,
    #[source]
    source: std::io::Error,
  },
}

impl RuntimeError {
  pub(crate) fn validation(message: impl Into<String>) -> Self {
    Self::Validation {
      message: message.into(),
    }
  }

  /// Whether this error reports a malformed definition or input.
  pub fn is_validation(&self) -> bool {
    matches!(self, Self::Validation { .. } | Self::MissingInput { .. })
  }
}
