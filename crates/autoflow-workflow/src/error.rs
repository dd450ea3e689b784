use thiserror::Error;

/// Errors found while resolving a workflow definition.
#[derive(Debug, Error)]
pub enum WorkflowError {
  #[error("workflow '{key}' has no name")]
  MissingName { key: String },

  #[error("workflow '{key}' has no tasks array")]
  MissingTasks { key: String },

  #[error("unknown inline handler '{name}' at {path}")]
  UnknownHandler { name: String, path: String },

  #[error("step at {path} has nothing to execute")]
  EmptyStep { path: String },

  #[error("forEach at {path}: {message}")]
  InvalidForEach { path: String, message: String },

  #[error("invalid event trigger on workflow '{key}': {message}")]
  InvalidTrigger { key: String, message: String },
}
