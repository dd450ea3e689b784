use std::sync::Arc;

use async_trait::async_trait;

use crate::task::TaskDef;

/// Lookup of tasks by name.
///
/// The interpreter only ever needs `get`; new tasks are added by registering
/// them, never by changing the interpreter.
#[async_trait]
pub trait TaskRegistry: Send + Sync {
  /// Get a task by name.
  async fn get(&self, name: &str) -> Option<Arc<TaskDef>>;

  /// Names of all registered tasks.
  async fn list(&self) -> Vec<String>;
}
