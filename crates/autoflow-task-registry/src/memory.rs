use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::RegistryError;
use crate::registry::TaskRegistry;
use crate::task::TaskDef;

/// Task registry held in memory.
#[derive(Default)]
pub struct InMemoryTaskRegistry {
  tasks: RwLock<HashMap<String, Arc<TaskDef>>>,
}

impl InMemoryTaskRegistry {
  /// Create a registry pre-populated with `tasks`. Later duplicates replace earlier ones.
  pub fn new(tasks: impl IntoIterator<Item = TaskDef>) -> Self {
    let tasks = tasks
      .into_iter()
      .map(|def| (def.name.clone(), Arc::new(def)))
      .collect();
    Self {
      tasks: RwLock::new(tasks),
    }
  }

  /// Register a task, refusing to replace an existing one.
  pub async fn register(&self, def: TaskDef) -> Result<(), RegistryError> {
    let mut tasks = self.tasks.write().await;
    if tasks.contains_key(&def.name) {
      return Err(RegistryError::AlreadyRegistered { name: def.name });
    }
    tasks.insert(def.name.clone(), Arc::new(def));
    Ok(())
  }
}

#[async_trait]
impl TaskRegistry for InMemoryTaskRegistry {
  async fn get(&self, name: &str) -> Option<Arc<TaskDef>> {
    self.tasks.read().await.get(name).cloned()
  }

  async fn list(&self) -> Vec<String> {
    let mut names: Vec<String> = self.tasks.read().await.keys().cloned().collect();
    names.sort();
    names
  }
}
