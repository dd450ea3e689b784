use std::collections::BTreeMap;
use std::sync::Arc;

use autoflow_config::WorkflowDef;
use autoflow_workflow::{HandlerTable, Resolver, Workflow, WorkflowError};

/// All workflows known to the process, by key. Built once at startup.
#[derive(Debug, Clone, Default)]
pub struct WorkflowCatalog {
  workflows: BTreeMap<String, Arc<Workflow>>,
}

impl WorkflowCatalog {
  pub fn new(workflows: impl IntoIterator<Item = Workflow>) -> Self {
    Self {
      workflows: workflows
        .into_iter()
        .map(|workflow| (workflow.key.clone(), Arc::new(workflow)))
        .collect(),
    }
  }

  /// Resolve a definitions document into a catalog.
  pub fn from_definitions(
    defs: BTreeMap<String, WorkflowDef>,
    handlers: &HandlerTable,
  ) -> Result<Self, WorkflowError> {
    Ok(Self::new(Resolver::new(handlers).resolve_all(defs)?))
  }

  pub fn get(&self, key: &str) -> Option<Arc<Workflow>> {
    self.workflows.get(key).cloned()
  }

  pub fn iter(&self) -> impl Iterator<Item = &Arc<Workflow>> {
    self.workflows.values()
  }

  /// Workflows that declare an event trigger.
  pub fn triggered(&self) -> impl Iterator<Item = &Arc<Workflow>> {
    self.iter().filter(|workflow| workflow.event_trigger.is_some())
  }

  pub fn len(&self) -> usize {
    self.workflows.len()
  }

  pub fn is_empty(&self) -> bool {
    self.workflows.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_from_definitions() {
    let defs: BTreeMap<String, WorkflowDef> = serde_json::from_value(json!({
      "plain": { "name": "Plain", "tasks": [] },
      "watched": {
        "name": "Watched",
        "tasks": [],
        "eventTrigger": { "event": { "type": "watchFiles", "folder": "/in" }, "condition": true }
      }
    }))
    .unwrap();

    let catalog = WorkflowCatalog::from_definitions(defs, &HandlerTable::new()).unwrap();

    assert_eq!(catalog.len(), 2);
    assert_eq!(catalog.get("plain").map(|w| w.name.clone()), Some("Plain".to_string()));
    assert!(catalog.get("nope").is_none());
    let triggered: Vec<&str> = catalog.triggered().map(|w| w.key.as_str()).collect();
    assert_eq!(triggered, vec!["watched"]);
  }
}
