use std::collections::{BTreeMap, HashSet};

use autoflow_config::{EventTriggerDef, ForEachDef, ItemsDef, StepDef, WorkflowDef};

use crate::error::WorkflowError;
use crate::handler::HandlerTable;
use crate::step::{Action, ForEachStep, IMAGE_EXTENSIONS, ItemSource, Step, TaskStep};
use crate::workflow::Workflow;

const DEFAULT_LOOP_VARIABLE: &str = "item";

/// Resolver transforms a [`WorkflowDef`] into a [`Workflow`].
///
/// This process:
/// 1. Checks the workflow has a name and a step list
/// 2. Decides each step's action by dispatch priority
/// 3. Looks up inline handlers in the handler table
/// 4. Checks the event trigger declaration is consistent
///
/// Task names are not checked here; the task registry is consulted at run time.
pub struct Resolver<'a> {
  handlers: &'a HandlerTable,
}

impl<'a> Resolver<'a> {
  pub fn new(handlers: &'a HandlerTable) -> Self {
    Self { handlers }
  }

  /// Resolve every definition in a definitions document.
  pub fn resolve_all(
    &self,
    defs: BTreeMap<String, WorkflowDef>,
  ) -> Result<Vec<Workflow>, WorkflowError> {
    defs
      .into_iter()
      .map(|(key, def)| self.resolve(key, def))
      .collect()
  }

  /// Resolve a single workflow definition registered under `key`.
  pub fn resolve(&self, key: impl Into<String>, def: WorkflowDef) -> Result<Workflow, WorkflowError> {
    let key = key.into();

    if def.name.trim().is_empty() {
      return Err(WorkflowError::MissingName { key });
    }

    let Some(tasks) = def.tasks else {
      return Err(WorkflowError::MissingTasks { key });
    };

    let steps = self.resolve_steps(tasks, "tasks")?;

    if let Some(trigger) = &def.event_trigger {
      validate_trigger(&key, trigger)?;
    }

    Ok(Workflow {
      key,
      name: def.name,
      category: def.category,
      inputs: def.inputs,
      steps,
      output: def.output,
      event_trigger: def.event_trigger,
    })
  }

  fn resolve_steps(&self, defs: Vec<StepDef>, path: &str) -> Result<Vec<Step>, WorkflowError> {
    defs
      .into_iter()
      .enumerate()
      .map(|(index, def)| self.resolve_step(def, &format!("{}[{}]", path, index)))
      .collect()
  }

  fn resolve_step(&self, def: StepDef, path: &str) -> Result<Step, WorkflowError> {
    let nested_path = format!("{}.tasks", path);

    let action = if let Some(for_each) = def.for_each {
      let Some(tasks) = def.tasks else {
        return Err(WorkflowError::InvalidForEach {
          path: path.to_string(),
          message: "missing nested tasks".to_string(),
        });
      };
      Action::ForEach(ForEachStep {
        source: self.resolve_source(&for_each, path)?,
        as_name: for_each
          .as_name
          .unwrap_or_else(|| DEFAULT_LOOP_VARIABLE.to_string()),
        content_as: for_each.content_as,
        combine: def.combine_results.unwrap_or_default(),
        steps: self.resolve_steps(tasks, &nested_path)?,
      })
    } else if let Some(tasks) = def.tasks {
      Action::Block(self.resolve_steps(tasks, &nested_path)?)
    } else if let Some(name) = def.handler {
      let handler = self
        .handlers
        .get(&name)
        .ok_or_else(|| WorkflowError::UnknownHandler {
          name,
          path: path.to_string(),
        })?;
      Action::Handler(handler)
    } else if let Some(task_name) = def.task_name {
      Action::Task(TaskStep {
        task_name,
        inputs: def.inputs,
        debug: def.debug,
      })
    } else {
      return Err(WorkflowError::EmptyStep {
        path: path.to_string(),
      });
    };

    Ok(Step {
      condition: def.condition,
      output_as: def.output_as,
      action,
    })
  }

  fn resolve_source(&self, def: &ForEachDef, path: &str) -> Result<ItemSource, WorkflowError> {
    match (&def.items, &def.files_in) {
      (Some(_), Some(_)) => Err(WorkflowError::InvalidForEach {
        path: path.to_string(),
        message: "both items and filesIn given".to_string(),
      }),
      (None, None) => Err(WorkflowError::InvalidForEach {
        path: path.to_string(),
        message: "no items or filesIn given".to_string(),
      }),
      (Some(ItemsDef::Handler { handler }), None) => self
        .handlers
        .get(handler)
        .map(ItemSource::Handler)
        .ok_or_else(|| WorkflowError::UnknownHandler {
          name: handler.clone(),
          path: path.to_string(),
        }),
      (Some(ItemsDef::Value(value)), None) => Ok(ItemSource::Value(value.clone())),
      (None, Some(files_in)) => {
        let extensions = match &files_in.extension {
          Some(ext) => vec![normalize_extension(ext)],
          None => IMAGE_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
        };
        Ok(ItemSource::Files {
          folder: files_in.folder.clone(),
          extensions,
        })
      }
    }
  }
}

fn normalize_extension(ext: &str) -> String {
  ext.trim_start_matches('.').to_ascii_lowercase()
}

fn validate_trigger(key: &str, trigger: &EventTriggerDef) -> Result<(), WorkflowError> {
  let invalid = |message: &str| WorkflowError::InvalidTrigger {
    key: key.to_string(),
    message: message.to_string(),
  };

  if trigger.condition.is_some() && trigger.composite_condition.is_some() {
    return Err(invalid("condition and compositeCondition are exclusive"));
  }

  if let Some(composite) = &trigger.composite_condition {
    if composite.conditions.is_empty() {
      return Err(invalid("compositeCondition has no conditions"));
    }
    if composite.match_key.is_empty() {
      return Err(invalid("compositeCondition has no matchKey"));
    }
    let mut seen = HashSet::new();
    for named in &composite.conditions {
      if !seen.insert(named.id.as_str()) {
        return Err(invalid(&format!("duplicate condition id '{}'", named.id)));
      }
    }
  }

  Ok(())
}
