//! Workflow interpreter.
//!
//! The [`Runtime`] owns the task registry and the workflow catalog, and
//! provides [`Runtime::run_workflow`] to execute a resolved workflow and
//! [`Runtime::execute_workflow`] to run one by key.
//!
//! Steps run strictly in declaration order. Each step's output is
//! shallow-merged into the context before the next step starts. Nested
//! blocks and loop bodies run against their own copy of the context and only
//! hand back their final output.

use std::path::Path;
use std::sync::Arc;

use autoflow_config::{CombineStrategy, OutputDef};
use autoflow_task_registry::TaskRegistry;
use autoflow_workflow::{Action, ForEachStep, ItemSource, Step, TaskStep, Workflow};
use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::{Map, Value, json};
use tracing::{debug, error, info, instrument};

use crate::Context;
use crate::catalog::WorkflowCatalog;
use crate::combine::combine_results;
use crate::condition::evaluate_condition;
use crate::error::RuntimeError;
use crate::files::scan_folder;
use crate::result::RunResult;
use crate::template::resolve_value;

/// One iteration of a `forEach` loop.
struct LoopItem {
  value: Value,
  content: Option<String>,
}

/// The workflow interpreter.
pub struct Runtime {
  registry: Arc<dyn TaskRegistry>,
  catalog: WorkflowCatalog,
}

impl Runtime {
  pub fn new(registry: Arc<dyn TaskRegistry>, catalog: WorkflowCatalog) -> Self {
    Self { registry, catalog }
  }

  pub fn catalog(&self) -> &WorkflowCatalog {
    &self.catalog
  }

  /// Run the workflow registered under `key`.
  pub async fn execute_workflow(&self, key: &str, inputs: Context) -> Result<RunResult, RuntimeError> {
    let workflow = self
      .catalog
      .get(key)
      .ok_or_else(|| RuntimeError::WorkflowNotFound {
        key: key.to_string(),
      })?;

    self.run_workflow(&workflow, inputs).await
  }

  /// Run a workflow against `inputs`.
  ///
  /// Any task or handler failure aborts the run and is returned unchanged.
  #[instrument(
    name = "workflow_run",
    skip(self, workflow, inputs),
    fields(workflow = %workflow.key)
  )]
  pub async fn run_workflow(&self, workflow: &Workflow, inputs: Context) -> Result<RunResult, RuntimeError> {
    let execution_id = uuid::Uuid::new_v4().to_string();

    info!(
      execution_id = %execution_id,
      workflow = %workflow.key,
      "workflow_started"
    );

    let result = self.run_steps(workflow, inputs, &execution_id).await;

    match &result {
      Ok(_) => {
        info!(execution_id = %execution_id, "workflow_completed");
      }
      Err(e) => {
        error!(execution_id = %execution_id, error = %e, "workflow_failed");
      }
    }

    result
  }

  async fn run_steps(
    &self,
    workflow: &Workflow,
    inputs: Context,
    execution_id: &str,
  ) -> Result<RunResult, RuntimeError> {
    validate_workflow(workflow, &inputs)?;

    let mut context = inputs;
    let mut last = None;

    for step in &workflow.steps {
      if let Some(output) = self.execute_step(step, &context).await? {
        merge_output(&mut context, &output);
        last = Some(output);
      }
    }

    let output = match &workflow.output {
      Some(OutputDef::Key(key)) => context.get(key).cloned().unwrap_or(Value::Null),
      Some(OutputDef::Keys(keys)) => Value::Object(
        keys
          .iter()
          .filter_map(|key| context.get(key).map(|value| (key.clone(), value.clone())))
          .collect(),
      ),
      None => last.unwrap_or(Value::Null),
    };

    Ok(RunResult {
      execution_id: execution_id.to_string(),
      workflow_key: workflow.key.clone(),
      output,
      context,
    })
  }

  /// Run `steps` as a sub-sequence over its own context, returning the last output.
  fn execute_steps<'a>(
    &'a self,
    steps: &'a [Step],
    mut context: Context,
  ) -> BoxFuture<'a, Result<Option<Value>, RuntimeError>> {
    async move {
      let mut last = None;
      for step in steps {
        if let Some(output) = self.execute_step(step, &context).await? {
          merge_output(&mut context, &output);
          last = Some(output);
        }
      }
      Ok(last)
    }
    .boxed()
  }

  /// Execute one step. `None` means the step produced nothing (e.g. a false guard).
  fn execute_step<'a>(
    &'a self,
    step: &'a Step,
    context: &'a Context,
  ) -> BoxFuture<'a, Result<Option<Value>, RuntimeError>> {
    async move {
      if let Some(condition) = &step.condition
        && !evaluate_condition(condition, context)
      {
        debug!(condition = %condition, "step skipped");
        return Ok(None);
      }

      let output = match &step.action {
        Action::Block(steps) => self.execute_steps(steps, context.clone()).await?,
        Action::ForEach(for_each) => Some(self.execute_for_each(for_each, context).await?),
        Action::Handler(handler) => {
          debug!(handler = %handler.name, "inline handler started");
          handler.call(context.clone()).await.inspect_err(|e| {
            error!(handler = %handler.name, error = %e, "inline handler failed");
          })?
        }
        Action::Task(task) => Some(self.execute_task(task, context).await?),
      };

      Ok(match (&step.output_as, output) {
        (Some(name), Some(output)) => {
          let mut wrapped = Map::new();
          wrapped.insert(name.clone(), output);
          Some(Value::Object(wrapped))
        }
        (_, output) => output,
      })
    }
    .boxed()
  }

  async fn execute_task(&self, task: &TaskStep, context: &Context) -> Result<Value, RuntimeError> {
    let def = self
      .registry
      .get(&task.task_name)
      .await
      .ok_or_else(|| RuntimeError::TaskNotFound {
        name: task.task_name.clone(),
      })?;

    let mut inputs = Map::new();
    for spec in &def.inputs {
      let value = match task.inputs.get(&spec.name) {
        Some(raw) => Some(resolve_value(raw, context)),
        None => context.get(&spec.name).cloned(),
      };

      match value {
        Some(value) => {
          inputs.insert(spec.name.clone(), value);
        }
        None if spec.required => {
          return Err(RuntimeError::MissingInput {
            task: task.task_name.clone(),
            input: spec.name.clone(),
          });
        }
        None => {}
      }
    }

    debug!(task = %task.task_name, "task_started");

    let output = def.handler.run(inputs).await.inspect_err(|e| {
      error!(task = %task.task_name, error = %e, "task_failed");
    })?;

    if task.debug {
      info!(task = %task.task_name, output = %output, "task_output");
    }
    debug!(task = %task.task_name, "task_completed");

    Ok(output)
  }

  async fn execute_for_each(&self, for_each: &ForEachStep, context: &Context) -> Result<Value, RuntimeError> {
    let items = self.collect_items(for_each, context).await?;
    debug!(items = items.len(), variable = %for_each.as_name, "for_each_started");

    let mut outputs = Vec::with_capacity(items.len());
    for item in items {
      let mut local = context.clone();
      local.insert(for_each.as_name.clone(), item.value);
      if let (Some(name), Some(content)) = (&for_each.content_as, item.content) {
        local.insert(name.clone(), Value::String(content));
      }

      match self.execute_steps(&for_each.steps, local).await? {
        Some(output) => outputs.push(output),
        None if for_each.combine == CombineStrategy::Array => outputs.push(Value::Null),
        None => {}
      }
    }

    Ok(combine_results(for_each.combine, outputs))
  }

  async fn collect_items(&self, for_each: &ForEachStep, context: &Context) -> Result<Vec<LoopItem>, RuntimeError> {
    let values = match &for_each.source {
      ItemSource::Value(raw) => match resolve_value(raw, context) {
        Value::Array(items) => items,
        other => {
          return Err(RuntimeError::validation(format!(
            "forEach items must resolve to an array, got {}",
            other
          )));
        }
      },
      ItemSource::Handler(handler) => match handler.call(context.clone()).await? {
        Some(Value::Array(items)) => items,
        other => {
          return Err(RuntimeError::validation(format!(
            "forEach handler '{}' must return an array, got {}",
            handler.name,
            other.unwrap_or(Value::Null)
          )));
        }
      },
      ItemSource::Files { folder, extensions } => {
        return self
          .collect_files(folder, extensions, for_each.content_as.is_some(), context)
          .await;
      }
    };

    Ok(
      values
        .into_iter()
        .map(|value| LoopItem {
          value,
          content: None,
        })
        .collect(),
    )
  }

  async fn collect_files(
    &self,
    folder: &str,
    extensions: &[String],
    load_content: bool,
    context: &Context,
  ) -> Result<Vec<LoopItem>, RuntimeError> {
    let folder = match resolve_value(&Value::String(folder.to_string()), context) {
      Value::String(folder) => folder,
      other => {
        return Err(RuntimeError::validation(format!(
          "forEach folder must resolve to a string, got {}",
          other
        )));
      }
    };

    let folder = Path::new(&folder);
    let files = scan_folder(folder, extensions)
      .await
      .map_err(io_error(folder))?;

    let mut items = Vec::with_capacity(files.len());
    for path in files {
      let content = if load_content {
        Some(
          tokio::fs::read_to_string(&path)
            .await
            .map_err(io_error(&path))?,
        )
      } else {
        None
      };

      let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

      items.push(LoopItem {
        value: json!({ "name": name, "path": path.display().to_string() }),
        content,
      });
    }

    Ok(items)
  }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> RuntimeError {
  let path = path.display().to_string();
  move |source| RuntimeError::Io { path, source }
}

/// Check the run preconditions: a named workflow and every required input present.
fn validate_workflow(workflow: &Workflow, inputs: &Context) -> Result<(), RuntimeError> {
  if workflow.name.trim().is_empty() {
    return Err(RuntimeError::validation(format!(
      "workflow '{}' has no name",
      workflow.key
    )));
  }

  if let Some(missing) = workflow
    .required_inputs()
    .find(|name| inputs.get(*name).is_none_or(Value::is_null))
  {
    return Err(RuntimeError::validation(format!(
      "workflow '{}' requires input '{}'",
      workflow.key, missing
    )));
  }

  Ok(())
}

/// Shallow-merge an object output into the context. Other outputs are not addressable.
fn merge_output(context: &mut Context, output: &Value) {
  match output {
    Value::Object(map) => {
      for (key, value) in map {
        context.insert(key.clone(), value.clone());
      }
    }
    other => {
      debug!(output = %other, "non-object step output not merged into context");
    }
  }
}
