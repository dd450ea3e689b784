//! Tasks and inline handlers compiled into the `autoflow` binary.

use autoflow_runtime::scan_folder;
use autoflow_task_registry::{InMemoryTaskRegistry, InputSpec, TaskDef, TaskError, task_fn};
use autoflow_workflow::{HandlerTable, handler_fn};
use serde_json::{Map, Value, json};
use tracing::info;

fn string_input<'a>(inputs: &'a Map<String, Value>, name: &str) -> Result<&'a str, TaskError> {
  inputs
    .get(name)
    .and_then(Value::as_str)
    .ok_or_else(|| TaskError::failed(format!("input '{}' must be a string", name)))
}

/// The task registry the CLI runs workflows against.
pub fn registry() -> InMemoryTaskRegistry {
  InMemoryTaskRegistry::new([
    TaskDef::new(
      "Log Message",
      task_fn(|inputs| async move {
        let message = match inputs.get("message") {
          Some(Value::String(s)) => s.clone(),
          Some(other) => other.to_string(),
          None => String::new(),
        };
        info!(message = %message, "workflow message");
        Ok(json!({ "logged": message }))
      }),
    )
    .description("Write a message to the log")
    .input(InputSpec::required("message"))
    .output("logged"),
    TaskDef::new(
      "Read File",
      task_fn(|inputs| async move {
        let path = string_input(&inputs, "path")?;
        let content = tokio::fs::read_to_string(path).await?;
        Ok::<_, TaskError>(json!({ "content": content }))
      }),
    )
    .description("Read a UTF-8 text file")
    .input(InputSpec::required("path"))
    .output("content"),
    TaskDef::new(
      "Write File",
      task_fn(|inputs| async move {
        let path = string_input(&inputs, "path")?;
        let content = match inputs.get("content") {
          Some(Value::String(s)) => s.clone(),
          Some(other) => serde_json::to_string_pretty(other)?,
          None => String::new(),
        };
        if let Some(parent) = std::path::Path::new(path).parent() {
          tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, content).await?;
        Ok::<_, TaskError>(json!({ "written": path }))
      }),
    )
    .description("Write text or JSON to a file, creating parent folders")
    .input(InputSpec::required("path"))
    .input(InputSpec::optional("content"))
    .output("written"),
    TaskDef::new(
      "List Files",
      task_fn(|inputs| async move {
        let folder = string_input(&inputs, "folder")?;
        let extensions: Vec<String> = inputs
          .get("extension")
          .and_then(Value::as_str)
          .map(|ext| vec![ext.trim_start_matches('.').to_lowercase()])
          .unwrap_or_default();
        let files = scan_folder(std::path::Path::new(folder), &extensions).await?;
        let files: Vec<String> = files.iter().map(|p| p.display().to_string()).collect();
        Ok::<_, TaskError>(json!({ "files": files }))
      }),
    )
    .description("List the files in a folder, optionally by extension")
    .input(InputSpec::required("folder"))
    .input(InputSpec::optional("extension"))
    .output("files"),
  ])
}

/// Inline handlers definitions may reference by name.
pub fn handlers() -> HandlerTable {
  HandlerTable::new()
    .with(
      "contextSnapshot",
      handler_fn(|context| async move { Ok(Some(json!({ "snapshot": context }))) }),
    )
    .with(
      "contextKeys",
      handler_fn(|context| async move {
        let keys: Vec<Value> = context.keys().cloned().map(Value::String).collect();
        Ok(Some(Value::Array(keys)))
      }),
    )
}
