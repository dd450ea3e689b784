mod builtin;

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use autoflow_config::{HostConfig, load_definitions};
use autoflow_runtime::{Runtime, WorkflowCatalog};
use autoflow_store::SqliteStore;
use autoflow_trigger::{DefaultProducerFactory, EventBus, ProcessRuntime, TriggerRegistrar};

/// Autoflow - run declarative task workflows, directly or from background events
#[derive(Parser)]
#[command(name = "autoflow")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.autoflow)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  /// Host configuration file (default: <data-dir>/config.json)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  /// Emit logs as JSON lines
  #[arg(long, global = true)]
  log_json: bool,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Run one workflow with inputs read from stdin as a JSON object
  Run {
    /// Path to the workflow definitions file
    definitions: PathBuf,

    /// Key of the workflow to run
    workflow: String,
  },

  /// Register event triggers and dispatch events until interrupted
  ///
  /// Events are read from stdin as JSON lines: {"event": "newEmail", "payload": {...}}
  Serve {
    /// Path to the workflow definitions file
    definitions: PathBuf,
  },
}

/// One line of event input for `serve`.
#[derive(Deserialize)]
struct EventLine {
  event: String,
  #[serde(default)]
  payload: Value,
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  init_tracing(cli.log_json);

  let data_dir = match cli.data_dir {
    Some(dir) => dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".autoflow"),
  };
  let config_path = cli.config.unwrap_or_else(|| data_dir.join("config.json"));

  match cli.command {
    Some(Commands::Run {
      definitions,
      workflow,
    }) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(run_workflow(&definitions, &workflow))
    }
    Some(Commands::Serve { definitions }) => {
      let config = HostConfig::load(&config_path)
        .with_context(|| format!("failed to load config: {}", config_path.display()))?;
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(serve(&definitions, &data_dir, config))
    }
    None => {
      println!("autoflow - use --help to see available commands");
      Ok(())
    }
  }
}

fn init_tracing(json: bool) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(io::stderr);

  if json {
    builder.json().init();
  } else {
    builder.with_target(false).compact().init();
  }
}

fn load_runtime(definitions: &Path) -> Result<Runtime> {
  let defs = load_definitions(definitions)
    .with_context(|| format!("failed to load definitions: {}", definitions.display()))?;
  let catalog = WorkflowCatalog::from_definitions(defs, &builtin::handlers())
    .context("failed to resolve workflow definitions")?;

  info!(workflows = catalog.len(), "definitions loaded");
  Ok(Runtime::new(Arc::new(builtin::registry()), catalog))
}

async fn run_workflow(definitions: &Path, key: &str) -> Result<()> {
  let runtime = load_runtime(definitions)?;

  let inputs = match read_inputs_from_stdin()? {
    Value::Object(map) => map,
    other => bail!("workflow inputs must be a JSON object, got {}", other),
  };

  let result = runtime
    .execute_workflow(key, inputs)
    .await
    .with_context(|| format!("workflow '{}' failed", key))?;

  eprintln!("Execution completed: {}", result.execution_id);
  println!("{}", serde_json::to_string_pretty(&result.output)?);

  Ok(())
}

async fn serve(definitions: &Path, data_dir: &Path, config: HostConfig) -> Result<()> {
  let runtime = Arc::new(load_runtime(definitions)?);

  tokio::fs::create_dir_all(data_dir)
    .await
    .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;
  let database_url = config
    .database_url
    .clone()
    .unwrap_or_else(|| format!("sqlite://{}", data_dir.join("autoflow.db").display()));
  let store = SqliteStore::connect(&database_url)
    .await
    .with_context(|| format!("failed to open pending trigger store: {}", database_url))?;

  let factory = DefaultProducerFactory::new(Duration::from_millis(config.poll_interval_ms));
  let process = Arc::new(ProcessRuntime::new(EventBus::new(), Arc::new(factory)));
  let registrar = TriggerRegistrar::new(runtime, Arc::clone(&process), Arc::new(store));

  let registered = registrar.register_all(&config).await;
  info!(triggers = registered, "serving, press ctrl-c to stop");

  let mut lines = BufReader::new(tokio::io::stdin()).lines();
  let mut stdin_open = true;
  let shutdown = tokio::signal::ctrl_c();
  tokio::pin!(shutdown);

  loop {
    tokio::select! {
      _ = &mut shutdown => break,
      line = lines.next_line(), if stdin_open => match line {
        Ok(Some(line)) if line.trim().is_empty() => {}
        Ok(Some(line)) => match serde_json::from_str::<EventLine>(&line) {
          Ok(event) => {
            process.bus().emit(&event.event, event.payload).await;
          }
          Err(e) => warn!(error = %e, "ignoring malformed event line"),
        },
        Ok(None) => stdin_open = false,
        Err(e) => {
          warn!(error = %e, "stdin closed");
          stdin_open = false;
        }
      },
    }
  }

  process.shutdown().await;
  Ok(())
}

fn read_inputs_from_stdin() -> Result<Value> {
  use std::io::IsTerminal;

  if io::stdin().is_terminal() {
    return Ok(serde_json::json!({}));
  }

  let mut input = String::new();
  io::stdin()
    .read_to_string(&mut input)
    .context("failed to read inputs from stdin")?;

  if input.trim().is_empty() {
    Ok(serde_json::json!({}))
  } else {
    serde_json::from_str(&input).context("failed to parse inputs as JSON")
  }
}
