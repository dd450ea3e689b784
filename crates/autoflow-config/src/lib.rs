//! Autoflow Config
//!
//! This crate contains the serializable configuration types for autoflow.
//! Workflow definitions are plain JSON documents describing ordered steps,
//! loops, conditional blocks and event triggers. They are loaded at process
//! start and resolved by `autoflow-workflow` into the typed form the runtime
//! executes.
//!
//! Configuration can be loaded from:
//! - a definitions file mapping workflow keys to [`WorkflowDef`]s
//! - a host configuration file ([`HostConfig`])

mod error;
mod host;
mod step;
mod trigger;
mod workflow;

pub use error::ConfigError;
pub use host::{DEFAULT_POLL_INTERVAL_MS, HostConfig, trigger_env_var};
pub use step::{CombineStrategy, FilesInDef, ForEachDef, ItemsDef, StepDef};
pub use trigger::{
  ArrayFilter, CompositeConditionDef, CompositeKind, EventCondition, EventSource, EventTriggerDef,
  ExtractDef, FieldTest, KeyExtractionDef, NamedCondition, ValueSelector,
};
pub use workflow::{OutputDef, WorkflowDef, WorkflowInputDef, load_definitions, parse_definitions};
