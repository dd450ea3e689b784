//! Autoflow Workflow
//!
//! This crate provides the resolved workflow representation for autoflow.
//! A resolved workflow is a validated form of a [`WorkflowDef`] that is
//! ready for the interpreter.
//!
//! Key differences from `autoflow-config`:
//! - Each step has exactly one [`Action`], chosen by dispatch priority
//! - Inline handlers are looked up in a compiled-in [`HandlerTable`]
//! - Trigger declarations are checked for consistency
//!
//! [`WorkflowDef`]: autoflow_config::WorkflowDef

mod error;
mod handler;
mod resolver;
mod step;
mod workflow;

pub use error::WorkflowError;
pub use handler::{Context, FnHandler, HandlerTable, InlineHandler, NamedHandler, handler_fn};
pub use resolver::Resolver;
pub use step::{Action, ForEachStep, IMAGE_EXTENSIONS, ItemSource, Step, TaskStep};
pub use workflow::Workflow;
