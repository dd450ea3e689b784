//! Autoflow Runtime
//!
//! This crate provides the workflow interpreter for autoflow. It executes a
//! resolved workflow's steps in order against a context that accumulates
//! each step's output, calling into the task registry for leaf operations.
//!
//! - [`template`] substitutes `{{path.to.value}}` placeholders
//! - [`condition`] decides whether a guarded step runs
//! - [`Runtime`] runs workflows directly or by key from a [`WorkflowCatalog`]

mod catalog;
mod combine;
pub mod condition;
mod error;
mod files;
mod result;
mod runtime;
pub mod template;

pub use autoflow_workflow::Context;
pub use catalog::WorkflowCatalog;
pub use combine::combine_results;
pub use condition::evaluate_condition;
pub use error::RuntimeError;
pub use files::scan_folder;
pub use result::RunResult;
pub use runtime::Runtime;
pub use template::{get_nested_value, lookup, resolve_value};
