//! Autoflow Task Registry
//!
//! Tasks are the leaf operations workflows call by name: sending email,
//! converting documents, calling an LLM and so on. The implementations live
//! outside the engine; this crate only defines the contract the interpreter
//! consumes and an in-memory registry to hold them.

mod error;
mod memory;
mod registry;
mod task;

pub use error::{RegistryError, TaskError};
pub use memory::InMemoryTaskRegistry;
pub use registry::TaskRegistry;
pub use task::{FnTask, InputSpec, TaskDef, TaskHandler, task_fn};
