//! Inline handlers.
//!
//! Some steps need logic that cannot be written declaratively: enumerating a
//! folder, arithmetic on durations, reshaping a task result. Definitions name
//! such a handler (`"handler": "listFiles"`) and the name is looked up in a
//! table compiled into the host when the workflow is resolved.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use autoflow_task_registry::TaskError;
use serde_json::{Map, Value};

/// Variables visible to template resolution during a single run.
pub type Context = Map<String, Value>;

#[async_trait]
pub trait InlineHandler: Send + Sync {
  /// Run against a snapshot of the current context. `None` produces no output.
  async fn call(&self, context: Context) -> Result<Option<Value>, TaskError>;
}

/// Adapts an async closure into an [`InlineHandler`].
pub struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> InlineHandler for FnHandler<F>
where
  F: Fn(Context) -> Fut + Send + Sync,
  Fut: Future<Output = Result<Option<Value>, TaskError>> + Send,
{
  async fn call(&self, context: Context) -> Result<Option<Value>, TaskError> {
    (self.0)(context).await
  }
}

pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn InlineHandler>
where
  F: Fn(Context) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<Option<Value>, TaskError>> + Send + 'static,
{
  Arc::new(FnHandler(f))
}

/// Compiled-in inline handlers, by name.
#[derive(Clone, Default)]
pub struct HandlerTable {
  handlers: HashMap<String, Arc<dyn InlineHandler>>,
}

impl HandlerTable {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with(mut self, name: impl Into<String>, handler: Arc<dyn InlineHandler>) -> Self {
    self.insert(name, handler);
    self
  }

  pub fn insert(&mut self, name: impl Into<String>, handler: Arc<dyn InlineHandler>) {
    self.handlers.insert(name.into(), handler);
  }

  pub fn get(&self, name: &str) -> Option<NamedHandler> {
    self.handlers.get(name).map(|handler| NamedHandler {
      name: name.to_string(),
      handler: handler.clone(),
    })
  }
}

impl fmt::Debug for HandlerTable {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut names: Vec<&String> = self.handlers.keys().collect();
    names.sort();
    f.debug_struct("HandlerTable").field("handlers", &names).finish()
  }
}

/// A handler reference resolved from the table.
#[derive(Clone)]
pub struct NamedHandler {
  pub name: String,
  pub handler: Arc<dyn InlineHandler>,
}

impl NamedHandler {
  pub async fn call(&self, context: Context) -> Result<Option<Value>, TaskError> {
    self.handler.call(context).await
  }
}

impl fmt::Debug for NamedHandler {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_tuple("NamedHandler").field(&self.name).finish()
  }
}
