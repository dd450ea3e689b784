//! Autoflow Trigger
//!
//! Connects background events to workflow runs.
//!
//! - [`EventBus`] delivers named events to subscribed [`EventHandler`]s
//! - [`ProcessRuntime`] owns the bus, the running producers and the
//!   subscriptions, and tears them down on shutdown
//! - [`TriggerRegistrar`] subscribes a [`TriggerHandler`] for each enabled
//!   workflow trigger and starts the producer its event source needs
//! - [`TriggerHandler`] evaluates events against simple or composite
//!   conditions, tracking composite progress in a
//!   [`PendingTriggerStore`](autoflow_store::PendingTriggerStore)

mod bus;
mod error;
pub mod extract;
mod file_watcher;
mod matcher;
pub mod predicate;
mod process;
mod producer;
mod registrar;

pub use bus::{EventBus, EventHandler, SubscriptionId};
pub use error::TriggerError;
pub use file_watcher::{FILE_CHANGE_EVENT, FileWatcher, Snapshot};
pub use matcher::{EVENT_DATA_KEY, MatchOutcome, TriggerHandler, WORKFLOW_ID_FIELD, correlation_value};
pub use process::ProcessRuntime;
pub use producer::{DefaultProducerFactory, EventProducer, ProducerFactory, ProducerSpec, producer_identity};
pub use registrar::{TriggerGate, TriggerRegistrar};
