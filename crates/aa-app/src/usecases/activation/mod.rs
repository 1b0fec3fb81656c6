//! Activation use cases.
//!
//! This module exposes the activation workflow and the disposable sink
//! presentation layers wrap their callbacks in.

mod context;
mod disposable_sink;
pub mod workflow;

pub use disposable_sink::DisposableOutcomeSink;
pub use workflow::{ActivationPorts, ActivationWorkflow, WorkflowError};
