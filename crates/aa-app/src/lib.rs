//! Account assistant application orchestration layer
//!
//! This crate contains the activation use case and runtime orchestration.

pub mod usecases;

pub use usecases::activation::{
    ActivationPorts, ActivationWorkflow, DisposableOutcomeSink, WorkflowError,
};
