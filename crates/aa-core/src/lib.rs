//! # aa-core
//!
//! Core domain models and business logic for the account activation assistant.
//!
//! This crate contains pure business logic without any infrastructure dependencies.
//! Remote calls, persistence and presentation are reached through [`ports`].

pub mod activation;
pub mod code;
pub mod config;
pub mod ports;
pub mod request;

// Re-export commonly used types at the crate root
pub use activation::{
    AccountActivationResponse, ActivatedAccount, ActivationAction, ActivationError,
    ActivationEvent, ActivationPolicy, ActivationState, ActivationStateMachine, ActivationStatus,
    ActivationSubmission, LinkedAccount, Outcome,
};
pub use code::{is_complete, CodeEntry};
pub use config::ActivationConfig;
pub use request::{ActivationMode, ActivationRequest, RequestError, ScreenTitle};
