//! Activation domain module.
//!
//! This module defines the activation workflow state machine types.

mod error;
mod outcome;
pub mod state_machine;
mod status;
mod submission;

pub use error::ActivationError;
pub use outcome::{ActivatedAccount, Outcome};
pub use state_machine::{
    ActivationAction, ActivationEvent, ActivationPolicy, ActivationState, ActivationStateMachine,
};
pub use status::{AccountActivationResponse, ActivationStatus};
pub use submission::{ActivationSubmission, LinkedAccount};
