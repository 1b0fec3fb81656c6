//! Port interfaces for the application layer
//!
//! Ports define the contract between the activation workflow and the
//! outside world: the remote account service, the local account store,
//! the phone number utility and the presentation layer.

pub mod account_creator;
pub mod linked_account_store;
pub mod outcome_sink;
pub mod phone_number;

pub use account_creator::AccountCreatorPort;
pub use linked_account_store::LinkedAccountStorePort;
pub use outcome_sink::OutcomeSinkPort;
pub use phone_number::PhoneNumberPort;
