pub mod account_service;
pub mod config;
pub mod linked_accounts;
pub mod phone;

pub use account_service::JsonRpcAccountCreator;
pub use config::load_config;
pub use linked_accounts::FileLinkedAccountStore;
pub use phone::DialPlanPhoneNumbers;
