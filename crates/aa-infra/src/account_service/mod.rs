//! Account service adapters.

mod json_rpc;

pub use json_rpc::JsonRpcAccountCreator;
