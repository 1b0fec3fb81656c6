use std::path::PathBuf;

use aa_core::{ActivationMode, ActivationRequest, RequestError};
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "account-assistant")]
#[command(about = "Activate a SIP account with the code received by SMS", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to $ACCOUNT_ASSISTANT_CONFIG or ./account-assistant.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Account username, if one was chosen at registration
    #[arg(short, long)]
    pub username: Option<String>,

    /// Phone number as typed, with or without the dial code
    #[arg(short, long, default_value = "")]
    pub phone: String,

    /// International dial code, e.g. 33 or +33
    #[arg(short, long, default_value = "")]
    pub dial_code: String,

    /// Recover an existing account instead of activating a new one
    #[arg(long, conflicts_with = "link")]
    pub recover: bool,

    /// Link the phone number to the stored account at this index
    #[arg(long, value_name = "INDEX")]
    pub link: Option<u32>,
}

impl Cli {
    pub fn mode(&self) -> ActivationMode {
        match (self.link, self.recover) {
            (Some(account_index), _) => ActivationMode::Link { account_index },
            (None, true) => ActivationMode::Recover,
            (None, false) => ActivationMode::Normal,
        }
    }

    pub fn activation_request(&self) -> Result<ActivationRequest, RequestError> {
        ActivationRequest::new(
            self.username.clone(),
            self.phone.clone(),
            self.dial_code.clone(),
            self.mode(),
        )
    }
}
