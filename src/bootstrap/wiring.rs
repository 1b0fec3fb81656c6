//! Dependency wiring: builds the activation ports from configuration.

use std::sync::Arc;

use aa_app::ActivationPorts;
use aa_core::ports::OutcomeSinkPort;
use aa_core::ActivationConfig;
use aa_infra::{DialPlanPhoneNumbers, FileLinkedAccountStore, JsonRpcAccountCreator};
use anyhow::Context;
use tracing::info;

pub fn wire_ports(
    config: &ActivationConfig,
    linked_accounts: Arc<FileLinkedAccountStore>,
    outcome_sink: Arc<dyn OutcomeSinkPort>,
) -> anyhow::Result<ActivationPorts> {
    let account_creator = JsonRpcAccountCreator::from_config(config)
        .context("Failed to create account service client")?;
    info!(
        endpoint = %config.account_service_url,
        store = %linked_accounts.path().display(),
        "activation ports wired"
    );

    Ok(ActivationPorts {
        account_creator: Arc::new(account_creator),
        outcome_sink,
        linked_accounts,
        phone_numbers: Arc::new(DialPlanPhoneNumbers),
    })
}
