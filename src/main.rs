mod bootstrap;
mod cli;
mod console;

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use aa_app::{ActivationWorkflow, DisposableOutcomeSink};
use aa_core::{ActivationState, Outcome};
use aa_infra::FileLinkedAccountStore;
use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::cli::Cli;
use crate::console::ConsoleOutcomeSink;

const SETTLE_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    bootstrap::init_tracing_subscriber().context("Failed to initialize tracing")?;

    let cli = Cli::parse();
    let config = bootstrap::load_config(cli.config.as_deref())?;
    let request = cli
        .activation_request()
        .context("Invalid activation request")?;

    let store = Arc::new(FileLinkedAccountStore::with_defaults(&config.data_dir));
    let (outcomes_tx, mut outcomes) = mpsc::unbounded_channel();
    let sink = Arc::new(DisposableOutcomeSink::new(Arc::new(ConsoleOutcomeSink::new(
        store.clone(),
        outcomes_tx,
    ))));
    let ports = bootstrap::wire_ports(&config, store, sink.clone())?;
    let workflow = ActivationWorkflow::new(request, &config, ports);

    println!("{}", console::banner(workflow.request()));

    let result = tokio::select! {
        result = run_input_loop(&workflow, &mut outcomes) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted, leaving activation screen");
            Ok(())
        }
    };

    // Late responses still update state but no longer reach the console.
    sink.dispose();
    result
}

/// Reads codes from stdin until an attempt ends in a terminal outcome.
async fn run_input_loop(
    workflow: &ActivationWorkflow,
    outcomes: &mut mpsc::UnboundedReceiver<Outcome>,
) -> anyhow::Result<()> {
    info!(mode = ?workflow.request().mode(), "activation screen ready");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("Code: ");
        std::io::stdout().flush().context("Failed to flush stdout")?;

        let Some(line) = lines.next_line().await.context("Failed to read stdin")? else {
            return Ok(());
        };
        let code = line.trim();
        if !workflow.code_changed(code).await {
            println!("The code is incomplete");
            continue;
        }

        if let Err(err) = workflow.submit_code(code).await {
            warn!(error = %err, "submit rejected");
            println!("{err}");
            continue;
        }

        if !wait_for_outcome(workflow, outcomes).await {
            return Ok(());
        }
    }
}

/// Waits for the submitted attempt to settle; returns whether another code
/// may be entered.
async fn wait_for_outcome(
    workflow: &ActivationWorkflow,
    outcomes: &mut mpsc::UnboundedReceiver<Outcome>,
) -> bool {
    let received = tokio::select! {
        outcome = outcomes.recv() => Some(outcome),
        _ = wait_until_settled(workflow) => None,
    };
    let outcome = match received {
        Some(outcome) => outcome,
        None => {
            // A dropped link failure settles back to idle without any outcome.
            if workflow.state().await == ActivationState::Idle {
                return true;
            }
            outcomes.recv().await
        }
    };
    // Actions queued after the outcome (verification, login) still have to
    // reach the sink before it is disposed.
    workflow.settled().await;
    outcome.is_some_and(|outcome| outcome.is_retryable())
}

async fn wait_until_settled(workflow: &ActivationWorkflow) {
    while workflow.state().await.is_submitting() {
        tokio::time::sleep(SETTLE_POLL_INTERVAL).await;
    }
}
