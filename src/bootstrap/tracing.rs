//! Tracing configuration for the account assistant.
//!
//! Logs go to stderr so they never interleave with the prompts on stdout.
//! `RUST_LOG` overrides the default directives.

use std::io;

use tracing_subscriber::{fmt, fmt::writer::BoxMakeWriter, prelude::*, registry};

fn is_development() -> bool {
    cfg!(debug_assertions)
}

/// Build the default filter directives for tracing
///
/// - **Development**: debug level for the workspace crates
/// - **Production**: warn overall, info for the workflow
/// - HTTP stack internals stay quiet in both
fn build_filter_directives(is_dev: bool) -> Vec<String> {
    vec![
        if is_dev { "info" } else { "warn" }.to_string(),
        if is_dev { "aa_app=debug" } else { "aa_app=info" }.to_string(),
        if is_dev {
            "aa_infra=debug"
        } else {
            "aa_infra=info"
        }
        .to_string(),
        "hyper=warn".to_string(),
        "hyper_util=warn".to_string(),
        "reqwest=info".to_string(),
        "rustls=warn".to_string(),
    ]
}

/// Initialize the global tracing subscriber.
///
/// Call once from `main`, before the configuration is loaded, so config
/// fallbacks are logged.
///
/// # Errors
///
/// Returns `Err` if a subscriber is already registered.
pub fn init_tracing_subscriber() -> anyhow::Result<()> {
    let filter_directives = build_filter_directives(is_development());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter_directives.join(",")));

    // "2025-01-15 10:30:45.123 INFO [file.rs:42] [target] message"
    let stderr_layer = fmt::layer()
        .with_timer(fmt::time::ChronoUtc::new(
            "%Y-%m-%d %H:%M:%S%.3f".to_string(),
        ))
        .with_level(true)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .with_ansi(cfg!(not(test)))
        .with_writer(BoxMakeWriter::new(io::stderr));

    registry().with(env_filter).with(stderr_layer).try_init()?;

    Ok(())
}
