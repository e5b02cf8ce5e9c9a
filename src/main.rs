//! netdiag - Main CLI Application
//!
//! Resolves a target, probes it and prints a diagnosis of why it is (or is
//! not) reachable. The report goes to stdout; logs and warnings to stderr.

use clap::Parser;
use netdiag::{
    cli::Cli,
    config::{display_config_summary, load_config, validate_config, ValidationLevel},
    error::{AppError, Result},
    logging::ProbeLogger,
    output::OutputFormatterFactory,
    DiagnosticEngine, PKG_NAME, VERSION,
};
use std::process;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
        process::exit(AppError::internal("panic").exit_code());
    }));

    let cli = Cli::parse();

    if let Err(message) = cli.validate() {
        eprintln!("Error: {}", message);
        process::exit(2);
    }

    let use_color = cli.use_colors();
    if let Err(e) = run_application(cli).await {
        eprintln!("{}", e.format_for_console(use_color));
        if e.is_fatal() || matches!(e, AppError::Config(_) | AppError::Validation(_)) {
            eprintln!();
            eprintln!("{}", e.user_friendly_message());
        }
        process::exit(e.exit_code());
    }
}

/// Main application logic
async fn run_application(cli: Cli) -> Result<()> {
    let target = cli.target();
    let config = load_config(cli)?;

    if config.debug {
        eprintln!("{} v{}", PKG_NAME, VERSION);
        eprintln!("{}", display_config_summary(&config));
        eprintln!();
    }

    for warning in validate_config(&config)? {
        if warning.level > ValidationLevel::Info || config.verbose || config.debug {
            eprintln!("{}", warning.format(config.enable_color));
        }
    }

    let engine = DiagnosticEngine::from_options(&config.dns_config()?, &config.options)?
        .with_logger(ProbeLogger::new(&config));

    // Ctrl-C cancels outstanding probes; the partial batch is still reported
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let report = engine.run_with_cancel(&target, &config.options, cancel).await?;

    let formatter = OutputFormatterFactory::from_config(&config);
    println!("{}", formatter.format_report(&report)?);

    Ok(())
}
