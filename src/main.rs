use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;

mod cli;
mod commands;
mod executor;
mod logging;
mod stdio;

use cli::{Cli, Commands};
use executor::CommandExecutor;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout belongs to the protocol from here on; logs go to stderr
    logging::init(cli.log_file.as_deref())?;

    if cli.list_tools {
        println!("Available tools:");
        for tool in stdio::metadata::all_tool_metadata() {
            println!("  - {} ({})", tool.name, tool.category);
        }
        return Ok(());
    }

    let executor = CommandExecutor::new(cli.executor_config()?);

    if let Some(command) = &cli.command {
        return match command {
            Commands::SelfTest => commands::handle_self_test(&executor).await,
        };
    }

    let enabled_tools = cli.enabled_tools()?;
    if let Some(tools) = &enabled_tools {
        cli::validate_tool_names(tools)?;
    }

    log_engine_config(&executor);

    let shutdown_token = CancellationToken::new();
    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        let signal = shutdown_signal().await;
        log::info!("Received {signal}, shutting down");
        signal_token.cancel();
    });

    stdio::CommandServer::new(executor, enabled_tools)
        .serve_stdio(shutdown_token)
        .await
}

fn log_engine_config(executor: &CommandExecutor) {
    let config = executor.config();
    let decoders: Vec<&str> = config
        .decoders
        .candidates()
        .iter()
        .map(|decoder| decoder.name())
        .collect();
    log::info!(
        "Denylist: {} patterns, decoding order: {}, default timeout: {}s",
        config.denylist.patterns().len(),
        decoders.join(" -> "),
        config.default_timeout.as_secs()
    );
}

/// Resolve once SIGINT or SIGTERM arrives and name the signal.
///
/// If no handler can be installed this never resolves and the server runs
/// until stdin closes.
#[cfg(unix)]
async fn shutdown_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let terminate = signal(SignalKind::terminate());
    let interrupt = signal(SignalKind::interrupt());

    match (terminate, interrupt) {
        (Ok(mut terminate), Ok(mut interrupt)) => tokio::select! {
            _ = terminate.recv() => "SIGTERM",
            _ = interrupt.recv() => "SIGINT",
        },
        (Ok(mut terminate), Err(e)) => {
            log::warn!("SIGINT handler unavailable: {e}");
            terminate.recv().await;
            "SIGTERM"
        }
        (Err(e), Ok(mut interrupt)) => {
            log::warn!("SIGTERM handler unavailable: {e}");
            interrupt.recv().await;
            "SIGINT"
        }
        (Err(e), Err(_)) => {
            log::warn!("Signal handlers unavailable: {e}");
            std::future::pending().await
        }
    }
}

#[cfg(windows)]
async fn shutdown_signal() -> &'static str {
    match tokio::signal::windows::ctrl_c() {
        Ok(mut ctrl_c) => {
            ctrl_c.recv().await;
            "Ctrl-C"
        }
        Err(e) => {
            log::warn!("Ctrl-C handler unavailable: {e}");
            std::future::pending().await
        }
    }
}
