//! Macroflow command line tool.
//!
//! # Usage
//!
//! ```bash
//! macroflow validate scripts.json
//! macroflow show scripts.json --script "accept match"
//! macroflow run scripts.json --script "accept match" --snapshot snapshot.json
//! ```
//!
//! `run` never touches the input devices: every mouse and keyboard action
//! is logged instead.

use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use macroflow_cli::{Cli, execute, load_config};
use macroflow_graph::Cancellation;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => return fail(&e),
    };
    match config.logging_config() {
        Ok(logging) => logging.init(),
        Err(e) => return fail(&e),
    }

    // Ctrl-C stops the run before its next node.
    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let interrupted = interrupted.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                interrupted.store(true, Ordering::SeqCst);
                tracing::info!("interrupt received");
            }
        });
    }

    // Unlocked: each write takes the lock only for its own duration.
    let mut out = std::io::stdout();
    match execute(cli.command, &config, Cancellation::from_flag(interrupted), &mut out).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => fail(&e),
    }
}

fn fail(error: &dyn std::error::Error) -> ExitCode {
    let _ = writeln!(std::io::stderr(), "Error: {error}");
    ExitCode::FAILURE
}
