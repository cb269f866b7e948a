// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Queuewerk: converge CUPS queues to a declared state.
//
// Entry point. Initialises logging, loads the spooler configuration, and runs
// one subcommand. Exit status: 0 nothing changed, 2 changes applied (or
// pending for `diff`), 1 failure.

mod cli;
mod run;

use std::process::ExitCode;

use clap::Parser;

use queuewerk_core::config::SpoolerConfig;
use queuewerk_core::error::Result;
use queuewerk_ipp::{Reconciler, SystemRunner};

use cli::Cli;
use run::Status;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // clap's own usage-error status is 2, which here means "changed".
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match execute(&cli) {
        Ok(status) => status.exit_code(),
        Err(e) => {
            tracing::error!(error = %e, "queuewerk failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn execute(cli: &Cli) -> Result<Status> {
    let config = match &cli.config {
        Some(path) => SpoolerConfig::load(path)?,
        None => SpoolerConfig::default(),
    };
    tracing::debug!(?config, "spooler configuration");

    let reconciler = Reconciler::new(SystemRunner, config);
    let mut out = std::io::stdout().lock();
    run::run(&cli.command, &reconciler, cli.json, &mut out)
}
