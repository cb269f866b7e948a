// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Converge CUPS printers and classes to a declared state.
#[derive(Parser, Debug)]
#[command(name = "queuewerk", version, disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// Spooler configuration file (JSON). Built-in defaults apply when
    /// omitted or when the file does not exist.
    #[arg(long, global = true, value_name = "PATH")]
    pub(crate) config: Option<PathBuf>,
    /// Emit JSON instead of human-readable text.
    #[arg(long, global = true)]
    pub(crate) json: bool,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    /// List printers and classes on the server.
    List,
    /// Show the current state of a queue.
    Show {
        queue: String,
    },
    /// Print the changes that would converge a queue, without applying them.
    Diff {
        queue: String,
        /// Desired state of the queue (JSON).
        desired: PathBuf,
    },
    /// Converge a queue and verify the result.
    Apply {
        queue: String,
        /// Desired state of the queue (JSON).
        desired: PathBuf,
    },
}
