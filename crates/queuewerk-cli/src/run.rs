// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Subcommand execution and output rendering.

use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

use serde_json::json;

use queuewerk_core::error::Result;
use queuewerk_core::types::{DesiredState, QueueSnapshot};
use queuewerk_ipp::{ChangeOperation, ProcessRunner, ReconcileOutcome, Reconciler};

use crate::cli::Command;

/// How a successful run left the spooler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Status {
    /// Nothing to change.
    Unchanged,
    /// Changes were applied, or are pending for `diff`.
    Changed,
    /// Changes were applied but a fresh snapshot still differs.
    Diverged,
}

impl Status {
    pub(crate) fn exit_code(self) -> ExitCode {
        match self {
            Self::Unchanged => ExitCode::SUCCESS,
            Self::Changed => ExitCode::from(2),
            Self::Diverged => ExitCode::FAILURE,
        }
    }
}

pub(crate) fn load_desired(path: &Path) -> Result<DesiredState> {
    let json = std::fs::read_to_string(path)?;
    DesiredState::from_json(&json)
}

pub(crate) fn run<R: ProcessRunner>(
    command: &Command,
    reconciler: &Reconciler<R>,
    json: bool,
    out: &mut impl Write,
) -> Result<Status> {
    match command {
        Command::List => {
            let (printers, classes) = reconciler.client().list_destinations()?;
            if json {
                writeln!(out, "{}", json!({ "printers": printers, "classes": classes }))?;
            } else {
                for name in &printers {
                    writeln!(out, "printer {name}")?;
                }
                for name in &classes {
                    writeln!(out, "class {name}")?;
                }
            }
            Ok(Status::Unchanged)
        }
        Command::Show { queue } => {
            let snapshot = reconciler.snapshot(queue)?;
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&snapshot)?)?;
            } else {
                match &snapshot {
                    Some(snapshot) => write_snapshot(out, snapshot)?,
                    None => writeln!(out, "{queue}: absent")?,
                }
            }
            Ok(Status::Unchanged)
        }
        Command::Diff { queue, desired } => {
            let desired = load_desired(desired)?;
            let operations = reconciler.plan(queue, &desired)?;
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&operations)?)?;
            } else {
                write_operations(out, queue, "", &operations)?;
            }
            Ok(if operations.is_empty() {
                Status::Unchanged
            } else {
                Status::Changed
            })
        }
        Command::Apply { queue, desired } => {
            let desired = load_desired(desired)?;
            let outcome = reconciler.converge(queue, &desired)?;
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&outcome)?)?;
            }
            match outcome {
                ReconcileOutcome::NoChanges => {
                    if !json {
                        writeln!(out, "{queue}: no changes")?;
                    }
                    Ok(Status::Unchanged)
                }
                ReconcileOutcome::Changed(report) => {
                    if !json {
                        write_operations(out, queue, "applied: ", &report.applied)?;
                        for operation in &report.remaining {
                            writeln!(out, "{queue}: still pending: {operation}")?;
                        }
                    }
                    Ok(if report.converged() {
                        Status::Changed
                    } else {
                        Status::Diverged
                    })
                }
            }
        }
    }
}

fn write_operations(
    out: &mut impl Write,
    queue: &str,
    prefix: &str,
    operations: &[ChangeOperation],
) -> std::io::Result<()> {
    if operations.is_empty() {
        return writeln!(out, "{queue}: no changes");
    }
    for operation in operations {
        writeln!(out, "{queue}: {prefix}{operation}")?;
    }
    Ok(())
}

fn write_snapshot(out: &mut impl Write, snapshot: &QueueSnapshot) -> std::io::Result<()> {
    writeln!(out, "{} ({})", snapshot.name, snapshot.kind)?;
    if let Some(uri) = &snapshot.device_uri {
        writeln!(out, "  uri:         {uri}")?;
    }
    if let Some(model) = &snapshot.make_and_model {
        writeln!(out, "  model:       {model}")?;
    }
    if !snapshot.members.is_empty() {
        writeln!(out, "  members:     {}", snapshot.members.join(", "))?;
    }
    writeln!(out, "  access:      {}", snapshot.access.to_lpadmin_arg())?;
    writeln!(out, "  accepting:   {}", snapshot.accepting)?;
    writeln!(out, "  enabled:     {}", snapshot.enabled)?;
    writeln!(out, "  held:        {}", snapshot.held)?;
    writeln!(out, "  shared:      {}", snapshot.shared)?;
    writeln!(out, "  description: {}", snapshot.description)?;
    writeln!(out, "  location:    {}", snapshot.location)?;
    for (key, value) in &snapshot.options {
        writeln!(out, "  option {key} = {value}")?;
    }
    Ok(())
}
