// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Queuewerk IPP: ipptool protocol client, queue snapshots, and the diff and
// apply engine that converges CUPS queues. All spooler access goes through
// child processes behind the `ProcessRunner` trait.

pub mod apply;
pub mod client;
pub mod commands;
#[cfg(test)]
mod fake;
pub mod options;
pub mod reconcile;
pub mod runner;
pub mod snapshot;

pub use apply::{FailedOperation, ReconcileOutcome, ReconcileReport, Reconciler};
pub use client::IppClient;
pub use reconcile::{ChangeOperation, diff};
pub use runner::{Invocation, ProcessOutput, ProcessRunner, SystemRunner};
pub use snapshot::SnapshotReader;
