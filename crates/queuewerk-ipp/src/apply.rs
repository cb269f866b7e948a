// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Reconciler: snapshot, diff, apply, then snapshot and diff again.
//
// Applying is not transactional. A failure part-way through leaves the
// earlier changes in place, and the next run picks up what is left.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use queuewerk_core::config::{ApplyPolicy, SpoolerConfig};
use queuewerk_core::error::{QueuewerkError, Result};
use queuewerk_core::types::{DesiredState, QueueSnapshot, validate_queue_name};

use crate::client::IppClient;
use crate::commands::native_commands;
use crate::reconcile::{ChangeOperation, diff};
use crate::runner::ProcessRunner;
use crate::snapshot::SnapshotReader;

/// A change that could not be applied, with the error it produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedOperation {
    pub operation: ChangeOperation,
    pub error: String,
}

/// What one apply pass did to a queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub queue: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub applied: Vec<ChangeOperation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<FailedOperation>,
    /// Changes a fresh snapshot still calls for after applying.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub remaining: Vec<ChangeOperation>,
}

impl ReconcileReport {
    fn new(queue: &str) -> Self {
        let now = Utc::now();
        Self {
            queue: queue.to_string(),
            started_at: now,
            finished_at: now,
            applied: Vec::new(),
            failures: Vec::new(),
            remaining: Vec::new(),
        }
    }

    /// No failures and nothing left to change.
    pub fn converged(&self) -> bool {
        self.failures.is_empty() && self.remaining.is_empty()
    }
}

/// Result of converging a queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "report", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    NoChanges,
    Changed(ReconcileReport),
}

/// Drives queues on one CUPS server toward their desired state.
pub struct Reconciler<R> {
    client: IppClient<R>,
    config: SpoolerConfig,
}

impl<R: ProcessRunner> Reconciler<R> {
    pub fn new(runner: R, config: SpoolerConfig) -> Self {
        Self {
            client: IppClient::new(runner, &config),
            config,
        }
    }

    pub fn client(&self) -> &IppClient<R> {
        &self.client
    }

    pub fn config(&self) -> &SpoolerConfig {
        &self.config
    }

    /// Current state of `queue`, or `None` if it does not exist.
    pub fn snapshot(&self, queue: &str) -> Result<Option<QueueSnapshot>> {
        validate_queue_name(queue)?;
        SnapshotReader::new(&self.client, &self.config).fetch(queue)
    }

    /// Changes that would converge `queue`, without applying any.
    #[instrument(skip(self, desired))]
    pub fn plan(&self, queue: &str, desired: &DesiredState) -> Result<Vec<ChangeOperation>> {
        desired.validate()?;
        let current = self.snapshot(queue)?;
        Ok(diff(current.as_ref(), desired))
    }

    /// Run the native commands for a single change, stopping at the first
    /// command that fails.
    pub fn apply_operation(&self, queue: &str, operation: &ChangeOperation) -> Result<()> {
        for invocation in native_commands(operation, queue, &self.config) {
            self.client.runner().run_checked(&invocation)?;
        }
        info!(queue, change = %operation, "applied");
        Ok(())
    }

    /// Apply `operations` in order according to the configured policy.
    ///
    /// With [`ApplyPolicy::StopOnFirstFailure`] the first error is returned
    /// as is. With [`ApplyPolicy::ContinueOnFailure`] failures are collected
    /// in the report; a failed create or delete still ends the pass, since
    /// everything after it addresses a queue in the wrong state.
    #[instrument(skip(self, operations), fields(count = operations.len()))]
    pub fn apply(&self, queue: &str, operations: &[ChangeOperation]) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::new(queue);

        for operation in operations {
            match self.apply_operation(queue, operation) {
                Ok(()) => report.applied.push(operation.clone()),
                Err(e) => {
                    error!(queue, change = %operation, error = %e, "change failed");
                    if self.config.apply_policy == ApplyPolicy::StopOnFirstFailure {
                        return Err(e);
                    }
                    report.failures.push(FailedOperation {
                        operation: operation.clone(),
                        error: e.to_string(),
                    });
                    if matches!(operation, ChangeOperation::Create { .. } | ChangeOperation::Delete) {
                        warn!(queue, "existence change failed, skipping the rest");
                        break;
                    }
                }
            }
        }

        report.finished_at = Utc::now();
        Ok(report)
    }

    /// Bring `queue` to `desired` and verify the result with a fresh
    /// snapshot.
    #[instrument(skip(self, desired))]
    pub fn converge(&self, queue: &str, desired: &DesiredState) -> Result<ReconcileOutcome> {
        let operations = self.plan(queue, desired)?;
        if operations.is_empty() {
            info!(queue, "already converged");
            return Ok(ReconcileOutcome::NoChanges);
        }

        let mut report = self.apply(queue, &operations)?;
        if !report.failures.is_empty() {
            return Err(QueuewerkError::ApplyFailed {
                queue: queue.to_string(),
                attempted: report.applied.len() + report.failures.len(),
                failed: report.failures.len(),
                messages: report
                    .failures
                    .iter()
                    .map(|f| format!("{}: {}", f.operation, f.error))
                    .collect(),
            });
        }

        let after = self.snapshot(queue)?;
        report.remaining = diff(after.as_ref(), desired);
        report.finished_at = Utc::now();
        if report.remaining.is_empty() {
            info!(queue, applied = report.applied.len(), "converged");
        } else {
            warn!(
                queue,
                remaining = report.remaining.len(),
                "queue did not converge after applying changes"
            );
        }
        Ok(ReconcileOutcome::Changed(report))
    }
}
