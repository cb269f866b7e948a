// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Queuewerk.

use std::fmt;

use thiserror::Error;

use crate::ipp::IppRequest;

/// Status keyword that `ipptool` sometimes prints on stderr while exiting with
/// a failure code.
///
/// `successful-ok` is the IPP success status (RFC 2911 §3.1.6.1, carried over
/// into RFC 8011). Seeing it on the error channel means the tool and the
/// server disagree about the outcome, not that the request itself failed.
pub const SUCCESSFUL_OK_SENTINEL: &str = "successful-ok\n";

/// An `ipptool` invocation whose exit status and output do not describe a
/// usable response.
///
/// The message embeds the target URI, the request body, stdout and stderr so
/// a failure can be diagnosed without re-running the tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolError {
    pub request: IppRequest,
    pub stdout: String,
    pub stderr: String,
}

impl ProtocolError {
    pub fn new(request: IppRequest, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            request,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Whether stderr carries nothing but the IPP success status keyword.
    pub fn is_successful_ok_on_stderr(&self) -> bool {
        self.stderr == SUCCESSFUL_OK_SENTINEL
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "IPP request to '{}' failed",
            self.request.target_uri()
        )?;
        writeln!(f, "request:\n{}", self.request.body())?;
        writeln!(f, "stdout:\n{}", self.stdout)?;
        write!(f, "stderr:\n{}", self.stderr)?;

        if self.is_successful_ok_on_stderr() {
            write!(
                f,
                "\nipptool reported the status 'successful-ok' on stderr while signalling \
                 failure. RFC 2911 §3.1.6.1 defines 'successful-ok' as a success status, so \
                 this is an inconsistency of the tool rather than a rejected request."
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for ProtocolError {}

/// A native administration command (`lpadmin`, `cupsenable`, ...) exited
/// with a failure status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "command `{command_line}` failed with {}\nstdout:\n{stdout}\nstderr:\n{stderr}",
    describe_exit(.exit_code)
)]
pub struct CommandError {
    /// Program and arguments as they were invoked, shell-quoted for display.
    pub command_line: String,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

fn describe_exit(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("exit status {code}"),
        None => "no exit status (terminated by signal)".to_string(),
    }
}

/// Top-level error type for all Queuewerk operations.
#[derive(Debug, Error)]
pub enum QueuewerkError {
    // -- Spooler errors --
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{failed} of {attempted} change(s) to queue '{queue}' failed:\n{}", .messages.join("\n"))]
    ApplyFailed {
        queue: String,
        attempted: usize,
        failed: usize,
        messages: Vec<String>,
    },

    // -- Input errors --
    #[error("invalid desired state: {0}")]
    InvalidDesiredState(String),

    #[error("invalid queue name '{name}': {reason}")]
    InvalidQueueName { name: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, QueuewerkError>;
