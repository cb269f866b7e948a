// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Process execution boundary.
//
// Every interaction with CUPS goes through a child process: `ipptool` for
// queries, `lpadmin` and friends for changes. `ProcessRunner` is the seam
// between deciding what to run and actually running it, so tests can swap
// in a scripted runner or an in-memory spooler.

use std::fmt;
use std::io::{ErrorKind, Write};
use std::process::{Command, Stdio};

use tracing::debug;

use queuewerk_core::error::{CommandError, QueuewerkError, Result};

/// A program with its arguments and optional stdin payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub stdin: Option<String>,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            stdin: None,
        }
    }

    pub fn with_stdin(mut self, stdin: impl Into<String>) -> Self {
        self.stdin = Some(stdin.into());
        self
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&shell_quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", shell_quote(arg))?;
        }
        Ok(())
    }
}

/// Quote an argument for display so a logged command line can be pasted
/// into a shell.
fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=,@%+".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// Captured result of a finished child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs a program to completion and captures its output.
///
/// A non-zero exit is not an error at this level; only a failure to start
/// or wait for the process is.
pub trait ProcessRunner {
    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput>;

    /// Run a native command and turn a failure exit into [`CommandError`].
    fn run_checked(&self, invocation: &Invocation) -> Result<ProcessOutput> {
        let output = self.run(invocation)?;
        if output.success() {
            Ok(output)
        } else {
            Err(CommandError {
                command_line: invocation.to_string(),
                exit_code: output.exit_code,
                stdout: output.stdout,
                stderr: output.stderr,
            }
            .into())
        }
    }
}

impl<R: ProcessRunner + ?Sized> ProcessRunner for &R {
    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput> {
        (**self).run(invocation)
    }
}

/// Production runner spawning real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput> {
        debug!(command = %invocation, "spawning");

        let spawn_error = |source: std::io::Error| QueuewerkError::Spawn {
            program: invocation.program.clone(),
            source,
        };

        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(if invocation.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;

        if let Some(input) = &invocation.stdin {
            // Dropping the handle closes the pipe so the child sees EOF.
            if let Some(mut stdin) = child.stdin.take() {
                match stdin.write_all(input.as_bytes()) {
                    Ok(()) => {}
                    // The child exited without reading everything; its exit
                    // status and output still decide the outcome.
                    Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                        debug!(command = %invocation, "child closed stdin early");
                    }
                    Err(e) => {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(spawn_error(e));
                    }
                }
            }
        }

        let output = child.wait_with_output().map_err(spawn_error)?;
        let result = ProcessOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        };

        debug!(
            command = %invocation,
            exit_code = ?result.exit_code,
            stdout_len = result.stdout.len(),
            stderr_len = result.stderr.len(),
            "process finished"
        );
        Ok(result)
    }
}

/// Test-double runner that records invocations and replays scripted outputs.
#[cfg(test)]
pub(crate) struct MockRunner {
    responses: std::cell::RefCell<std::collections::VecDeque<ProcessOutput>>,
    invocations: std::cell::RefCell<Vec<Invocation>>,
}

#[cfg(test)]
impl MockRunner {
    pub(crate) fn with_responses(responses: Vec<ProcessOutput>) -> Self {
        Self {
            responses: std::cell::RefCell::new(responses.into()),
            invocations: std::cell::RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn invocations(&self) -> Vec<Invocation> {
        self.invocations.borrow().clone()
    }
}

#[cfg(test)]
impl ProcessRunner for MockRunner {
    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput> {
        self.invocations.borrow_mut().push(invocation.clone());
        Ok(self
            .responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| output(0, "", "")))
    }
}

/// Shorthand for building a [`ProcessOutput`] in tests.
#[cfg(test)]
pub(crate) fn output(exit_code: i32, stdout: &str, stderr: &str) -> ProcessOutput {
    ProcessOutput {
        stdout: stdout.into(),
        stderr: stderr.into(),
        exit_code: Some(exit_code),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_quotes_only_when_needed() {
        let invocation = Invocation::new("lpadmin", ["-E", "-p", "Office", "-D", "Room 101's printer"]);
        assert_eq!(
            invocation.to_string(),
            r"lpadmin -E -p Office -D 'Room 101'\''s printer'"
        );
    }

    #[test]
    fn display_quotes_empty_arguments() {
        let invocation = Invocation::new("lpadmin", ["-E", "-p", "Office", "-L", ""]);
        assert_eq!(invocation.to_string(), "lpadmin -E -p Office -L ''");
    }

    #[test]
    fn mock_runner_records_invocations_and_replays_outputs() {
        let runner = MockRunner::with_responses(vec![output(0, "first", ""), output(1, "", "nope")]);

        let first = runner.run(&Invocation::new("cupsenable", ["-E", "Office"])).expect("run");
        assert!(first.success());
        let second = runner.run(&Invocation::new("cupsenable", ["-E", "Office"])).expect("run");
        assert!(!second.success());

        assert_eq!(runner.invocations().len(), 2);
    }

    #[test]
    fn run_checked_turns_failure_into_command_error() {
        let runner = MockRunner::with_responses(vec![output(
            1,
            "",
            "lpadmin: The printer or class does not exist.\n",
        )]);

        let err = runner
            .run_checked(&Invocation::new("lpadmin", ["-E", "-x", "Office"]))
            .expect_err("non-zero exit must fail");
        match err {
            QueuewerkError::Command(e) => {
                assert_eq!(e.command_line, "lpadmin -E -x Office");
                assert_eq!(e.exit_code, Some(1));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn system_runner_reports_missing_program() {
        let err = SystemRunner
            .run(&Invocation::new("/nonexistent/queuewerk-test-binary", Vec::<String>::new()))
            .expect_err("spawn must fail");
        assert!(matches!(err, QueuewerkError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn unread_stdin_still_yields_exit_status() {
        let output = SystemRunner
            .run(&Invocation::new("true", Vec::<String>::new()).with_stdin("x".repeat(1 << 20)))
            .expect("run true");
        assert!(output.success());

        let output = SystemRunner
            .run(&Invocation::new("false", Vec::<String>::new()).with_stdin("x".repeat(1 << 20)))
            .expect("run false");
        assert_eq!(output.exit_code, Some(1));
    }

    #[cfg(unix)]
    #[test]
    fn system_runner_pipes_stdin() {
        let output = SystemRunner
            .run(&Invocation::new("cat", Vec::<String>::new()).with_stdin("hello\n"))
            .expect("run cat");
        assert!(output.success());
        assert_eq!(output.stdout, "hello\n");
    }
}
