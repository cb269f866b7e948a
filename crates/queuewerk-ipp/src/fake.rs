// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory CUPS stand-in for tests.
//
// Interprets the exact command lines the client and the apply step produce
// (`ipptool -c`, `lpoptions -l`, `lpadmin`, `cupsaccept`, ...) against a map
// of queues, so snapshot -> diff -> apply -> snapshot can run end to end.

use std::cell::RefCell;
use std::collections::BTreeMap;

use queuewerk_core::error::Result;
use queuewerk_core::types::{Access, AccessPolicy, QueueKind, QueueSnapshot};

use crate::client::NO_DESTINATIONS_SENTINEL;
use crate::options::is_native_option;
use crate::runner::{Invocation, ProcessOutput, ProcessRunner, output};

const SERVER_URI: &str = "ipp://localhost";
const MISSING_QUEUE: &str = "lpadmin: The printer or class does not exist.\n";

pub(crate) struct FakeSpooler {
    queues: RefCell<BTreeMap<String, QueueSnapshot>>,
    native: RefCell<Vec<String>>,
    fail_matching: RefCell<Option<String>>,
}

impl FakeSpooler {
    pub(crate) fn new() -> Self {
        Self {
            queues: RefCell::new(BTreeMap::new()),
            native: RefCell::new(Vec::new()),
            fail_matching: RefCell::new(None),
        }
    }

    pub(crate) fn add_printer(&self, name: &str, configure: impl FnOnce(&mut QueueSnapshot)) {
        let mut queue = new_printer(name, "file:///dev/null");
        configure(&mut queue);
        self.queues.borrow_mut().insert(name.to_string(), queue);
    }

    pub(crate) fn add_class(&self, name: &str, members: &[&str]) {
        let mut queue = QueueSnapshot::with_defaults(name, QueueKind::Class);
        queue.members = members.iter().map(|m| m.to_string()).collect();
        self.queues.borrow_mut().insert(name.to_string(), queue);
    }

    pub(crate) fn queue(&self, name: &str) -> Option<QueueSnapshot> {
        self.queues.borrow().get(name).cloned()
    }

    /// Administration commands run so far, as display strings.
    pub(crate) fn native_commands(&self) -> Vec<String> {
        self.native.borrow().clone()
    }

    /// Make every native command whose command line contains `needle` fail.
    pub(crate) fn fail_commands_matching(&self, needle: &str) {
        *self.fail_matching.borrow_mut() = Some(needle.to_string());
    }

    fn ipptool(&self, invocation: &Invocation) -> ProcessOutput {
        let body = invocation.stdin.as_deref().unwrap_or_default();
        let path = invocation
            .args
            .get(1)
            .and_then(|uri| uri.strip_prefix(SERVER_URI))
            .unwrap_or_default();
        let queues = self.queues.borrow();

        // CUPS-Get-Printers answers with every destination, classes included.
        let listing = |only: Option<QueueKind>| {
            let names: Vec<&String> = queues
                .iter()
                .filter(|(_, q)| only.is_none_or(|kind| q.kind == kind))
                .map(|(name, _)| name)
                .collect();
            if names.is_empty() {
                return output(1, "", NO_DESTINATIONS_SENTINEL);
            }
            let mut stdout = String::from("printer-name\n");
            for name in names {
                stdout.push_str(name);
                stdout.push('\n');
            }
            output(0, &stdout, "")
        };

        if body.contains("CUPS-Get-Printers") {
            return listing(None);
        }
        if body.contains("CUPS-Get-Classes") {
            return listing(Some(QueueKind::Class));
        }

        let Some(attribute) = body
            .lines()
            .find_map(|line| line.trim().strip_prefix("DISPLAY "))
        else {
            return output(1, "", "ipptool: Unable to read test file\n");
        };

        let queue = [QueueKind::Printer, QueueKind::Class].iter().find_map(|kind| {
            let name = path.strip_prefix(kind.resource_prefix())?;
            queues.get(name).filter(|q| q.kind == *kind)
        });
        let Some(queue) = queue else {
            return output(1, "", "client-error-not-found\n");
        };

        let value = attribute_value(queue, attribute).map(|v| csv_cell(&v)).unwrap_or_default();
        output(0, &format!("{attribute}\n{value}\n"), "")
    }

    fn lpoptions(&self, args: &[String]) -> ProcessOutput {
        let Some(name) = flag_value(args, "-p") else {
            return output(1, "", "lpoptions: missing destination\n");
        };
        let queues = self.queues.borrow();
        let Some(queue) = queues.get(name) else {
            return output(1, "", "lpoptions: Unknown printer or class.\n");
        };

        let mut stdout = String::new();
        for (key, value) in queue.options.iter().filter(|(key, _)| !is_native_option(key)) {
            stdout.push_str(&format!("{key}/{key}: *{value}\n"));
        }
        output(0, &stdout, "")
    }

    fn lpadmin(&self, args: &[String]) -> ProcessOutput {
        let mut queues = self.queues.borrow_mut();
        let mut target: Option<String> = None;
        let mut iter = args.iter();

        while let Some(flag) = iter.next() {
            if flag == "-E" {
                continue;
            }
            let Some(value) = iter.next() else {
                return output(1, "", "lpadmin: missing argument\n");
            };

            match flag.as_str() {
                "-p" => target = Some(value.clone()),
                "-x" => {
                    if queues.remove(value).is_none() {
                        return output(1, "", MISSING_QUEUE);
                    }
                }
                "-v" => {
                    let Some(name) = &target else {
                        return output(1, "", "lpadmin: -v requires -p\n");
                    };
                    queues
                        .entry(name.clone())
                        .and_modify(|q| q.device_uri = Some(value.clone()))
                        .or_insert_with(|| created(new_printer(name, value)));
                }
                "-c" | "-r" => {
                    let Some(member) = &target else {
                        return output(1, "", "lpadmin: -c/-r requires -p\n");
                    };
                    if queues.get(member).is_none_or(|q| q.kind != QueueKind::Printer) {
                        return output(1, "", MISSING_QUEUE);
                    }
                    if flag == "-c" {
                        let class = queues
                            .entry(value.clone())
                            .or_insert_with(|| {
                                created(QueueSnapshot::with_defaults(value.as_str(), QueueKind::Class))
                            });
                        if !class.members.contains(member) {
                            class.members.push(member.clone());
                        }
                    } else {
                        let Some(class) = queues.get_mut(value) else {
                            return output(1, "", MISSING_QUEUE);
                        };
                        class.members.retain(|m| m != member);
                        if class.members.is_empty() {
                            queues.remove(value);
                        }
                    }
                }
                _ => {
                    let Some(queue) = target.as_ref().and_then(|name| queues.get_mut(name)) else {
                        return output(1, "", MISSING_QUEUE);
                    };
                    match flag.as_str() {
                        "-m" => queue.make_and_model = Some(value.clone()),
                        "-D" => queue.description = value.clone(),
                        "-L" => queue.location = value.clone(),
                        "-u" => queue.access = parse_access(value),
                        "-o" => {
                            let (key, setting) = value.split_once('=').unwrap_or((value, ""));
                            if key == "printer-is-shared" {
                                queue.shared = setting == "true";
                            } else {
                                queue.options.insert(key.to_string(), setting.to_string());
                            }
                        }
                        other => return output(1, "", &format!("lpadmin: unknown option {other}\n")),
                    }
                }
            }
        }
        output(0, "", "")
    }

    fn toggle(&self, program: &str, args: &[String]) -> ProcessOutput {
        let mut queues = self.queues.borrow_mut();
        let Some(queue) = args.last().and_then(|name| queues.get_mut(name)) else {
            return output(1, "", &format!("{program}: The printer or class does not exist.\n"));
        };
        let hold = args.iter().any(|a| a == "--hold");
        let release = args.iter().any(|a| a == "--release");

        match program {
            "cupsaccept" => queue.accepting = true,
            "cupsreject" => queue.accepting = false,
            "cupsenable" if release => queue.held = false,
            "cupsenable" => queue.enabled = true,
            "cupsdisable" if hold => queue.held = true,
            "cupsdisable" => queue.enabled = false,
            _ => return output(127, "", "command not found\n"),
        }
        output(0, "", "")
    }
}

impl ProcessRunner for FakeSpooler {
    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput> {
        let program = invocation.program.as_str();
        if program == "ipptool" {
            return Ok(self.ipptool(invocation));
        }
        if program == "lpoptions" {
            return Ok(self.lpoptions(&invocation.args));
        }

        let line = invocation.to_string();
        self.native.borrow_mut().push(line.clone());
        if let Some(needle) = self.fail_matching.borrow().as_deref() {
            if line.contains(needle) {
                return Ok(output(1, "", "simulated failure\n"));
            }
        }

        Ok(match program {
            "lpadmin" => self.lpadmin(&invocation.args),
            _ => self.toggle(program, &invocation.args),
        })
    }
}

fn new_printer(name: &str, uri: &str) -> QueueSnapshot {
    let mut queue = QueueSnapshot::with_defaults(name, QueueKind::Printer);
    queue.device_uri = Some(uri.to_string());
    queue.make_and_model = Some("Local Raw Printer".into());
    queue
}

/// Destinations added with `lpadmin` start out stopped and rejecting jobs.
fn created(mut queue: QueueSnapshot) -> QueueSnapshot {
    queue.accepting = false;
    queue.enabled = false;
    queue
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn parse_access(value: &str) -> Access {
    let (policy, users) = value.split_once(':').unwrap_or(("allow", value));
    let policy = if policy == "deny" {
        AccessPolicy::Deny
    } else {
        AccessPolicy::Allow
    };
    let access = Access::new(policy, users.split(',').filter(|u| !u.is_empty()));
    if access.is_unrestricted() {
        Access::unrestricted()
    } else {
        access
    }
}

/// Raw attribute value the way CUPS would report it, before CSV quoting.
fn attribute_value(queue: &QueueSnapshot, attribute: &str) -> Option<String> {
    let flag = |b: bool| Some(b.to_string());
    let restricted = !queue.access.is_unrestricted();

    match attribute {
        "printer-is-accepting-jobs" => flag(queue.accepting),
        "printer-is-shared" => flag(queue.shared),
        "printer-state" => Some(if queue.enabled { "idle" } else { "stopped" }.to_string()),
        "printer-state-reasons" => {
            let mut reasons = Vec::new();
            if !queue.enabled {
                reasons.push("paused");
            }
            if queue.held {
                reasons.push("hold-new-jobs");
            }
            if reasons.is_empty() {
                reasons.push("none");
            }
            Some(reasons.join(","))
        }
        "printer-info" => Some(queue.description.clone()),
        "printer-location" => Some(queue.location.clone()),
        "requesting-user-name-allowed" if restricted && queue.access.policy == AccessPolicy::Allow => {
            Some(queue.access.users.join(","))
        }
        "requesting-user-name-denied" if restricted && queue.access.policy == AccessPolicy::Deny => {
            Some(queue.access.users.join(","))
        }
        "member-names" if queue.kind == QueueKind::Class => Some(queue.members.join(",")),
        "device-uri" => queue.device_uri.clone(),
        "printer-make-and-model" => queue.make_and_model.clone(),
        other if is_native_option(other) => queue.options.get(other).cloned(),
        _ => None,
    }
}

fn csv_cell(value: &str) -> String {
    if value.contains(',') || value.contains('"') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
