// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Translation of change operations into CUPS administration commands.
//
// `-E` before `-p` only forces an encrypted connection to the scheduler. A
// new destination starts out stopped and rejecting jobs; accepting and
// enabled are set by their own operations.

use queuewerk_core::config::SpoolerConfig;
use queuewerk_core::types::QueueKind;

use crate::reconcile::{BoolProperty, ChangeOperation, TextProperty};
use crate::runner::Invocation;

/// Native commands performing `operation` on `queue`, in execution order.
pub fn native_commands(
    operation: &ChangeOperation,
    queue: &str,
    config: &SpoolerConfig,
) -> Vec<Invocation> {
    let tools = &config.tools;
    let lpadmin = |args: &[&str]| {
        let mut full = vec!["-E", "-p", queue];
        full.extend_from_slice(args);
        Invocation::new(tools.lpadmin.as_str(), full)
    };

    match operation {
        ChangeOperation::Create {
            kind: QueueKind::Printer,
            uri,
            model,
            ..
        } => {
            let uri = uri.as_deref().unwrap_or(&config.default_device_uri);
            let mut args = vec!["-v", uri];
            if let Some(model) = model {
                args.extend(["-m", model.as_str()]);
            }
            vec![lpadmin(&args)]
        }
        ChangeOperation::Create {
            kind: QueueKind::Class,
            members,
            ..
        } => members
            .iter()
            .map(|member| Invocation::new(tools.lpadmin.as_str(), ["-E", "-p", member.as_str(), "-c", queue]))
            .collect(),
        ChangeOperation::Delete => {
            vec![Invocation::new(tools.lpadmin.as_str(), ["-E", "-x", queue])]
        }
        ChangeOperation::SetDeviceUri { uri } => vec![lpadmin(&["-v", uri])],
        // Members are added before any are removed so the class never
        // drops to zero members, which would make CUPS delete it.
        ChangeOperation::SetMembers { add, remove } => add
            .iter()
            .map(|member| Invocation::new(tools.lpadmin.as_str(), ["-E", "-p", member.as_str(), "-c", queue]))
            .chain(remove.iter().map(|member| {
                Invocation::new(tools.lpadmin.as_str(), ["-E", "-p", member.as_str(), "-r", queue])
            }))
            .collect(),
        ChangeOperation::SetAccess(access) => vec![lpadmin(&["-u", &access.to_lpadmin_arg()])],
        ChangeOperation::SetBoolean { property, value } => {
            let invocation = match (property, value) {
                (BoolProperty::Accepting, true) => Invocation::new(tools.cupsaccept.as_str(), ["-E", queue]),
                (BoolProperty::Accepting, false) => Invocation::new(tools.cupsreject.as_str(), ["-E", queue]),
                (BoolProperty::Enabled, true) => Invocation::new(tools.cupsenable.as_str(), ["-E", queue]),
                (BoolProperty::Enabled, false) => Invocation::new(tools.cupsdisable.as_str(), ["-E", queue]),
                (BoolProperty::Held, true) => {
                    Invocation::new(tools.cupsdisable.as_str(), ["-E", "--hold", queue])
                }
                (BoolProperty::Held, false) => {
                    Invocation::new(tools.cupsenable.as_str(), ["-E", "--release", queue])
                }
                (BoolProperty::Shared, shared) => {
                    lpadmin(&["-o", &format!("printer-is-shared={shared}")])
                }
            };
            vec![invocation]
        }
        ChangeOperation::SetText { property, value } => {
            let flag = match property {
                TextProperty::Description => "-D",
                TextProperty::Location => "-L",
            };
            vec![lpadmin(&[flag, value])]
        }
        ChangeOperation::SetOption { key, value } => {
            vec![lpadmin(&["-o", &format!("{key}={value}")])]
        }
    }
}
