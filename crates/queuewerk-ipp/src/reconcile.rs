// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Diff engine: compares a queue snapshot with a desired state and decides
// which changes bring the queue in line.
//
// The diff is pure. It performs no I/O and cannot fail, which keeps it
// usable as a dry run and as the convergence check after an apply.
//
// Operations come out in a fixed order:
//   1. existence (delete / create)
//   2. identity (device URI, class members)
//   3. access
//   4. accepting, description, enabled, held, location, options, shared

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use queuewerk_core::types::{Access, DesiredState, Ensure, QueueKind, QueueSnapshot};

/// On/off queue properties, each with its own native command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BoolProperty {
    Accepting,
    Enabled,
    Held,
    Shared,
}

impl BoolProperty {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Accepting => "accepting",
            Self::Enabled => "enabled",
            Self::Held => "held",
            Self::Shared => "shared",
        }
    }

    fn current(&self, snapshot: &QueueSnapshot) -> bool {
        match self {
            Self::Accepting => snapshot.accepting,
            Self::Enabled => snapshot.enabled,
            Self::Held => snapshot.held,
            Self::Shared => snapshot.shared,
        }
    }

    fn desired(&self, desired: &DesiredState) -> Option<bool> {
        match self {
            Self::Accepting => desired.accepting,
            Self::Enabled => desired.enabled,
            Self::Held => desired.held,
            Self::Shared => desired.shared,
        }
    }
}

/// Free-text queue properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TextProperty {
    Description,
    Location,
}

impl TextProperty {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Description => "description",
            Self::Location => "location",
        }
    }

    fn current<'a>(&self, snapshot: &'a QueueSnapshot) -> &'a str {
        match self {
            Self::Description => &snapshot.description,
            Self::Location => &snapshot.location,
        }
    }

    fn desired<'a>(&self, desired: &'a DesiredState) -> Option<&'a str> {
        match self {
            Self::Description => desired.managed_description(),
            Self::Location => desired.managed_location(),
        }
    }
}

/// A manageable queue property. Each variant owns its comparison and the
/// operations it emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Property {
    Access,
    Boolean(BoolProperty),
    Text(TextProperty),
    Options,
}

/// Properties compared after existence, in emission order.
pub const MANAGED_PROPERTIES: [Property; 8] = [
    Property::Access,
    Property::Boolean(BoolProperty::Accepting),
    Property::Text(TextProperty::Description),
    Property::Boolean(BoolProperty::Enabled),
    Property::Boolean(BoolProperty::Held),
    Property::Text(TextProperty::Location),
    Property::Options,
    Property::Boolean(BoolProperty::Shared),
];

impl Property {
    /// Operations converging this property. With no current snapshot (queue
    /// about to be created) every managed value is set.
    pub fn changes(&self, current: Option<&QueueSnapshot>, desired: &DesiredState) -> Vec<ChangeOperation> {
        match self {
            Self::Access => {
                let Some(wanted) = &desired.access else {
                    return Vec::new();
                };
                let converged = current.is_some_and(|snapshot| snapshot.access.is_equivalent(wanted));
                if converged {
                    Vec::new()
                } else {
                    vec![ChangeOperation::SetAccess(wanted.normalized())]
                }
            }
            Self::Boolean(property) => match property.desired(desired) {
                Some(value) if current.is_none_or(|s| property.current(s) != value) => {
                    vec![ChangeOperation::SetBoolean {
                        property: *property,
                        value,
                    }]
                }
                _ => Vec::new(),
            },
            Self::Text(property) => match property.desired(desired) {
                Some(value) if current.is_none_or(|s| property.current(s) != value) => {
                    vec![ChangeOperation::SetText {
                        property: *property,
                        value: value.to_string(),
                    }]
                }
                _ => Vec::new(),
            },
            Self::Options => {
                let Some(wanted) = &desired.options else {
                    return Vec::new();
                };
                wanted
                    .iter()
                    .filter(|(key, value)| {
                        current.is_none_or(|s| s.options.get(key.as_str()) != Some(*value))
                    })
                    .map(|(key, value)| ChangeOperation::SetOption {
                        key: key.clone(),
                        value: value.clone(),
                    })
                    .collect()
            }
        }
    }
}

/// A single change to a queue, translated into native commands on apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ChangeOperation {
    /// Create the queue. Printers get a device URI (the configured default
    /// when `None`) and optional driver; classes are created by adding
    /// their first members.
    Create {
        kind: QueueKind,
        #[serde(skip_serializing_if = "Option::is_none")]
        uri: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        model: Option<String>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        members: Vec<String>,
    },
    Delete,
    SetDeviceUri {
        uri: String,
    },
    SetMembers {
        add: Vec<String>,
        remove: Vec<String>,
    },
    SetAccess(Access),
    SetBoolean {
        property: BoolProperty,
        value: bool,
    },
    SetText {
        property: TextProperty,
        value: String,
    },
    SetOption {
        key: String,
        value: String,
    },
}

impl fmt::Display for ChangeOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create { kind, .. } => write!(f, "create {kind}"),
            Self::Delete => f.write_str("delete"),
            Self::SetDeviceUri { uri } => write!(f, "set uri => '{uri}'"),
            Self::SetMembers { add, remove } => {
                write!(f, "set members: add [{}], remove [{}]", add.join(", "), remove.join(", "))
            }
            Self::SetAccess(access) => write!(f, "set access => {}", access.to_lpadmin_arg()),
            Self::SetBoolean { property, value } => write!(f, "set {} => {value}", property.name()),
            Self::SetText { property, value } => write!(f, "set {} => '{value}'", property.name()),
            Self::SetOption { key, value } => write!(f, "set option {key} => '{value}'"),
        }
    }
}

/// Operations converging `current` (or an absent queue) to `desired`.
///
/// Applying the result and diffing a fresh snapshot again yields an empty
/// list.
pub fn diff(current: Option<&QueueSnapshot>, desired: &DesiredState) -> Vec<ChangeOperation> {
    let mut operations = Vec::new();

    let baseline = match (desired.ensure, current) {
        (Some(Ensure::Absent), Some(_)) => return vec![ChangeOperation::Delete],
        (Some(Ensure::Absent), None) | (None, None) => return Vec::new(),
        (Some(ensure), None) => {
            operations.push(create(ensure, desired));
            None
        }
        (Some(ensure), Some(snapshot)) if ensure.kind() != Some(snapshot.kind) => {
            operations.push(ChangeOperation::Delete);
            operations.push(create(ensure, desired));
            None
        }
        (_, Some(snapshot)) => {
            operations.extend(identity_changes(snapshot, desired));
            Some(snapshot)
        }
    };

    for property in MANAGED_PROPERTIES {
        operations.extend(property.changes(baseline, desired));
    }
    operations
}

fn create(ensure: Ensure, desired: &DesiredState) -> ChangeOperation {
    match ensure {
        Ensure::Class => ChangeOperation::Create {
            kind: QueueKind::Class,
            uri: None,
            model: None,
            members: unique(desired.members.as_deref().unwrap_or_default()),
        },
        Ensure::Printer | Ensure::Absent => ChangeOperation::Create {
            kind: QueueKind::Printer,
            uri: desired.uri.clone(),
            model: desired.model.clone(),
            members: Vec::new(),
        },
    }
}

/// Device URI and class membership of an existing queue.
fn identity_changes(snapshot: &QueueSnapshot, desired: &DesiredState) -> Vec<ChangeOperation> {
    let mut operations = Vec::new();

    match snapshot.kind {
        QueueKind::Printer => {
            if let Some(uri) = &desired.uri {
                if snapshot.device_uri.as_deref() != Some(uri.as_str()) {
                    operations.push(ChangeOperation::SetDeviceUri { uri: uri.clone() });
                }
            }
        }
        QueueKind::Class => {
            if let Some(members) = &desired.members {
                let wanted = unique(members);
                let current: BTreeSet<&str> = snapshot.members.iter().map(String::as_str).collect();
                let wanted_set: BTreeSet<&str> = wanted.iter().map(String::as_str).collect();

                let add: Vec<String> = wanted
                    .iter()
                    .filter(|m| !current.contains(m.as_str()))
                    .cloned()
                    .collect();
                let remove: Vec<String> = snapshot
                    .members
                    .iter()
                    .filter(|m| !wanted_set.contains(m.as_str()))
                    .cloned()
                    .collect();

                if !add.is_empty() || !remove.is_empty() {
                    operations.push(ChangeOperation::SetMembers { add, remove });
                }
            }
        }
    }
    operations
}

fn unique(items: &[String]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    items
        .iter()
        .filter(|item| seen.insert(item.as_str()))
        .cloned()
        .collect()
}
