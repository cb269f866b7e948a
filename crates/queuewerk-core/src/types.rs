// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types: what a queue looks like on the server, and what the
// operator wants it to look like.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{QueuewerkError, Result};

/// User token that lifts every access restriction.
pub const ALL_USERS: &str = "all";

/// CUPS rejects destination names longer than this.
pub const MAX_QUEUE_NAME_LEN: usize = 127;

/// Whether a destination prints directly or fans out to member printers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueKind {
    Printer,
    Class,
}

impl QueueKind {
    /// Resource path prefix on the CUPS server.
    pub fn resource_prefix(&self) -> &'static str {
        match self {
            Self::Printer => "/printers/",
            Self::Class => "/classes/",
        }
    }
}

impl fmt::Display for QueueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Printer => f.write_str("printer"),
            Self::Class => f.write_str("class"),
        }
    }
}

/// Requested existence of a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ensure {
    Printer,
    Class,
    Absent,
}

impl Ensure {
    /// The queue kind this value asks for, `None` for `Absent`.
    pub fn kind(&self) -> Option<QueueKind> {
        match self {
            Self::Printer => Some(QueueKind::Printer),
            Self::Class => Some(QueueKind::Class),
            Self::Absent => None,
        }
    }
}

/// Whether the user list of an [`Access`] is an allow list or a deny list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessPolicy {
    Allow,
    Deny,
}

impl fmt::Display for AccessPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => f.write_str("allow"),
            Self::Deny => f.write_str("deny"),
        }
    }
}

/// Per-queue user access control.
///
/// Users are names or `@group` references. The token [`ALL_USERS`] anywhere
/// in the list means "no restriction", whatever the policy says.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Access {
    pub policy: AccessPolicy,
    pub users: Vec<String>,
}

impl Access {
    pub fn new<I, S>(policy: AccessPolicy, users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            policy,
            users: users.into_iter().map(Into::into).collect(),
        }
    }

    /// `allow:all`, the CUPS default.
    pub fn unrestricted() -> Self {
        Self::new(AccessPolicy::Allow, [ALL_USERS])
    }

    /// Whether this access control lets everybody print.
    pub fn is_unrestricted(&self) -> bool {
        self.users.is_empty() || self.users.iter().any(|u| u == ALL_USERS)
    }

    /// Canonical form: duplicate users removed (first occurrence wins) and
    /// any list mentioning `all` collapsed to `allow:all`.
    pub fn normalized(&self) -> Self {
        if self.is_unrestricted() {
            return Self::unrestricted();
        }

        let mut seen = BTreeSet::new();
        let users = self
            .users
            .iter()
            .filter(|user| seen.insert(user.as_str()))
            .cloned()
            .collect();
        Self {
            policy: self.policy,
            users,
        }
    }

    /// Whether both access controls restrict the same users in the same way,
    /// ignoring user order and duplicates.
    pub fn is_equivalent(&self, other: &Access) -> bool {
        let lhs = self.normalized();
        let rhs = other.normalized();
        lhs.policy == rhs.policy && user_set(&lhs) == user_set(&rhs)
    }

    /// Value for `lpadmin -u`, e.g. `allow:nina,@council`.
    pub fn to_lpadmin_arg(&self) -> String {
        let normalized = self.normalized();
        format!("{}:{}", normalized.policy, normalized.users.join(","))
    }
}

fn user_set(access: &Access) -> BTreeSet<&str> {
    access.users.iter().map(String::as_str).collect()
}

/// Read-only view of a queue's live state on the print server.
///
/// Built fresh for every reconciliation pass; a new snapshot is taken to
/// verify convergence rather than patching an old one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub name: String,
    pub kind: QueueKind,
    /// Member printers, for classes only.
    pub members: Vec<String>,
    /// Device URI, for printers only.
    pub device_uri: Option<String>,
    /// Driver description reported by CUPS, for printers only.
    pub make_and_model: Option<String>,
    pub access: Access,
    pub accepting: bool,
    pub enabled: bool,
    pub held: bool,
    pub description: String,
    pub location: String,
    pub shared: bool,
    /// Vendor (PPD) and native CUPS options with their current value.
    pub options: BTreeMap<String, String>,
}

impl QueueSnapshot {
    /// A snapshot with neutral property values: accepting, enabled, not
    /// held, unshared, unrestricted and without description or location.
    ///
    /// This is not what CUPS reports for a queue just added with `lpadmin`,
    /// which is stopped and rejecting jobs.
    pub fn with_defaults(name: impl Into<String>, kind: QueueKind) -> Self {
        Self {
            name: name.into(),
            kind,
            members: Vec::new(),
            device_uri: None,
            make_and_model: None,
            access: Access::unrestricted(),
            accepting: true,
            enabled: true,
            held: false,
            description: String::new(),
            location: String::new(),
            shared: false,
            options: BTreeMap::new(),
        }
    }
}

/// Declared target state of a queue. Every `None` field is left unmanaged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DesiredState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ensure: Option<Ensure>,
    /// Class members; only valid with `ensure = class`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<String>>,
    /// Device URI of a printer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// Driver passed to `lpadmin -m` when the printer is created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<Access>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepting: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub held: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared: Option<bool>,
}

impl DesiredState {
    /// Parse a desired state from its JSON representation.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// A description that is `None` or empty is unmanaged.
    pub fn managed_description(&self) -> Option<&str> {
        self.description.as_deref().filter(|s| !s.is_empty())
    }

    /// A location that is `None` or empty is unmanaged.
    pub fn managed_location(&self) -> Option<&str> {
        self.location.as_deref().filter(|s| !s.is_empty())
    }

    /// Reject combinations CUPS cannot represent.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| Err(QueuewerkError::InvalidDesiredState(reason.to_string()));

        match self.ensure {
            Some(Ensure::Class) => {
                match &self.members {
                    None => return invalid("a class needs 'members'"),
                    Some(members) if members.is_empty() => {
                        return invalid("a class needs at least one member");
                    }
                    Some(members) => {
                        for member in members {
                            validate_queue_name(member)?;
                        }
                    }
                }
                if self.uri.is_some() || self.model.is_some() {
                    return invalid("'uri' and 'model' only apply to printers");
                }
            }
            Some(Ensure::Printer) | None => {
                if self.members.is_some() {
                    return invalid("'members' requires ensure = class");
                }
            }
            Some(Ensure::Absent) => {
                if self.members.is_some() || self.uri.is_some() || self.model.is_some() {
                    return invalid("'members', 'uri' and 'model' cannot be combined with ensure = absent");
                }
            }
        }

        if let Some(options) = &self.options {
            if options.keys().any(|key| key.trim().is_empty()) {
                return invalid("option names must not be empty");
            }
        }

        if let Some(access) = &self.access {
            if access.users.iter().any(|user| user.trim().is_empty() || user.contains(',')) {
                return invalid("access users must be non-empty and must not contain ','");
            }
        }

        Ok(())
    }
}

/// Check a destination name against the rules `lpadmin` enforces.
pub fn validate_queue_name(name: &str) -> Result<()> {
    let reject = |reason: &str| {
        Err(QueuewerkError::InvalidQueueName {
            name: name.to_string(),
            reason: reason.to_string(),
        })
    };

    if name.is_empty() {
        return reject("name is empty");
    }
    if name.len() > MAX_QUEUE_NAME_LEN {
        return reject("name is longer than 127 bytes");
    }
    if name
        .chars()
        .any(|c| c == '/' || c == '#' || c.is_whitespace() || c.is_control())
    {
        return reject("name must not contain '/', '#', whitespace or control characters");
    }
    Ok(())
}
