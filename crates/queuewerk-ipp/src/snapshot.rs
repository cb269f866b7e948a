// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Reads the live state of one queue into a `QueueSnapshot`.
//
// Existence comes from the CUPS-Get-Classes / CUPS-Get-Printers listings,
// which answer "No destinations added." rather than failing when nothing
// matches. Every property is then read with its own Get-Printer-Attributes
// request, and vendor options with `lpoptions -l`.

use std::collections::BTreeMap;

use tracing::{debug, instrument};

use queuewerk_core::config::SpoolerConfig;
use queuewerk_core::error::Result;
use queuewerk_core::ipp::unquote_csv;
use queuewerk_core::types::{Access, AccessPolicy, QueueKind, QueueSnapshot};

use crate::client::IppClient;
use crate::options::{NATIVE_OPTIONS, parse_vendor_options};
use crate::runner::{Invocation, ProcessRunner};

/// `printer-state-reasons` keyword present while new jobs are held.
const HOLD_NEW_JOBS_REASON: &str = "hold-new-jobs";

/// Builds snapshots from a client and the configured status tools.
pub struct SnapshotReader<'a, R> {
    client: &'a IppClient<R>,
    lpoptions: &'a str,
}

impl<'a, R: ProcessRunner> SnapshotReader<'a, R> {
    pub fn new(client: &'a IppClient<R>, config: &'a SpoolerConfig) -> Self {
        Self {
            client,
            lpoptions: &config.tools.lpoptions,
        }
    }

    /// Snapshot of `name`, or `None` when no such printer or class exists.
    #[instrument(skip(self))]
    pub fn fetch(&self, name: &str) -> Result<Option<QueueSnapshot>> {
        let Some(kind) = self.locate(name)? else {
            debug!("queue is absent");
            return Ok(None);
        };

        let allowed = self.list_attribute(kind, name, "requesting-user-name-allowed")?;
        let denied = self.list_attribute(kind, name, "requesting-user-name-denied")?;
        let access = if !allowed.is_empty() {
            Access::new(AccessPolicy::Allow, allowed)
        } else if !denied.is_empty() {
            Access::new(AccessPolicy::Deny, denied)
        } else {
            Access::unrestricted()
        };

        let state = self.attribute(kind, name, "printer-state")?;
        let reasons = self.list_attribute(kind, name, "printer-state-reasons")?;

        let (members, device_uri, make_and_model) = match kind {
            QueueKind::Class => (self.list_attribute(kind, name, "member-names")?, None, None),
            QueueKind::Printer => (
                Vec::new(),
                self.attribute(kind, name, "device-uri")?,
                self.attribute(kind, name, "printer-make-and-model")?,
            ),
        };

        let snapshot = QueueSnapshot {
            name: name.to_string(),
            kind,
            members,
            device_uri,
            make_and_model,
            access,
            accepting: self.attribute(kind, name, "printer-is-accepting-jobs")?.as_deref()
                == Some("true"),
            enabled: !matches!(state.as_deref(), Some("stopped") | Some("5")),
            held: reasons.iter().any(|r| r == HOLD_NEW_JOBS_REASON),
            description: self
                .attribute(kind, name, "printer-info")?
                .unwrap_or_default(),
            location: self
                .attribute(kind, name, "printer-location")?
                .unwrap_or_default(),
            shared: self.attribute(kind, name, "printer-is-shared")?.as_deref() == Some("true"),
            options: self.options(kind, name)?,
        };

        debug!(?snapshot, "queue snapshot");
        Ok(Some(snapshot))
    }

    fn locate(&self, name: &str) -> Result<Option<QueueKind>> {
        let (printers, classes) = self.client.list_destinations()?;
        if classes.iter().any(|c| c == name) {
            return Ok(Some(QueueKind::Class));
        }
        if printers.iter().any(|p| p == name) {
            return Ok(Some(QueueKind::Printer));
        }
        Ok(None)
    }

    /// Single attribute value; an unset or empty attribute reads as `None`.
    fn attribute(&self, kind: QueueKind, name: &str, attribute: &str) -> Result<Option<String>> {
        let response = self.client.queue_attribute(kind, name, attribute)?;
        Ok(response
            .joined_values()
            .map(|value| unquote_csv(&value))
            .filter(|value| !value.is_empty()))
    }

    /// Multi-valued attribute split into its members.
    fn list_attribute(&self, kind: QueueKind, name: &str, attribute: &str) -> Result<Vec<String>> {
        Ok(self
            .attribute(kind, name, attribute)?
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }

    fn options(&self, kind: QueueKind, name: &str) -> Result<BTreeMap<String, String>> {
        let mut options = match kind {
            QueueKind::Printer => {
                let invocation = Invocation::new(self.lpoptions, ["-E", "-p", name, "-l"]);
                let output = self.client.runner().run_checked(&invocation)?;
                parse_vendor_options(&output.stdout)
            }
            QueueKind::Class => BTreeMap::new(),
        };

        for option in NATIVE_OPTIONS {
            if let Some(value) = self.attribute(kind, name, option)? {
                options.insert((*option).to_string(), value);
            }
        }
        Ok(options)
    }
}
