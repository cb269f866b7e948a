// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Spooler configuration: where the CUPS server lives and which binaries
// talk to it.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{QueuewerkError, Result};

/// What to do with the remaining changes once one of them fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyPolicy {
    /// Surface the first failure and leave the rest unapplied.
    #[default]
    StopOnFirstFailure,
    /// Apply every change and report all failures together.
    ContinueOnFailure,
}

/// Persistent spooler settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpoolerConfig {
    /// Base URI of the CUPS server; request paths are appended to it.
    pub server_uri: String,
    /// Value of `requesting-user-name` in IPP requests.
    pub requesting_user: String,
    /// Device URI for printers created without an explicit `uri`.
    pub default_device_uri: String,
    pub apply_policy: ApplyPolicy,
    pub tools: ToolPaths,
}

/// Executable names or absolute paths of the CUPS command-line tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPaths {
    pub ipptool: String,
    pub lpadmin: String,
    pub lpoptions: String,
    pub cupsaccept: String,
    pub cupsreject: String,
    pub cupsenable: String,
    pub cupsdisable: String,
}

impl Default for SpoolerConfig {
    fn default() -> Self {
        Self {
            server_uri: "ipp://localhost".into(),
            requesting_user: "root".into(),
            default_device_uri: "file:///dev/null".into(),
            apply_policy: ApplyPolicy::default(),
            tools: ToolPaths::default(),
        }
    }
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            ipptool: "ipptool".into(),
            lpadmin: "lpadmin".into(),
            lpoptions: "lpoptions".into(),
            cupsaccept: "cupsaccept".into(),
            cupsreject: "cupsreject".into(),
            cupsenable: "cupsenable".into(),
            cupsdisable: "cupsdisable".into(),
        }
    }
}

impl SpoolerConfig {
    /// Load settings from a JSON file. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };

        let config: Self = serde_json::from_str(&json)
            .map_err(|e| QueuewerkError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Write settings as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if !(self.server_uri.starts_with("ipp://") || self.server_uri.starts_with("ipps://")) {
            return Err(QueuewerkError::Config(format!(
                "server_uri '{}' must use the ipp:// or ipps:// scheme",
                self.server_uri
            )));
        }
        if self.server_uri.ends_with('/') {
            return Err(QueuewerkError::Config(format!(
                "server_uri '{}' must not end with '/'",
                self.server_uri
            )));
        }
        if self.requesting_user.is_empty() {
            return Err(QueuewerkError::Config("requesting_user must not be empty".into()));
        }
        Ok(())
    }
}
