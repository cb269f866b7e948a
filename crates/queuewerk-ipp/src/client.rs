// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Synchronous IPP client driving `ipptool` in CSV mode.
//
// Each request is written to ipptool's stdin as a test file and sent to
// `<server_uri><target_uri>`. ipptool signals success and failure
// inconsistently, so the exit status alone is never trusted:
//
//   exit 0, stdout non-empty          -> response
//   exit 0, stdout empty              -> error (failure posing as success)
//   exit != 0, "No destinations added" -> response (nothing matched)
//   exit != 0, anything else          -> error

use tracing::{debug, error, instrument};

use queuewerk_core::config::SpoolerConfig;
use queuewerk_core::error::{ProtocolError, Result};
use queuewerk_core::ipp::{IppRequest, IppResponse};
use queuewerk_core::types::QueueKind;

use crate::runner::{Invocation, ProcessRunner};

/// stderr text CUPS produces when a request matched no destination.
///
/// Printed by ipptool when a listing is empty or the addressed queue does
/// not exist; it describes an empty result, not a failure.
pub const NO_DESTINATIONS_SENTINEL: &str = "No destinations added.\n";

/// Client bound to one CUPS server.
pub struct IppClient<R> {
    runner: R,
    ipptool: String,
    server_uri: String,
    requesting_user: String,
}

impl<R: ProcessRunner> IppClient<R> {
    pub fn new(runner: R, config: &SpoolerConfig) -> Self {
        Self {
            runner,
            ipptool: config.tools.ipptool.clone(),
            server_uri: config.server_uri.clone(),
            requesting_user: config.requesting_user.clone(),
        }
    }

    /// The runner used for every spawned process.
    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Send one request and classify the outcome.
    #[instrument(skip(self, request), fields(uri = %request.target_uri()))]
    pub fn execute(&self, request: &IppRequest) -> Result<IppResponse> {
        let invocation = Invocation::new(
            self.ipptool.as_str(),
            [
                "-c".to_string(),
                format!("{}{}", self.server_uri, request.target_uri()),
                "/dev/stdin".to_string(),
            ],
        )
        .with_stdin(request.body());

        let output = self.runner.run(&invocation)?;

        if output.success() {
            if output.stdout.is_empty() {
                error!("ipptool exited successfully without output");
                return Err(ProtocolError::new(request.clone(), output.stdout, output.stderr).into());
            }
            return Ok(IppResponse::new(output.stdout));
        }

        if output.stderr == NO_DESTINATIONS_SENTINEL {
            debug!("no destinations matched");
            return Ok(IppResponse::new(output.stdout));
        }

        error!(exit_code = ?output.exit_code, stderr = %output.stderr.trim_end(), "ipptool failed");
        Err(ProtocolError::new(request.clone(), output.stdout, output.stderr).into())
    }

    /// Run a request against the server itself and return its values.
    pub fn query(&self, body: &str) -> Result<Vec<String>> {
        let response = self.execute(&IppRequest::new("", body))?;
        Ok(response.values().into_iter().map(str::to_string).collect())
    }

    /// Printer and class names known to the server, as `(printers, classes)`.
    ///
    /// CUPS-Get-Printers lists every destination, classes included; printers
    /// are what remains once the class names are removed.
    pub fn list_destinations(&self) -> Result<(Vec<String>, Vec<String>)> {
        let destinations = self.query(&listing_request("CUPS-Get-Printers"))?;
        let classes = self.list_classes()?;
        let printers = destinations
            .into_iter()
            .filter(|name| !classes.contains(name))
            .collect();
        Ok((printers, classes))
    }

    /// Names of the printers (not classes) known to the server.
    pub fn list_printers(&self) -> Result<Vec<String>> {
        Ok(self.list_destinations()?.0)
    }

    /// Names of all classes known to the server.
    pub fn list_classes(&self) -> Result<Vec<String>> {
        self.query(&listing_request("CUPS-Get-Classes"))
    }

    /// Read a single attribute of a queue via Get-Printer-Attributes.
    pub fn queue_attribute(
        &self,
        kind: QueueKind,
        queue: &str,
        attribute: &str,
    ) -> Result<IppResponse> {
        let request = IppRequest::new(
            format!("{}{}", kind.resource_prefix(), queue),
            attribute_request(&self.requesting_user, attribute),
        );
        self.execute(&request)
    }
}

/// ipptool test body for a CUPS listing operation displaying `printer-name`.
fn listing_request(operation: &str) -> String {
    format!(
        "{{\n\
         \tOPERATION {operation}\n\
         \tGROUP operation\n\
         \tATTR charset attributes-charset utf-8\n\
         \tATTR language attributes-natural-language en\n\
         \tATTR keyword requested-attributes printer-name\n\
         \tDISPLAY printer-name\n\
         }}\n"
    )
}

/// ipptool test body reading one printer attribute of the addressed queue.
fn attribute_request(requesting_user: &str, attribute: &str) -> String {
    format!(
        "{{\n\
         \tOPERATION Get-Printer-Attributes\n\
         \tGROUP operation\n\
         \tATTR charset attributes-charset utf-8\n\
         \tATTR language attributes-natural-language en\n\
         \tATTR uri printer-uri $uri\n\
         \tATTR name requesting-user-name {requesting_user}\n\
         \tATTR keyword requested-attributes {attribute}\n\
         \tSTATUS successful-ok\n\
         \tDISPLAY {attribute}\n\
         }}\n"
    )
}
