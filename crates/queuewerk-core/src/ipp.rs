// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Request and response values exchanged with `ipptool`.
//
// A request is a resource path on the print server plus an ipptool test
// body. A response is the CSV text `ipptool -c` prints: one header line
// naming the displayed attribute, followed by one line per value.

use serde::{Deserialize, Serialize};

/// An IPP request addressed to a resource on the print server.
///
/// `target_uri` is a path such as `/printers/Office`; an empty path addresses
/// the server itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IppRequest {
    target_uri: String,
    body: String,
}

impl IppRequest {
    pub fn new(target_uri: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            target_uri: target_uri.into(),
            body: body.into(),
        }
    }

    /// Resource path, relative to the configured server URI.
    pub fn target_uri(&self) -> &str {
        &self.target_uri
    }

    /// ipptool test file text sent on stdin.
    pub fn body(&self) -> &str {
        &self.body
    }
}

/// Raw `ipptool -c` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IppResponse {
    raw_output: String,
}

impl IppResponse {
    pub fn new(raw_output: impl Into<String>) -> Self {
        Self {
            raw_output: raw_output.into(),
        }
    }

    pub fn raw_output(&self) -> &str {
        &self.raw_output
    }

    /// Attribute values, one per output line.
    ///
    /// The header line is skipped, as is the empty segment after the final
    /// line break. `"Header\n"` has no values while `"Header\n\n"` has a
    /// single empty value; callers rely on that distinction.
    pub fn values(&self) -> Vec<&str> {
        let mut lines = self.raw_output.split('\n');
        lines.next();

        let mut values: Vec<&str> = lines.collect();
        if values.last() == Some(&"") {
            values.pop();
        }
        values
    }

    /// Values joined with `,`, or `None` when there are none.
    pub fn joined_values(&self) -> Option<String> {
        let values = self.values();
        if values.is_empty() {
            None
        } else {
            Some(values.join(","))
        }
    }
}

/// Strip the CSV quoting `ipptool -c` applies to values containing commas
/// or quotes.
pub fn unquote_csv(value: &str) -> String {
    match value
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
    {
        Some(inner) => inner.replace("\"\"", "\""),
        None => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Microphone check\n", &[])]
    #[case("Microphone check\n\n", &[""])]
    #[case("Microphone check\nOne\n", &["One"])]
    #[case("Microphone check\nOne\nTwo\n", &["One", "Two"])]
    #[case("Microphone check", &[])]
    #[case("", &[])]
    fn values_skip_header_and_trailing_break(#[case] raw: &str, #[case] expected: &[&str]) {
        assert_eq!(IppResponse::new(raw).values(), expected);
    }

    #[rstest]
    #[case("Microphone check\n", None)]
    #[case("Microphone check\n\n", Some(""))]
    #[case("Microphone check\nOne\n", Some("One"))]
    #[case("Microphone check\nOne\nTwo\n", Some("One,Two"))]
    fn joined_values(#[case] raw: &str, #[case] expected: Option<&str>) {
        assert_eq!(IppResponse::new(raw).joined_values().as_deref(), expected);
    }

    #[test]
    fn listing_output_yields_every_name() {
        let response = IppResponse::new("printer-name\nOffice\nWarehouse\n");
        assert_eq!(response.values(), vec!["Office", "Warehouse"]);
    }

    #[test]
    fn only_one_trailing_empty_segment_is_dropped() {
        let response = IppResponse::new("Header\nOne\n\n");
        assert_eq!(response.values(), vec!["One", ""]);
    }

    #[test]
    fn request_is_plain_data() {
        let request = IppRequest::new("", "{ OPERATION CUPS-Get-Printers }");
        assert_eq!(request.target_uri(), "");
        assert_eq!(request.body(), "{ OPERATION CUPS-Get-Printers }");
    }

    #[rstest]
    #[case("\"none,none\"", "none,none")]
    #[case("plain", "plain")]
    #[case("\"say \"\"hi\"\"\"", "say \"hi\"")]
    #[case("\"", "\"")]
    fn unquote(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(unquote_csv(raw), expected);
    }
}
