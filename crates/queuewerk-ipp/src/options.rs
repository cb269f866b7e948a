// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Device options: vendor (PPD) options listed by `lpoptions -l` and the
// native CUPS options that are read back as printer attributes.

use std::collections::BTreeMap;

/// CUPS options set with `lpadmin -o` that the server reports as printer
/// attributes of the same name rather than through `lpoptions -l`.
pub const NATIVE_OPTIONS: &[&str] = &[
    "auth-info-required",
    "job-k-limit",
    "job-page-limit",
    "job-quota-period",
    "job-sheets-default",
    "port-monitor",
    "printer-error-policy",
    "printer-op-policy",
];

/// Whether `key` is one of the [`NATIVE_OPTIONS`].
pub fn is_native_option(key: &str) -> bool {
    NATIVE_OPTIONS.contains(&key)
}

/// Parse `lpoptions -p <queue> -l` output into option name → selected value.
///
/// Each line reads `Keyword/Human Text: choice *selected choice`; the choice
/// marked with `*` is the current value. Lines without a marked choice are
/// skipped.
pub fn parse_vendor_options(output: &str) -> BTreeMap<String, String> {
    output
        .lines()
        .filter_map(|line| {
            let (label, choices) = line.split_once(':')?;
            let keyword = label.split('/').next()?.trim();
            if keyword.is_empty() {
                return None;
            }
            let selected = choices
                .split_whitespace()
                .find_map(|choice| choice.strip_prefix('*'))?;
            Some((keyword.to_string(), selected.to_string()))
        })
        .collect()
}
