// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Queuewerk core: types, configuration, and error definitions shared across
// all crates.

pub mod config;
pub mod error;
pub mod ipp;
pub mod types;

pub use config::{ApplyPolicy, SpoolerConfig, ToolPaths};
pub use error::{CommandError, ProtocolError, QueuewerkError};
pub use ipp::{IppRequest, IppResponse};
pub use types::*;
