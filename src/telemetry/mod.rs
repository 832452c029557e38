// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Logging and tracing infrastructure.
//!
//! Numbers (counts and durations) go to the monitoring backend. This module
//! covers the other half: structured logs and a span per intercepted call.
//!
//! # Usage
//!
//! ```rust,ignore
//! use cmis_monitor::telemetry::{init_telemetry, TelemetryConfig};
//!
//! let _guard = init_telemetry(&TelemetryConfig::default())?;
//! ```
//!
//! Per-call spans are only emitted with the `telemetry` feature (on by
//! default).

mod init;
mod spans;

pub use init::{init_telemetry, TelemetryConfig, TelemetryGuard};
pub use spans::{CallSpan, SpanExt};
