// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Span helpers for intercepted service calls.

use std::fmt::Display;
use std::time::Duration;

use tracing::{debug, info_span, Span};

/// Extension trait for recording call outcomes on any span.
pub trait SpanExt {
    /// Record `success` and `error` flags for a result.
    fn record_result<T, E>(&self, result: &Result<T, E>);
}

impl SpanExt for Span {
    fn record_result<T, E>(&self, result: &Result<T, E>) {
        self.record("success", result.is_ok());
        self.record("error", result.is_err());
    }
}

/// Tracing span wrapped around one intercepted operation.
///
/// The monitoring backend owns the numbers; this only makes each call
/// visible in the logs with its duration and outcome.
pub struct CallSpan {
    span: Span,
}

impl CallSpan {
    pub fn start(op: &str) -> Self {
        let span = info_span!(
            "cmis_call",
            op = %op,
            duration_ms = tracing::field::Empty,
            success = tracing::field::Empty,
            error = tracing::field::Empty,
        );
        Self { span }
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Record the measured duration and the outcome.
    pub fn finish<T, E: Display>(self, elapsed: Duration, result: &Result<T, E>) {
        let duration_ms = elapsed.as_secs_f64() * 1000.0;
        self.span.record("duration_ms", duration_ms);
        self.span.record_result(result);

        match result {
            Ok(_) => debug!(parent: &self.span, duration_ms, "Call completed"),
            Err(err) => debug!(parent: &self.span, duration_ms, error = %err, "Call failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_span_success() {
        let span = CallSpan::start("query");
        let result: Result<u32, String> = Ok(3);
        span.finish(Duration::from_millis(12), &result);
    }

    #[test]
    fn test_call_span_failure() {
        let span = CallSpan::start("getChildren");
        let result: Result<(), String> = Err("backend down".to_string());
        span.finish(Duration::from_millis(1), &result);
    }

    #[test]
    fn test_span_ext() {
        let span = info_span!(
            "test",
            success = tracing::field::Empty,
            error = tracing::field::Empty
        );
        let result: Result<i32, &str> = Err("nope");
        span.record_result(&result);
    }
}
