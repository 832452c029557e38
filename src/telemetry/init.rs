// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Log subscriber setup.

use std::io;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Configuration for telemetry initialization.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Level used when neither `filter_directive` nor RUST_LOG is set.
    pub default_level: Level,

    /// Emit an event when each call span closes (carries its busy/idle time).
    pub log_span_close: bool,

    /// Include file/line information.
    pub include_file_line: bool,

    /// Include the target module path.
    pub include_target: bool,

    pub ansi_colors: bool,

    /// Use the single-line compact format.
    pub compact: bool,

    /// Explicit filter directive; takes precedence over RUST_LOG.
    pub filter_directive: Option<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            default_level: Level::INFO,
            log_span_close: false,
            include_file_line: false,
            include_target: true,
            ansi_colors: true,
            compact: true,
            filter_directive: None,
        }
    }
}

impl TelemetryConfig {
    /// Verbose output with span close events, for local debugging.
    pub fn development() -> Self {
        Self {
            default_level: Level::DEBUG,
            log_span_close: true,
            include_file_line: true,
            compact: false,
            ..Self::default()
        }
    }

    /// Warnings and errors only, no colors.
    pub fn production() -> Self {
        Self {
            default_level: Level::WARN,
            include_target: false,
            ansi_colors: false,
            ..Self::default()
        }
    }

    /// Everything from this crate, for tests.
    pub fn testing() -> Self {
        Self {
            default_level: Level::TRACE,
            log_span_close: true,
            include_file_line: true,
            ansi_colors: false,
            compact: false,
            filter_directive: Some("cmis_monitor=trace".to_string()),
            ..Self::default()
        }
    }

    /// Pick a preset from CLI verbosity flags.
    pub fn from_flags(verbose: bool, debug: bool) -> Self {
        if debug {
            Self::development()
        } else if verbose {
            Self::default().with_level(Level::DEBUG)
        } else {
            Self::default().with_level(Level::WARN)
        }
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.default_level = level;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter_directive = Some(filter.into());
        self
    }

    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi_colors = ansi;
        self
    }

    fn env_filter(&self) -> EnvFilter {
        let fallback = || EnvFilter::new(self.default_level.to_string());
        match &self.filter_directive {
            Some(directive) => EnvFilter::try_new(directive).unwrap_or_else(|_| fallback()),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback()),
        }
    }
}

/// Keep alive for the lifetime of the program.
pub struct TelemetryGuard {
    _private: (),
}

/// Install the global subscriber. Logs go to stderr so reports printed on
/// stdout stay clean.
///
/// Fails if a global subscriber is already installed.
pub fn init_telemetry(config: &TelemetryConfig) -> io::Result<TelemetryGuard> {
    let span_events = if config.log_span_close {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let fmt_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(config.ansi_colors)
        .with_target(config.include_target)
        .with_file(config.include_file_line)
        .with_line_number(config.include_file_line)
        .with_span_events(span_events);

    let registry = tracing_subscriber::registry().with(config.env_filter());
    let installed = if config.compact {
        registry.with(fmt_layer.compact()).try_init()
    } else {
        registry.with(fmt_layer).try_init()
    };
    installed.map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;

    Ok(TelemetryGuard { _private: () })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telemetry_config_default() {
        let config = TelemetryConfig::default();
        assert_eq!(config.default_level, Level::INFO);
        assert!(config.compact);
        assert!(!config.log_span_close);
    }

    #[test]
    fn test_presets() {
        assert_eq!(TelemetryConfig::development().default_level, Level::DEBUG);
        assert!(TelemetryConfig::development().log_span_close);
        assert_eq!(TelemetryConfig::production().default_level, Level::WARN);
        assert!(!TelemetryConfig::production().ansi_colors);
        assert_eq!(
            TelemetryConfig::testing().filter_directive.as_deref(),
            Some("cmis_monitor=trace")
        );
    }

    #[test]
    fn test_from_flags() {
        assert_eq!(TelemetryConfig::from_flags(false, false).default_level, Level::WARN);
        assert_eq!(TelemetryConfig::from_flags(true, false).default_level, Level::DEBUG);
        assert!(TelemetryConfig::from_flags(true, true).include_file_line);
    }

    #[test]
    fn test_builder() {
        let config = TelemetryConfig::default()
            .with_level(Level::ERROR)
            .with_filter("cmis_monitor=debug")
            .with_ansi(false);

        assert_eq!(config.default_level, Level::ERROR);
        assert_eq!(config.filter_directive.as_deref(), Some("cmis_monitor=debug"));
        assert!(!config.ansi_colors);
    }
}
