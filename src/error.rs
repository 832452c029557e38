// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Error types for the CMIS monitoring wrapper.
//!
//! This module provides strongly-typed errors for the service, monitoring and
//! configuration layers, using `thiserror` for ergonomic error definitions and
//! `anyhow` for error propagation in the binary.

use thiserror::Error;

/// Errors produced by a [`CmisService`](crate::service::CmisService).
///
/// The timed wrapper passes these through untouched; it only adds
/// [`CmisError::Monitoring`] when it cannot reach its own instrumentation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CmisError {
    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Repository backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Monitoring not available: {0}")]
    Monitoring(#[from] MonitorError),
}

impl CmisError {
    /// Check if a caller could reasonably retry the operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::BackendUnavailable(_))
    }
}

/// Errors raised by a [`MonitorBackend`](crate::monitor::MonitorBackend) or
/// by handle registration.
///
/// `Clone` so a failed registration can be handed to every later caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MonitorError {
    #[error("Monitoring backend unreachable: {0}")]
    BackendUnreachable(String),

    #[error("Container lookup failed for '{name}': {message}")]
    ContainerLookup { name: String, message: String },

    #[error("Event lookup failed for '{name}': {message}")]
    EventLookup { name: String, message: String },

    #[error("Accumulator lookup failed for '{name}': {message}")]
    AccumulatorLookup { name: String, message: String },

    #[error("Unknown handle: {0}")]
    UnknownHandle(String),

    #[error("Registration task aborted: {0}")]
    RegistrationAborted(String),
}

impl MonitorError {
    /// Create a container lookup error.
    pub fn container(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ContainerLookup {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an event lookup error.
    pub fn event(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EventLookup {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an accumulator lookup error.
    pub fn accumulator(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AccumulatorLookup {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("IO error reading config: {0}")]
    IoError(String),

    #[error("YAML parsing error: {0}")]
    YamlError(String),

    #[error("JSON parsing error: {0}")]
    JsonError(String),
}

impl ConfigError {
    /// Create an invalid value error.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(err.to_string()),
            _ => Self::IoError(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError(err.to_string())
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::YamlError(err.to_string())
    }
}

/// Result type alias using anyhow for flexible error handling.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cmis_error_retryable() {
        assert!(CmisError::BackendUnavailable("db down".to_string()).is_retryable());
        assert!(!CmisError::ObjectNotFound("doc-1".to_string()).is_retryable());
        assert!(!CmisError::InvalidArgument("maxItems".to_string()).is_retryable());
    }

    #[test]
    fn test_cmis_error_from_monitor() {
        let err: CmisError = MonitorError::BackendUnreachable("refused".to_string()).into();
        assert!(matches!(err, CmisError::Monitoring(_)));
        assert!(err.to_string().contains("refused"));
    }

    #[test]
    fn test_monitor_error_constructors() {
        let err = MonitorError::event("query", "no such container");
        match &err {
            MonitorError::EventLookup { name, message } => {
                assert_eq!(name, "query");
                assert_eq!(message, "no such container");
            }
            _ => panic!("Expected EventLookup"),
        }
        assert_eq!(err.clone(), err);
    }

    #[test]
    fn test_config_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let config_err: ConfigError = io_err.into();
        assert!(matches!(config_err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_config_error_from_json() {
        let result: std::result::Result<serde_json::Value, _> = serde_json::from_str("{oops");
        let config_err: ConfigError = result.unwrap_err().into();
        assert!(matches!(config_err, ConfigError::JsonError(_)));
    }

    #[test]
    fn test_error_display() {
        let err = MonitorError::accumulator("queryTime", "event gone");
        let display = format!("{}", err);
        assert!(display.contains("queryTime"));
        assert!(display.contains("event gone"));
    }
}
