// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration type definitions.
//!
//! Defines the on-disk configuration (every field optional, JSON or YAML)
//! and the resolved configuration the wrapper is built from.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::monitor::{EventClass, ListenerInfo};
use crate::registry::{OperationCatalog, OperationDescriptor};

/// How the host hands out wrapper instances.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WrapperMode {
    /// One wrapper serves every request.
    #[default]
    Shared,
    /// A fresh wrapper per request, each running the initialize hook.
    PerRequest,
}

/// Catch-all counter settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatchAllConfig {
    /// Count every call in one extra event
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Name of that event
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,
}

/// Monitoring configuration as written in a config file.
/// Can be defined in .cmis-monitor.json or .cmis-monitor/config.json.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorConfigFile {
    /// Listener name reported to the backend
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listener_name: Option<String>,

    /// Listener version reported to the backend
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listener_version: Option<String>,

    /// Root container name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,

    /// Event class for operation events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_class: Option<EventClass>,

    /// Operations to time (replaces the default list)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operations: Option<Vec<String>>,

    /// Suffix appended to operation names for accumulators
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accumulator_suffix: Option<String>,

    /// Catch-all counter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catch_all: Option<CatchAllConfig>,

    /// Shared or per-request wrapper instances
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wrapper_mode: Option<WrapperMode>,
}

/// Fully resolved configuration after merging all sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedConfig {
    pub listener_name: String,
    pub listener_version: String,
    pub container: String,
    pub event_class: EventClass,
    pub operations: Vec<String>,
    pub accumulator_suffix: String,
    pub catch_all_enabled: bool,
    pub catch_all_event: String,
    pub wrapper_mode: WrapperMode,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        let listener = ListenerInfo::default();
        let catalog = OperationCatalog::default();
        Self {
            listener_name: listener.name,
            listener_version: listener.version,
            operations: catalog
                .operations()
                .iter()
                .map(|op| op.name().to_string())
                .collect(),
            container: catalog.container,
            event_class: catalog.event_class,
            accumulator_suffix: catalog.accumulator_suffix,
            catch_all_enabled: catalog.catch_all.is_some(),
            catch_all_event: OperationCatalog::DEFAULT_CATCH_ALL.to_string(),
            wrapper_mode: WrapperMode::default(),
        }
    }
}

impl ResolvedConfig {
    /// Listener identity to present to the backend.
    pub fn listener(&self) -> ListenerInfo {
        ListenerInfo::new(&self.listener_name, &self.listener_version)
    }

    /// Check names and build the operation catalog.
    pub fn catalog(&self) -> Result<OperationCatalog, ConfigError> {
        if self.container.trim().is_empty() {
            return Err(ConfigError::invalid("container", "must not be empty"));
        }
        if self.accumulator_suffix.is_empty() {
            return Err(ConfigError::invalid(
                "accumulatorSuffix",
                "must not be empty",
            ));
        }

        let mut catalog = OperationCatalog::empty().with_container(&self.container);
        catalog.event_class = self.event_class;
        catalog.accumulator_suffix = self.accumulator_suffix.clone();

        if self.catch_all_enabled {
            if self.catch_all_event.trim().is_empty() {
                return Err(ConfigError::invalid("catchAll.eventName", "must not be empty"));
            }
            if OperationDescriptor::known(&self.catch_all_event).is_some() {
                return Err(ConfigError::invalid(
                    "catchAll.eventName",
                    format!("'{}' collides with an operation event", self.catch_all_event),
                ));
            }
            catalog = catalog.with_catch_all(&self.catch_all_event);
        }

        for name in &self.operations {
            let op = OperationDescriptor::known(name).ok_or_else(|| {
                ConfigError::invalid(
                    "operations",
                    format!(
                        "unknown operation '{}', expected one of: {}",
                        name,
                        OperationDescriptor::ALL
                            .iter()
                            .map(|o| o.name())
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                )
            })?;
            catalog = catalog.with_operation(op);
        }

        Ok(catalog)
    }
}
