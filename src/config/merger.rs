// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration merging.
//!
//! Handles merging configurations from different sources with proper precedence.

use super::types::{MonitorConfigFile, ResolvedConfig, WrapperMode};

/// CLI options that can override configuration.
#[derive(Debug, Clone, Default)]
pub struct CliOptions {
    pub container: Option<String>,
    pub operations: Option<Vec<String>>,
    pub catch_all: Option<bool>,
    pub wrapper_mode: Option<WrapperMode>,
}

/// Default configuration values.
pub fn default_config() -> ResolvedConfig {
    ResolvedConfig::default()
}

/// Merge multiple configurations with precedence.
///
/// Precedence (highest to lowest):
/// 1. CLI options
/// 2. Local config (.cmis-monitor.local.json)
/// 3. Workspace config (.cmis-monitor.json)
/// 4. Global config (~/.cmis-monitor/config.json)
/// 5. Default values
pub fn merge_config(
    global: Option<MonitorConfigFile>,
    workspace: Option<MonitorConfigFile>,
    local: Option<MonitorConfigFile>,
    cli: CliOptions,
) -> ResolvedConfig {
    let mut result = default_config();

    for config in [global, workspace, local].iter().flatten() {
        apply_config_file(&mut result, config);
    }

    apply_cli_options(&mut result, &cli);

    result
}

fn apply_config_file(result: &mut ResolvedConfig, config: &MonitorConfigFile) {
    if let Some(ref name) = config.listener_name {
        result.listener_name = name.clone();
    }

    if let Some(ref version) = config.listener_version {
        result.listener_version = version.clone();
    }

    if let Some(ref container) = config.container {
        result.container = container.clone();
    }

    if let Some(class) = config.event_class {
        result.event_class = class;
    }

    // A later list replaces an earlier one rather than extending it, so a
    // workspace can narrow what the global config times.
    if let Some(ref operations) = config.operations {
        result.operations = operations.clone();
    }

    if let Some(ref suffix) = config.accumulator_suffix {
        result.accumulator_suffix = suffix.clone();
    }

    if let Some(ref catch_all) = config.catch_all {
        if let Some(enabled) = catch_all.enabled {
            result.catch_all_enabled = enabled;
        }
        if let Some(ref name) = catch_all.event_name {
            result.catch_all_event = name.clone();
        }
    }

    if let Some(mode) = config.wrapper_mode {
        result.wrapper_mode = mode;
    }
}

fn apply_cli_options(result: &mut ResolvedConfig, cli: &CliOptions) {
    if let Some(ref container) = cli.container {
        result.container = container.clone();
    }

    if let Some(ref operations) = cli.operations {
        result.operations = operations.clone();
    }

    if let Some(catch_all) = cli.catch_all {
        result.catch_all_enabled = catch_all;
    }

    if let Some(mode) = cli.wrapper_mode {
        result.wrapper_mode = mode;
    }
}
