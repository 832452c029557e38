// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Host integration.
//!
//! A server asks a [`ServiceFactory`] for the service to dispatch each
//! request to. Depending on [`WrapperMode`] the factory hands out one shared
//! [`TimedService`] or builds a new one per request; either way the
//! wrapper's `initialize` hook runs before the service is returned, and
//! every wrapper reports through the same registry.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::{debug, info};

use crate::config::{ResolvedConfig, WrapperMode};
use crate::error::{ConfigError, MonitorError};
use crate::monitor::MonitorBackend;
use crate::registry::InstrumentationRegistry;
use crate::service::{SharedService, TimedService};

/// Hands out instrumented services to a server.
pub struct ServiceFactory {
    repository: SharedService,
    registry: Arc<InstrumentationRegistry>,
    mode: WrapperMode,
    shared: OnceCell<SharedService>,
}

impl ServiceFactory {
    pub fn new(
        repository: SharedService,
        registry: Arc<InstrumentationRegistry>,
        mode: WrapperMode,
    ) -> Self {
        Self {
            repository,
            registry,
            mode,
            shared: OnceCell::new(),
        }
    }

    /// Build the registry from a resolved configuration.
    pub fn from_config(
        repository: SharedService,
        backend: Arc<dyn MonitorBackend>,
        config: &ResolvedConfig,
    ) -> Result<Self, ConfigError> {
        let catalog = config.catalog()?;
        let registry = Arc::new(InstrumentationRegistry::new(backend, catalog));
        Ok(Self::new(repository, registry, config.wrapper_mode))
    }

    /// Startup check: run registration now so a dead backend stops the host
    /// before it serves anything.
    pub fn start(&self) -> Result<(), MonitorError> {
        let handles = self.registry.ensure_registered()?;
        info!(
            mode = ?self.mode,
            operations = handles.len(),
            catch_all = handles.catch_all.is_some(),
            "Monitoring wrapper ready"
        );
        Ok(())
    }

    /// Service to dispatch one request to.
    pub fn service(&self) -> Result<SharedService, MonitorError> {
        match self.mode {
            WrapperMode::Shared => self
                .shared
                .get_or_try_init(|| self.build())
                .map(Arc::clone),
            WrapperMode::PerRequest => self.build(),
        }
    }

    pub fn mode(&self) -> WrapperMode {
        self.mode
    }

    pub fn registry(&self) -> &Arc<InstrumentationRegistry> {
        &self.registry
    }

    fn build(&self) -> Result<SharedService, MonitorError> {
        let wrapper = TimedService::new(self.repository.clone(), self.registry.clone());
        wrapper.initialize()?;
        debug!(mode = ?self.mode, "Built monitoring wrapper");
        Ok(Arc::new(wrapper))
    }
}
