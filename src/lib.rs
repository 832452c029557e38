// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! cmis-monitor - timed interception of CMIS service calls.
//!
//! Wraps a CMIS repository service so that `query`, `getChildren` and
//! `getContentStream` (or any configured subset of the operations) report
//! their call count and duration to a monitoring backend. Requests and
//! results pass through unchanged.
//!
//! # Architecture
//!
//! - [`types`] - Request and response types of the wrapped operations
//! - [`error`] - Error types and result aliases
//! - [`service`] - The [`CmisService`] contract, the [`TimedService`]
//!   decorator and an in-memory fixture repository
//! - [`monitor`] - The [`MonitorBackend`] contract and an in-process backend
//! - [`registry`] - One-time registration of per-operation handles
//! - [`host`] - Service factory for servers (shared or per-request wrappers)
//! - [`config`] - Configuration loading and merging
//! - [`telemetry`] - Log subscriber setup and per-call spans
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cmis_monitor::{InMemoryRepository, InstrumentationRegistry, LocalBackend,
//!     OperationCatalog, TimedService};
//!
//! let backend = Arc::new(LocalBackend::default());
//! let registry = Arc::new(InstrumentationRegistry::new(backend.clone(), OperationCatalog::default()));
//! let service = TimedService::new(InMemoryRepository::new("repo"), registry);
//! service.initialize()?;
//! ```

pub mod config;
pub mod error;
pub mod host;
pub mod monitor;
pub mod registry;
pub mod service;
pub mod telemetry;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{CmisError, ConfigError, MonitorError, Result};
pub use host::ServiceFactory;
pub use monitor::{EventClass, ListenerInfo, LocalBackend, MonitorBackend};
pub use registry::{
    HandlePair, InstrumentationRegistry, OperationCatalog, OperationDescriptor, RegisteredHandles,
};
pub use service::{CmisService, InMemoryRepository, SharedService, TimedService};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
