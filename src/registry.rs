// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Instrumentation handle registry.
//!
//! Maps each instrumented operation to the event and duration accumulator it
//! reports to. Handles are looked up from the [`MonitorBackend`] exactly once
//! per registry: the first caller of [`InstrumentationRegistry::ensure_registered`]
//! runs the registration pass, concurrent callers block until it finishes,
//! and everyone afterwards reads the stored result without locking. Async
//! callers use [`InstrumentationRegistry::ensure_registered_async`], which
//! does the same wait on tokio's blocking pool.
//!
//! A failed pass is stored as well. Every later caller gets the same
//! [`MonitorError`] and the backend is not asked again.

use std::borrow::{Borrow, Cow};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::{error, info};

use crate::error::MonitorError;
use crate::monitor::{AccumulatorHandle, ContainerHandle, EventClass, EventHandle, MonitorBackend};

/// Stable logical name of an instrumented operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationDescriptor(Cow<'static, str>);

impl OperationDescriptor {
    pub const QUERY: Self = Self(Cow::Borrowed("query"));
    pub const GET_CHILDREN: Self = Self(Cow::Borrowed("getChildren"));
    pub const GET_CONTENT_STREAM: Self = Self(Cow::Borrowed("getContentStream"));
    pub const GET_OBJECT: Self = Self(Cow::Borrowed("getObject"));
    pub const GET_REPOSITORY_INFO: Self = Self(Cow::Borrowed("getRepositoryInfo"));

    /// Every operation the timed wrapper knows how to intercept.
    pub const ALL: [Self; 5] = [
        Self::QUERY,
        Self::GET_CHILDREN,
        Self::GET_CONTENT_STREAM,
        Self::GET_OBJECT,
        Self::GET_REPOSITORY_INFO,
    ];

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Resolve a name to one of the interceptable operations.
    pub fn known(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// Name of the accumulator paired with this operation.
    pub fn accumulator_name(&self, suffix: &str) -> String {
        format!("{}{}", self.0, suffix)
    }
}

impl fmt::Display for OperationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for OperationDescriptor {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// What to register with the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationCatalog {
    /// Root container all events live in.
    pub container: String,

    /// Class every operation event is filed under.
    pub event_class: EventClass,

    /// Appended to the operation name to name its accumulator.
    pub accumulator_suffix: String,

    /// Event counting every call regardless of type, if enabled.
    pub catch_all: Option<String>,

    operations: Vec<OperationDescriptor>,
}

impl OperationCatalog {
    pub const DEFAULT_CONTAINER: &'static str = "cmisContainer";
    pub const DEFAULT_ACCUMULATOR_SUFFIX: &'static str = "Time";
    pub const DEFAULT_CATCH_ALL: &'static str = "allEvents";

    /// A catalog with no operations and no catch-all event.
    pub fn empty() -> Self {
        Self {
            container: Self::DEFAULT_CONTAINER.to_string(),
            event_class: EventClass::Rpc,
            accumulator_suffix: Self::DEFAULT_ACCUMULATOR_SUFFIX.to_string(),
            catch_all: None,
            operations: Vec::new(),
        }
    }

    /// Add an operation. Duplicates are ignored.
    pub fn with_operation(mut self, op: OperationDescriptor) -> Self {
        if !self.operations.contains(&op) {
            self.operations.push(op);
        }
        self
    }

    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = container.into();
        self
    }

    pub fn with_catch_all(mut self, event_name: impl Into<String>) -> Self {
        self.catch_all = Some(event_name.into());
        self
    }

    pub fn without_catch_all(mut self) -> Self {
        self.catch_all = None;
        self
    }

    pub fn operations(&self) -> &[OperationDescriptor] {
        &self.operations
    }

    pub fn contains(&self, op: &str) -> bool {
        self.operations.iter().any(|o| o.name() == op)
    }
}

impl Default for OperationCatalog {
    /// `query`, `getChildren` and `getContentStream` plus the `allEvents`
    /// catch-all counter.
    fn default() -> Self {
        Self::empty()
            .with_operation(OperationDescriptor::QUERY)
            .with_operation(OperationDescriptor::GET_CHILDREN)
            .with_operation(OperationDescriptor::GET_CONTENT_STREAM)
            .with_catch_all(Self::DEFAULT_CATCH_ALL)
    }
}

/// Event and accumulator an operation reports to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlePair {
    pub event: EventHandle,
    pub accumulator: AccumulatorHandle,
}

/// Result of a successful registration pass.
#[derive(Debug, Clone)]
pub struct RegisteredHandles {
    pub container: ContainerHandle,
    pub catch_all: Option<EventHandle>,
    pairs: HashMap<OperationDescriptor, HandlePair>,
}

impl RegisteredHandles {
    /// Handles for an operation, if it was registered.
    pub fn get(&self, op: &str) -> Option<HandlePair> {
        self.pairs.get(op).copied()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Registry of instrumentation handles, shared by every wrapper instance
/// that reports to the same backend.
pub struct InstrumentationRegistry {
    backend: Arc<dyn MonitorBackend>,
    catalog: OperationCatalog,
    handles: OnceCell<Result<RegisteredHandles, MonitorError>>,
    passes: AtomicU64,
}

impl InstrumentationRegistry {
    pub fn new(backend: Arc<dyn MonitorBackend>, catalog: OperationCatalog) -> Self {
        Self {
            backend,
            catalog,
            handles: OnceCell::new(),
            passes: AtomicU64::new(0),
        }
    }

    /// Register every catalog entry with the backend unless that already
    /// happened, and return the handles.
    ///
    /// Blocks while another thread is running the registration pass.
    pub fn ensure_registered(&self) -> Result<&RegisteredHandles, MonitorError> {
        self.handles
            .get_or_init(|| self.register())
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Async form of [`ensure_registered`](Self::ensure_registered) for the
    /// request path.
    ///
    /// The pass, and any wait for a pass already running, happens on the
    /// blocking pool, so the calling task yields instead of holding its
    /// runtime thread.
    pub async fn ensure_registered_async(
        self: &Arc<Self>,
    ) -> Result<&RegisteredHandles, MonitorError> {
        if self.handles.get().is_none() {
            let registry = Arc::clone(self);
            let pass = tokio::task::spawn_blocking(move || {
                registry.ensure_registered().map(|_| ())
            });
            if let Err(e) = pass.await {
                error!(error = %e, "Instrumentation registration task failed");
                return Err(MonitorError::RegistrationAborted(e.to_string()));
            }
        }

        // Settled by now unless the pass panicked.
        match self.handles.get() {
            Some(result) => result.as_ref().map_err(Clone::clone),
            None => Err(MonitorError::RegistrationAborted(
                "registration did not complete".to_string(),
            )),
        }
    }

    /// Handles if registration has already succeeded. Never blocks.
    pub fn handles(&self) -> Option<&RegisteredHandles> {
        self.handles.get().and_then(|r| r.as_ref().ok())
    }

    /// Whether a registration pass has completed, successfully or not.
    pub fn is_initialized(&self) -> bool {
        self.handles.get().is_some()
    }

    /// Number of registration passes run. Never more than one.
    pub fn registration_passes(&self) -> u64 {
        self.passes.load(Ordering::SeqCst)
    }

    pub fn backend(&self) -> &Arc<dyn MonitorBackend> {
        &self.backend
    }

    pub fn catalog(&self) -> &OperationCatalog {
        &self.catalog
    }

    fn register(&self) -> Result<RegisteredHandles, MonitorError> {
        self.passes.fetch_add(1, Ordering::SeqCst);
        let listener = self.backend.listener();
        info!(
            listener = %listener.name,
            version = %listener.version,
            container = %self.catalog.container,
            operations = self.catalog.operations.len(),
            "Registering instrumentation handles"
        );

        self.register_all().map_err(|e| {
            error!(error = %e, "Instrumentation registration failed");
            e
        })
    }

    fn register_all(&self) -> Result<RegisteredHandles, MonitorError> {
        let catalog = &self.catalog;
        let container = self.backend.lookup_container(&catalog.container)?;

        let catch_all = match &catalog.catch_all {
            Some(name) => Some(
                self.backend
                    .lookup_event(container, catalog.event_class, name)?,
            ),
            None => None,
        };

        let mut pairs = HashMap::with_capacity(catalog.operations.len());
        for op in &catalog.operations {
            let accumulator_name = op.accumulator_name(&catalog.accumulator_suffix);
            info!(event = %op, accumulator = %accumulator_name, "Setting up event");

            let event = self
                .backend
                .lookup_event(container, catalog.event_class, op.name())?;
            let accumulator = self.backend.lookup_accumulator(event, &accumulator_name)?;
            pairs.insert(op.clone(), HandlePair { event, accumulator });
        }

        Ok(RegisteredHandles {
            container,
            catch_all,
            pairs,
        })
    }
}

impl fmt::Debug for InstrumentationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstrumentationRegistry")
            .field("listener", self.backend.listener())
            .field("catalog", &self.catalog)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
