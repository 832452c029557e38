// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Timing decorator for CMIS services.
//!
//! [`TimedService`] implements [`CmisService`] by delegating to the wrapped
//! service. Calls to operations in the registry's catalog are bracketed by
//! `begin_timing` / `end_timing` on the operation's accumulator, counting one
//! occurrence per call. Requests reach the delegate untouched, and its result
//! or error comes back untouched.
//!
//! The sample is recorded by a drop guard, so failed, panicking and dropped
//! calls are measured as well.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

#[cfg(feature = "telemetry")]
use tracing::Instrument;

use super::CmisService;
use crate::error::{CmisError, MonitorError};
use crate::monitor::{AccumulatorHandle, MonitorBackend, Timer};
use crate::registry::{InstrumentationRegistry, OperationDescriptor};
#[cfg(feature = "telemetry")]
use crate::telemetry::CallSpan;
use crate::types::{
    ContentStream, GetChildrenRequest, GetContentStreamRequest, GetObjectRequest, ObjectData,
    ObjectInFolderList, ObjectList, QueryRequest, RepositoryInfo,
};

/// Ends a backend timer when dropped.
struct TimingGuard<'a> {
    backend: &'a dyn MonitorBackend,
    timer: Option<Timer>,
}

impl<'a> TimingGuard<'a> {
    fn start(backend: &'a dyn MonitorBackend, accumulator: AccumulatorHandle) -> Self {
        Self {
            backend,
            timer: Some(backend.begin_timing(accumulator)),
        }
    }

    /// Stop the timer now and return the measured duration.
    fn finish(mut self) -> Duration {
        self.stop()
    }

    fn stop(&mut self) -> Duration {
        match self.timer.take() {
            Some(mut timer) => {
                let elapsed = timer.stop();
                self.backend.end_timing(timer, true);
                elapsed
            }
            None => Duration::ZERO,
        }
    }
}

impl Drop for TimingGuard<'_> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// A [`CmisService`] that reports call timings to a monitoring backend.
pub struct TimedService<S> {
    inner: S,
    registry: Arc<InstrumentationRegistry>,
}

impl<S: CmisService> TimedService<S> {
    /// Wrap `inner`, reporting through `registry`.
    ///
    /// Registration is deferred to [`initialize`](Self::initialize) or the
    /// first call, whichever comes first.
    pub fn new(inner: S, registry: Arc<InstrumentationRegistry>) -> Self {
        Self { inner, registry }
    }

    /// One-time setup hook: registers the registry's handles if that has not
    /// happened yet. Hosts call this before serving the first request and
    /// treat an error as a startup failure.
    pub fn initialize(&self) -> Result<(), MonitorError> {
        self.registry.ensure_registered().map(|_| ())
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn registry(&self) -> &Arc<InstrumentationRegistry> {
        &self.registry
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    /// Run `call` against the delegate. The delegate is only invoked once
    /// the timer for `op` is running.
    async fn intercept<T, C, F>(&self, op: &OperationDescriptor, call: C) -> Result<T, CmisError>
    where
        C: FnOnce() -> F + Send,
        F: Future<Output = Result<T, CmisError>> + Send,
        T: Send,
    {
        let handles = match self.registry.handles() {
            Some(handles) => handles,
            None => self.registry.ensure_registered_async().await?,
        };
        let backend = self.registry.backend().as_ref();

        if let Some(catch_all) = handles.catch_all {
            backend.record_event(catch_all);
        }

        let Some(pair) = handles.get(op.name()) else {
            return call().await;
        };

        let guard = TimingGuard::start(backend, pair.accumulator);

        #[cfg(feature = "telemetry")]
        let result = {
            let span = CallSpan::start(op.name());
            let result = call().instrument(span.span().clone()).await;
            span.finish(guard.finish(), &result);
            result
        };

        #[cfg(not(feature = "telemetry"))]
        let result = {
            let result = call().await;
            guard.finish();
            result
        };

        result
    }
}

#[async_trait]
impl<S: CmisService> CmisService for TimedService<S> {
    async fn get_repository_info(
        &self,
        repository_id: String,
    ) -> Result<RepositoryInfo, CmisError> {
        self.intercept(
            &OperationDescriptor::GET_REPOSITORY_INFO,
            || self.inner.get_repository_info(repository_id),
        )
        .await
    }

    async fn get_object(&self, request: GetObjectRequest) -> Result<ObjectData, CmisError> {
        self.intercept(&OperationDescriptor::GET_OBJECT, || {
            self.inner.get_object(request)
        })
        .await
    }

    async fn query(&self, request: QueryRequest) -> Result<ObjectList, CmisError> {
        self.intercept(&OperationDescriptor::QUERY, || self.inner.query(request))
            .await
    }

    async fn get_children(
        &self,
        request: GetChildrenRequest,
    ) -> Result<ObjectInFolderList, CmisError> {
        self.intercept(
            &OperationDescriptor::GET_CHILDREN,
            || self.inner.get_children(request),
        )
        .await
    }

    async fn get_content_stream(
        &self,
        request: GetContentStreamRequest,
    ) -> Result<ContentStream, CmisError> {
        self.intercept(
            &OperationDescriptor::GET_CONTENT_STREAM,
            || self.inner.get_content_stream(request),
        )
        .await
    }
}

impl<S> std::fmt::Debug for TimedService<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimedService")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
