// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! CMIS service contract and its implementations.
//!
//! - [`CmisService`] is the operation set a server dispatches requests to
//! - [`TimedService`] decorates any service with per-operation timing
//! - [`InMemoryRepository`] is a small fixture repository for tests and demos

mod memory;
mod timed;

pub use memory::{InMemoryRepository, ROOT_FOLDER_ID};
pub use timed::TimedService;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::CmisError;
use crate::types::{
    ContentStream, GetChildrenRequest, GetContentStreamRequest, GetObjectRequest, ObjectData,
    ObjectInFolderList, ObjectList, QueryRequest, RepositoryInfo,
};

/// Operations of a CMIS repository service.
///
/// Requests carry every optional paging and filter parameter as `Option`, so
/// an implementation can tell "not given" apart from any explicit value.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CmisService: Send + Sync {
    /// Describe a repository.
    async fn get_repository_info(&self, repository_id: String)
        -> Result<RepositoryInfo, CmisError>;

    /// Fetch one object by id.
    async fn get_object(&self, request: GetObjectRequest) -> Result<ObjectData, CmisError>;

    /// Run a query statement and return one page of results.
    async fn query(&self, request: QueryRequest) -> Result<ObjectList, CmisError>;

    /// List one page of a folder's children.
    async fn get_children(
        &self,
        request: GetChildrenRequest,
    ) -> Result<ObjectInFolderList, CmisError>;

    /// Fetch a document's content, or a byte range of it.
    async fn get_content_stream(
        &self,
        request: GetContentStreamRequest,
    ) -> Result<ContentStream, CmisError>;
}

/// Shared, type-erased service.
pub type SharedService = Arc<dyn CmisService>;

#[async_trait]
impl<S: CmisService + ?Sized> CmisService for Arc<S> {
    async fn get_repository_info(
        &self,
        repository_id: String,
    ) -> Result<RepositoryInfo, CmisError> {
        (**self).get_repository_info(repository_id).await
    }

    async fn get_object(&self, request: GetObjectRequest) -> Result<ObjectData, CmisError> {
        (**self).get_object(request).await
    }

    async fn query(&self, request: QueryRequest) -> Result<ObjectList, CmisError> {
        (**self).query(request).await
    }

    async fn get_children(
        &self,
        request: GetChildrenRequest,
    ) -> Result<ObjectInFolderList, CmisError> {
        (**self).get_children(request).await
    }

    async fn get_content_stream(
        &self,
        request: GetContentStreamRequest,
    ) -> Result<ContentStream, CmisError> {
        (**self).get_content_stream(request).await
    }
}
