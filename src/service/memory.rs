// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! In-memory repository.
//!
//! A deliberately small [`CmisService`]: a folder tree with documents, plain
//! substring search standing in for a query language, and byte-range content
//! reads. Latency and availability can be dialled in to exercise wrappers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::CmisService;
use crate::error::CmisError;
use crate::types::{
    BaseType, ContentStream, GetChildrenRequest, GetContentStreamRequest, GetObjectRequest,
    ObjectData, ObjectInFolderData, ObjectInFolderList, ObjectList, QueryRequest, RepositoryInfo,
};

/// Id of the root folder of every in-memory repository.
pub const ROOT_FOLDER_ID: &str = "root";

#[derive(Debug, Clone)]
struct StoredObject {
    data: ObjectData,
    content: Option<Vec<u8>>,
}

/// A [`CmisService`] backed by a vector of objects.
#[derive(Debug)]
pub struct InMemoryRepository {
    info: RepositoryInfo,
    objects: RwLock<Vec<StoredObject>>,
    latency: Duration,
    available: AtomicBool,
}

impl InMemoryRepository {
    /// Create a repository holding only its root folder.
    pub fn new(repository_id: impl Into<String>) -> Self {
        let id = repository_id.into();
        let root = StoredObject {
            data: ObjectData {
                id: ROOT_FOLDER_ID.to_string(),
                name: String::new(),
                base_type: BaseType::Folder,
                parent_id: None,
                content_length: None,
                mime_type: None,
                last_modified: Utc::now(),
                properties: Default::default(),
            },
            content: None,
        };

        Self {
            info: RepositoryInfo {
                name: format!("In-memory repository {}", id),
                id,
                description: "Fixture repository held in process memory".to_string(),
                root_folder_id: ROOT_FOLDER_ID.to_string(),
                product_name: env!("CARGO_PKG_NAME").to_string(),
                product_version: env!("CARGO_PKG_VERSION").to_string(),
            },
            objects: RwLock::new(vec![root]),
            latency: Duration::ZERO,
            available: AtomicBool::new(true),
        }
    }

    /// Delay every operation by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Make every operation fail with [`CmisError::BackendUnavailable`].
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn repository_id(&self) -> &str {
        &self.info.id
    }

    /// Create a folder under `parent_id` and return its id.
    pub fn add_folder(&self, parent_id: &str, name: &str) -> Result<String, CmisError> {
        self.insert(parent_id, name, BaseType::Folder, None)
    }

    /// Create a document under `parent_id` and return its id.
    pub fn add_document(
        &self,
        parent_id: &str,
        name: &str,
        mime_type: &str,
        content: impl Into<Vec<u8>>,
    ) -> Result<String, CmisError> {
        self.insert(
            parent_id,
            name,
            BaseType::Document,
            Some((mime_type.to_string(), content.into())),
        )
    }

    fn insert(
        &self,
        parent_id: &str,
        name: &str,
        base_type: BaseType,
        content: Option<(String, Vec<u8>)>,
    ) -> Result<String, CmisError> {
        if name.is_empty() {
            return Err(CmisError::InvalidArgument("name must not be empty".to_string()));
        }

        let mut objects = self.write_objects()?;
        match objects.iter().find(|o| o.data.id == parent_id) {
            Some(parent) if parent.data.is_folder() => {}
            Some(_) => {
                return Err(CmisError::InvalidArgument(format!(
                    "{} is not a folder",
                    parent_id
                )))
            }
            None => return Err(CmisError::ObjectNotFound(parent_id.to_string())),
        }

        let id = Uuid::new_v4().to_string();
        let (mime_type, content) = match content {
            Some((mime, bytes)) => (Some(mime), Some(bytes)),
            None => (None, None),
        };
        objects.push(StoredObject {
            data: ObjectData {
                id: id.clone(),
                name: name.to_string(),
                base_type,
                parent_id: Some(parent_id.to_string()),
                content_length: content.as_ref().map(|c| c.len() as u64),
                mime_type,
                last_modified: Utc::now(),
                properties: Default::default(),
            },
            content,
        });
        Ok(id)
    }

    fn read_objects(&self) -> Result<std::sync::RwLockReadGuard<'_, Vec<StoredObject>>, CmisError> {
        self.objects
            .read()
            .map_err(|_| CmisError::Runtime("object store poisoned".to_string()))
    }

    fn write_objects(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, Vec<StoredObject>>, CmisError> {
        self.objects
            .write()
            .map_err(|_| CmisError::Runtime("object store poisoned".to_string()))
    }

    /// Shared preamble of every operation: latency, availability, repository id.
    async fn enter(&self, repository_id: &str) -> Result<(), CmisError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if !self.available.load(Ordering::SeqCst) {
            return Err(CmisError::BackendUnavailable(format!(
                "repository {} is offline",
                self.info.id
            )));
        }
        if repository_id != self.info.id {
            return Err(CmisError::ObjectNotFound(format!(
                "repository {}",
                repository_id
            )));
        }
        Ok(())
    }
}

/// Apply `skip_count` / `max_items` to a full result set.
fn page<T>(items: Vec<T>, max_items: Option<u64>, skip_count: Option<u64>) -> (Vec<T>, bool, u64) {
    let total = items.len() as u64;
    let skip = skip_count.unwrap_or(0).min(total) as usize;
    let remaining = total as usize - skip;
    let take = max_items.map_or(remaining, |m| (m as usize).min(remaining));
    let has_more = skip + take < total as usize;
    let page = items.into_iter().skip(skip).take(take).collect();
    (page, has_more, total)
}

#[async_trait]
impl CmisService for InMemoryRepository {
    async fn get_repository_info(
        &self,
        repository_id: String,
    ) -> Result<RepositoryInfo, CmisError> {
        self.enter(&repository_id).await?;
        Ok(self.info.clone())
    }

    async fn get_object(&self, request: GetObjectRequest) -> Result<ObjectData, CmisError> {
        self.enter(&request.repository_id).await?;
        let found = {
            let objects = self.read_objects()?;
            objects
                .iter()
                .find(|o| o.data.id == request.object_id)
                .map(|o| o.data.clone())
        };
        found.ok_or(CmisError::ObjectNotFound(request.object_id))
    }

    async fn query(&self, request: QueryRequest) -> Result<ObjectList, CmisError> {
        self.enter(&request.repository_id).await?;

        let term = request.statement.trim().to_lowercase();
        let matches: Vec<ObjectData> = {
            let objects = self.read_objects()?;
            objects
                .iter()
                .filter(|o| !o.data.is_folder())
                .filter(|o| {
                    term.is_empty() || term == "*" || o.data.name.to_lowercase().contains(&term)
                })
                .map(|o| o.data.clone())
                .collect()
        };

        let (objects, has_more_items, total) = page(matches, request.max_items, request.skip_count);
        Ok(ObjectList {
            objects,
            has_more_items,
            num_items: Some(total),
        })
    }

    async fn get_children(
        &self,
        request: GetChildrenRequest,
    ) -> Result<ObjectInFolderList, CmisError> {
        self.enter(&request.repository_id).await?;

        let mut children: Vec<ObjectData> = {
            let objects = self.read_objects()?;
            match objects.iter().find(|o| o.data.id == request.folder_id) {
                Some(folder) if folder.data.is_folder() => {}
                Some(_) => {
                    return Err(CmisError::InvalidArgument(format!(
                        "{} is not a folder",
                        request.folder_id
                    )))
                }
                None => return Err(CmisError::ObjectNotFound(request.folder_id)),
            }
            objects
                .iter()
                .filter(|o| o.data.parent_id.as_deref() == Some(request.folder_id.as_str()))
                .map(|o| o.data.clone())
                .collect()
        };

        if let Some(order_by) = request.order_by.as_deref() {
            let mut parts = order_by.split_whitespace();
            match (parts.next(), parts.next()) {
                (Some("cmis:name"), direction) => {
                    children.sort_by(|a, b| a.name.cmp(&b.name));
                    if direction.is_some_and(|d| d.eq_ignore_ascii_case("desc")) {
                        children.reverse();
                    }
                }
                _ => {
                    return Err(CmisError::InvalidArgument(format!(
                        "unsupported orderBy '{}'",
                        order_by
                    )))
                }
            }
        }

        let with_segment = request.include_path_segment.unwrap_or(false);
        let (children, has_more_items, total) =
            page(children, request.max_items, request.skip_count);
        Ok(ObjectInFolderList {
            objects: children
                .into_iter()
                .map(|object| ObjectInFolderData {
                    path_segment: with_segment.then(|| object.name.clone()),
                    object,
                })
                .collect(),
            has_more_items,
            num_items: Some(total),
        })
    }

    async fn get_content_stream(
        &self,
        request: GetContentStreamRequest,
    ) -> Result<ContentStream, CmisError> {
        self.enter(&request.repository_id).await?;

        let objects = self.read_objects()?;
        let object = objects
            .iter()
            .find(|o| o.data.id == request.object_id)
            .ok_or_else(|| CmisError::ObjectNotFound(request.object_id.clone()))?;
        let content = object.content.as_ref().ok_or_else(|| {
            CmisError::InvalidArgument(format!("{} has no content stream", request.object_id))
        })?;

        let size = content.len() as u64;
        let offset = request.offset.unwrap_or(0);
        if offset > size {
            return Err(CmisError::InvalidArgument(format!(
                "offset {} beyond content length {}",
                offset, size
            )));
        }
        let end = match request.length {
            Some(length) => offset.saturating_add(length).min(size),
            None => size,
        };
        let data = content[offset as usize..end as usize].to_vec();

        Ok(ContentStream {
            filename: object.data.name.clone(),
            mime_type: object
                .data
                .mime_type
                .clone()
                .unwrap_or_else(|| "application/octet-stream".to_string()),
            length: data.len() as u64,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> (InMemoryRepository, String) {
        let repo = InMemoryRepository::new("repo");
        let docs = repo.add_folder(ROOT_FOLDER_ID, "docs").unwrap();
        repo.add_document(&docs, "b-report.txt", "text/plain", "hello world")
            .unwrap();
        repo.add_document(&docs, "a-invoice.pdf", "application/pdf", vec![1u8, 2, 3])
            .unwrap();
        repo.add_document(&docs, "c-report.md", "text/markdown", "# notes")
            .unwrap();
        (repo, docs)
    }

    #[test]
    fn test_page_window() {
        let (items, more, total) = page(vec![1, 2, 3, 4, 5], Some(2), Some(1));
        assert_eq!(items, vec![2, 3]);
        assert!(more);
        assert_eq!(total, 5);

        let (items, more, _) = page(vec![1, 2, 3], None, Some(10));
        assert!(items.is_empty());
        assert!(!more);
    }

    #[test]
    fn test_add_under_document_fails() {
        let (repo, docs) = repo();
        let doc = repo.add_document(&docs, "x", "text/plain", "x").unwrap();
        let err = repo.add_folder(&doc, "nested").unwrap_err();
        assert!(matches!(err, CmisError::InvalidArgument(_)));
        let err = repo.add_folder("missing", "nested").unwrap_err();
        assert!(matches!(err, CmisError::ObjectNotFound(_)));
    }

    #[tokio::test]
    async fn test_query_matches_names() {
        let (repo, _) = repo();
        let result = repo.query(QueryRequest::new("repo", "report")).await.unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result.num_items, Some(2));
        assert!(!result.has_more_items);

        let all = repo
            .query(QueryRequest::new("repo", "*").with_paging(Some(1), None))
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
        assert!(all.has_more_items);
        assert_eq!(all.num_items, Some(3));
    }

    #[tokio::test]
    async fn test_get_children_ordering_and_segments() {
        let (repo, docs) = repo();
        let mut request = GetChildrenRequest::new("repo", docs.clone());
        request.order_by = Some("cmis:name DESC".to_string());
        request.include_path_segment = Some(true);

        let children = repo.get_children(request).await.unwrap();
        let names: Vec<_> = children.objects.iter().map(|c| c.object.name.as_str()).collect();
        assert_eq!(names, vec!["c-report.md", "b-report.txt", "a-invoice.pdf"]);
        assert_eq!(children.objects[0].path_segment.as_deref(), Some("c-report.md"));

        let mut request = GetChildrenRequest::new("repo", docs);
        request.order_by = Some("cmis:creationDate".to_string());
        assert!(matches!(
            repo.get_children(request).await,
            Err(CmisError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_get_children_of_missing_folder() {
        let (repo, _) = repo();
        let err = repo
            .get_children(GetChildrenRequest::new("repo", "nope"))
            .await
            .unwrap_err();
        assert_eq!(err, CmisError::ObjectNotFound("nope".to_string()));
    }

    #[tokio::test]
    async fn test_content_stream_range() {
        let (repo, docs) = repo();
        let id = repo
            .add_document(&docs, "greeting.txt", "text/plain", "hello world")
            .unwrap();

        let full = repo
            .get_content_stream(GetContentStreamRequest::new("repo", id.clone()))
            .await
            .unwrap();
        assert_eq!(full.data, b"hello world");
        assert_eq!(full.mime_type, "text/plain");

        let range = repo
            .get_content_stream(
                GetContentStreamRequest::new("repo", id.clone()).with_range(Some(6), Some(100)),
            )
            .await
            .unwrap();
        assert_eq!(range.data, b"world");
        assert_eq!(range.length, 5);

        let err = repo
            .get_content_stream(GetContentStreamRequest::new("repo", id).with_range(Some(12), None))
            .await
            .unwrap_err();
        assert!(matches!(err, CmisError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_unavailable_and_unknown_repository() {
        let (repo, _) = repo();
        let err = repo.get_repository_info("other".to_string()).await.unwrap_err();
        assert!(matches!(err, CmisError::ObjectNotFound(_)));

        repo.set_available(false);
        let err = repo.query(QueryRequest::new("repo", "")).await.unwrap_err();
        assert!(matches!(err, CmisError::BackendUnavailable(_)));
    }

    #[tokio::test]
    async fn test_get_object() {
        let (repo, docs) = repo();
        let folder = repo
            .get_object(GetObjectRequest::new("repo", docs))
            .await
            .unwrap();
        assert!(folder.is_folder());
        assert_eq!(folder.name, "docs");
        assert_eq!(folder.parent_id.as_deref(), Some(ROOT_FOLDER_ID));
    }
}
