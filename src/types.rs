// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Core types for CMIS service calls.
//!
//! This module defines the request and response shapes of the operations the
//! monitoring wrapper sits in front of. Optional paging and filter parameters
//! stay `Option` all the way through: the wrapper never fills in defaults.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Shared parameter types
// ============================================================================

/// Which relationships to include with returned objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncludeRelationships {
    None,
    Source,
    Target,
    Both,
}

/// Opaque extension payload carried alongside a request or response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtensionsData {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub elements: Vec<serde_json::Value>,
}

impl ExtensionsData {
    /// Create extension data from a list of JSON elements.
    pub fn new(elements: Vec<serde_json::Value>) -> Self {
        Self { elements }
    }
}

/// Base type of a repository object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BaseType {
    Document,
    Folder,
}

// ============================================================================
// Response types
// ============================================================================

/// Basic description of a repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub root_folder_id: String,
    pub product_name: String,
    pub product_version: String,
}

/// A repository object and its properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectData {
    pub id: String,
    pub name: String,
    pub base_type: BaseType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub last_modified: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub properties: HashMap<String, serde_json::Value>,
}

impl ObjectData {
    /// Check if the object is a folder.
    pub fn is_folder(&self) -> bool {
        self.base_type == BaseType::Folder
    }
}

/// A page of objects returned by a query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectList {
    pub objects: Vec<ObjectData>,
    pub has_more_items: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_items: Option<u64>,
}

impl ObjectList {
    /// Number of objects on this page.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Check if the page is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

/// A child entry of a folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectInFolderData {
    pub object: ObjectData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_segment: Option<String>,
}

/// A page of folder children.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectInFolderList {
    pub objects: Vec<ObjectInFolderData>,
    pub has_more_items: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_items: Option<u64>,
}

impl ObjectInFolderList {
    /// Number of children on this page.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Check if the page is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

/// Document content, possibly a byte range of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentStream {
    pub filename: String,
    pub mime_type: String,
    pub length: u64,
    pub data: Vec<u8>,
}

// ============================================================================
// Requests
// ============================================================================

/// Arguments of `getObject`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetObjectRequest {
    pub repository_id: String,
    pub object_id: String,
    pub filter: Option<String>,
    pub include_allowable_actions: Option<bool>,
    pub include_relationships: Option<IncludeRelationships>,
    pub rendition_filter: Option<String>,
    pub extension: Option<ExtensionsData>,
}

impl GetObjectRequest {
    pub fn new(repository_id: impl Into<String>, object_id: impl Into<String>) -> Self {
        Self {
            repository_id: repository_id.into(),
            object_id: object_id.into(),
            ..Default::default()
        }
    }
}

/// Arguments of `query`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub repository_id: String,
    pub statement: String,
    pub search_all_versions: Option<bool>,
    pub include_allowable_actions: Option<bool>,
    pub include_relationships: Option<IncludeRelationships>,
    pub rendition_filter: Option<String>,
    pub max_items: Option<u64>,
    pub skip_count: Option<u64>,
    pub extension: Option<ExtensionsData>,
}

impl QueryRequest {
    pub fn new(repository_id: impl Into<String>, statement: impl Into<String>) -> Self {
        Self {
            repository_id: repository_id.into(),
            statement: statement.into(),
            ..Default::default()
        }
    }

    /// Set the paging window.
    pub fn with_paging(mut self, max_items: Option<u64>, skip_count: Option<u64>) -> Self {
        self.max_items = max_items;
        self.skip_count = skip_count;
        self
    }
}

/// Arguments of `getChildren`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetChildrenRequest {
    pub repository_id: String,
    pub folder_id: String,
    pub filter: Option<String>,
    pub order_by: Option<String>,
    pub include_allowable_actions: Option<bool>,
    pub include_relationships: Option<IncludeRelationships>,
    pub rendition_filter: Option<String>,
    pub include_path_segment: Option<bool>,
    pub max_items: Option<u64>,
    pub skip_count: Option<u64>,
    pub extension: Option<ExtensionsData>,
}

impl GetChildrenRequest {
    pub fn new(repository_id: impl Into<String>, folder_id: impl Into<String>) -> Self {
        Self {
            repository_id: repository_id.into(),
            folder_id: folder_id.into(),
            ..Default::default()
        }
    }

    /// Set the paging window.
    pub fn with_paging(mut self, max_items: Option<u64>, skip_count: Option<u64>) -> Self {
        self.max_items = max_items;
        self.skip_count = skip_count;
        self
    }
}

/// Arguments of `getContentStream`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetContentStreamRequest {
    pub repository_id: String,
    pub object_id: String,
    pub stream_id: Option<String>,
    pub offset: Option<u64>,
    pub length: Option<u64>,
    pub extension: Option<ExtensionsData>,
}

impl GetContentStreamRequest {
    pub fn new(repository_id: impl Into<String>, object_id: impl Into<String>) -> Self {
        Self {
            repository_id: repository_id.into(),
            object_id: object_id.into(),
            ..Default::default()
        }
    }

    /// Request a byte range of the content.
    pub fn with_range(mut self, offset: Option<u64>, length: Option<u64>) -> Self {
        self.offset = offset;
        self.length = length;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_request_defaults_are_unset() {
        let req = QueryRequest::new("repo", "SELECT * FROM cmis:document");
        assert_eq!(req.repository_id, "repo");
        assert!(req.max_items.is_none());
        assert!(req.skip_count.is_none());
        assert!(req.search_all_versions.is_none());
    }

    #[test]
    fn test_children_request_paging() {
        let req = GetChildrenRequest::new("repo", "root").with_paging(Some(10), None);
        assert_eq!(req.max_items, Some(10));
        assert_eq!(req.skip_count, None);
    }

    #[test]
    fn test_request_serializes_camel_case() {
        let req = GetContentStreamRequest::new("repo", "doc-1").with_range(Some(4), Some(8));
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["objectId"], "doc-1");
        assert_eq!(json["offset"], 4);
        assert_eq!(json["length"], 8);
    }

    #[test]
    fn test_include_relationships_serde() {
        let json = serde_json::to_string(&IncludeRelationships::Both).unwrap();
        assert_eq!(json, "\"both\"");
        let parsed: IncludeRelationships = serde_json::from_str("\"source\"").unwrap();
        assert_eq!(parsed, IncludeRelationships::Source);
    }
}
