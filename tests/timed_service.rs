// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! End-to-end tests of the timing wrapper over the in-memory repository and
//! the in-process backend.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use cmis_monitor::service::ROOT_FOLDER_ID;
use cmis_monitor::types::{
    ContentStream, GetChildrenRequest, GetContentStreamRequest, GetObjectRequest, ObjectData,
    ObjectInFolderList, ObjectList, QueryRequest, RepositoryInfo,
};
use cmis_monitor::{
    CmisError, CmisService, InMemoryRepository, InstrumentationRegistry, LocalBackend,
    MonitorError, OperationCatalog, TimedService,
};

fn registry(backend: &Arc<LocalBackend>) -> Arc<InstrumentationRegistry> {
    Arc::new(InstrumentationRegistry::new(
        backend.clone(),
        OperationCatalog::default(),
    ))
}

fn repository_with_folder(latency: Duration) -> (InMemoryRepository, String) {
    let repo = InMemoryRepository::new("repo").with_latency(latency);
    let folder = repo.add_folder(ROOT_FOLDER_ID, "reports").unwrap();
    for name in ["a.txt", "b.txt", "c.txt"] {
        repo.add_document(&folder, name, "text/plain", "hello").unwrap();
    }
    (repo, folder)
}

// ============================================================================
// Pass-through and timing
// ============================================================================

#[tokio::test]
async fn test_get_children_is_returned_and_timed() {
    let backend = Arc::new(LocalBackend::default());
    let (repo, folder) = repository_with_folder(Duration::from_millis(12));
    let repo = Arc::new(repo);

    let direct = repo
        .get_children(GetChildrenRequest::new("repo", folder.clone()))
        .await
        .unwrap();

    let service = TimedService::new(repo.clone(), registry(&backend));
    service.initialize().unwrap();
    let wrapped = service
        .get_children(GetChildrenRequest::new("repo", folder))
        .await
        .unwrap();

    assert_eq!(wrapped, direct);
    assert_eq!(wrapped.len(), 3);

    let stats = backend.accumulator_stats("getChildrenTime").unwrap();
    assert_eq!(stats.samples, 1);
    assert!(stats.total >= Duration::from_millis(12));
    assert_eq!(backend.event_count("getChildren"), Some(1));
    assert_eq!(backend.event_count("query"), Some(0));
}

#[tokio::test]
async fn test_failed_query_is_timed_and_error_unchanged() {
    let backend = Arc::new(LocalBackend::default());
    let repo = Arc::new(InMemoryRepository::new("repo"));
    repo.set_available(false);

    let expected = repo
        .query(QueryRequest::new("repo", "*"))
        .await
        .unwrap_err();

    let service = TimedService::new(repo.clone(), registry(&backend));
    let err = service
        .query(QueryRequest::new("repo", "*"))
        .await
        .unwrap_err();

    assert_eq!(err, expected);
    assert!(matches!(err, CmisError::BackendUnavailable(_)));
    assert_eq!(backend.accumulator_stats("queryTime").unwrap().samples, 1);
    assert_eq!(backend.event_count("query"), Some(1));
}

#[tokio::test]
async fn test_content_range_passes_through() {
    let backend = Arc::new(LocalBackend::default());
    let repo = InMemoryRepository::new("repo");
    let doc = repo
        .add_document(ROOT_FOLDER_ID, "data.bin", "application/octet-stream", vec![7u8; 32])
        .unwrap();

    let service = TimedService::new(repo, registry(&backend));
    let stream = service
        .get_content_stream(GetContentStreamRequest::new("repo", doc).with_range(Some(8), Some(4)))
        .await
        .unwrap();

    assert_eq!(stream.data, vec![7u8; 4]);
    assert_eq!(
        backend.accumulator_stats("getContentStreamTime").unwrap().samples,
        1
    );
}

// ============================================================================
// Registration
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_calls_racing_first_registration() {
    let backend = Arc::new(LocalBackend::default().with_lookup_delay(Duration::from_millis(20)));
    let (repo, folder) = repository_with_folder(Duration::from_millis(2));
    let service = Arc::new(TimedService::new(repo, registry(&backend)));

    let query = {
        let service = service.clone();
        tokio::spawn(async move { service.query(QueryRequest::new("repo", "txt")).await })
    };
    let children = {
        let service = service.clone();
        tokio::spawn(async move {
            service
                .get_children(GetChildrenRequest::new("repo", folder))
                .await
        })
    };

    assert_eq!(query.await.unwrap().unwrap().len(), 3);
    assert_eq!(children.await.unwrap().unwrap().len(), 3);

    assert_eq!(service.registry().registration_passes(), 1);
    let counts = backend.lookup_counts();
    assert_eq!(counts.containers, 1);
    assert_eq!(counts.accumulators, 3);
    assert_eq!(backend.accumulator_stats("queryTime").unwrap().samples, 1);
    assert_eq!(backend.accumulator_stats("getChildrenTime").unwrap().samples, 1);
    assert_eq!(backend.event_count("allEvents"), Some(2));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_initialize_registers_once() {
    let backend = Arc::new(LocalBackend::default().with_lookup_delay(Duration::from_millis(5)));
    let service = Arc::new(TimedService::new(
        InMemoryRepository::new("repo"),
        registry(&backend),
    ));

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let service = service.clone();
            tokio::task::spawn_blocking(move || service.initialize())
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(service.registry().registration_passes(), 1);
    assert_eq!(backend.lookup_counts().containers, 1);
    assert_eq!(backend.lookup_counts().events, 4);
}

#[tokio::test]
async fn test_unreachable_backend_fails_fast() {
    let backend = Arc::new(LocalBackend::default());
    backend.set_reachable(false);
    let service = TimedService::new(InMemoryRepository::new("repo"), registry(&backend));

    assert!(matches!(
        service.initialize(),
        Err(MonitorError::BackendUnreachable(_))
    ));
    let err = service
        .query(QueryRequest::new("repo", "*"))
        .await
        .unwrap_err();
    assert!(matches!(err, CmisError::Monitoring(_)));
}

#[tokio::test]
async fn test_slow_registration_does_not_stall_runtime() {
    // Default test runtime: a single thread shared by every task.
    let backend = Arc::new(LocalBackend::default().with_lookup_delay(Duration::from_millis(20)));
    let (repo, _) = repository_with_folder(Duration::ZERO);
    let service = TimedService::new(repo, registry(&backend));

    let ticks = Arc::new(AtomicU64::new(0));
    let ticker = {
        let ticks = ticks.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_millis(5)).await;
                ticks.fetch_add(1, Ordering::Relaxed);
            }
        })
    };

    // Eight lookups at 20ms each.
    let page = service.query(QueryRequest::new("repo", "txt")).await.unwrap();
    ticker.abort();

    assert_eq!(page.len(), 3);
    assert_eq!(service.registry().registration_passes(), 1);
    assert!(
        ticks.load(Ordering::Relaxed) >= 5,
        "ticker advanced {} times during registration",
        ticks.load(Ordering::Relaxed)
    );
}

// ============================================================================
// Cancelled and panicking calls
// ============================================================================

#[tokio::test]
async fn test_cancelled_call_is_still_timed() {
    let backend = Arc::new(LocalBackend::default());
    let repo = InMemoryRepository::new("repo").with_latency(Duration::from_millis(200));
    let service = TimedService::new(repo, registry(&backend));
    service.initialize().unwrap();

    let outcome = tokio::time::timeout(
        Duration::from_millis(10),
        service.query(QueryRequest::new("repo", "*")),
    )
    .await;

    assert!(outcome.is_err());
    let stats = backend.accumulator_stats("queryTime").unwrap();
    assert_eq!(stats.samples, 1);
    assert!(stats.total < Duration::from_millis(200));
    assert_eq!(backend.event_count("query"), Some(1));
}

/// Repository whose `query` panics after a short delay.
struct PanickingRepository;

#[async_trait]
impl CmisService for PanickingRepository {
    async fn get_repository_info(&self, _: String) -> Result<RepositoryInfo, CmisError> {
        Err(CmisError::Runtime("not supported".to_string()))
    }

    async fn get_object(&self, _: GetObjectRequest) -> Result<ObjectData, CmisError> {
        Err(CmisError::Runtime("not supported".to_string()))
    }

    async fn query(&self, _: QueryRequest) -> Result<ObjectList, CmisError> {
        tokio::time::sleep(Duration::from_millis(3)).await;
        panic!("index corrupted");
    }

    async fn get_children(&self, _: GetChildrenRequest) -> Result<ObjectInFolderList, CmisError> {
        Err(CmisError::Runtime("not supported".to_string()))
    }

    async fn get_content_stream(
        &self,
        _: GetContentStreamRequest,
    ) -> Result<ContentStream, CmisError> {
        Err(CmisError::Runtime("not supported".to_string()))
    }
}

#[tokio::test]
async fn test_panicking_call_is_still_timed() {
    let backend = Arc::new(LocalBackend::default());
    let service = Arc::new(TimedService::new(PanickingRepository, registry(&backend)));
    service.initialize().unwrap();

    let task = {
        let service = service.clone();
        tokio::spawn(async move { service.query(QueryRequest::new("repo", "*")).await })
    };
    let err = task.await.unwrap_err();

    assert!(err.is_panic());
    let stats = backend.accumulator_stats("queryTime").unwrap();
    assert_eq!(stats.samples, 1);
    assert!(stats.total >= Duration::from_millis(3));
    assert_eq!(backend.event_count("allEvents"), Some(1));
}
