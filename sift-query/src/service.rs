//! External collaborators: the column catalog service and the search service.
//!
//! The registry never talks to a network itself. Screens plug in an
//! implementation of these traits; the in-memory ones here are used by tests
//! and by callers that already hold their column lists.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::column::ColumnInfo;
use crate::error::{FilterError, FilterResult};
use crate::query::SearchRequest;
use crate::registry::ProjectId;

/// Supplies the filterable columns of a slot for a project.
#[async_trait]
pub trait ColumnCatalogService: Send + Sync {
    /// Fetch the ordered column list for `slot` in `project`.
    async fn fetch_columns(&self, project: ProjectId, slot: &str) -> FilterResult<Vec<ColumnInfo>>;
}

/// Runs a serialized filter against the backend.
#[async_trait]
pub trait SearchService: Send + Sync {
    /// Whatever the backend returns for a search.
    type Response: Send;

    /// Execute a search request.
    async fn search(&self, request: &SearchRequest) -> FilterResult<Self::Response>;
}

/// A catalog service backed by a fixed map of column lists.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalogService {
    columns: Arc<RwLock<HashMap<(ProjectId, String), Vec<ColumnInfo>>>>,
}

impl StaticCatalogService {
    /// Create an empty service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the columns of a slot for a project.
    pub fn register(
        &self,
        project: impl Into<ProjectId>,
        slot: impl Into<String>,
        columns: Vec<ColumnInfo>,
    ) -> &Self {
        self.columns
            .write()
            .insert((project.into(), slot.into()), columns);
        self
    }

    /// Remove a registration.
    pub fn unregister(&self, project: impl Into<ProjectId>, slot: &str) -> Option<Vec<ColumnInfo>> {
        self.columns.write().remove(&(project.into(), slot.to_string()))
    }

    /// Number of registered (project, slot) pairs.
    pub fn len(&self) -> usize {
        self.columns.read().len()
    }

    /// Check if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.columns.read().is_empty()
    }
}

#[async_trait]
impl ColumnCatalogService for StaticCatalogService {
    async fn fetch_columns(&self, project: ProjectId, slot: &str) -> FilterResult<Vec<ColumnInfo>> {
        self.columns
            .read()
            .get(&(project, slot.to_string()))
            .cloned()
            .ok_or_else(|| {
                FilterError::catalog_service(format!(
                    "No columns registered for slot '{}' in project {}",
                    slot, project
                ))
            })
    }
}

/// Boxed future returned by a catalog callback.
pub type CatalogFuture = Pin<Box<dyn Future<Output = FilterResult<Vec<ColumnInfo>>> + Send>>;

/// Type alias for async catalog callbacks.
pub type CatalogFn = Arc<dyn Fn(ProjectId, String) -> CatalogFuture + Send + Sync>;

/// A catalog service driven by a callback.
pub struct FnCatalogService {
    fetch_fn: CatalogFn,
}

impl FnCatalogService {
    /// Create a service from an async callback.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(ProjectId, String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = FilterResult<Vec<ColumnInfo>>> + Send + 'static,
    {
        Self {
            fetch_fn: Arc::new(move |project, slot| Box::pin(f(project, slot))),
        }
    }
}

impl std::fmt::Debug for FnCatalogService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnCatalogService").finish()
    }
}

#[async_trait]
impl ColumnCatalogService for FnCatalogService {
    async fn fetch_columns(&self, project: ProjectId, slot: &str) -> FilterResult<Vec<ColumnInfo>> {
        (self.fetch_fn)(project, slot.to_string()).await
    }
}

/// A search service that records every request and answers with its JSON.
///
/// Useful for inspecting exactly what a screen would send.
#[derive(Debug, Clone, Default)]
pub struct RecordingSearchService {
    requests: Arc<RwLock<Vec<SearchRequest>>>,
}

impl RecordingSearchService {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// All requests seen so far.
    pub fn requests(&self) -> Vec<SearchRequest> {
        self.requests.read().clone()
    }

    /// The most recent request.
    pub fn last(&self) -> Option<SearchRequest> {
        self.requests.read().last().cloned()
    }
}

#[async_trait]
impl SearchService for RecordingSearchService {
    type Response = serde_json::Value;

    async fn search(&self, request: &SearchRequest) -> FilterResult<Self::Response> {
        self.requests.write().push(request.clone());
        request.to_value()
    }
}
