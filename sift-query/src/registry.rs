//! The filter instance registry.
//!
//! A [`FilterRegistry`] owns every [`FilterSlot`] of an application. Slots are
//! created lazily on first reference and each lives behind its own lock, so
//! edits on different slots never contend or interfere.
//!
//! The registry also tracks the selected project. Changing it resets every
//! slot and bumps a generation counter; requests snapshotted under an older
//! generation are recognised as stale, and catalogs fetched for a project
//! that is no longer selected are dropped.
//!
//! ```rust
//! use sift_query::{FilterRegistry, ProjectId, RegistryConfig};
//!
//! let registry = FilterRegistry::new(RegistryConfig::default());
//! registry.set_project(ProjectId::new(1));
//!
//! let documents = registry.slot("documents");
//! documents.with(|slot| {
//!     slot.start_edit("documents");
//!     slot.finish_edit().unwrap();
//! });
//! assert_eq!(documents.read(|slot| slot.active_filter_count("documents")), 1);
//!
//! registry.set_project(ProjectId::new(2));
//! assert_eq!(documents.read(|slot| slot.active_filter_count("documents")), 0);
//! ```

use futures::future::join_all;
use parking_lot::{RwLock, RwLockWriteGuard};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

use crate::column::{ColumnCatalog, ColumnInfo};
use crate::error::{FilterError, FilterResult};
use crate::query::{SearchRequest, SortSpec};
use crate::service::{ColumnCatalogService, SearchService};
use crate::slot::{ExpressionTemplate, FilterSlot};
use crate::tree::FilterGroup;

/// Identifier of the selected project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(i64);

impl ProjectId {
    /// Create a project id.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the raw id.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ProjectId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Per-slot settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotSettings {
    /// Template for new expressions.
    pub template: ExpressionTemplate,
    /// Editing mode override for this slot.
    pub expert_mode: Option<bool>,
}

/// Settings applied to slots when they are created.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistryConfig {
    /// Template for slots without their own settings.
    pub default_template: ExpressionTemplate,
    /// Default editing mode.
    pub expert_mode: bool,
    /// Per-slot settings, keyed by slot name.
    pub slots: HashMap<String, SlotSettings>,
}

impl RegistryConfig {
    /// Create a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fallback template.
    pub fn with_default_template(mut self, template: ExpressionTemplate) -> Self {
        self.default_template = template;
        self
    }

    /// Set the default editing mode.
    pub fn with_expert_mode(mut self, expert_mode: bool) -> Self {
        self.expert_mode = expert_mode;
        self
    }

    /// Set the template for one slot.
    pub fn with_slot_template(mut self, slot: impl Into<String>, template: ExpressionTemplate) -> Self {
        self.slots.insert(
            slot.into(),
            SlotSettings {
                template,
                expert_mode: None,
            },
        );
        self
    }

    fn build_slot(&self, name: &str) -> FilterSlot {
        let settings = self.slots.get(name);
        let template = settings
            .map(|s| s.template.clone())
            .unwrap_or_else(|| self.default_template.clone());
        let expert_mode = settings
            .and_then(|s| s.expert_mode)
            .unwrap_or(self.expert_mode);

        let mut slot = FilterSlot::new(name, template);
        slot.set_expert_mode(expert_mode);
        slot
    }
}

/// Shared handle to one slot.
///
/// [`SlotHandle::with`] takes the slot exclusively and [`SlotHandle::read`]
/// shares it. Registry calls that only read a slot (`request`,
/// `has_catalog`) may be made from inside a `read` closure on the same slot.
/// Calls that write it (`set_project`, `store_catalog`, catalog loads) must
/// not be made from inside either closure; they would wait on the guard the
/// closure holds.
#[derive(Debug, Clone)]
pub struct SlotHandle {
    inner: Arc<RwLock<FilterSlot>>,
}

impl SlotHandle {
    fn new(slot: FilterSlot) -> Self {
        Self {
            inner: Arc::new(RwLock::new(slot)),
        }
    }

    /// Lock the slot for writing.
    pub fn lock(&self) -> RwLockWriteGuard<'_, FilterSlot> {
        self.inner.write()
    }

    /// Run a closure with exclusive, mutable access to the slot.
    pub fn with<R>(&self, f: impl FnOnce(&mut FilterSlot) -> R) -> R {
        let mut guard = self.inner.write();
        f(&mut *guard)
    }

    /// Run a closure with shared access to the slot.
    ///
    /// Readers do not wait for queued writers, so nested reads of the same
    /// slot cannot deadlock.
    pub fn read<R>(&self, f: impl FnOnce(&FilterSlot) -> R) -> R {
        let guard = self.inner.read_recursive();
        f(&*guard)
    }
}

/// Owned store of all filter slots.
pub struct FilterRegistry {
    config: RegistryConfig,
    project: RwLock<Option<ProjectId>>,
    generation: AtomicU64,
    slots: RwLock<HashMap<String, SlotHandle>>,
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterRegistry")
            .field("project", &*self.project.read())
            .field("generation", &self.generation())
            .field("slots", &self.slot_names())
            .finish()
    }
}

impl FilterRegistry {
    /// Create an empty registry.
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            project: RwLock::new(None),
            generation: AtomicU64::new(0),
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// The registry settings.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    // ============== Slots ==============

    /// Get a slot, creating it on first reference.
    pub fn slot(&self, name: &str) -> SlotHandle {
        if let Some(handle) = self.slots.read().get(name) {
            return handle.clone();
        }

        self.slots
            .write()
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!(slot = %name, "Filter slot created");
                SlotHandle::new(self.config.build_slot(name))
            })
            .clone()
    }

    /// Check whether a slot exists.
    pub fn contains(&self, name: &str) -> bool {
        self.slots.read().contains_key(name)
    }

    /// Names of all created slots, sorted.
    pub fn slot_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.slots.read().keys().cloned().collect();
        names.sort();
        names
    }

    // ============== Project ==============

    /// The selected project.
    pub fn project(&self) -> Option<ProjectId> {
        *self.project.read()
    }

    /// The current generation. Bumped on every project change.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Select a project.
    ///
    /// If the project differs from the current one, every slot is reset and
    /// its catalog invalidated before this returns. Returns whether anything
    /// changed.
    pub fn set_project(&self, project: ProjectId) -> bool {
        let mut current = self.project.write();
        if *current == Some(project) {
            return false;
        }

        let previous = current.replace(project);
        self.generation.fetch_add(1, Ordering::AcqRel);

        let slots = self.slots.read();
        for handle in slots.values() {
            handle.lock().reset();
        }

        info!(
            previous = ?previous.map(|p| p.as_i64()),
            project = %project,
            slots = slots.len(),
            "Project changed, filters reset"
        );
        true
    }

    // ============== Column Catalogs ==============

    /// Store a slot's catalog for a project.
    ///
    /// A catalog for a project that is no longer selected is discarded and
    /// `false` is returned.
    pub fn store_catalog(&self, slot: &str, project: ProjectId, columns: Vec<ColumnInfo>) -> bool {
        // Held across the write so a concurrent project change cannot interleave.
        let current = self.project.read();
        if *current != Some(project) {
            warn!(slot = %slot, project = %project, "Discarding catalog for deselected project");
            return false;
        }

        self.slot(slot)
            .lock()
            .set_catalog(project, ColumnCatalog::from_columns(columns));
        true
    }

    /// Check whether a slot has a catalog for the selected project.
    pub fn has_catalog(&self, slot: &str) -> bool {
        match self.project() {
            Some(project) => self.slot(slot).read(|s| s.catalog_for(&project).is_some()),
            None => false,
        }
    }

    /// Load a slot's catalog for the selected project, unless already cached.
    pub async fn load_catalog<S>(&self, slot: &str, service: &S) -> FilterResult<()>
    where
        S: ColumnCatalogService + ?Sized,
    {
        self.fetch_catalog(slot, service, false).await
    }

    /// Fetch a slot's catalog again, replacing the cached one.
    pub async fn reload_catalog<S>(&self, slot: &str, service: &S) -> FilterResult<()>
    where
        S: ColumnCatalogService + ?Sized,
    {
        self.fetch_catalog(slot, service, true).await
    }

    /// Load the catalogs of several slots concurrently.
    pub async fn load_catalogs<S>(&self, slots: &[&str], service: &S) -> Vec<FilterResult<()>>
    where
        S: ColumnCatalogService + ?Sized,
    {
        join_all(slots.iter().map(|slot| self.load_catalog(slot, service))).await
    }

    async fn fetch_catalog<S>(&self, slot: &str, service: &S, force: bool) -> FilterResult<()>
    where
        S: ColumnCatalogService + ?Sized,
    {
        let project = self.project().ok_or_else(FilterError::no_project)?;
        if !force && self.has_catalog(slot) {
            return Ok(());
        }

        let columns = service
            .fetch_columns(project, slot)
            .await
            .map_err(|e| e.with_slot(slot).with_context("Loading column catalog"))?;

        if self.store_catalog(slot, project, columns) {
            Ok(())
        } else {
            Err(FilterError::stale(format!(
                "Catalog for slot '{}' arrived after project {} was deselected",
                slot, project
            ))
            .with_slot(slot))
        }
    }

    // ============== Queries ==============

    /// Snapshot a committed filter into a search request.
    ///
    /// Sort columns are checked against the slot's catalog when one is loaded.
    pub fn request(&self, slot: &str, root: &str, sorts: Vec<SortSpec>) -> FilterResult<SearchRequest> {
        let project = self.project.read();
        let project_id = (*project).ok_or_else(FilterError::no_project)?;

        let filter = self.slot(slot).read(|s| -> FilterResult<FilterGroup> {
            if let Some(catalog) = s.catalog_for(&project_id) {
                SortSpec::validate_all(&sorts, catalog)?;
            }
            Ok(s.committed_or_empty(root))
        })?;

        Ok(SearchRequest::new(project_id, filter, sorts).at_generation(self.generation()))
    }

    /// Check whether a request was issued under the current project.
    pub fn is_current(&self, request: &SearchRequest) -> bool {
        request.generation() == self.generation()
    }

    /// Check whether a request still matches what is committed for its root.
    ///
    /// False after a project change or once the slot commits a different
    /// filter under the same root.
    pub fn is_committed(&self, slot: &str, request: &SearchRequest) -> bool {
        self.is_current(request)
            && self
                .slot(slot)
                .read(|s| s.committed_or_empty(&request.filter.id) == request.filter)
    }

    /// Snapshot a committed filter and run it against a search service.
    ///
    /// The snapshot is returned with the response so callers can check it
    /// with [`FilterRegistry::is_committed`]. Results that arrive after a
    /// project change are reported as stale.
    pub async fn search<S>(
        &self,
        slot: &str,
        root: &str,
        sorts: Vec<SortSpec>,
        service: &S,
    ) -> FilterResult<(SearchRequest, S::Response)>
    where
        S: SearchService + ?Sized,
    {
        let request = self.request(slot, root, sorts)?;
        debug!(
            slot = %slot,
            root = %root,
            expressions = request.filter.count_expressions(),
            "Issuing search"
        );

        let response = service
            .search(&request)
            .await
            .map_err(|e| e.with_slot(slot).with_context("Executing search"))?;

        if !self.is_current(&request) {
            warn!(slot = %slot, "Discarding search result for a stale filter");
            return Err(FilterError::stale(format!(
                "Search for slot '{}' finished after the project changed",
                slot
            ))
            .with_slot(slot));
        }

        Ok((request, response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::OperatorFamily;
    use crate::slot::InsertPosition;
    use crate::{FilterColumn, FilterOperator};

    fn columns() -> Vec<ColumnInfo> {
        vec![
            ColumnInfo::new("Filename", "filename", OperatorFamily::String).sortable(),
            ColumnInfo::new("Tags", "tag_id_list", OperatorFamily::IdList),
        ]
    }

    #[test]
    fn test_slots_are_lazy_and_distinct() {
        let registry = FilterRegistry::default();
        assert!(!registry.contains("documents"));

        let a = registry.slot("documents");
        let b = registry.slot("memos");
        a.with(|s| {
            s.start_edit("documents");
            s.finish_edit().unwrap();
        });

        assert_eq!(a.read(|s| s.active_filter_count("documents")), 1);
        assert_eq!(b.read(|s| s.active_filter_count("memos")), 0);
        assert_eq!(registry.slot_names(), vec!["documents", "memos"]);
    }

    #[test]
    fn test_same_name_shares_state() {
        let registry = FilterRegistry::default();
        registry.slot("documents").with(|s| s.start_edit("documents"));
        assert!(registry.slot("documents").read(|s| s.is_editing()));
    }

    #[test]
    fn test_slot_settings_from_config() {
        let config = RegistryConfig::new()
            .with_expert_mode(true)
            .with_slot_template("memos", ExpressionTemplate::new("title", FilterOperator::Equals, "x"));
        let registry = FilterRegistry::new(config);

        let memos = registry.slot("memos");
        assert_eq!(memos.read(|s| s.default_template().column.clone()), FilterColumn::fixed("title"));
        assert_eq!(memos.read(|s| s.default_insert_position()), InsertPosition::Prepend);
        assert_eq!(
            registry.slot("documents").read(|s| s.default_template().clone()),
            ExpressionTemplate::default()
        );
    }

    #[test]
    fn test_project_change_resets_slots() {
        let registry = FilterRegistry::default();
        registry.set_project(ProjectId::new(1));
        assert!(registry.store_catalog("documents", ProjectId::new(1), columns()));

        let documents = registry.slot("documents");
        documents.with(|s| {
            s.start_edit("documents");
            s.add_expression("documents", InsertPosition::Append).unwrap();
            s.add_expression("documents", InsertPosition::Append).unwrap();
            s.finish_edit().unwrap();
        });
        assert_eq!(documents.read(|s| s.active_filter_count("documents")), 3);

        let generation = registry.generation();
        assert!(registry.set_project(ProjectId::new(2)));
        assert!(registry.generation() > generation);
        assert_eq!(documents.read(|s| s.primary()), FilterGroup::empty("documents"));
        assert!(!registry.has_catalog("documents"));
    }

    #[test]
    fn test_same_project_is_noop() {
        let registry = FilterRegistry::default();
        registry.set_project(ProjectId::new(1));
        registry.slot("documents").with(|s| {
            s.start_edit("documents");
            s.finish_edit().unwrap();
        });

        assert!(!registry.set_project(ProjectId::new(1)));
        assert_eq!(registry.slot("documents").read(|s| s.active_filter_count("documents")), 1);
    }

    #[test]
    fn test_stale_catalog_is_discarded() {
        let registry = FilterRegistry::default();
        registry.set_project(ProjectId::new(2));
        assert!(!registry.store_catalog("documents", ProjectId::new(1), columns()));
        assert!(!registry.has_catalog("documents"));
    }

    #[test]
    fn test_request_snapshots_committed_filter() {
        let registry = FilterRegistry::default();
        registry.set_project(ProjectId::new(1));
        let documents = registry.slot("documents");
        documents.with(|s| {
            s.start_edit("documents");
            s.finish_edit().unwrap();
        });

        let request = registry.request("documents", "documents", vec![]).unwrap();
        documents.with(|s| {
            s.start_edit("documents");
            s.add_expression("documents", InsertPosition::Append).unwrap();
            s.finish_edit().unwrap();
        });

        assert_eq!(request.filter.count_expressions(), 1);
        assert!(registry.is_current(&request));
        registry.set_project(ProjectId::new(3));
        assert!(!registry.is_current(&request));
    }

    #[test]
    fn test_request_validates_sorts() {
        let registry = FilterRegistry::default();
        registry.set_project(ProjectId::new(1));
        registry.store_catalog("documents", ProjectId::new(1), columns());

        assert!(registry.request("documents", "documents", vec![SortSpec::asc("filename")]).is_ok());
        let err = registry
            .request("documents", "documents", vec![SortSpec::desc("tag_id_list")])
            .unwrap_err();
        assert_eq!(err.code, crate::ErrorCode::ColumnNotSortable);
    }

    #[test]
    fn test_request_requires_project() {
        let registry = FilterRegistry::default();
        let err = registry.request("documents", "documents", vec![]).unwrap_err();
        assert_eq!(err.code, crate::ErrorCode::NoProject);
    }

    #[test]
    fn test_registry_reads_inside_slot_read() {
        let registry = FilterRegistry::default();
        registry.set_project(ProjectId::new(1));
        registry.store_catalog("documents", ProjectId::new(1), columns());

        let documents = registry.slot("documents");
        let (request, has_catalog) = documents.read(|s| {
            assert!(!s.is_editing());
            (
                registry.request("documents", "documents", vec![]),
                registry.has_catalog("documents"),
            )
        });
        assert!(request.is_ok());
        assert!(has_catalog);
    }

    #[tokio::test]
    async fn test_search_returns_request_snapshot() {
        let registry = FilterRegistry::default();
        registry.set_project(ProjectId::new(1));
        registry.store_catalog("documents", ProjectId::new(1), columns());
        let documents = registry.slot("documents");
        documents.with(|s| {
            s.start_edit("documents");
            s.finish_edit().unwrap();
        });

        let service = crate::service::RecordingSearchService::new();
        let (request, response) = registry
            .search("documents", "documents", vec![], &service)
            .await
            .unwrap();

        assert_eq!(response["project_id"], 1);
        assert_eq!(service.last(), Some(request.clone()));
        assert!(registry.is_committed("documents", &request));

        documents.with(|s| {
            s.start_edit("documents");
            s.add_expression("documents", InsertPosition::Append).unwrap();
            s.finish_edit().unwrap();
        });
        assert!(registry.is_current(&request));
        assert!(!registry.is_committed("documents", &request));
    }
}
