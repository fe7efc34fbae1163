//! # sift-query
//!
//! Boolean filter engine for data-browsing screens.
//!
//! This crate provides:
//! - A filter tree of AND/OR groups over column-operator-value expressions
//! - Operator families that fix which operators a column accepts
//! - Per-slot column catalogs fetched from an external service
//! - An edit session protocol (start, modify, finish or discard)
//! - A registry of independent named filter slots scoped to a project
//! - Serialization of committed filters into search requests
//!
//! ## Editing a filter
//!
//! ```rust
//! use sift_query::prelude::*;
//!
//! let mut slot = FilterSlot::new("documents", ExpressionTemplate::default());
//! slot.set_catalog(
//!     ProjectId::new(1),
//!     ColumnCatalog::from_columns([
//!         ColumnInfo::new("Filename", "filename", OperatorFamily::String).sortable(),
//!         ColumnInfo::new("Tags", "tag_id_list", OperatorFamily::IdList),
//!     ]),
//! );
//!
//! slot.start_edit("documents");
//! let expr = slot.add_expression("documents", InsertPosition::Append).unwrap();
//! slot.change_value(&expr, "report".into()).unwrap();
//! slot.finish_edit().unwrap();
//!
//! let request = SearchRequest::new(
//!     ProjectId::new(1),
//!     slot.committed_or_empty("documents"),
//!     vec![SortSpec::asc("filename")],
//! );
//! // The seeded expression plus the added one.
//! assert_eq!(request.filter.count_expressions(), 2);
//! ```
//!
//! ## Wire format
//!
//! Groups serialize as `{"id", "logic_operator", "items"}` and expressions as
//! `{"id", "column", "operator", "value"}`. A string column is a fixed column
//! key; a numeric column is a project metadata id.

pub mod column;
pub mod config;
pub mod error;
pub mod logging;
pub mod operator;
pub mod query;
pub mod registry;
pub mod service;
pub mod slot;
pub mod tree;
pub mod value;

pub use column::{ColumnCatalog, ColumnInfo, FilterColumn};
pub use config::{LogFormat, LoggingConfig, SiftConfig};
pub use error::{ErrorCode, ErrorContext, FilterError, FilterResult};
pub use operator::{FilterOperator, OperatorFamily, ValueType};
pub use query::{SearchRequest, SortDirection, SortSpec, describe, serialize_filter};
pub use registry::{FilterRegistry, ProjectId, RegistryConfig, SlotHandle, SlotSettings};
pub use service::{
    ColumnCatalogService, FnCatalogService, RecordingSearchService, SearchService,
    StaticCatalogService,
};
pub use slot::{EditState, ExpressionTemplate, FilterSlot, InsertPosition};
pub use tree::{FilterExpression, FilterGroup, FilterNode, LogicalOperator};
pub use value::FilterValue;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::column::{ColumnCatalog, ColumnInfo, FilterColumn};
    pub use crate::error::{ErrorCode, FilterError, FilterResult};
    pub use crate::filter_error;
    pub use crate::operator::{FilterOperator, OperatorFamily, ValueType};
    pub use crate::query::{SearchRequest, SortDirection, SortSpec};
    pub use crate::registry::{FilterRegistry, ProjectId, RegistryConfig, SlotHandle};
    pub use crate::service::{ColumnCatalogService, SearchService};
    pub use crate::slot::{EditState, ExpressionTemplate, FilterSlot, InsertPosition};
    pub use crate::tree::{FilterExpression, FilterGroup, FilterNode, LogicalOperator};
    pub use crate::value::FilterValue;
}
