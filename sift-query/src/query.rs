//! Query payloads for the search/analysis service.
//!
//! A [`SearchRequest`] pairs a committed filter tree with a sort
//! specification. Its JSON form is what the search backend consumes:
//!
//! ```text
//! {
//!   "project_id": 1,
//!   "filter": { "id": "documents", "logic_operator": "AND", "items": [ ... ] },
//!   "sorts": [ { "column": "filename", "direction": "ASC" } ]
//! }
//! ```
//!
//! The root of a serialized filter is always a group; an empty group means
//! no filter is applied.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::column::{ColumnCatalog, FilterColumn};
use crate::error::{FilterError, FilterResult};
use crate::registry::ProjectId;
use crate::tree::{FilterGroup, FilterNode};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortDirection {
    /// Ascending order.
    #[default]
    #[serde(rename = "ASC")]
    Asc,
    /// Descending order.
    #[serde(rename = "DESC")]
    Desc,
}

impl SortDirection {
    /// Wire name of the direction.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort specification for a single column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    /// The column to sort by.
    pub column: FilterColumn,
    /// The sort direction.
    pub direction: SortDirection,
}

impl SortSpec {
    /// Create a sort specification.
    pub fn new(column: impl Into<FilterColumn>, direction: SortDirection) -> Self {
        Self {
            column: column.into(),
            direction,
        }
    }

    /// Sort ascending.
    pub fn asc(column: impl Into<FilterColumn>) -> Self {
        Self::new(column, SortDirection::Asc)
    }

    /// Sort descending.
    pub fn desc(column: impl Into<FilterColumn>) -> Self {
        Self::new(column, SortDirection::Desc)
    }

    /// Check that the column exists and is sortable.
    pub fn validate(&self, catalog: &ColumnCatalog) -> FilterResult<()> {
        match catalog.resolve(&self.column) {
            Some(info) if info.sortable => Ok(()),
            Some(_) => Err(FilterError::not_sortable(self.column.to_string())),
            None => Err(FilterError::unknown_column(self.column.to_string())),
        }
    }

    /// Validate a whole sort list.
    pub fn validate_all(sorts: &[SortSpec], catalog: &ColumnCatalog) -> FilterResult<()> {
        sorts.iter().try_for_each(|sort| sort.validate(catalog))
    }
}

/// A search request snapshot.
///
/// The filter is a copy of the committed tree at issue time; later edits to
/// the slot do not affect a request already built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRequest {
    /// Project the request is scoped to.
    pub project_id: ProjectId,
    /// The filter tree.
    pub filter: FilterGroup,
    /// Sort order, applied in sequence.
    pub sorts: Vec<SortSpec>,
    #[serde(skip)]
    generation: u64,
}

impl SearchRequest {
    /// Create a request.
    pub fn new(project_id: ProjectId, filter: FilterGroup, sorts: Vec<SortSpec>) -> Self {
        Self {
            project_id,
            filter,
            sorts,
            generation: 0,
        }
    }

    pub(crate) fn at_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    /// Registry generation the request was issued under.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Serialize to a JSON value.
    pub fn to_value(&self) -> FilterResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> FilterResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Serialize a filter tree to its wire JSON value.
pub fn serialize_filter(filter: &FilterGroup) -> FilterResult<serde_json::Value> {
    Ok(serde_json::to_value(filter)?)
}

/// Render a filter as a one-line human-readable summary.
///
/// Column labels come from the catalog when available.
///
/// ```rust
/// use sift_query::query::describe;
/// use sift_query::tree::{FilterExpression, FilterGroup, LogicalOperator};
/// use sift_query::{ColumnCatalog, ColumnInfo, FilterOperator, OperatorFamily};
///
/// let catalog = ColumnCatalog::from_columns([
///     ColumnInfo::new("Filename", "filename", OperatorFamily::String),
/// ]);
/// let filter = FilterGroup::new("root", LogicalOperator::Or)
///     .with_item(FilterExpression::new("filename", FilterOperator::Contains, "a"))
///     .with_item(FilterExpression::new("filename", FilterOperator::EndsWith, ".txt"));
///
/// assert_eq!(
///     describe(&filter, Some(&catalog)),
///     "(Filename contains 'a' OR Filename ends with '.txt')"
/// );
/// ```
pub fn describe(filter: &FilterGroup, catalog: Option<&ColumnCatalog>) -> String {
    let mut out = String::new();
    write_group(&mut out, filter, catalog);
    out
}

fn write_group(out: &mut String, group: &FilterGroup, catalog: Option<&ColumnCatalog>) {
    if group.items.is_empty() {
        out.push_str("(*)");
        return;
    }

    out.push('(');
    for (i, item) in group.items.iter().enumerate() {
        if i > 0 {
            out.push(' ');
            out.push_str(group.logic_operator.as_str());
            out.push(' ');
        }
        match item {
            FilterNode::Group(inner) => write_group(out, inner, catalog),
            FilterNode::Expression(expr) => {
                let label = match catalog {
                    Some(catalog) => catalog.label_of(&expr.column),
                    None => expr.column.to_string(),
                };
                out.push_str(&format!("{} {} {}", label, expr.operator.symbol(), expr.value));
            }
        }
    }
    out.push(')');
}
