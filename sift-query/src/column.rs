//! Column identifiers, column metadata and the per-slot column catalog.
//!
//! A catalog is the ordered list of filterable columns a screen exposes for
//! one project. Fixed columns are addressed by a string key; project-scoped
//! metadata fields are addressed by their numeric id. The two never share a
//! namespace, so [`FilterColumn`] keeps them as separate variants.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::operator::{FilterOperator, OperatorFamily, ValueType};
use crate::value::FilterValue;

/// Identifier of a filterable column.
///
/// On the wire a JSON string is always [`FilterColumn::Fixed`] and a JSON
/// number is always [`FilterColumn::Metadata`], even if the string looks
/// numeric.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterColumn {
    /// A well-known column key.
    Fixed(String),
    /// A project metadata field id.
    Metadata(i64),
}

impl FilterColumn {
    /// Create a fixed column key.
    pub fn fixed(key: impl Into<String>) -> Self {
        Self::Fixed(key.into())
    }

    /// Create a metadata column reference.
    pub fn metadata(id: i64) -> Self {
        Self::Metadata(id)
    }

    /// Check if this column refers to a project metadata field.
    pub fn is_metadata(&self) -> bool {
        matches!(self, Self::Metadata(_))
    }
}

impl fmt::Display for FilterColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(key) => f.write_str(key),
            Self::Metadata(id) => write!(f, "metadata#{}", id),
        }
    }
}

impl From<&str> for FilterColumn {
    fn from(key: &str) -> Self {
        Self::Fixed(key.to_string())
    }
}

impl From<String> for FilterColumn {
    fn from(key: String) -> Self {
        Self::Fixed(key)
    }
}

impl From<i64> for FilterColumn {
    fn from(id: i64) -> Self {
        Self::Metadata(id)
    }
}

/// Metadata describing one filterable column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Human-readable label.
    pub label: String,
    /// Column identifier.
    pub column: FilterColumn,
    /// Whether results can be sorted by this column.
    pub sortable: bool,
    /// Declared operator family.
    pub operator: OperatorFamily,
    /// Declared value semantic type.
    pub value: ValueType,
}

impl ColumnInfo {
    /// Create column info with `INFER_FROM_OPERATOR` values, not sortable.
    pub fn new(label: impl Into<String>, column: impl Into<FilterColumn>, operator: OperatorFamily) -> Self {
        Self {
            label: label.into(),
            column: column.into(),
            sortable: false,
            operator,
            value: ValueType::InferFromOperator,
        }
    }

    /// Mark the column as sortable.
    pub fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    /// Set the value semantic type.
    pub fn with_value_type(mut self, value: ValueType) -> Self {
        self.value = value;
        self
    }

    /// The canonical default operator for this column.
    #[inline]
    pub fn default_operator(&self) -> FilterOperator {
        self.operator.default_operator()
    }

    /// The default value for a fresh expression on this column.
    #[inline]
    pub fn default_value(&self) -> FilterValue {
        self.value.default_value(self.operator)
    }
}

/// Ordered mapping from column identifier to its metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnCatalog {
    columns: IndexMap<FilterColumn, ColumnInfo>,
}

impl ColumnCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from the records returned by a catalog service.
    ///
    /// Order is preserved. A column listed twice keeps its first position and
    /// its last metadata.
    pub fn from_columns(columns: impl IntoIterator<Item = ColumnInfo>) -> Self {
        let columns = columns
            .into_iter()
            .map(|info| (info.column.clone(), info))
            .collect();
        Self { columns }
    }

    /// Resolve a column's metadata.
    #[inline]
    pub fn resolve(&self, column: &FilterColumn) -> Option<&ColumnInfo> {
        self.columns.get(column)
    }

    /// Resolve a column's operator family.
    #[inline]
    pub fn family_of(&self, column: &FilterColumn) -> Option<OperatorFamily> {
        self.resolve(column).map(|info| info.operator)
    }

    /// Check whether the catalog knows a column.
    pub fn contains(&self, column: &FilterColumn) -> bool {
        self.columns.contains_key(column)
    }

    /// Iterate over all columns in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &ColumnInfo> {
        self.columns.values()
    }

    /// Iterate over the sortable columns in catalog order.
    pub fn sortable_columns(&self) -> impl Iterator<Item = &ColumnInfo> {
        self.columns.values().filter(|info| info.sortable)
    }

    /// Label for a column, falling back to its identifier.
    pub fn label_of(&self, column: &FilterColumn) -> String {
        self.resolve(column)
            .map(|info| info.label.clone())
            .unwrap_or_else(|| column.to_string())
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl FromIterator<ColumnInfo> for ColumnCatalog {
    fn from_iter<I: IntoIterator<Item = ColumnInfo>>(iter: I) -> Self {
        Self::from_columns(iter)
    }
}
