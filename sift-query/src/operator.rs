//! Operator families and default-value tables.
//!
//! Every column declares an [`OperatorFamily`] (its value kind) and a
//! [`ValueType`] (the finer-grained meaning of its values). Together they
//! decide which [`FilterOperator`]s an expression on that column may use and
//! which value a freshly created or re-targeted expression starts with.
//!
//! ```rust
//! use sift_query::operator::{FilterOperator, OperatorFamily, ValueType};
//! use sift_query::FilterValue;
//!
//! assert_eq!(OperatorFamily::String.default_operator(), FilterOperator::Contains);
//! assert!(OperatorFamily::Number.allows(FilterOperator::Gte));
//! assert!(!OperatorFamily::Boolean.allows(FilterOperator::Contains));
//!
//! let value = ValueType::TagId.default_value(OperatorFamily::Id);
//! assert_eq!(value, FilterValue::Int(-1));
//! ```

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::value::FilterValue;

/// Date format used for date-valued expressions.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    /// Equal to the value.
    Equals,
    /// Not equal to the value.
    NotEquals,
    /// Contains the value (substring or list membership).
    Contains,
    /// Does not contain the value.
    NotContains,
    /// Starts with the value.
    StartsWith,
    /// Ends with the value.
    EndsWith,
    /// Greater than the value.
    Gt,
    /// Less than the value.
    Lt,
    /// Greater than or equal to the value.
    Gte,
    /// Less than or equal to the value.
    Lte,
}

impl FilterOperator {
    /// Wire name of the operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::NotEquals => "not_equals",
            Self::Contains => "contains",
            Self::NotContains => "not_contains",
            Self::StartsWith => "starts_with",
            Self::EndsWith => "ends_with",
            Self::Gt => "gt",
            Self::Lt => "lt",
            Self::Gte => "gte",
            Self::Lte => "lte",
        }
    }

    /// Short symbol used in human-readable filter descriptions.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Equals => "=",
            Self::NotEquals => "!=",
            Self::Contains => "contains",
            Self::NotContains => "not contains",
            Self::StartsWith => "starts with",
            Self::EndsWith => "ends with",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Gte => ">=",
            Self::Lte => "<=",
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The value kind of a column, which fixes its legal operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperatorFamily {
    /// Single identifier.
    #[serde(rename = "ID", alias = "FilterOperator.ID")]
    Id,
    /// Numeric value.
    #[serde(rename = "NUMBER", alias = "FilterOperator.NUMBER")]
    Number,
    /// Free text.
    #[serde(rename = "STRING", alias = "FilterOperator.STRING")]
    String,
    /// List of identifiers.
    #[serde(rename = "ID_LIST", alias = "FilterOperator.ID_LIST")]
    IdList,
    /// List of strings.
    #[serde(rename = "LIST", alias = "FilterOperator.LIST")]
    List,
    /// Calendar date.
    #[serde(rename = "DATE", alias = "FilterOperator.DATE")]
    Date,
    /// Boolean flag.
    #[serde(rename = "BOOLEAN", alias = "FilterOperator.BOOLEAN")]
    Boolean,
}

const ID_OPERATORS: &[FilterOperator] = &[FilterOperator::Equals, FilterOperator::NotEquals];

const NUMBER_OPERATORS: &[FilterOperator] = &[
    FilterOperator::Equals,
    FilterOperator::NotEquals,
    FilterOperator::Gt,
    FilterOperator::Lt,
    FilterOperator::Gte,
    FilterOperator::Lte,
];

const STRING_OPERATORS: &[FilterOperator] = &[
    FilterOperator::Contains,
    FilterOperator::Equals,
    FilterOperator::NotEquals,
    FilterOperator::StartsWith,
    FilterOperator::EndsWith,
];

const LIST_OPERATORS: &[FilterOperator] = &[FilterOperator::Contains, FilterOperator::NotContains];

const DATE_OPERATORS: &[FilterOperator] = &[
    FilterOperator::Equals,
    FilterOperator::Gt,
    FilterOperator::Lt,
    FilterOperator::Gte,
    FilterOperator::Lte,
];

const BOOLEAN_OPERATORS: &[FilterOperator] = &[FilterOperator::Equals, FilterOperator::NotEquals];

impl OperatorFamily {
    /// All families, in declaration order.
    pub const ALL: [OperatorFamily; 7] = [
        Self::Id,
        Self::Number,
        Self::String,
        Self::IdList,
        Self::List,
        Self::Date,
        Self::Boolean,
    ];

    /// The legal operators of this family. The first entry is the default.
    pub fn operators(&self) -> &'static [FilterOperator] {
        match self {
            Self::Id => ID_OPERATORS,
            Self::Number => NUMBER_OPERATORS,
            Self::String => STRING_OPERATORS,
            Self::IdList | Self::List => LIST_OPERATORS,
            Self::Date => DATE_OPERATORS,
            Self::Boolean => BOOLEAN_OPERATORS,
        }
    }

    /// The canonical default operator: the family's first-declared member.
    #[inline]
    pub fn default_operator(&self) -> FilterOperator {
        self.operators()[0]
    }

    /// Check whether an operator belongs to this family.
    #[inline]
    pub fn allows(&self, operator: FilterOperator) -> bool {
        self.operators().contains(&operator)
    }

    /// The family-level default value, used for [`ValueType::InferFromOperator`].
    pub fn default_value(&self) -> FilterValue {
        match self {
            Self::Boolean => FilterValue::Bool(false),
            Self::String => FilterValue::String(String::new()),
            Self::Id | Self::Number => FilterValue::Int(0),
            Self::IdList | Self::List => FilterValue::empty_list(),
            Self::Date => FilterValue::String(today()),
        }
    }

    /// Wire tag of the family.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "ID",
            Self::Number => "NUMBER",
            Self::String => "STRING",
            Self::IdList => "ID_LIST",
            Self::List => "LIST",
            Self::Date => "DATE",
            Self::Boolean => "BOOLEAN",
        }
    }
}

impl fmt::Display for OperatorFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The semantic type of a column's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    /// Derive the value shape from the operator family.
    #[serde(rename = "INFER_FROM_OPERATOR", alias = "FilterValueType.INFER_FROM_OPERATOR")]
    InferFromOperator,
    /// A code identifier.
    #[serde(rename = "CODE_ID", alias = "FilterValueType.CODE_ID")]
    CodeId,
    /// A tag identifier.
    #[serde(rename = "TAG_ID", alias = "FilterValueType.TAG_ID")]
    TagId,
    /// A user identifier.
    #[serde(rename = "USER_ID", alias = "FilterValueType.USER_ID")]
    UserId,
    /// A document type name.
    #[serde(rename = "DOC_TYPE", alias = "FilterValueType.DOC_TYPE")]
    DocType,
    /// A source document identifier.
    #[serde(rename = "SDOC_ID", alias = "FilterValueType.SDOC_ID")]
    SdocId,
    /// A composite span annotation reference (code id, annotated text).
    #[serde(rename = "SPAN_ANNOTATION", alias = "FilterValueType.SPAN_ANNOTATION")]
    SpanAnnotation,
}

impl ValueType {
    /// Resolve the default value for a column of this semantic type.
    ///
    /// `InferFromOperator` defers to the family table; every other semantic
    /// type has a fixed default regardless of family.
    pub fn default_value(&self, family: OperatorFamily) -> FilterValue {
        match self {
            Self::InferFromOperator => family.default_value(),
            Self::CodeId | Self::TagId | Self::UserId => FilterValue::Int(-1),
            Self::DocType => FilterValue::String("none".to_string()),
            Self::SdocId => FilterValue::Int(0),
            Self::SpanAnnotation => FilterValue::from(vec!["-1", ""]),
        }
    }
}

/// Today's local date in [`DATE_FORMAT`].
pub fn today() -> String {
    Local::now().date_naive().format(DATE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_default_operator_is_first_member() {
        for family in OperatorFamily::ALL {
            assert_eq!(family.default_operator(), family.operators()[0]);
            assert!(family.allows(family.default_operator()));
        }
        assert_eq!(OperatorFamily::Id.default_operator(), FilterOperator::Equals);
        assert_eq!(OperatorFamily::IdList.default_operator(), FilterOperator::Contains);
        assert_eq!(OperatorFamily::Date.default_operator(), FilterOperator::Equals);
    }

    #[test]
    fn test_family_default_values() {
        assert_eq!(OperatorFamily::Boolean.default_value(), FilterValue::Bool(false));
        assert_eq!(OperatorFamily::String.default_value(), FilterValue::from(""));
        assert_eq!(OperatorFamily::Number.default_value(), FilterValue::Int(0));
        assert_eq!(OperatorFamily::List.default_value(), FilterValue::empty_list());

        let date = OperatorFamily::Date.default_value();
        let date = date.as_str().expect("date default is a string");
        assert!(NaiveDate::parse_from_str(date, DATE_FORMAT).is_ok());
        assert_eq!(date.len(), 10);
    }

    #[test]
    fn test_semantic_defaults_ignore_family() {
        assert_eq!(ValueType::CodeId.default_value(OperatorFamily::Id), FilterValue::Int(-1));
        assert_eq!(ValueType::UserId.default_value(OperatorFamily::IdList), FilterValue::Int(-1));
        assert_eq!(ValueType::DocType.default_value(OperatorFamily::Id), FilterValue::from("none"));
        assert_eq!(ValueType::SdocId.default_value(OperatorFamily::Id), FilterValue::Int(0));
        assert_eq!(
            ValueType::SpanAnnotation.default_value(OperatorFamily::Id),
            FilterValue::from(vec!["-1", ""])
        );
    }

    #[test]
    fn test_tags_accept_qualified_names() {
        let family: OperatorFamily = serde_json::from_str("\"FilterOperator.ID_LIST\"").unwrap();
        assert_eq!(family, OperatorFamily::IdList);
        let family: OperatorFamily = serde_json::from_str("\"BOOLEAN\"").unwrap();
        assert_eq!(family, OperatorFamily::Boolean);

        let value: ValueType = serde_json::from_str("\"FilterValueType.TAG_ID\"").unwrap();
        assert_eq!(value, ValueType::TagId);
        assert_eq!(serde_json::to_string(&ValueType::DocType).unwrap(), "\"DOC_TYPE\"");
    }

    #[test]
    fn test_operator_wire_names() {
        assert_eq!(serde_json::to_string(&FilterOperator::NotEquals).unwrap(), "\"not_equals\"");
        let op: FilterOperator = serde_json::from_str("\"starts_with\"").unwrap();
        assert_eq!(op, FilterOperator::StartsWith);
        assert_eq!(op.to_string(), op.as_str());
    }
}
