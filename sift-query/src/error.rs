//! Error types for filter operations with actionable messages.
//!
//! Errors carry:
//! - An error code for programmatic handling
//! - Context about the slot, node or column involved
//! - Suggestions for fixing the issue
//!
//! # Error Codes
//!
//! Error codes follow a pattern: F{category}{number}
//! - 1xxx: Tree errors (node not found, wrong node kind)
//! - 2xxx: Column and operator errors
//! - 3xxx: Edit session errors
//! - 4xxx: Registry and collaborator errors
//! - 7xxx: Configuration errors
//! - 9xxx: Internal errors
//!
//! ```rust
//! use sift_query::{FilterError, ErrorCode};
//!
//! let err = FilterError::node_not_found("3f1c");
//! assert_eq!(err.code, ErrorCode::NodeNotFound);
//! assert!(err.to_string().contains("F1001"));
//! ```

use std::fmt;
use thiserror::Error;

/// Result type for filter operations.
pub type FilterResult<T> = Result<T, FilterError>;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Tree errors (1xxx)
    /// No node with the given id exists in the tree (F1001).
    NodeNotFound = 1001,
    /// The node exists but is not a group (F1002).
    NotAGroup = 1002,
    /// The node exists but is not an expression (F1003).
    NotAnExpression = 1003,

    // Column and operator errors (2xxx)
    /// The column is not part of the loaded catalog (F2001).
    UnknownColumn = 2001,
    /// The operator does not belong to the column's family (F2002).
    OperatorNotAllowed = 2002,
    /// The column cannot be sorted on (F2003).
    ColumnNotSortable = 2003,
    /// No column catalog has been loaded for the slot (F2004).
    CatalogNotLoaded = 2004,

    // Edit session errors (3xxx)
    /// No edit session is open on the slot (F3001).
    NoActiveEdit = 3001,

    // Registry and collaborator errors (4xxx)
    /// No project is selected (F4001).
    NoProject = 4001,
    /// The result belongs to a project or filter that is no longer current (F4002).
    StaleResult = 4002,
    /// The column catalog service failed (F4003).
    CatalogServiceFailed = 4003,
    /// The search service failed (F4004).
    SearchServiceFailed = 4004,
    /// A payload could not be serialized (F4005).
    SerializationError = 4005,
    /// A payload could not be deserialized (F4006).
    DeserializationError = 4006,

    // Configuration errors (7xxx)
    /// Invalid configuration (F7001).
    InvalidConfiguration = 7001,
    /// Configuration file could not be read (F7002).
    ConfigurationIo = 7002,

    // Internal errors (9xxx)
    /// Internal error (F9001).
    Internal = 9001,
}

impl ErrorCode {
    /// Get the error code string (e.g., "F1001").
    pub fn code(&self) -> String {
        format!("F{}", *self as u16)
    }

    /// Get a short description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::NodeNotFound => "Filter node not found",
            Self::NotAGroup => "Filter node is not a group",
            Self::NotAnExpression => "Filter node is not an expression",
            Self::UnknownColumn => "Unknown column",
            Self::OperatorNotAllowed => "Operator not allowed for column",
            Self::ColumnNotSortable => "Column is not sortable",
            Self::CatalogNotLoaded => "Column catalog not loaded",
            Self::NoActiveEdit => "No active edit session",
            Self::NoProject => "No project selected",
            Self::StaleResult => "Stale result",
            Self::CatalogServiceFailed => "Column catalog service failed",
            Self::SearchServiceFailed => "Search service failed",
            Self::SerializationError => "Serialization error",
            Self::DeserializationError => "Deserialization error",
            Self::InvalidConfiguration => "Invalid configuration",
            Self::ConfigurationIo => "Configuration file unreadable",
            Self::Internal => "Internal error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Additional context for an error.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The operation that was being performed.
    pub operation: Option<String>,
    /// The slot involved.
    pub slot: Option<String>,
    /// The filter node involved.
    pub node: Option<String>,
    /// The column involved.
    pub column: Option<String>,
    /// Suggestions for fixing the error.
    pub suggestions: Vec<String>,
    /// Help text.
    pub help: Option<String>,
}

/// Errors that can occur during filter operations.
#[derive(Error, Debug)]
pub struct FilterError {
    /// The error code.
    pub code: ErrorCode,
    /// The error message.
    pub message: String,
    /// Additional context.
    pub context: ErrorContext,
    /// The source error (if any).
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)
    }
}

impl FilterError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Add context about the operation.
    pub fn with_context(mut self, operation: impl Into<String>) -> Self {
        self.context.operation = Some(operation.into());
        self
    }

    /// Add a suggestion for fixing the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context.suggestions.push(suggestion.into());
        self
    }

    /// Add help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.context.help = Some(help.into());
        self
    }

    /// Set the slot.
    pub fn with_slot(mut self, slot: impl Into<String>) -> Self {
        self.context.slot = Some(slot.into());
        self
    }

    /// Set the node id.
    pub fn with_node(mut self, node: impl Into<String>) -> Self {
        self.context.node = Some(node.into());
        self
    }

    /// Set the column.
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.context.column = Some(column.into());
        self
    }

    /// Set the source error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // ============== Tree Errors ==============

    /// Create a node-not-found error.
    pub fn node_not_found(id: impl Into<String>) -> Self {
        let id = id.into();
        Self::new(ErrorCode::NodeNotFound, format!("No filter node with id '{}'", id))
            .with_node(id)
            .with_suggestion("The node may have been deleted; re-read the draft before editing")
    }

    /// Create a not-a-group error.
    pub fn not_a_group(id: impl Into<String>) -> Self {
        let id = id.into();
        Self::new(ErrorCode::NotAGroup, format!("Filter node '{}' is not a group", id))
            .with_node(id)
            .with_suggestion("Children can only be added to groups")
    }

    /// Create a not-an-expression error.
    pub fn not_an_expression(id: impl Into<String>) -> Self {
        let id = id.into();
        Self::new(
            ErrorCode::NotAnExpression,
            format!("Filter node '{}' is not an expression", id),
        )
        .with_node(id)
    }

    // ============== Column Errors ==============

    /// Create an unknown-column error.
    pub fn unknown_column(column: impl Into<String>) -> Self {
        let column = column.into();
        Self::new(
            ErrorCode::UnknownColumn,
            format!("Column '{}' is not part of the column catalog", column),
        )
        .with_column(column)
        .with_suggestion("Reload the column catalog for the current project")
    }

    /// Create an operator-not-allowed error.
    pub fn operator_not_allowed(column: impl Into<String>, operator: impl fmt::Display) -> Self {
        let column = column.into();
        Self::new(
            ErrorCode::OperatorNotAllowed,
            format!("Operator '{}' is not allowed for column '{}'", operator, column),
        )
        .with_column(column)
    }

    /// Create a column-not-sortable error.
    pub fn not_sortable(column: impl Into<String>) -> Self {
        let column = column.into();
        Self::new(
            ErrorCode::ColumnNotSortable,
            format!("Column '{}' is not sortable", column),
        )
        .with_column(column)
    }

    /// Create a catalog-not-loaded error.
    pub fn catalog_not_loaded(slot: impl Into<String>) -> Self {
        let slot = slot.into();
        Self::new(
            ErrorCode::CatalogNotLoaded,
            format!("No column catalog loaded for slot '{}'", slot),
        )
        .with_slot(slot)
        .with_suggestion("Call FilterRegistry::load_catalog before editing column-dependent values")
    }

    // ============== Session Errors ==============

    /// Create a no-active-edit error.
    pub fn no_active_edit(slot: impl Into<String>) -> Self {
        let slot = slot.into();
        Self::new(
            ErrorCode::NoActiveEdit,
            format!("Slot '{}' has no open edit session", slot),
        )
        .with_slot(slot)
        .with_suggestion("Call start_edit before finish_edit")
    }

    // ============== Registry Errors ==============

    /// Create a no-project error.
    pub fn no_project() -> Self {
        Self::new(ErrorCode::NoProject, "No project is selected")
            .with_suggestion("Call FilterRegistry::set_project first")
    }

    /// Create a stale-result error.
    pub fn stale(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StaleResult, message)
            .with_help("The project changed while the request was in flight; the result was discarded")
    }

    /// Create a catalog-service error.
    pub fn catalog_service(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::CatalogServiceFailed, message)
    }

    /// Create a search-service error.
    pub fn search_service(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SearchServiceFailed, message)
    }

    /// Create a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SerializationError, message)
    }

    /// Create a deserialization error.
    pub fn deserialization(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DeserializationError, message)
    }

    // ============== Configuration Errors ==============

    /// Create an invalid-configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidConfiguration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
            .with_help("This is likely a bug in Sift. Please report it.")
    }

    // ============== Error Checks ==============

    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        self.code == ErrorCode::NodeNotFound
    }

    /// Check if this error reports a stale result.
    pub fn is_stale(&self) -> bool {
        self.code == ErrorCode::StaleResult
    }

    /// Check if the operation may succeed when re-issued.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::StaleResult | ErrorCode::CatalogServiceFailed | ErrorCode::SearchServiceFailed
        )
    }

    /// Display the full error with all context and suggestions.
    pub fn display_full(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("Error [{}]: {}\n", self.code.code(), self.message));

        if let Some(ref op) = self.context.operation {
            output.push_str(&format!("  → While: {}\n", op));
        }
        if let Some(ref slot) = self.context.slot {
            output.push_str(&format!("  → Slot: {}\n", slot));
        }
        if let Some(ref node) = self.context.node {
            output.push_str(&format!("  → Node: {}\n", node));
        }
        if let Some(ref column) = self.context.column {
            output.push_str(&format!("  → Column: {}\n", column));
        }

        if !self.context.suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for (i, suggestion) in self.context.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
            }
        }

        if let Some(ref help) = self.context.help {
            output.push_str(&format!("\nHelp: {}\n", help));
        }

        output
    }
}

impl From<serde_json::Error> for FilterError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            Self::deserialization(err.to_string()).with_source(err)
        } else {
            Self::serialization(err.to_string()).with_source(err)
        }
    }
}

/// Helper for creating errors with context.
#[macro_export]
macro_rules! filter_error {
    ($code:expr, $msg:expr) => {
        $crate::error::FilterError::new($code, $msg)
    };
    ($code:expr, $msg:expr, $($key:ident = $value:expr),+ $(,)?) => {{
        let mut err = $crate::error::FilterError::new($code, $msg);
        $(
            err = err.$key($value);
        )+
        err
    }};
}
