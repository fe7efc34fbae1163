//! The filter tree: AND/OR groups of column-operator-value expressions.
//!
//! Trees are plain data. The algorithms in this module ([`find`],
//! [`find_mut`], [`delete`], [`count_expressions`]) are free functions over an
//! explicit tree argument. `find` and `count_expressions` walk the tree with
//! an explicit work stack so deeply nested trees cannot overflow the call
//! stack.
//!
//! ```rust
//! use sift_query::tree::{self, FilterExpression, FilterGroup, FilterNode};
//! use sift_query::{FilterOperator, FilterValue};
//!
//! let expr = FilterExpression::new("filename", FilterOperator::Contains, "report");
//! let expr_id = expr.id.clone();
//! let root = FilterNode::from(FilterGroup::empty("root").with_item(expr));
//!
//! assert_eq!(tree::count_expressions(&root), 1);
//! assert!(tree::find(&root, &expr_id).is_some());
//!
//! let pruned = tree::delete(&root, &expr_id);
//! assert_eq!(tree::count_expressions(&pruned), 0);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::column::FilterColumn;
use crate::error::FilterResult;
use crate::operator::FilterOperator;
use crate::value::FilterValue;

/// Generate a fresh node id.
pub fn new_node_id() -> String {
    Uuid::new_v4().to_string()
}

/// How a group combines its immediate children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LogicalOperator {
    /// All children must match.
    #[default]
    #[serde(rename = "AND", alias = "and", alias = "LogicalOperator.and")]
    And,
    /// At least one child must match.
    #[serde(rename = "OR", alias = "or", alias = "LogicalOperator.or")]
    Or,
}

impl LogicalOperator {
    /// Wire name of the operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An internal node combining its children with AND/OR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterGroup {
    /// Node id, unique within the tree.
    pub id: String,
    /// How the items combine.
    pub logic_operator: LogicalOperator,
    /// Child nodes, in display order.
    pub items: Vec<FilterNode>,
}

impl FilterGroup {
    /// Create an empty group with the given id and operator.
    pub fn new(id: impl Into<String>, logic_operator: LogicalOperator) -> Self {
        Self {
            id: id.into(),
            logic_operator,
            items: Vec::new(),
        }
    }

    /// Create an empty AND group. This is the "no filter applied" tree.
    pub fn empty(id: impl Into<String>) -> Self {
        Self::new(id, LogicalOperator::And)
    }

    /// Create an empty group with a generated id.
    pub fn generated(logic_operator: LogicalOperator) -> Self {
        Self::new(new_node_id(), logic_operator)
    }

    /// Append a child node.
    pub fn with_item(mut self, item: impl Into<FilterNode>) -> Self {
        self.items.push(item.into());
        self
    }

    /// Check if the group has no children.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Return a copy of this group with the node `id` removed at any depth.
    pub fn without(&self, id: &str) -> FilterGroup {
        FilterGroup {
            id: self.id.clone(),
            logic_operator: self.logic_operator,
            items: self
                .items
                .iter()
                .filter(|node| node.id() != id)
                .map(|node| delete(node, id))
                .collect(),
        }
    }

    /// Find a descendant node by id. The group itself is not matched.
    pub fn find(&self, id: &str) -> Option<&FilterNode> {
        find_from(self.items.iter().rev().collect(), id)
    }

    /// Mutable counterpart of [`FilterGroup::find`].
    pub fn find_mut(&mut self, id: &str) -> Option<&mut FilterNode> {
        find_mut_from(self.items.iter_mut().rev().collect(), id)
    }

    /// Count the expressions in this group at any depth.
    pub fn count_expressions(&self) -> usize {
        self.items.iter().map(count_expressions).sum()
    }

    /// Parse a group from its wire JSON.
    pub fn from_json(json: &str) -> FilterResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// A leaf testing one column against one operator and value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterExpression {
    /// Node id, unique within the tree.
    pub id: String,
    /// The column under test.
    pub column: FilterColumn,
    /// The comparison operator.
    pub operator: FilterOperator,
    /// The comparison value.
    pub value: FilterValue,
}

impl FilterExpression {
    /// Create an expression with a generated id.
    pub fn new(
        column: impl Into<FilterColumn>,
        operator: FilterOperator,
        value: impl Into<FilterValue>,
    ) -> Self {
        Self {
            id: new_node_id(),
            column: column.into(),
            operator,
            value: value.into(),
        }
    }
}

/// A filter tree node.
///
/// On the wire the variants are distinguished by the presence of `items`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterNode {
    /// A group of child nodes.
    Group(FilterGroup),
    /// A single comparison.
    Expression(FilterExpression),
}

impl FilterNode {
    /// The node id.
    pub fn id(&self) -> &str {
        match self {
            Self::Group(g) => &g.id,
            Self::Expression(e) => &e.id,
        }
    }

    /// Check if this node is a group.
    #[inline]
    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group(_))
    }

    /// Check if this node is an expression.
    #[inline]
    pub fn is_expression(&self) -> bool {
        matches!(self, Self::Expression(_))
    }

    /// Borrow as a group.
    pub fn as_group(&self) -> Option<&FilterGroup> {
        match self {
            Self::Group(g) => Some(g),
            Self::Expression(_) => None,
        }
    }

    /// Borrow as an expression.
    pub fn as_expression(&self) -> Option<&FilterExpression> {
        match self {
            Self::Expression(e) => Some(e),
            Self::Group(_) => None,
        }
    }
}

impl From<FilterGroup> for FilterNode {
    fn from(group: FilterGroup) -> Self {
        Self::Group(group)
    }
}

impl From<FilterExpression> for FilterNode {
    fn from(expression: FilterExpression) -> Self {
        Self::Expression(expression)
    }
}

/// Find the first node with the given id, in pre-order.
pub fn find<'a>(tree: &'a FilterNode, id: &str) -> Option<&'a FilterNode> {
    find_from(vec![tree], id)
}

/// Mutable counterpart of [`find`].
pub fn find_mut<'a>(tree: &'a mut FilterNode, id: &str) -> Option<&'a mut FilterNode> {
    find_mut_from(vec![tree], id)
}

fn find_from<'a>(mut stack: Vec<&'a FilterNode>, id: &str) -> Option<&'a FilterNode> {
    while let Some(node) = stack.pop() {
        if node.id() == id {
            return Some(node);
        }
        if let FilterNode::Group(group) = node {
            // Reversed so the first child is popped first.
            stack.extend(group.items.iter().rev());
        }
    }

    None
}

fn find_mut_from<'a>(mut stack: Vec<&'a mut FilterNode>, id: &str) -> Option<&'a mut FilterNode> {
    while let Some(node) = stack.pop() {
        if node.id() == id {
            return Some(node);
        }
        if let FilterNode::Group(group) = node {
            stack.extend(group.items.iter_mut().rev());
        }
    }

    None
}

/// Return a new tree with the node `id` removed wherever it occurs.
///
/// The root itself is never removed. An unknown id yields an equal copy.
pub fn delete(tree: &FilterNode, id: &str) -> FilterNode {
    match tree {
        FilterNode::Group(group) => FilterNode::Group(group.without(id)),
        FilterNode::Expression(expr) => FilterNode::Expression(expr.clone()),
    }
}

/// Count expression leaves. Groups are not counted.
pub fn count_expressions(tree: &FilterNode) -> usize {
    let mut stack = vec![tree];
    let mut count = 0;

    while let Some(node) = stack.pop() {
        match node {
            FilterNode::Expression(_) => count += 1,
            FilterNode::Group(group) => stack.extend(group.items.iter()),
        }
    }

    count
}

/// Collect every node id in pre-order.
pub fn node_ids(tree: &FilterNode) -> Vec<&str> {
    let mut stack = vec![tree];
    let mut ids = Vec::new();

    while let Some(node) = stack.pop() {
        ids.push(node.id());
        if let FilterNode::Group(group) = node {
            stack.extend(group.items.iter().rev());
        }
    }

    ids
}
