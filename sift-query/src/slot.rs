//! Filter slots and the edit session protocol.
//!
//! A [`FilterSlot`] is one named, independently addressable filter instance
//! (one per screen or table). It holds the committed filter trees that drive
//! live queries and a single draft tree under interactive edit.
//!
//! # Edit sessions
//!
//! ```text
//!            start_edit(root)                 finish_edit()
//!   Idle ─────────────────────▶ Editing ─────────────────────▶ Idle
//!    ▲                          │   ▲ │                          (draft → committed[root])
//!    │      discard_edit()      │   │ │ add_* / change_* / delete_node
//!    └──────────────────────────┘   └─┘ (draft only)
//! ```
//!
//! Mutations only ever touch the draft, so abandoning an edit with
//! [`FilterSlot::discard_edit`] cannot leak partial state into the committed
//! filter. While the slot is idle they are rejected with
//! `NoActiveEdit`.
//!
//! ```rust
//! use sift_query::slot::{FilterSlot, InsertPosition};
//! use sift_query::ExpressionTemplate;
//!
//! let mut slot = FilterSlot::new("documents", ExpressionTemplate::default());
//! slot.start_edit("documents");
//! assert_eq!(slot.draft().items.len(), 1);
//!
//! let root = slot.draft().id.clone();
//! slot.add_expression(&root, InsertPosition::Append).unwrap();
//! slot.discard_edit();
//!
//! assert_eq!(slot.active_filter_count("documents"), 0);
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::mem;
use tracing::{debug, info, warn};

use crate::column::{ColumnCatalog, ColumnInfo, FilterColumn};
use crate::error::{FilterError, FilterResult};
use crate::operator::FilterOperator;
use crate::registry::ProjectId;
use crate::tree::{FilterExpression, FilterGroup, FilterNode, LogicalOperator};
use crate::value::FilterValue;

/// Id of the draft tree while no edit session is open.
pub const IDLE_DRAFT_ID: &str = "root";

/// Where a new node is inserted among its siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InsertPosition {
    /// Insert before existing items, so the newest edit is visible at the top.
    Prepend,
    /// Insert after existing items, preserving authoring order.
    Append,
}

impl InsertPosition {
    /// The default position for a slot's editing mode.
    ///
    /// Expert mode nests groups freely and prepends; the flat mode appends.
    pub fn for_mode(expert_mode: bool) -> Self {
        if expert_mode { Self::Prepend } else { Self::Append }
    }
}

/// The expression used to seed new expressions in a slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExpressionTemplate {
    /// Column of the new expression.
    pub column: FilterColumn,
    /// Operator of the new expression.
    pub operator: FilterOperator,
    /// Value of the new expression.
    pub value: FilterValue,
}

impl Default for ExpressionTemplate {
    fn default() -> Self {
        Self {
            column: FilterColumn::fixed("filename"),
            operator: FilterOperator::Contains,
            value: FilterValue::String(String::new()),
        }
    }
}

impl ExpressionTemplate {
    /// Create a template.
    pub fn new(
        column: impl Into<FilterColumn>,
        operator: FilterOperator,
        value: impl Into<FilterValue>,
    ) -> Self {
        Self {
            column: column.into(),
            operator,
            value: value.into(),
        }
    }

    /// Build a fresh expression with a generated id.
    pub fn instantiate(&self) -> FilterExpression {
        FilterExpression::new(self.column.clone(), self.operator, self.value.clone())
    }

    /// Align the template with a catalog.
    ///
    /// If the catalog knows the column but the template's operator is not in
    /// its family, operator and value are replaced with the column defaults.
    /// If the catalog does not know the column, the template falls back to
    /// the catalog's first column and its defaults. An empty catalog leaves
    /// the template as is.
    pub fn resolved(&self, catalog: &ColumnCatalog) -> Self {
        match catalog.resolve(&self.column) {
            Some(info) if info.operator.allows(self.operator) => self.clone(),
            Some(info) => Self::from_column(info),
            None => match catalog.iter().next() {
                Some(first) => {
                    warn!(
                        column = %self.column,
                        fallback = %first.column,
                        "Template column not in catalog, seeding from first column"
                    );
                    Self::from_column(first)
                }
                None => self.clone(),
            },
        }
    }

    fn from_column(info: &ColumnInfo) -> Self {
        Self {
            column: info.column.clone(),
            operator: info.default_operator(),
            value: info.default_value(),
        }
    }
}

/// State of a slot's edit session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EditState {
    /// No edit open; the draft is the empty default.
    #[default]
    Idle,
    /// The draft is a live copy of `committed[root]`.
    Editing {
        /// The committed root being edited.
        root: String,
    },
}

/// A column catalog tagged with the project it was loaded for.
#[derive(Debug, Clone)]
pub(crate) struct CachedCatalog {
    pub(crate) project: ProjectId,
    pub(crate) catalog: ColumnCatalog,
}

/// One named filter instance.
#[derive(Debug, Clone)]
pub struct FilterSlot {
    name: String,
    committed: IndexMap<String, FilterGroup>,
    draft: FilterGroup,
    state: EditState,
    default_template: ExpressionTemplate,
    catalog: Option<CachedCatalog>,
    expert_mode: bool,
}

impl FilterSlot {
    /// Create a slot in its initial state.
    pub fn new(name: impl Into<String>, default_template: ExpressionTemplate) -> Self {
        let name = name.into();
        Self {
            committed: Self::initial_committed(&name),
            draft: FilterGroup::empty(IDLE_DRAFT_ID),
            state: EditState::Idle,
            default_template,
            catalog: None,
            expert_mode: false,
            name,
        }
    }

    fn initial_committed(name: &str) -> IndexMap<String, FilterGroup> {
        let mut committed = IndexMap::new();
        committed.insert(name.to_string(), FilterGroup::empty(name));
        committed
    }

    /// The slot name.
    pub fn name(&self) -> &str {
        &self.name
    }

    // ============== Committed Filters ==============

    /// The committed filter for a root, if one was ever committed.
    pub fn committed(&self, root: &str) -> Option<&FilterGroup> {
        self.committed.get(root)
    }

    /// The committed filter for a root, or an empty group with that id.
    pub fn committed_or_empty(&self, root: &str) -> FilterGroup {
        self.committed
            .get(root)
            .cloned()
            .unwrap_or_else(|| FilterGroup::empty(root))
    }

    /// The primary committed filter, keyed by the slot name.
    pub fn primary(&self) -> FilterGroup {
        self.committed_or_empty(&self.name)
    }

    /// Names of all committed roots, in first-commit order.
    pub fn committed_roots(&self) -> impl Iterator<Item = &str> {
        self.committed.keys().map(String::as_str)
    }

    /// Number of expressions in effect for a root.
    pub fn active_filter_count(&self, root: &str) -> usize {
        self.committed
            .get(root)
            .map(FilterGroup::count_expressions)
            .unwrap_or(0)
    }

    /// Replace a committed root, e.g. when restoring a saved filter.
    ///
    /// Every expression must name a catalog column and use an operator of
    /// that column's family; otherwise nothing is stored. The group is stored
    /// under `root` and its id is set to `root`.
    pub fn set_committed(&mut self, root: &str, mut group: FilterGroup) -> FilterResult<()> {
        self.validate_group(&group)
            .map_err(|e| e.with_slot(&self.name).with_context("Restoring committed filter"))?;

        group.id = root.to_string();
        info!(slot = %self.name, root = %root, expressions = group.count_expressions(), "Committed filter replaced");
        self.committed.insert(root.to_string(), group);
        Ok(())
    }

    fn validate_group(&self, group: &FilterGroup) -> FilterResult<()> {
        let catalog = self.catalog_ref()?;
        let mut stack: Vec<&FilterNode> = group.items.iter().collect();

        while let Some(node) = stack.pop() {
            match node {
                FilterNode::Group(inner) => stack.extend(inner.items.iter()),
                FilterNode::Expression(expr) => {
                    let family = catalog.family_of(&expr.column).ok_or_else(|| {
                        FilterError::unknown_column(expr.column.to_string()).with_node(&expr.id)
                    })?;
                    if !family.allows(expr.operator) {
                        return Err(FilterError::operator_not_allowed(expr.column.to_string(), expr.operator)
                            .with_node(&expr.id));
                    }
                }
            }
        }

        Ok(())
    }

    /// Drop a committed sub-filter.
    pub fn remove_committed(&mut self, root: &str) -> Option<FilterGroup> {
        self.committed.shift_remove(root)
    }

    /// Append an expression directly to a committed root.
    ///
    /// The operator is the column family's default. Used for one-click
    /// actions such as "filter by this tag" that bypass the editor.
    pub fn add_quick_filter(
        &mut self,
        root: &str,
        column: FilterColumn,
        value: FilterValue,
    ) -> FilterResult<String> {
        let catalog = self.catalog_ref()?;
        let info = catalog
            .resolve(&column)
            .ok_or_else(|| FilterError::unknown_column(column.to_string()).with_slot(&self.name))?;
        let expression = FilterExpression::new(column, info.default_operator(), value);
        let id = expression.id.clone();

        self.committed
            .entry(root.to_string())
            .or_insert_with(|| FilterGroup::empty(root))
            .items
            .push(FilterNode::Expression(expression));

        info!(slot = %self.name, root = %root, node = %id, "Quick filter added");
        Ok(id)
    }

    // ============== Edit Session ==============

    /// The current edit state.
    pub fn edit_state(&self) -> &EditState {
        &self.state
    }

    /// Check if an edit session is open.
    pub fn is_editing(&self) -> bool {
        matches!(self.state, EditState::Editing { .. })
    }

    /// The draft tree.
    pub fn draft(&self) -> &FilterGroup {
        &self.draft
    }

    /// Open an edit session on a committed root.
    ///
    /// The draft becomes a deep copy of `committed[root]`. An empty copy is
    /// seeded with one expression from the default template. Starting while
    /// an edit is already open re-seeds the draft from `root`.
    pub fn start_edit(&mut self, root: &str) {
        if let EditState::Editing { root: open } = &self.state {
            debug!(slot = %self.name, previous = %open, root = %root, "Re-seeding open edit session");
        }

        let mut draft = self.committed_or_empty(root);
        if draft.items.is_empty() {
            draft
                .items
                .push(FilterNode::Expression(self.seed_expression()));
        }

        self.draft = draft;
        self.state = EditState::Editing {
            root: root.to_string(),
        };
        debug!(slot = %self.name, root = %root, "Edit session started");
    }

    /// Commit the draft: it replaces `committed[root]` verbatim.
    ///
    /// Returns the committed root. Fails without side effects when no edit
    /// session is open.
    pub fn finish_edit(&mut self) -> FilterResult<String> {
        let root = match mem::take(&mut self.state) {
            EditState::Editing { root } => root,
            EditState::Idle => return Err(FilterError::no_active_edit(&self.name)),
        };

        let draft = mem::replace(&mut self.draft, FilterGroup::empty(IDLE_DRAFT_ID));
        info!(
            slot = %self.name,
            root = %root,
            expressions = draft.count_expressions(),
            "Filter committed"
        );
        self.committed.insert(root.clone(), draft);
        Ok(root)
    }

    /// Abandon the draft. Committed filters are untouched.
    ///
    /// Returns whether an edit session was open.
    pub fn discard_edit(&mut self) -> bool {
        let was_editing = self.is_editing();
        self.draft = FilterGroup::empty(IDLE_DRAFT_ID);
        self.state = EditState::Idle;
        if was_editing {
            debug!(slot = %self.name, "Edit session discarded");
        }
        was_editing
    }

    /// Add an empty group under `parent`. Returns the new group's id.
    pub fn add_group(&mut self, parent: &str, position: InsertPosition) -> FilterResult<String> {
        let group = FilterGroup::generated(LogicalOperator::And);
        let id = group.id.clone();
        self.insert(parent, FilterNode::Group(group), position)?;
        debug!(slot = %self.name, parent = %parent, node = %id, "Group added");
        Ok(id)
    }

    /// Add a default expression under `parent`. Returns the new expression's id.
    pub fn add_expression(&mut self, parent: &str, position: InsertPosition) -> FilterResult<String> {
        let expression = self.seed_expression();
        let id = expression.id.clone();
        self.insert(parent, FilterNode::Expression(expression), position)?;
        debug!(slot = %self.name, parent = %parent, node = %id, "Expression added");
        Ok(id)
    }

    fn insert(&mut self, parent: &str, node: FilterNode, position: InsertPosition) -> FilterResult<()> {
        let group = self.draft_group_mut(parent)?;
        match position {
            InsertPosition::Prepend => group.items.insert(0, node),
            InsertPosition::Append => group.items.push(node),
        }
        Ok(())
    }

    /// Remove a node from the draft. Unknown ids, the draft root and calls
    /// without an open edit session are no-ops.
    ///
    /// Returns whether a node was removed.
    pub fn delete_node(&mut self, id: &str) -> bool {
        if !self.is_editing() || self.draft.find(id).is_none() {
            return false;
        }
        self.draft = self.draft.without(id);
        debug!(slot = %self.name, node = %id, "Node deleted");
        true
    }

    /// Change how a draft group combines its items.
    pub fn change_logical_operator(&mut self, group: &str, operator: LogicalOperator) -> FilterResult<()> {
        self.draft_group_mut(group)?.logic_operator = operator;
        Ok(())
    }

    /// Point a draft expression at another column.
    ///
    /// Operator and value are re-derived from the new column in the same
    /// step. Nothing changes and `false` is returned when no edit session is
    /// open, no catalog is loaded, the column is unknown or the node is not an
    /// expression.
    pub fn change_column(&mut self, expression: &str, column: FilterColumn) -> bool {
        let defaults = self.catalog.as_ref().and_then(|cached| {
            cached
                .catalog
                .resolve(&column)
                .map(|info| (info.default_operator(), info.default_value()))
        });
        let Some((operator, value)) = defaults else {
            warn!(slot = %self.name, column = %column, "Cannot change to unresolved column");
            return false;
        };

        match self.draft_expression_mut(expression) {
            Ok(expr) => {
                debug!(node = %expression, from = %expr.column, to = %column, "Column changed");
                expr.column = column;
                expr.operator = operator;
                expr.value = value;
                true
            }
            Err(err) => {
                warn!(slot = %self.name, error = %err, "Column change ignored");
                false
            }
        }
    }

    /// Change a draft expression's operator.
    ///
    /// The operator must belong to the family of the expression's column.
    pub fn change_operator(&mut self, expression: &str, operator: FilterOperator) -> FilterResult<()> {
        let column = self.draft_expression(expression)?.column.clone();
        let family = self
            .catalog_ref()?
            .family_of(&column)
            .ok_or_else(|| FilterError::unknown_column(column.to_string()).with_slot(&self.name))?;

        if !family.allows(operator) {
            return Err(FilterError::operator_not_allowed(column.to_string(), operator)
                .with_slot(&self.name)
                .with_node(expression)
                .with_suggestion(format!("Use one of the {} operators", family)));
        }

        self.draft_expression_mut(expression)?.operator = operator;
        Ok(())
    }

    /// Change a draft expression's value.
    pub fn change_value(&mut self, expression: &str, value: FilterValue) -> FilterResult<()> {
        self.draft_expression_mut(expression)?.value = value;
        Ok(())
    }

    fn ensure_editing(&self) -> FilterResult<()> {
        if self.is_editing() {
            Ok(())
        } else {
            Err(FilterError::no_active_edit(&self.name))
        }
    }

    fn draft_group_mut(&mut self, id: &str) -> FilterResult<&mut FilterGroup> {
        self.ensure_editing()?;
        if self.draft.id == id {
            return Ok(&mut self.draft);
        }
        match self.draft.find_mut(id) {
            Some(FilterNode::Group(group)) => Ok(group),
            Some(FilterNode::Expression(_)) => Err(FilterError::not_a_group(id)),
            None => Err(FilterError::node_not_found(id)),
        }
    }

    fn draft_expression(&self, id: &str) -> FilterResult<&FilterExpression> {
        self.ensure_editing()?;
        match self.draft.find(id) {
            Some(FilterNode::Expression(expr)) => Ok(expr),
            Some(FilterNode::Group(_)) => Err(FilterError::not_an_expression(id)),
            None => Err(FilterError::node_not_found(id)),
        }
    }

    fn draft_expression_mut(&mut self, id: &str) -> FilterResult<&mut FilterExpression> {
        self.ensure_editing()?;
        match self.draft.find_mut(id) {
            Some(FilterNode::Expression(expr)) => Ok(expr),
            Some(FilterNode::Group(_)) => Err(FilterError::not_an_expression(id)),
            None => Err(FilterError::node_not_found(id)),
        }
    }

    // ============== Templates & Modes ==============

    /// The template as stored.
    pub fn default_template(&self) -> &ExpressionTemplate {
        &self.default_template
    }

    /// Replace the template used to seed new expressions.
    pub fn set_default_template(&mut self, template: ExpressionTemplate) {
        self.default_template = template;
    }

    fn seed_expression(&self) -> FilterExpression {
        match &self.catalog {
            Some(cached) => self.default_template.resolved(&cached.catalog).instantiate(),
            None => self.default_template.instantiate(),
        }
    }

    /// Whether the slot edits in expert (nested) mode.
    pub fn expert_mode(&self) -> bool {
        self.expert_mode
    }

    /// Switch between expert (nested) and flat editing.
    pub fn set_expert_mode(&mut self, expert_mode: bool) {
        self.expert_mode = expert_mode;
    }

    /// Insert position matching the current editing mode.
    pub fn default_insert_position(&self) -> InsertPosition {
        InsertPosition::for_mode(self.expert_mode)
    }

    // ============== Column Catalog ==============

    /// The loaded catalog, whatever project it belongs to.
    pub fn catalog(&self) -> Option<&ColumnCatalog> {
        self.catalog.as_ref().map(|cached| &cached.catalog)
    }

    /// The loaded catalog if it belongs to `project`.
    pub fn catalog_for(&self, project: &ProjectId) -> Option<&ColumnCatalog> {
        self.catalog
            .as_ref()
            .filter(|cached| &cached.project == project)
            .map(|cached| &cached.catalog)
    }

    /// Store the catalog for a project, replacing any previous one.
    pub fn set_catalog(&mut self, project: ProjectId, catalog: ColumnCatalog) {
        debug!(slot = %self.name, project = %project, columns = catalog.len(), "Column catalog stored");
        self.catalog = Some(CachedCatalog { project, catalog });
    }

    fn catalog_ref(&self) -> FilterResult<&ColumnCatalog> {
        self.catalog()
            .ok_or_else(|| FilterError::catalog_not_loaded(&self.name))
    }

    /// Return the slot to its initial state and drop its catalog.
    ///
    /// Templates and editing mode are kept; they are screen settings rather
    /// than project data.
    pub fn reset(&mut self) {
        self.committed = Self::initial_committed(&self.name);
        self.draft = FilterGroup::empty(IDLE_DRAFT_ID);
        self.state = EditState::Idle;
        self.catalog = None;
    }
}
