//! Integration tests for the filter engine.
//!
//! These tests drive slots through the registry the way a data-browsing
//! screen would: select a project, load catalogs, edit, commit and search.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::json;

use sift::prelude::*;
use sift::tree::{count_expressions, delete, find, node_ids};
use sift::{FnCatalogService, RecordingSearchService, serialize_filter};

fn document_columns() -> Vec<ColumnInfo> {
    vec![
        ColumnInfo::new("Filename", "filename", OperatorFamily::String).sortable(),
        ColumnInfo::new("Tags", "tag_id_list", OperatorFamily::IdList),
        ColumnInfo::new("Code", "code_id", OperatorFamily::Id).with_value_type(ValueType::CodeId),
        ColumnInfo::new("Year", 12i64, OperatorFamily::Number).sortable(),
        ColumnInfo::new("Reviewed", "reviewed", OperatorFamily::Boolean),
        ColumnInfo::new("Created", "created", OperatorFamily::Date).sortable(),
        ColumnInfo::new("Keywords", "keywords", OperatorFamily::List),
        ColumnInfo::new("Spans", "span_annotation", OperatorFamily::IdList)
            .with_value_type(ValueType::SpanAnnotation),
    ]
}

fn registry_with_catalog() -> FilterRegistry {
    let registry = FilterRegistry::default();
    registry.set_project(ProjectId::new(1));
    assert!(registry.store_catalog("documents", ProjectId::new(1), document_columns()));
    registry
}

fn first_item_id(slot: &FilterSlot) -> String {
    slot.draft().items[0].id().to_string()
}

/// Test the seed, column change, commit and serialize walkthrough
#[test]
fn test_scenario_seed_change_column_commit() {
    let registry = registry_with_catalog();
    let documents = registry.slot("documents");

    let payload = documents.with(|slot| {
        slot.start_edit("documents");

        let draft = slot.draft();
        assert_eq!(draft.id, "documents");
        assert_eq!(draft.items.len(), 1);
        let seeded = draft.items[0].as_expression().unwrap();
        assert_eq!(seeded.column, FilterColumn::fixed("filename"));
        assert_eq!(seeded.operator, FilterOperator::Contains);
        assert_eq!(seeded.value, FilterValue::from(""));

        let id = first_item_id(slot);
        assert!(slot.change_column(&id, "tag_id_list".into()));
        assert_eq!(slot.finish_edit().unwrap(), "documents");

        let committed = slot.committed("documents").unwrap();
        let mut value = serialize_filter(committed).unwrap();
        assert_eq!(value["items"][0]["id"], json!(id));
        value["items"][0]["id"] = json!("e1");
        value
    });

    assert_eq!(
        payload,
        json!({
            "id": "documents",
            "logic_operator": "AND",
            "items": [
                {"id": "e1", "column": "tag_id_list", "operator": "contains", "value": []}
            ]
        })
    );
}

/// Test that a project change resets committed filters and catalogs
#[test]
fn test_scenario_project_change_resets_slot() {
    let registry = registry_with_catalog();
    let documents = registry.slot("documents");

    documents.with(|slot| {
        slot.start_edit("documents");
        slot.add_expression("documents", InsertPosition::Append).unwrap();
        slot.add_expression("documents", InsertPosition::Append).unwrap();
        slot.finish_edit().unwrap();
        assert_eq!(slot.active_filter_count("documents"), 3);
    });

    assert!(registry.set_project(ProjectId::new(2)));

    documents.read(|slot| {
        assert_eq!(
            serialize_filter(&slot.primary()).unwrap(),
            json!({"id": "documents", "logic_operator": "AND", "items": []})
        );
        assert!(slot.catalog().is_none());
        assert!(!slot.is_editing());
    });
    assert!(!registry.has_catalog("documents"));
}

/// Test that ids stay unique across many inserts
#[test]
fn test_ids_unique_after_adds() {
    let registry = registry_with_catalog();
    let documents = registry.slot("documents");

    documents.with(|slot| {
        slot.start_edit("documents");
        let mut parent = "documents".to_string();
        for i in 0..50 {
            if i % 5 == 0 {
                parent = slot.add_group(&parent, InsertPosition::Prepend).unwrap();
            }
            slot.add_expression(&parent, InsertPosition::Append).unwrap();
        }

        let tree = FilterNode::Group(slot.draft().clone());
        let ids = node_ids(&tree);
        let unique: HashSet<&str> = ids.iter().copied().collect();
        assert_eq!(ids.len(), unique.len());
        assert_eq!(count_expressions(&tree), 51);
    });
}

/// Test that deleting twice is the same as deleting once
#[test]
fn test_delete_idempotent() {
    let tree = FilterNode::Group(
        FilterGroup::new("root", LogicalOperator::Or)
            .with_item(FilterExpression::new("filename", FilterOperator::Contains, "a"))
            .with_item(
                FilterGroup::new("inner", LogicalOperator::And)
                    .with_item(FilterExpression::new("reviewed", FilterOperator::Equals, true)),
            ),
    );

    let mut ids: Vec<String> = node_ids(&tree).into_iter().map(String::from).collect();
    ids.push("missing".to_string());
    for id in &ids {
        let once = delete(&tree, id);
        assert_eq!(delete(&once, id), once);
        if id != "root" {
            assert!(find(&once, id).is_none());
        }
    }

    assert_eq!(delete(&tree, "root"), tree);
    assert_eq!(delete(&tree, "missing"), tree);
}

/// Test that a committed tree comes back unchanged on the next edit
#[test]
fn test_commit_round_trip() {
    let registry = registry_with_catalog();
    let documents = registry.slot("documents");

    documents.with(|slot| {
        slot.start_edit("documents");
        let group = slot.add_group("documents", InsertPosition::Append).unwrap();
        slot.change_logical_operator(&group, LogicalOperator::Or).unwrap();
        let expr = slot.add_expression(&group, InsertPosition::Append).unwrap();
        assert!(slot.change_column(&expr, FilterColumn::metadata(12)));
        slot.change_operator(&expr, FilterOperator::Gte).unwrap();
        slot.change_value(&expr, FilterValue::Int(2020)).unwrap();
        let draft = slot.draft().clone();
        slot.finish_edit().unwrap();

        slot.start_edit("documents");
        assert_eq!(slot.draft(), &draft);
        slot.discard_edit();
    });
}

/// Test that discarding leaves committed filters untouched
#[test]
fn test_discard_isolation() {
    let registry = registry_with_catalog();
    let documents = registry.slot("documents");

    documents.with(|slot| {
        slot.start_edit("documents");
        slot.finish_edit().unwrap();
        let committed = slot.committed_or_empty("documents");

        slot.start_edit("documents");
        let id = first_item_id(slot);
        slot.change_value(&id, "draft only".into()).unwrap();
        slot.add_group("documents", InsertPosition::Prepend).unwrap();
        assert!(slot.delete_node(&id));
        assert!(slot.discard_edit());

        assert_eq!(slot.committed_or_empty("documents"), committed);
        assert_eq!(slot.draft(), &FilterGroup::empty("root"));
    });
}

/// Test that a column change always lands on a legal operator and default value
#[test]
fn test_column_change_consistency() {
    let registry = registry_with_catalog();
    let documents = registry.slot("documents");

    documents.with(|slot| {
        slot.start_edit("documents");
        let id = first_item_id(slot);

        for info in document_columns() {
            assert!(slot.change_column(&id, info.column.clone()));
            let expr = slot.draft().items[0].as_expression().unwrap();
            assert!(info.operator.allows(expr.operator));
            assert_eq!(expr.operator, info.operator.default_operator());
            assert_eq!(expr.value, info.default_value());
        }

        let before = slot.draft().items[0].clone();
        assert!(!slot.change_column(&id, "not_a_column".into()));
        assert_eq!(slot.draft().items[0], before);
    });

    let catalog = ColumnCatalog::from_columns(document_columns());
    assert_eq!(
        catalog.resolve(&"code_id".into()).unwrap().default_value(),
        FilterValue::Int(-1)
    );
    assert_eq!(
        catalog.resolve(&"span_annotation".into()).unwrap().default_value(),
        FilterValue::from(vec!["-1", ""])
    );
}

/// Test operator changes outside the column family are rejected
#[test]
fn test_change_operator_rejected() {
    let registry = registry_with_catalog();
    let documents = registry.slot("documents");

    documents.with(|slot| {
        slot.start_edit("documents");
        let id = first_item_id(slot);
        let before = slot.draft().clone();

        let err = slot.change_operator(&id, FilterOperator::Gt).unwrap_err();
        assert_eq!(err.code, ErrorCode::OperatorNotAllowed);
        assert_eq!(slot.draft(), &before);

        slot.change_operator(&id, FilterOperator::EndsWith).unwrap();
    });
}

/// Test that counts do not depend on nesting depth
#[test]
fn test_count_deep_nesting() {
    let mut tree = FilterGroup::empty("leaf")
        .with_item(FilterExpression::new("filename", FilterOperator::Contains, "x"));
    for depth in 0..300 {
        tree = FilterGroup::empty(format!("g{}", depth))
            .with_item(FilterExpression::new("reviewed", FilterOperator::Equals, false))
            .with_item(tree);
    }

    let node = FilterNode::Group(tree);
    assert_eq!(count_expressions(&node), 301);
    assert!(find(&node, "leaf").is_some());
}

/// Test slots never share state
#[test]
fn test_slots_are_independent() {
    let registry = registry_with_catalog();

    registry.slot("documents").with(|slot| {
        slot.start_edit("documents");
        slot.finish_edit().unwrap();
    });
    registry.slot("memos").with(|slot| slot.start_edit("memos"));

    assert_eq!(registry.slot("documents").read(|s| s.active_filter_count("documents")), 1);
    assert_eq!(registry.slot("memos").read(|s| s.active_filter_count("memos")), 0);
    assert!(registry.slot("memos").read(FilterSlot::is_editing));
    assert!(!registry.slot("documents").read(FilterSlot::is_editing));
    assert_eq!(registry.slot_names(), vec!["documents", "memos"]);
}

/// Test that a saved filter can be restored from JSON
#[test]
fn test_restore_saved_filter() {
    let json = r#"{
        "id": "saved",
        "logic_operator": "OR",
        "items": [
            {"id": "a", "column": "filename", "operator": "starts_with", "value": "draft"},
            {"id": "b", "column": 12, "operator": "lt", "value": 1990}
        ]
    }"#;

    let registry = registry_with_catalog();
    let documents = registry.slot("documents");
    documents.with(|slot| {
        slot.set_committed("documents", FilterGroup::from_json(json).unwrap()).unwrap();
        assert_eq!(slot.active_filter_count("documents"), 2);
        assert_eq!(slot.primary().id, "documents");
        assert_eq!(
            sift::describe(&slot.primary(), slot.catalog()),
            "(Filename starts with 'draft' OR Year < 1990)"
        );
    });
}

#[tokio::test]
async fn test_load_catalog_and_search() {
    let registry = FilterRegistry::default();
    registry.set_project(ProjectId::new(1));

    let catalogs = StaticCatalogService::new();
    catalogs.register(1i64, "documents", document_columns());
    registry.load_catalog("documents", &catalogs).await.unwrap();
    assert!(registry.has_catalog("documents"));

    registry.slot("documents").with(|slot| {
        slot.start_edit("documents");
        slot.finish_edit().unwrap();
    });

    let search = RecordingSearchService::new();
    let (request, response) = registry
        .search("documents", "documents", vec![SortSpec::desc("created")], &search)
        .await
        .unwrap();

    assert_eq!(response["project_id"], json!(1));
    assert_eq!(response["sorts"], json!([{"column": "created", "direction": "DESC"}]));
    assert_eq!(search.last(), Some(request.clone()));
    assert_eq!(request.filter.count_expressions(), 1);
    assert!(registry.is_committed("documents", &request));

    let err = registry
        .search("documents", "documents", vec![SortSpec::asc("tag_id_list")], &search)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ColumnNotSortable);
    assert_eq!(search.requests().len(), 1);
}

#[tokio::test]
async fn test_load_catalogs_reports_each_slot() {
    let registry = FilterRegistry::default();
    registry.set_project(ProjectId::new(1));

    let catalogs = StaticCatalogService::new();
    catalogs.register(1i64, "documents", document_columns());

    let results = registry.load_catalogs(&["documents", "spans"], &catalogs).await;
    assert!(results[0].is_ok());
    assert_eq!(results[1].as_ref().unwrap_err().code, ErrorCode::CatalogServiceFailed);
    assert!(registry.has_catalog("documents"));
    assert!(!registry.has_catalog("spans"));
}

#[tokio::test]
async fn test_catalog_failure_keeps_committed_state() {
    let registry = registry_with_catalog();
    registry.slot("documents").with(|slot| {
        slot.start_edit("documents");
        slot.finish_edit().unwrap();
    });

    let failing = FnCatalogService::new(|_, _| async {
        Err::<Vec<ColumnInfo>, _>(FilterError::catalog_service("backend down"))
    });
    let err = registry.reload_catalog("documents", &failing).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::CatalogServiceFailed);

    assert_eq!(registry.slot("documents").read(|s| s.active_filter_count("documents")), 1);
    assert!(registry.has_catalog("documents"));
}

/// Catalog service that switches project while the fetch is in flight.
struct SwitchingCatalogService {
    registry: Arc<FilterRegistry>,
}

#[async_trait]
impl ColumnCatalogService for SwitchingCatalogService {
    async fn fetch_columns(&self, _project: ProjectId, _slot: &str) -> FilterResult<Vec<ColumnInfo>> {
        self.registry.set_project(ProjectId::new(2));
        Ok(document_columns())
    }
}

#[tokio::test]
async fn test_late_catalog_is_discarded() {
    let registry = Arc::new(FilterRegistry::default());
    registry.set_project(ProjectId::new(1));

    let service = SwitchingCatalogService {
        registry: Arc::clone(&registry),
    };
    let err = registry.load_catalog("documents", &service).await.unwrap_err();

    assert!(err.is_stale());
    assert_eq!(registry.project(), Some(ProjectId::new(2)));
    assert!(!registry.has_catalog("documents"));
}

/// Search service that switches project before answering.
struct SwitchingSearchService {
    registry: Arc<FilterRegistry>,
}

#[async_trait]
impl SearchService for SwitchingSearchService {
    type Response = usize;

    async fn search(&self, request: &SearchRequest) -> FilterResult<usize> {
        self.registry.set_project(ProjectId::new(9));
        Ok(request.filter.count_expressions())
    }
}

#[tokio::test]
async fn test_late_search_result_is_stale() {
    let registry = Arc::new(FilterRegistry::default());
    registry.set_project(ProjectId::new(1));

    let service = SwitchingSearchService {
        registry: Arc::clone(&registry),
    };
    let request = registry.request("documents", "documents", vec![]).unwrap();
    assert!(registry.is_current(&request));

    let err = registry
        .search("documents", "documents", vec![], &service)
        .await
        .unwrap_err();
    assert!(err.is_stale());
    assert!(!registry.is_current(&request));
}
