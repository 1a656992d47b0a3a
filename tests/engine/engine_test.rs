//! Integration tests for the report engine.
//!
//! These tests drive a whole builder session through `ReportEngine` with
//! the in-memory backend: edits, execution, paging, drill-down, export and
//! persistence, plus the notices each failure leaves behind.

#[path = "../common/mod.rs"]
mod common;

use std::time::Duration;

use common::{Calls, MockBackend};
use quarry::calculated::AddOutcome;
use quarry::engine::{Applied, Command, EngineError, NoticeLevel, ReportEngine};
use quarry::execution::{ExecutionError, ExecutionState};
use quarry::export::{ExportError, ExportFormat};
use quarry::model::{Aggregation, FieldRef, FilterOperator, NotReady, ReportConfig, Scalar};
use quarry::persistence::PersistenceError;
use quarry::surface::{Target, WidgetId};

fn region() -> FieldRef {
    FieldRef::column("orders", "region")
}

fn amount() -> FieldRef {
    FieldRef::column("orders", "amount")
}

fn place(engine: &mut ReportEngine<MockBackend>, target: Target, field: FieldRef) -> WidgetId {
    match engine.apply(Command::Place { target, field }).unwrap() {
        Applied::Placed(id) => id,
        other => panic!("expected a placement, got {:?}", other),
    }
}

/// Connection "1" selected with `orders.region` as the only column.
fn ready_engine() -> ReportEngine<MockBackend> {
    let mut engine = ReportEngine::new(MockBackend::new());
    engine
        .apply(Command::SelectConnection(Some("1".to_string())))
        .unwrap();
    place(&mut engine, Target::Columns, region());
    engine
}

#[tokio::test]
async fn test_run_without_connection_sends_nothing() {
    let mut engine = ReportEngine::new(MockBackend::new());
    place(&mut engine, Target::Columns, region());

    let err = engine.run(1).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Execution(ExecutionError::NotReady(NotReady::NoConnection))
    ));
    assert_eq!(Calls::get(&engine.backend().calls.execute), 0);

    let notices = engine.take_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Warning);
    assert!(!notices[0].retry);
}

#[tokio::test]
async fn test_edits_are_reconciled_into_config() {
    let mut engine = ready_engine();
    let total = place(&mut engine, Target::Columns, amount());
    engine
        .apply(Command::SetAggregation {
            id: total,
            aggregation: Some(Aggregation::Sum),
        })
        .unwrap();
    let filter = place(&mut engine, Target::Filters, region());
    engine
        .apply(Command::SetOperator {
            id: filter,
            operator: Some(FilterOperator::NotEq),
        })
        .unwrap();
    engine
        .apply(Command::SetFilterValue {
            id: filter,
            value: Scalar::from("APAC"),
        })
        .unwrap();
    engine.apply(Command::Move { id: total, index: 0 }).unwrap();

    let config = engine.config();
    assert_eq!(config.connection_id.as_deref(), Some("1"));
    assert_eq!(config.columns[0].field, amount());
    assert_eq!(config.columns[0].aggregation, Aggregation::Sum);
    assert_eq!(config.filters[0].operator, FilterOperator::NotEq);

    engine.apply(Command::Remove(filter)).unwrap();
    assert!(engine.config().filters.is_empty());
}

#[tokio::test]
async fn test_schema_checks_reject_bad_edits() {
    let mut engine = ready_engine();
    engine.load_columns("orders").await.unwrap();

    let err = engine
        .apply(Command::Place {
            target: Target::Columns,
            field: FieldRef::column("orders", "missing"),
        })
        .unwrap_err();
    assert!(matches!(err, EngineError::UnknownField(_)));

    let err = engine
        .apply(Command::Place {
            target: Target::Sorts,
            field: FieldRef::calculated("Margin"),
        })
        .unwrap_err();
    assert!(matches!(err, EngineError::UnknownField(_)));

    let region_column = engine.surface().widgets(Target::Columns)[0].id;
    let err = engine
        .apply(Command::SetAggregation {
            id: region_column,
            aggregation: Some(Aggregation::Sum),
        })
        .unwrap_err();
    assert!(matches!(err, EngineError::NonNumericAggregation { .. }));

    // COUNT works on any type.
    engine
        .apply(Command::SetAggregation {
            id: region_column,
            aggregation: Some(Aggregation::Count),
        })
        .unwrap();

    assert_eq!(engine.surface().len(), 1);
    assert_eq!(engine.notices().len(), 3);
}

#[tokio::test]
async fn test_paging_through_250_rows() {
    let mut engine = ready_engine();

    assert_eq!(engine.run(1).await.unwrap().rows.len(), 100);
    assert_eq!(engine.next_page().await.unwrap().rows.len(), 100);
    assert_eq!(engine.next_page().await.unwrap().rows.len(), 50);
    assert_eq!(engine.pagination().current_page, 3);

    // Already on the last page.
    engine.next_page().await.unwrap();
    assert_eq!(Calls::get(&engine.backend().calls.execute), 3);

    let result = engine.go_to_page(99).await.unwrap();
    assert_eq!(result.current_page, 3);

    let result = engine.previous_page().await.unwrap();
    assert_eq!(result.current_page, 2);
    assert!(matches!(
        engine.execution_state(),
        ExecutionState::Succeeded { .. }
    ));
}

#[tokio::test]
async fn test_failed_run_offers_retry() {
    let mut engine = ready_engine();
    engine.backend().fail_next_executions(1);

    let err = engine.run(2).await.unwrap_err();
    assert!(matches!(err, EngineError::Execution(ExecutionError::Failed(_))));
    assert!(engine.result().is_empty());
    let notice = engine.notices().last().unwrap();
    assert_eq!(notice.level, NoticeLevel::Error);
    assert!(notice.retry);

    let result = engine.retry().await.unwrap();
    assert_eq!(result.current_page, 2);
    assert_eq!(Calls::get(&engine.backend().calls.execute), 2);
}

#[tokio::test]
async fn test_overtaken_run_is_discarded() {
    let mut engine = ready_engine();
    let first = engine.begin_run(1).unwrap();
    let second = engine.begin_run(3).unwrap();
    assert!(second.ticket().seq() > first.ticket().seq());
    let (first, second) = (first.send(), second.send());

    // Both requests are in flight while the builder keeps editing.
    place(&mut engine, Target::Groups, region());
    let (first, second) = tokio::join!(first, second);

    assert_eq!(engine.finish_run(second).unwrap().current_page, 3);
    let err = engine.finish_run(first).unwrap_err();
    assert!(matches!(err, EngineError::Execution(ExecutionError::Superseded)));
    assert_eq!(engine.result().current_page, 3);
    assert_eq!(engine.result().rows.len(), 50);
    assert_eq!(engine.notices().last().unwrap().level, NoticeLevel::Info);
    assert_eq!(Calls::get(&engine.backend().calls.execute), 2);
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_run_can_be_retried() {
    let mut engine = ready_engine();
    engine.backend().set_execute_delay(Duration::from_secs(5));

    assert!(tokio::time::timeout(Duration::from_secs(1), engine.run(2))
        .await
        .is_err());
    assert!(matches!(
        engine.execution_state(),
        ExecutionState::Requesting { page: 2, .. }
    ));

    let result = engine.retry().await.unwrap();
    assert_eq!(result.current_page, 2);
    assert!(matches!(
        engine.execution_state(),
        ExecutionState::Succeeded { .. }
    ));
    assert_eq!(Calls::get(&engine.backend().calls.execute), 2);
}

#[tokio::test]
async fn test_connection_change_resets_result_and_schema() {
    let mut engine = ready_engine();
    engine.load_tables().await.unwrap();
    engine.run(1).await.unwrap();

    let applied = engine
        .apply(Command::SelectConnection(Some("2".to_string())))
        .unwrap();
    assert_eq!(applied, Applied::ConnectionChanged);
    assert!(engine.result().is_empty());
    assert!(engine.catalog().cached_tables().is_none());

    // Selecting the same connection again changes nothing.
    let applied = engine
        .apply(Command::SelectConnection(Some("2".to_string())))
        .unwrap();
    assert_eq!(applied, Applied::Done);
}

#[tokio::test]
async fn test_drill_down_and_climb_up() {
    let mut engine = ready_engine();
    engine.run(1).await.unwrap();
    engine.next_page().await.unwrap();

    let result = engine.drill_into(region(), "R120").await.unwrap();
    assert_eq!(result.current_page, 1);
    let (sent, page, _) = engine.backend().last_executed().unwrap();
    assert_eq!(page, 1);
    assert_eq!(sent.drill_down_filters().count(), 1);
    assert_eq!(engine.drill_path().len(), 1);

    engine.drill_into(amount(), 5).await.unwrap();
    assert_eq!(engine.config().filters.len(), 2);

    let step = engine.climb_up().await.unwrap();
    assert_eq!(step.field, amount());
    let step = engine.climb_up().await.unwrap();
    assert_eq!(step.value, Scalar::from("R120"));
    assert!(engine.config().filters.is_empty());

    let err = engine.climb_up().await.unwrap_err();
    assert!(matches!(err, EngineError::NotDrilled));
}

#[tokio::test]
async fn test_removing_a_drill_pill_prunes_the_path() {
    let mut engine = ready_engine();
    engine.drill_into(region(), "EU").await.unwrap();
    let pill = engine.drill_path().last().unwrap().widget;

    engine.apply(Command::Remove(pill)).unwrap();
    assert!(engine.drill_path().is_empty());
    assert!(engine.config().filters.is_empty());
}

#[tokio::test]
async fn test_export_requires_a_result() {
    let mut engine = ready_engine();

    let err = engine.export(ExportFormat::Csv).await.unwrap_err();
    assert!(matches!(err, EngineError::Export(ExportError::NoData)));
    assert_eq!(Calls::get(&engine.backend().calls.export), 0);

    engine.run(1).await.unwrap();
    let file = engine.export(ExportFormat::Csv).await.unwrap();
    assert!(file.filename.ends_with(".csv"));
    assert_eq!(engine.result().rows.len(), 100);
}

#[tokio::test]
async fn test_calculated_field_commands() {
    let mut engine = ready_engine();
    let added = engine
        .apply(Command::AddCalculatedField {
            name: "Margin".to_string(),
            formula: "[orders.amount] - [orders.cost]".to_string(),
            description: String::new(),
        })
        .unwrap();
    assert_eq!(added, Applied::CalculatedField(AddOutcome::Added));

    place(&mut engine, Target::Columns, FieldRef::calculated("Margin"));
    place(&mut engine, Target::Sorts, FieldRef::calculated("Margin"));

    let replaced = engine
        .apply(Command::AddCalculatedField {
            name: "Margin".to_string(),
            formula: "[orders.amount] * 0.3".to_string(),
            description: String::new(),
        })
        .unwrap();
    assert!(matches!(
        replaced,
        Applied::CalculatedField(AddOutcome::Replaced { .. })
    ));
    assert_eq!(engine.config().calculated_fields.len(), 1);
    assert_eq!(engine.config().columns.len(), 2);

    engine
        .apply(Command::RemoveCalculatedField("Margin".to_string()))
        .unwrap();
    assert!(engine.config().calculated_fields.is_empty());
    assert_eq!(engine.config().columns.len(), 1);
    assert!(engine.config().sorts.is_empty());

    let err = engine
        .apply(Command::RemoveCalculatedField("Margin".to_string()))
        .unwrap_err();
    assert!(matches!(err, EngineError::UnknownCalculatedField(_)));
}

#[tokio::test]
async fn test_save_update_and_load() {
    let mut engine = ready_engine();
    assert!(engine.has_unsaved_changes());

    let err = engine.update().await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Persistence(PersistenceError::MissingId)
    ));

    let saved = engine.save("Regions").await.unwrap();
    assert_eq!(engine.saved_id(), Some(saved.id.as_str()));
    assert!(!engine.has_unsaved_changes());

    let filter = place(&mut engine, Target::Filters, region());
    engine
        .apply(Command::SetFilterValue {
            id: filter,
            value: Scalar::from("EU"),
        })
        .unwrap();
    assert!(engine.has_unsaved_changes());
    engine.update().await.unwrap();
    assert!(!engine.has_unsaved_changes());
    assert_eq!(engine.backend().last_update_name().as_deref(), Some("Regions"));

    // Start over, then load the saved report back.
    engine.open(ReportConfig::default());
    assert!(engine.surface().is_empty());
    let config = engine.load(&saved.id).await.unwrap();
    assert_eq!(config.filters.len(), 1);
    assert_eq!(engine.surface().widgets(Target::Filters).len(), 1);
    assert_eq!(engine.saved_name(), Some("Regions"));
    assert!(!engine.has_unsaved_changes());

    let listed = engine.list_saved().await.unwrap();
    assert_eq!(listed.len(), 1);

    let err = engine.save("  ").await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Persistence(PersistenceError::BlankName)
    ));
}

#[tokio::test]
async fn test_batch_column_failures_become_notices() {
    let mut engine = ready_engine();
    engine.backend().fail_table("customers");

    let tables = vec!["orders".to_string(), "customers".to_string()];
    let outcome = engine.load_columns_batch(&tables).await.unwrap();
    assert_eq!(outcome.failed, vec!["customers".to_string()]);

    let notices = engine.take_notices();
    assert_eq!(notices.len(), 1);
    assert!(notices[0].message.contains("customers"));
}

#[tokio::test]
async fn test_validation_reports_unknown_columns() {
    let mut engine = ready_engine();
    place(&mut engine, Target::Groups, FieldRef::column("orders", "ghost"));
    engine.load_columns("orders").await.unwrap();

    let issues = engine.validate();
    assert_eq!(issues.len(), 1);
    assert!(issues[0].is_error());
    assert!(issues[0].to_string().contains("orders.ghost"));
}

#[tokio::test(start_paused = true)]
async fn test_search_is_debounced() {
    let mut engine = ready_engine();
    engine.load_tables().await.unwrap();
    engine.load_columns("orders").await.unwrap();

    engine.search("a");
    engine.search("am");
    engine.search("amo");
    assert!(engine.poll_search().is_none());

    tokio::time::advance(Duration::from_millis(100)).await;
    assert!(engine.poll_search().is_none());

    let results = engine.settle_search().await.unwrap();
    assert_eq!(results.columns, vec![amount()]);
    assert!(engine.settle_search().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_opening_another_connection_drops_search_state() {
    let mut engine = ready_engine();
    engine.load_tables().await.unwrap();
    engine.load_columns("orders").await.unwrap();
    engine.search("amo");
    assert_eq!(engine.settle_search().await.unwrap().columns, vec![amount()]);

    engine.search("ord");
    engine.open(ReportConfig::new("2"));
    assert_eq!(engine.catalog().connection_id(), Some("2"));
    assert!(engine.search_results().is_empty());
    assert!(engine.settle_search().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_loading_another_connection_drops_search_state() {
    let mut engine = ReportEngine::new(MockBackend::new());
    engine.open(common::ready_config("2"));
    let saved = engine.save("Salaries").await.unwrap();

    engine.open(common::ready_config("1"));
    engine.load_tables().await.unwrap();
    engine.search("ord");
    assert_eq!(
        engine.settle_search().await.unwrap().tables,
        vec!["orders".to_string()]
    );

    engine.search("cust");
    engine.load(&saved.id).await.unwrap();
    assert_eq!(engine.catalog().connection_id(), Some("2"));
    assert!(engine.search_results().is_empty());
    assert!(engine.settle_search().await.is_none());
}
