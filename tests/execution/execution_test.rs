//! Integration tests for report execution and pagination.
//!
//! These tests run `ExecutionClient` against the in-memory backend, which
//! always reports 250 rows unless told otherwise.

#[path = "../common/mod.rs"]
mod common;

use common::{ready_config, Calls, MockBackend};
use quarry::execution::{Completion, ExecutionClient, ExecutionError, ExecutionState, PAGE_SIZE};
use quarry::model::{NotReady, ReportConfig, Scalar};

#[tokio::test]
async fn test_no_request_without_connection() {
    let backend = MockBackend::new();
    let mut client = ExecutionClient::new();
    let mut config = ready_config("1");
    config.connection_id = None;

    let err = client.execute(&backend, &config, 1).await.unwrap_err();
    assert!(matches!(err, ExecutionError::NotReady(NotReady::NoConnection)));
    assert!(!err.is_retriable());
    assert_eq!(Calls::get(&backend.calls.execute), 0);
    assert_eq!(client.state(), &ExecutionState::Idle);
}

#[tokio::test]
async fn test_no_request_without_columns_or_groups() {
    let backend = MockBackend::new();
    let mut client = ExecutionClient::new();

    let err = client
        .execute(&backend, &ReportConfig::new("1"), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, ExecutionError::NotReady(NotReady::NothingSelected)));
    assert_eq!(Calls::get(&backend.calls.execute), 0);
}

#[tokio::test]
async fn test_pages_of_250_rows() {
    let backend = MockBackend::new();
    let mut client = ExecutionClient::new();
    let config = ready_config("1");

    let mut sizes = Vec::new();
    for page in 1..=3 {
        let result = client.execute(&backend, &config, page).await.unwrap();
        assert_eq!(result.current_page, page);
        assert_eq!(result.total_rows, 250);
        sizes.push(result.rows.len());
    }
    assert_eq!(sizes, vec![100, 100, 50]);

    let pagination = client.pagination();
    assert_eq!(pagination.total_pages(), 3);
    assert!(!pagination.has_next());
    assert!(pagination.has_previous());

    // Page 3 starts at row 200.
    assert_eq!(client.result().cell(0, "total"), Some(&Scalar::Int(200)));
    for (_, page, page_size) in backend.executed() {
        assert!((1..=3).contains(&page));
        assert_eq!(page_size, PAGE_SIZE);
    }
}

#[tokio::test]
async fn test_page_zero_is_page_one() {
    let backend = MockBackend::new();
    let mut client = ExecutionClient::new();

    let result = client.execute(&backend, &ready_config("1"), 0).await.unwrap();
    assert_eq!(result.current_page, 1);
    assert_eq!(backend.last_executed().unwrap().1, 1);
}

#[tokio::test]
async fn test_failure_clears_result_and_can_be_retried() {
    let backend = MockBackend::new();
    let mut client = ExecutionClient::new();
    let config = ready_config("1");
    client.execute(&backend, &config, 2).await.unwrap();

    backend.fail_next_executions(1);
    let err = client.execute(&backend, &config, 3).await.unwrap_err();
    assert!(err.is_retriable());
    assert!(client.result().is_empty());
    assert!(matches!(client.state(), ExecutionState::Failed { .. }));
    assert!(client.can_retry());

    let result = client.retry(&backend).await.unwrap();
    assert_eq!(result.current_page, 3);
    assert_eq!(result.rows.len(), 50);
    assert!(!client.can_retry());
}

#[tokio::test]
async fn test_retry_without_failure() {
    let backend = MockBackend::new();
    let mut client = ExecutionClient::new();

    let err = client.retry(&backend).await.unwrap_err();
    assert!(matches!(err, ExecutionError::NothingToRetry));
    assert_eq!(Calls::get(&backend.calls.execute), 0);
}

#[test]
fn test_stale_response_is_discarded() {
    let mut client = ExecutionClient::new();
    let config = ready_config("1");

    let first = client.begin(&config, 1).unwrap();
    let second = client.begin(&config, 2).unwrap();
    assert!(second.seq() > first.seq());

    let fresh = quarry::execution::ExecutionPage {
        headers: vec!["region".to_string()],
        rows: common::fixture_rows(100, 200),
        total_rows: 250,
    };
    assert!(matches!(client.complete(&second, Ok(fresh)), Completion::Applied));

    let late = quarry::execution::ExecutionPage {
        headers: vec!["region".to_string()],
        rows: common::fixture_rows(0, 100),
        total_rows: 250,
    };
    assert!(matches!(client.complete(&first, Ok(late)), Completion::Stale));
    assert_eq!(client.result().current_page, 2);
    assert_eq!(client.result().cell(0, "total"), Some(&Scalar::Int(100)));
}

#[test]
fn test_ticket_snapshots_the_config() {
    let mut client = ExecutionClient::new();
    let mut config = ready_config("1");
    let ticket = client.begin(&config, 1).unwrap();

    config.connection_id = Some("2".to_string());
    assert_eq!(ticket.config().connection_id.as_deref(), Some("1"));
}

#[test]
fn test_clear_invalidates_in_flight_request() {
    let mut client = ExecutionClient::new();
    let ticket = client.begin(&ready_config("1"), 1).unwrap();
    client.clear();

    let page = quarry::execution::ExecutionPage {
        headers: vec!["region".to_string()],
        rows: Vec::new(),
        total_rows: 0,
    };
    assert!(matches!(client.complete(&ticket, Ok(page)), Completion::Stale));
    assert!(client.result().is_empty());
    assert_eq!(client.state(), &ExecutionState::Idle);
}
