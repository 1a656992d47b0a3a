//! Integration tests for exporting results.

#[path = "../common/mod.rs"]
mod common;

use common::{ready_config, Calls, MockBackend};
use quarry::execution::ExecutionClient;
use quarry::export::{export_report, ExportError, ExportFormat};
use quarry::model::ReportResult;

#[tokio::test]
async fn test_no_request_for_empty_result() {
    let backend = MockBackend::new();

    for format in ExportFormat::ALL {
        let err = export_report(&backend, &ready_config("1"), &ReportResult::empty(), format)
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::NoData));
    }
    assert_eq!(Calls::get(&backend.calls.export), 0);
}

#[tokio::test]
async fn test_export_last_result() {
    let backend = MockBackend::new();
    let config = ready_config("1");
    let mut client = ExecutionClient::new();
    client.execute(&backend, &config, 1).await.unwrap();

    let file = export_report(&backend, &config, client.result(), ExportFormat::Excel)
        .await
        .unwrap();

    assert_eq!(file.format, ExportFormat::Excel);
    assert!(file.filename.starts_with("report-"));
    assert!(file.filename.ends_with(".xlsx"));
    assert_eq!(file.bytes, b"excel:region,total".to_vec());
    assert_eq!(Calls::get(&backend.calls.export), 1);
}

#[tokio::test]
async fn test_failed_export_leaves_result_alone() {
    let backend = MockBackend::new();
    backend.set_fail_export(true);
    let config = ready_config("1");
    let mut client = ExecutionClient::new();
    client.execute(&backend, &config, 2).await.unwrap();
    let before = client.result().clone();

    let err = export_report(&backend, &config, client.result(), ExportFormat::Pdf)
        .await
        .unwrap_err();
    assert!(matches!(err, ExportError::Request(_)));
    assert_eq!(client.result(), &before);
}

#[tokio::test]
async fn test_save_in_creates_directory() {
    let backend = MockBackend::new();
    let config = ready_config("1");
    let mut client = ExecutionClient::new();
    client.execute(&backend, &config, 1).await.unwrap();
    let file = export_report(&backend, &config, client.result(), ExportFormat::Csv)
        .await
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("exports");
    let path = file.save_in(&target).unwrap();

    assert_eq!(path.parent(), Some(target.as_path()));
    assert_eq!(std::fs::read(&path).unwrap(), b"csv:region,total".to_vec());
}

#[test]
fn test_format_names() {
    let parsed: Vec<ExportFormat> = ["excel", "CSV", "pdf"]
        .iter()
        .map(|s| s.parse().unwrap())
        .collect();
    assert_eq!(parsed, ExportFormat::ALL.to_vec());
    assert_eq!(ExportFormat::Excel.extension(), "xlsx");
    assert_eq!(ExportFormat::Pdf.to_string(), "pdf");
}
