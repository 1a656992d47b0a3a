//! Integration tests for saving and loading reports.
//!
//! These tests use the SQLite repository in a temporary directory and check
//! that a loaded report rebuilds the same placement surface.

use quarry::drill::{drill_into, DrillPath};
use quarry::model::{Aggregation, FieldRef, GroupMethod, ReportConfig};
use quarry::persistence::{self, LocalReportRepository, PersistenceError};
use quarry::surface::{PlacementSurface, Target};
use quarry::sync::{project, reconcile};

fn built_report() -> (PlacementSurface, ReportConfig) {
    let mut surface = PlacementSurface::new();
    let amount = surface.place(Target::Columns, FieldRef::column("orders", "amount"));
    surface.set_aggregation(amount, Some(Aggregation::Sum)).unwrap();
    let group = surface.place(Target::Groups, FieldRef::column("orders", "year"));
    surface.set_group_method(group, Some(GroupMethod::Year)).unwrap();
    surface.place(Target::Sorts, FieldRef::column("orders", "year"));

    let mut path = DrillPath::new();
    drill_into(&mut surface, &mut path, FieldRef::column("orders", "region"), "EU").unwrap();

    let mut config = ReportConfig::new("1");
    config
        .column_formats
        .insert("orders.amount".to_string(), "currency".to_string());
    reconcile(&surface, &mut config);
    (surface, config)
}

#[tokio::test]
async fn test_save_and_load_rehydrates_surface() {
    let dir = tempfile::tempdir().unwrap();
    let repo = LocalReportRepository::open_at(&dir.path().join("reports.db")).unwrap();
    let (surface, config) = built_report();

    let saved = persistence::save(&repo, "  Sales by year ", &config).await.unwrap();
    assert_eq!(saved.name, "Sales by year");
    assert!(!saved.id.is_empty());

    let loaded = persistence::load(&repo, &saved.id).await.unwrap();
    assert_eq!(loaded.report.config, config);
    assert_eq!(project(&loaded.surface), project(&surface));

    let path = DrillPath::recover(&loaded.surface);
    assert_eq!(path.len(), 1);
    assert_eq!(path.steps()[0].field, FieldRef::column("orders", "region"));
}

#[tokio::test]
async fn test_reports_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("nested").join("reports.db");
    let (_, config) = built_report();

    let id = {
        let repo = LocalReportRepository::open_at(&db).unwrap();
        persistence::save(&repo, "First", &config).await.unwrap().id
    };

    let repo = LocalReportRepository::open_at(&db).unwrap();
    let loaded = persistence::load(&repo, &id).await.unwrap();
    assert_eq!(loaded.report.name, "First");
    assert_eq!(repo.path(), db.as_path());
}

#[tokio::test]
async fn test_update_replaces_config() {
    let repo = LocalReportRepository::open_in_memory().unwrap();
    let (_, config) = built_report();
    let saved = persistence::save(&repo, "Report", &config).await.unwrap();

    let mut changed = config.clone();
    changed.groups.clear();
    let updated = persistence::update(&repo, &saved.id, " Report v2 ", &changed)
        .await
        .unwrap();
    assert_eq!(updated.id, saved.id);
    assert_eq!(updated.name, "Report v2");

    let loaded = persistence::load(&repo, &saved.id).await.unwrap();
    assert_eq!(loaded.report.name, "Report v2");
    assert!(loaded.report.config.groups.is_empty());
    assert!(loaded.surface.widgets(Target::Groups).is_empty());
}

#[tokio::test]
async fn test_list_returns_summaries() {
    let repo = LocalReportRepository::open_in_memory().unwrap();
    let (_, config) = built_report();
    persistence::save(&repo, "Alpha", &config).await.unwrap();
    persistence::save(&repo, "Beta", &config).await.unwrap();

    let mut names: Vec<String> = persistence::list(&repo)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.name)
        .collect();
    names.sort();
    assert_eq!(names, vec!["Alpha".to_string(), "Beta".to_string()]);
}

#[tokio::test]
async fn test_guards() {
    let repo = LocalReportRepository::open_in_memory().unwrap();
    let config = ReportConfig::new("1");

    assert!(matches!(
        persistence::save(&repo, "   ", &config).await,
        Err(PersistenceError::BlankName)
    ));
    assert!(matches!(
        persistence::update(&repo, "", "Report", &config).await,
        Err(PersistenceError::MissingId)
    ));
    assert!(matches!(
        persistence::update(&repo, "r1", "  ", &config).await,
        Err(PersistenceError::BlankName)
    ));
    assert!(matches!(
        persistence::load(&repo, "does-not-exist").await,
        Err(PersistenceError::NotFound(id)) if id == "does-not-exist"
    ));
    assert!(persistence::list(&repo).await.unwrap().is_empty());
}
