//! Integration tests for drill-down.
//!
//! These tests check that drilling only ever adds filters, that climbing up
//! restores the previous projection, and that the breadcrumb survives a
//! rehydrate.

use quarry::drill::{climb_up, drill_into, DrillError, DrillPath};
use quarry::model::{FieldRef, FilterOperator, ReportConfig, Scalar};
use quarry::surface::{PlacementSurface, Target};
use quarry::sync::{project, reconcile};

fn region() -> FieldRef {
    FieldRef::column("orders", "region")
}

fn year() -> FieldRef {
    FieldRef::column("orders", "year")
}

/// A surface with one column and one user filter.
fn base_surface() -> PlacementSurface {
    let mut surface = PlacementSurface::new();
    surface.place(Target::Columns, region());
    let filter = surface.place(Target::Filters, FieldRef::column("orders", "amount"));
    surface.set_operator(filter, Some(FilterOperator::Gt)).unwrap();
    surface.set_filter_value(filter, 10).unwrap();
    surface
}

#[test]
fn test_drill_adds_filters_on_top_of_existing_ones() {
    let mut surface = base_surface();
    let mut path = DrillPath::new();
    let before = project(&surface).filters;

    drill_into(&mut surface, &mut path, region(), "EU").unwrap();
    drill_into(&mut surface, &mut path, year(), 2024).unwrap();

    let after = project(&surface).filters;
    assert_eq!(after.len(), before.len() + 2);
    assert_eq!(&after[..before.len()], &before[..]);
    assert!(after[1].is_drill_down);
    assert_eq!(after[1].operator, FilterOperator::Eq);
    assert_eq!(after[1].value, Scalar::from("EU"));
    assert_eq!(after[2].field, year());
    assert_eq!(path.len(), 2);
}

#[test]
fn test_climb_up_restores_previous_projection() {
    let mut surface = base_surface();
    let mut path = DrillPath::new();
    let base = project(&surface);

    drill_into(&mut surface, &mut path, region(), "EU").unwrap();
    let one_level = project(&surface);
    drill_into(&mut surface, &mut path, year(), 2024).unwrap();

    let step = climb_up(&mut surface, &mut path).unwrap();
    assert_eq!(step.field, year());
    assert_eq!(project(&surface), one_level);

    climb_up(&mut surface, &mut path).unwrap();
    assert_eq!(project(&surface), base);
    assert!(climb_up(&mut surface, &mut path).is_none());
}

#[test]
fn test_removed_pill_is_pruned_from_path() {
    let mut surface = base_surface();
    let mut path = DrillPath::new();
    drill_into(&mut surface, &mut path, region(), "EU").unwrap();
    let second = drill_into(&mut surface, &mut path, year(), 2024).unwrap();

    surface.remove(second).unwrap();
    assert_eq!(path.prune(&surface), 1);

    let step = climb_up(&mut surface, &mut path).unwrap();
    assert_eq!(step.field, region());
    assert!(path.is_empty());
}

#[test]
fn test_blank_value_is_rejected() {
    let mut surface = base_surface();
    let mut path = DrillPath::new();
    let before = surface.clone();

    let err = drill_into(&mut surface, &mut path, region(), Scalar::Null).unwrap_err();
    assert_eq!(err, DrillError::BlankValue(region()));
    assert_eq!(surface, before);
    assert!(path.is_empty());
}

#[test]
fn test_path_recovered_from_saved_config() {
    let mut surface = base_surface();
    let mut path = DrillPath::new();
    drill_into(&mut surface, &mut path, region(), "EU").unwrap();
    drill_into(&mut surface, &mut path, year(), 2024).unwrap();

    let mut config = ReportConfig::new("1");
    reconcile(&surface, &mut config);
    assert_eq!(config.drill_down_filters().count(), 2);

    let mut rebuilt = PlacementSurface::from_config(&config);
    let mut recovered = DrillPath::recover(&rebuilt);
    let values: Vec<&Scalar> = recovered.steps().iter().map(|s| &s.value).collect();
    assert_eq!(values, vec![&Scalar::from("EU"), &Scalar::Int(2024)]);

    climb_up(&mut rebuilt, &mut recovered).unwrap();
    assert_eq!(project(&rebuilt).filters.len(), 2);
}
