//! Report config synchronizer.
//!
//! Projects the placement surface onto the four surface-owned lists of a
//! [`ReportConfig`] (columns, filters, groups, sorts). The projection is
//! pure and total:
//!
//! - the output depends only on current widget state, never on the order
//!   of the edits that produced it;
//! - every list keeps surface order;
//! - filters whose value is blank are left out;
//! - unset selectors fall back to `NONE`, `=`, `exact` and `ASC`.
//!
//! All other config fields (connection, joins, calculated fields, display
//! metadata) are untouched by [`reconcile`].

use crate::model::{ColumnSpec, FilterSpec, GroupSpec, ReportConfig, SortSpec};
use crate::surface::{Controls, PlacementSurface, PlacementWidget, Target};

/// The surface-owned part of a report config.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Placement {
    pub columns: Vec<ColumnSpec>,
    pub filters: Vec<FilterSpec>,
    pub groups: Vec<GroupSpec>,
    pub sorts: Vec<SortSpec>,
}

/// Project the current widget state.
pub fn project(surface: &PlacementSurface) -> Placement {
    Placement {
        columns: surface
            .widgets(Target::Columns)
            .iter()
            .filter_map(column_spec)
            .collect(),
        filters: surface
            .widgets(Target::Filters)
            .iter()
            .filter_map(filter_spec)
            .collect(),
        groups: surface
            .widgets(Target::Groups)
            .iter()
            .filter_map(group_spec)
            .collect(),
        sorts: surface
            .widgets(Target::Sorts)
            .iter()
            .filter_map(sort_spec)
            .collect(),
    }
}

/// Replace the surface-owned lists of `config` with a fresh projection.
pub fn reconcile(surface: &PlacementSurface, config: &mut ReportConfig) {
    let Placement {
        columns,
        filters,
        groups,
        sorts,
    } = project(surface);
    config.columns = columns;
    config.filters = filters;
    config.groups = groups;
    config.sorts = sorts;
}

fn column_spec(widget: &PlacementWidget) -> Option<ColumnSpec> {
    match &widget.controls {
        Controls::Column { aggregation } => Some(ColumnSpec {
            field: widget.field.clone(),
            aggregation: aggregation.unwrap_or_default(),
        }),
        _ => None,
    }
}

fn filter_spec(widget: &PlacementWidget) -> Option<FilterSpec> {
    match &widget.controls {
        Controls::Filter {
            operator,
            value,
            drill_down,
        } if !value.is_blank() => Some(FilterSpec {
            field: widget.field.clone(),
            operator: operator.unwrap_or_default(),
            value: value.clone(),
            is_drill_down: *drill_down,
        }),
        _ => None,
    }
}

fn group_spec(widget: &PlacementWidget) -> Option<GroupSpec> {
    match &widget.controls {
        Controls::Group { method } => Some(GroupSpec {
            field: widget.field.clone(),
            method: method.unwrap_or_default(),
        }),
        _ => None,
    }
}

fn sort_spec(widget: &PlacementWidget) -> Option<SortSpec> {
    match &widget.controls {
        Controls::Sort { direction } => Some(SortSpec {
            field: widget.field.clone(),
            direction: direction.unwrap_or_default(),
        }),
        _ => None,
    }
}
