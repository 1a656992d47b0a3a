//! Rebuilding the placement surface from a saved config.

use super::{Controls, PlacementSurface};
use crate::model::ReportConfig;

impl PlacementSurface {
    /// Reconstruct the surface for `config`.
    ///
    /// One widget per entry of each target list, in list order, with every
    /// control explicitly set from the config. Widget ids are assigned in
    /// surface order (columns, filters, groups, sorts), so the same config
    /// always produces the same surface. Projecting the result with
    /// [`crate::sync::project`] gives back the config's lists unchanged,
    /// except filters whose value is blank, which a projection never keeps.
    pub fn from_config(config: &ReportConfig) -> Self {
        let mut surface = Self::new();

        for column in &config.columns {
            surface.place_with(
                column.field.clone(),
                Controls::Column {
                    aggregation: Some(column.aggregation),
                },
            );
        }
        for filter in &config.filters {
            surface.place_with(
                filter.field.clone(),
                Controls::Filter {
                    operator: Some(filter.operator),
                    value: filter.value.clone(),
                    drill_down: filter.is_drill_down,
                },
            );
        }
        for group in &config.groups {
            surface.place_with(
                group.field.clone(),
                Controls::Group {
                    method: Some(group.method),
                },
            );
        }
        for sort in &config.sorts {
            surface.place_with(
                sort.field.clone(),
                Controls::Sort {
                    direction: Some(sort.direction),
                },
            );
        }

        surface
    }
}
