//! Drill-down controller.
//!
//! Each drill adds an equality filter widget flagged `drill_down` to the
//! placement surface, on top of whatever filters already exist. The
//! [`DrillPath`] remembers which widgets were created that way, most
//! recent last, so the narrowing can be undone one step at a time:
//!
//! ```text
//!   base ──drill(region=EU)──► +region=EU ──drill(year=2024)──► +year=2024
//!        ◄──────climb_up──────            ◄───────climb_up───────
//! ```
//!
//! Drill widgets are appended to the end of the filter target, so removing
//! the latest one yields exactly the filters that existed before it.
//! Re-execution is left to the caller (see [`crate::engine`]).

use thiserror::Error;
use tracing::debug;

use crate::model::{FieldRef, FilterOperator, Scalar};
use crate::surface::{Controls, PlacementSurface, Target, WidgetId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DrillError {
    /// Blank values would be dropped by the synchronizer, so the drill
    /// would silently do nothing.
    #[error("cannot drill into a blank value of {0}")]
    BlankValue(FieldRef),
}

/// One narrowing step.
#[derive(Debug, Clone, PartialEq)]
pub struct DrillStep {
    pub widget: WidgetId,
    pub field: FieldRef,
    pub value: Scalar,
}

/// Breadcrumb of drill steps, oldest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrillPath {
    steps: Vec<DrillStep>,
}

impl DrillPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the path from drill filter widgets already on a surface,
    /// e.g. after loading a saved report.
    pub fn recover(surface: &PlacementSurface) -> Self {
        let steps = surface
            .widgets(Target::Filters)
            .iter()
            .filter_map(|widget| match &widget.controls {
                Controls::Filter {
                    value,
                    drill_down: true,
                    ..
                } => Some(DrillStep {
                    widget: widget.id,
                    field: widget.field.clone(),
                    value: value.clone(),
                }),
                _ => None,
            })
            .collect();
        Self { steps }
    }

    pub fn steps(&self) -> &[DrillStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn last(&self) -> Option<&DrillStep> {
        self.steps.last()
    }

    pub fn clear(&mut self) {
        self.steps.clear();
    }

    /// Forget steps whose widget is no longer on the surface (the user
    /// removed the pill by hand). Returns how many were dropped.
    pub fn prune(&mut self, surface: &PlacementSurface) -> usize {
        let before = self.steps.len();
        self.steps.retain(|step| surface.widget(step.widget).is_some());
        before - self.steps.len()
    }
}

/// Add `field = value` as a drill filter and record it on `path`.
pub fn drill_into(
    surface: &mut PlacementSurface,
    path: &mut DrillPath,
    field: FieldRef,
    value: impl Into<Scalar>,
) -> Result<WidgetId, DrillError> {
    let value = value.into();
    if value.is_blank() {
        return Err(DrillError::BlankValue(field));
    }

    let widget = surface.place_with(
        field.clone(),
        Controls::Filter {
            operator: Some(FilterOperator::Eq),
            value: value.clone(),
            drill_down: true,
        },
    );
    debug!(%field, %value, depth = path.len() + 1, "drilled into");
    path.steps.push(DrillStep {
        widget,
        field,
        value,
    });
    Ok(widget)
}

/// Undo the most recent drill step still on the surface.
pub fn climb_up(surface: &mut PlacementSurface, path: &mut DrillPath) -> Option<DrillStep> {
    path.prune(surface);
    let step = path.steps.pop()?;
    surface.remove(step.widget);
    debug!(field = %step.field, depth = path.len(), "climbed up");
    Some(step)
}
