//! Field placement surface.
//!
//! The builder's four drop targets (columns, filters, groups, sorts), held
//! as typed widget records. This is the editable view state; the canonical
//! [`crate::model::ReportConfig`] is projected from it by [`crate::sync`].
//!
//! A field may be placed on several targets, and even several times on the
//! same target. Same-target duplicates are allowed but reported by
//! [`PlacementSurface::redundant_entries`].

mod rehydrate;
mod widget;

pub use widget::{Controls, PlacementWidget, Target, WidgetId};

use thiserror::Error;

use crate::model::{Aggregation, FieldRef, FilterOperator, GroupMethod, Scalar, SortDirection};

/// Result type for surface edits.
pub type SurfaceResult<T> = Result<T, SurfaceError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    #[error("no widget {0} on the surface")]
    UnknownWidget(WidgetId),

    #[error("widget {id} is in {actual}, the control belongs to {expected}")]
    WrongTarget {
        id: WidgetId,
        expected: Target,
        actual: Target,
    },
}

/// Same-target duplicates of one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redundancy {
    pub target: Target,
    pub field: FieldRef,
    pub widgets: Vec<WidgetId>,
}

/// The four placement targets and their widgets, in surface order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlacementSurface {
    columns: Vec<PlacementWidget>,
    filters: Vec<PlacementWidget>,
    groups: Vec<PlacementWidget>,
    sorts: Vec<PlacementWidget>,
    next_id: u64,
}

impl PlacementSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop `field` onto `target` with empty controls.
    pub fn place(&mut self, target: Target, field: FieldRef) -> WidgetId {
        self.place_with(field, Controls::empty(target))
    }

    /// Append a widget with explicit controls; the target follows from the
    /// controls variant.
    pub fn place_with(&mut self, field: FieldRef, controls: Controls) -> WidgetId {
        self.next_id += 1;
        let id = WidgetId(self.next_id);
        let target = controls.target();
        self.list_mut(target).push(PlacementWidget {
            id,
            field,
            controls,
        });
        id
    }

    pub fn remove(&mut self, id: WidgetId) -> Option<PlacementWidget> {
        let (target, index) = self.locate(id)?;
        Some(self.list_mut(target).remove(index))
    }

    /// Move a widget to `index` within its own target. Out-of-range indexes
    /// move it to the end.
    pub fn move_widget(&mut self, id: WidgetId, index: usize) -> SurfaceResult<()> {
        let (target, from) = self.locate(id).ok_or(SurfaceError::UnknownWidget(id))?;
        let list = self.list_mut(target);
        let widget = list.remove(from);
        let index = index.min(list.len());
        list.insert(index, widget);
        Ok(())
    }

    /// Remove every widget placed for `field`, on any target.
    pub fn remove_field(&mut self, field: &FieldRef) -> usize {
        let mut removed = 0;
        for target in Target::ALL {
            let list = self.list_mut(target);
            let before = list.len();
            list.retain(|w| &w.field != field);
            removed += before - list.len();
        }
        removed
    }

    pub fn clear(&mut self) {
        for target in Target::ALL {
            self.list_mut(target).clear();
        }
    }

    pub fn widgets(&self, target: Target) -> &[PlacementWidget] {
        match target {
            Target::Columns => &self.columns,
            Target::Filters => &self.filters,
            Target::Groups => &self.groups,
            Target::Sorts => &self.sorts,
        }
    }

    /// All widgets, target by target in surface order.
    pub fn iter(&self) -> impl Iterator<Item = &PlacementWidget> {
        Target::ALL.into_iter().flat_map(move |t| self.widgets(t).iter())
    }

    pub fn widget(&self, id: WidgetId) -> Option<&PlacementWidget> {
        self.iter().find(|w| w.id == id)
    }

    pub fn len(&self) -> usize {
        Target::ALL.iter().map(|t| self.widgets(*t).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn set_aggregation(
        &mut self,
        id: WidgetId,
        aggregation: Option<Aggregation>,
    ) -> SurfaceResult<()> {
        match &mut self.widget_mut(id)?.controls {
            Controls::Column { aggregation: slot } => {
                *slot = aggregation;
                Ok(())
            }
            other => Err(wrong_target(id, Target::Columns, other.target())),
        }
    }

    pub fn set_operator(
        &mut self,
        id: WidgetId,
        operator: Option<FilterOperator>,
    ) -> SurfaceResult<()> {
        match &mut self.widget_mut(id)?.controls {
            Controls::Filter { operator: slot, .. } => {
                *slot = operator;
                Ok(())
            }
            other => Err(wrong_target(id, Target::Filters, other.target())),
        }
    }

    pub fn set_filter_value(&mut self, id: WidgetId, value: impl Into<Scalar>) -> SurfaceResult<()> {
        match &mut self.widget_mut(id)?.controls {
            Controls::Filter { value: slot, .. } => {
                *slot = value.into();
                Ok(())
            }
            other => Err(wrong_target(id, Target::Filters, other.target())),
        }
    }

    pub fn set_group_method(
        &mut self,
        id: WidgetId,
        method: Option<GroupMethod>,
    ) -> SurfaceResult<()> {
        match &mut self.widget_mut(id)?.controls {
            Controls::Group { method: slot } => {
                *slot = method;
                Ok(())
            }
            other => Err(wrong_target(id, Target::Groups, other.target())),
        }
    }

    pub fn set_sort_direction(
        &mut self,
        id: WidgetId,
        direction: Option<SortDirection>,
    ) -> SurfaceResult<()> {
        match &mut self.widget_mut(id)?.controls {
            Controls::Sort { direction: slot } => {
                *slot = direction;
                Ok(())
            }
            other => Err(wrong_target(id, Target::Sorts, other.target())),
        }
    }

    /// Fields placed more than once on the same target.
    pub fn redundant_entries(&self) -> Vec<Redundancy> {
        let mut found = Vec::new();
        for target in Target::ALL {
            let widgets = self.widgets(target);
            for (i, widget) in widgets.iter().enumerate() {
                // Report each field once, at its first occurrence.
                if widgets[..i].iter().any(|w| w.field == widget.field) {
                    continue;
                }
                let ids: Vec<WidgetId> = widgets
                    .iter()
                    .filter(|w| w.field == widget.field)
                    .map(|w| w.id)
                    .collect();
                if ids.len() > 1 {
                    found.push(Redundancy {
                        target,
                        field: widget.field.clone(),
                        widgets: ids,
                    });
                }
            }
        }
        found
    }

    fn list_mut(&mut self, target: Target) -> &mut Vec<PlacementWidget> {
        match target {
            Target::Columns => &mut self.columns,
            Target::Filters => &mut self.filters,
            Target::Groups => &mut self.groups,
            Target::Sorts => &mut self.sorts,
        }
    }

    fn locate(&self, id: WidgetId) -> Option<(Target, usize)> {
        Target::ALL.into_iter().find_map(|target| {
            self.widgets(target)
                .iter()
                .position(|w| w.id == id)
                .map(|index| (target, index))
        })
    }

    fn widget_mut(&mut self, id: WidgetId) -> SurfaceResult<&mut PlacementWidget> {
        let (target, index) = self.locate(id).ok_or(SurfaceError::UnknownWidget(id))?;
        Ok(&mut self.list_mut(target)[index])
    }
}

fn wrong_target(id: WidgetId, expected: Target, actual: Target) -> SurfaceError {
    SurfaceError::WrongTarget {
        id,
        expected,
        actual,
    }
}
