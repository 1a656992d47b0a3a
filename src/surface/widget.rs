//! Placement widgets.

use std::fmt;

use crate::model::{Aggregation, FieldRef, FilterOperator, GroupMethod, Scalar, SortDirection};

/// Stable identifier of a widget within one surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WidgetId(pub(crate) u64);

impl WidgetId {
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The four drop targets of the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Columns,
    Filters,
    Groups,
    Sorts,
}

impl Target {
    /// Surface order.
    pub const ALL: [Target; 4] = [Target::Columns, Target::Filters, Target::Groups, Target::Sorts];
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Target::Columns => "columns",
            Target::Filters => "filters",
            Target::Groups => "groups",
            Target::Sorts => "sorts",
        })
    }
}

/// Target-specific control state. `None` selectors mean nothing was picked
/// and project to the target's default.
#[derive(Debug, Clone, PartialEq)]
pub enum Controls {
    Column {
        aggregation: Option<Aggregation>,
    },
    Filter {
        operator: Option<FilterOperator>,
        value: Scalar,
        drill_down: bool,
    },
    Group {
        method: Option<GroupMethod>,
    },
    Sort {
        direction: Option<SortDirection>,
    },
}

impl Controls {
    /// Fresh controls for a widget just dropped onto `target`.
    pub fn empty(target: Target) -> Self {
        match target {
            Target::Columns => Controls::Column { aggregation: None },
            Target::Filters => Controls::Filter {
                operator: None,
                value: Scalar::Null,
                drill_down: false,
            },
            Target::Groups => Controls::Group { method: None },
            Target::Sorts => Controls::Sort { direction: None },
        }
    }

    pub fn target(&self) -> Target {
        match self {
            Controls::Column { .. } => Target::Columns,
            Controls::Filter { .. } => Target::Filters,
            Controls::Group { .. } => Target::Groups,
            Controls::Sort { .. } => Target::Sorts,
        }
    }
}

/// One entry on the placement surface.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementWidget {
    pub id: WidgetId,
    pub field: FieldRef,
    pub controls: Controls,
}

impl PlacementWidget {
    pub fn target(&self) -> Target {
        self.controls.target()
    }

    pub fn is_drill_down(&self) -> bool {
        matches!(self.controls, Controls::Filter { drill_down: true, .. })
    }
}
