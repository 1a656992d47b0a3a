//! Synchronous edits to the engine state.

use tracing::debug;

use super::{EngineError, EngineResult, ReportEngine};
use crate::calculated::{self, AddOutcome};
use crate::catalog::Resolution;
use crate::client::ReportBackend;
use crate::model::{
    Aggregation, FieldRef, FilterOperator, GroupMethod, JoinSpec, ReportType, Scalar,
    SortDirection,
};
use crate::surface::{Controls, Target, WidgetId};
use crate::sync;

/// An edit to the report being built.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetReportType(ReportType),
    /// Switch data source; clears the result and the schema cache.
    SelectConnection(Option<String>),
    Place {
        target: Target,
        field: FieldRef,
    },
    Remove(WidgetId),
    Move {
        id: WidgetId,
        index: usize,
    },
    SetAggregation {
        id: WidgetId,
        aggregation: Option<Aggregation>,
    },
    SetOperator {
        id: WidgetId,
        operator: Option<FilterOperator>,
    },
    SetFilterValue {
        id: WidgetId,
        value: Scalar,
    },
    SetGroupMethod {
        id: WidgetId,
        method: Option<GroupMethod>,
    },
    SetSortDirection {
        id: WidgetId,
        direction: Option<SortDirection>,
    },
    AddCalculatedField {
        name: String,
        formula: String,
        description: String,
    },
    RemoveCalculatedField(String),
    AddJoin(JoinSpec),
    RemoveJoin(usize),
    /// `None` removes the alias.
    SetColumnAlias {
        key: String,
        alias: Option<String>,
    },
    /// `None` removes the format.
    SetColumnFormat {
        key: String,
        format: Option<String>,
    },
    /// Navigation away from the result view.
    ClearResult,
}

/// What a successfully applied command produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    Done,
    Placed(WidgetId),
    CalculatedField(AddOutcome),
    /// The connection changed and dependent state was reset.
    ConnectionChanged,
}

impl<B: ReportBackend> ReportEngine<B> {
    /// Apply one edit, then re-derive the config from the surface.
    ///
    /// A rejected command leaves every piece of state as it was and is
    /// also recorded as a notice.
    pub fn apply(&mut self, command: Command) -> EngineResult<Applied> {
        match self.dispatch(command) {
            Ok(applied) => {
                sync::reconcile(&self.surface, &mut self.config);
                Ok(applied)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    fn dispatch(&mut self, command: Command) -> EngineResult<Applied> {
        debug!(?command, "applying command");
        match command {
            Command::SetReportType(report_type) => {
                self.config.report_type = report_type;
            }
            Command::SelectConnection(connection_id) => {
                let connection_id = connection_id.filter(|id| !id.trim().is_empty());
                self.config.connection_id = connection_id;
                if self.switch_connection() {
                    return Ok(Applied::ConnectionChanged);
                }
            }
            Command::Place { target, field } => {
                self.ensure_resolvable(&field)?;
                return Ok(Applied::Placed(self.surface.place(target, field)));
            }
            Command::Remove(id) => {
                self.surface.remove(id).ok_or(EngineError::UnknownWidget(id))?;
                self.drill.prune(&self.surface);
            }
            Command::Move { id, index } => self.surface.move_widget(id, index)?,
            Command::SetAggregation { id, aggregation } => {
                if let Some(aggregation) = aggregation {
                    self.ensure_aggregatable(id, aggregation)?;
                }
                self.surface.set_aggregation(id, aggregation)?;
            }
            Command::SetOperator { id, operator } => self.surface.set_operator(id, operator)?,
            Command::SetFilterValue { id, value } => self.surface.set_filter_value(id, value)?,
            Command::SetGroupMethod { id, method } => self.surface.set_group_method(id, method)?,
            Command::SetSortDirection { id, direction } => {
                self.surface.set_sort_direction(id, direction)?
            }
            Command::AddCalculatedField {
                name,
                formula,
                description,
            } => {
                let (_, outcome) =
                    calculated::add_calculated_field(&mut self.config, &name, &formula, &description)?;
                return Ok(Applied::CalculatedField(outcome));
            }
            Command::RemoveCalculatedField(name) => {
                calculated::remove_calculated_field(&mut self.config, &name)
                    .ok_or_else(|| EngineError::UnknownCalculatedField(name.clone()))?;
                let removed = self.surface.remove_field(&FieldRef::calculated(name));
                self.drill.prune(&self.surface);
                debug!(widgets = removed, "removed placements of calculated field");
            }
            Command::AddJoin(join) => self.config.joins.push(join),
            Command::RemoveJoin(index) => {
                if index >= self.config.joins.len() {
                    return Err(EngineError::UnknownJoin(index));
                }
                self.config.joins.remove(index);
            }
            Command::SetColumnAlias { key, alias } => match alias {
                Some(alias) => {
                    self.config.column_aliases.insert(key, alias);
                }
                None => {
                    self.config.column_aliases.remove(&key);
                }
            },
            Command::SetColumnFormat { key, format } => match format {
                Some(format) => {
                    self.config.column_formats.insert(key, format);
                }
                None => {
                    self.config.column_formats.remove(&key);
                }
            },
            Command::ClearResult => self.execution.clear(),
        }
        Ok(Applied::Done)
    }

    /// Refuse references that the loaded schema says do not exist.
    /// Columns of tables not fetched yet are accepted.
    fn ensure_resolvable(&self, field: &FieldRef) -> EngineResult<()> {
        let resolved = match field {
            FieldRef::Calculated(name) => self.config.calculated_field(name).is_some(),
            FieldRef::Column { .. } => {
                !matches!(self.catalog.resolve(field), Resolution::Missing)
            }
        };
        if resolved {
            Ok(())
        } else {
            Err(EngineError::UnknownField(field.clone()))
        }
    }

    fn ensure_aggregatable(&self, id: WidgetId, aggregation: Aggregation) -> EngineResult<()> {
        if !aggregation.requires_numeric() {
            return Ok(());
        }
        let widget = self.surface.widget(id).ok_or(EngineError::UnknownWidget(id))?;
        if !matches!(widget.controls, Controls::Column { .. }) {
            // The surface reports the wrong target.
            return Ok(());
        }
        match self.catalog.column_info(&widget.field) {
            Some(info) if !info.is_numeric() => Err(EngineError::NonNumericAggregation {
                field: widget.field.clone(),
                aggregation,
                data_type: info.data_type.clone(),
            }),
            _ => Ok(()),
        }
    }
}
