//! Calculated field compiler.
//!
//! Builds named derived fields from free-text formulas that reference
//! catalog columns as bracketed tokens (`[orders.amount] - [orders.cost]`).
//! Only presence of a name and a formula is checked here; whether the
//! formula is meaningful is up to the remote executor.
//!
//! Adding a field whose name already exists replaces it in place (last
//! write wins).

mod editor;

pub use editor::FormulaEditor;

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::model::{CalculatedField, FieldRef, ReportConfig};

/// Pattern for bracketed field tokens inside a formula.
static FIELD_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[([^\[\]]+)\]").unwrap());

/// Validation failures for a calculated field definition.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CalculatedFieldError {
    #[error("calculated field name is required")]
    MissingName,

    #[error("calculated field formula is required")]
    MissingFormula,

    #[error("calculated field name and formula are required")]
    MissingNameAndFormula,
}

/// What [`add_calculated_field`] did to the config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    /// A field with the same name existed and was overwritten.
    Replaced { previous: CalculatedField },
}

/// Validate and build a calculated field. Name and formula are trimmed.
pub fn compile(
    name: &str,
    formula: &str,
    description: &str,
) -> Result<CalculatedField, CalculatedFieldError> {
    let name = name.trim();
    let formula = formula.trim();

    match (name.is_empty(), formula.is_empty()) {
        (true, true) => Err(CalculatedFieldError::MissingNameAndFormula),
        (true, false) => Err(CalculatedFieldError::MissingName),
        (false, true) => Err(CalculatedFieldError::MissingFormula),
        (false, false) => Ok(CalculatedField {
            name: name.to_string(),
            formula: formula.to_string(),
            description: description.trim().to_string(),
        }),
    }
}

/// Compile a field and store it in `config`.
///
/// On a validation error `config` is not touched.
pub fn add_calculated_field(
    config: &mut ReportConfig,
    name: &str,
    formula: &str,
    description: &str,
) -> Result<(CalculatedField, AddOutcome), CalculatedFieldError> {
    let field = compile(name, formula, description)?;

    let outcome = match config
        .calculated_fields
        .iter_mut()
        .find(|f| f.name == field.name)
    {
        Some(existing) => {
            let previous = std::mem::replace(existing, field.clone());
            debug!(name = %field.name, "replaced calculated field");
            AddOutcome::Replaced { previous }
        }
        None => {
            config.calculated_fields.push(field.clone());
            debug!(name = %field.name, "added calculated field");
            AddOutcome::Added
        }
    };

    Ok((field, outcome))
}

/// Remove a calculated field by name.
///
/// Placements that reference it must be dropped by the caller (see
/// [`crate::surface::PlacementSurface::remove_field`]).
pub fn remove_calculated_field(config: &mut ReportConfig, name: &str) -> Option<CalculatedField> {
    let index = config.calculated_fields.iter().position(|f| f.name == name)?;
    Some(config.calculated_fields.remove(index))
}

/// Field references mentioned in a formula, in order of appearance.
///
/// Tokens that do not parse as field references are skipped; this is a
/// display aid, not validation.
pub fn formula_references(formula: &str) -> Vec<FieldRef> {
    FIELD_TOKEN
        .captures_iter(formula)
        .filter_map(|caps| FieldRef::parse(&caps[1]).ok())
        .collect()
}
