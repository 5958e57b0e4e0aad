//! Selection criteria the application builds repeatedly.

use std::sync::Arc;
use strata_core::{
    FieldCriterion, NumericMatchType, PersistenceError, Result, SelectionCriteria, Table,
};

fn integer_in(table: &Arc<Table>, field: &str, values: &[i32]) -> Result<SelectionCriteria> {
    let field = table
        .field_by_name(field)
        .ok_or_else(|| PersistenceError::binding(table.qualified_name(), field))?;
    let criterion = FieldCriterion::numeric(field, NumericMatchType::ExactIn, values.iter().copied())?;
    SelectionCriteria::new(table.clone(), vec![criterion])
}

/// Selects the rows of `term` (the `main.term` table) for the given IDs.
pub fn terms_by_id(term: &Arc<Table>, term_ids: &[i32]) -> Result<SelectionCriteria> {
    integer_in(term, "term", term_ids)
}

/// Selects the active term: the row whose `active_index` is 0.
pub fn active_term(term: &Arc<Table>) -> Result<SelectionCriteria> {
    integer_in(term, "active_index", &[0])
}

/// Selects the given weeks of a `term_week` table.
pub fn weeks(term_week: &Arc<Table>, week_nbrs: &[i32]) -> Result<SelectionCriteria> {
    integer_in(term_week, "week_nbr", week_nbrs)
}
