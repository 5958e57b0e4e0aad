//! Per-term tables.
//!
//! Each academic term has its own logical schema, `term_<id>`. Outside
//! production every term shares one physical schema per context.
//!
//! Term tables are declared by [`crate::build_registry`] and fetched from
//! the registry afterwards, so each term has a single declaration.

use std::sync::Arc;
use strata_core::{Field, FieldRole, FieldType, PersistenceError, Result, Table, TableRegistry};

/// Tablespace of every per-term table.
pub const TERM_TABLESPACE: &str = "term";

const MIN_TERM_ID: i32 = 100_000;
const MAX_TERM_ID: i32 = 999_999;

/// Logical schema holding the tables of `term_id`.
///
/// # Errors
/// `Configuration` for a term ID that is not six digits.
pub fn term_schema(term_id: i32) -> Result<String> {
    if !(MIN_TERM_ID..=MAX_TERM_ID).contains(&term_id) {
        return Err(PersistenceError::configuration(format!(
            "term ID {} is not of the form YYYYNN",
            term_id
        )));
    }
    Ok(format!("term_{}", term_id))
}

fn registered(registry: &TableRegistry, term_id: i32, name: &str) -> Result<Arc<Table>> {
    let schema = term_schema(term_id)?;
    registry.get(&schema, name).cloned().ok_or_else(|| {
        PersistenceError::configuration(format!(
            "{}.{} is not registered; add term {} to the registry",
            schema, name, term_id
        ))
    })
}

/// Calendar weeks of one term, numbered from 0.
///
/// # Errors
/// `Configuration` if the term was not registered.
pub fn term_week(registry: &TableRegistry, term_id: i32) -> Result<Arc<Table>> {
    registered(registry, term_id, "term_week")
}

pub(crate) fn declare_term_week(term_id: i32) -> Result<Arc<Table>> {
    Table::builder(TERM_TABLESPACE, term_schema(term_id)?, "term_week")
        .description("Start and end date of each week in the term.")
        .examples("week_nbr 0 is the partial week before classes begin")
        .field(Field::new("week_nbr", FieldType::Integer, FieldRole::PartitionKey, "Week number"))
        .field(Field::new(
            "start_date",
            FieldType::LocalDate,
            FieldRole::NotNull,
            "First day of the week",
        ))
        .field(Field::new(
            "end_date",
            FieldType::LocalDate,
            FieldRole::NotNull,
            "Last day of the week",
        ))
        .build()
}
