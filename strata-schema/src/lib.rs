//! Application table declarations for Strata.
//!
//! Tables are declared once and shared as `Arc<Table>`. The `main`
//! tablespace holds institution-wide reference data; the `term` tablespace
//! holds one schema per academic term.
//!
//! # Module Structure
//! - `main_tables`: Reference tables in the `main` schema
//! - `term_tables`: Per-term tables in `term_<id>` schemas
//! - `queries`: Selection criteria the application uses repeatedly

pub mod main_tables;
pub mod queries;
pub mod term_tables;

use strata_core::{Result, TableRegistry};

pub use main_tables::{hold_type, parameter, school, term, zip_code};
pub use term_tables::term_week;

/// Builds the application registry: every `main` table, plus the term
/// tables of each term in `term_ids`.
///
/// # Errors
/// `Configuration` for a term ID outside `100000..=999999` or a term listed
/// twice.
///
/// # Example
/// ```rust
/// let registry = strata_schema::build_registry(&[202410, 202460]).unwrap();
/// assert!(registry.get("main", "school").is_some());
/// assert!(registry.get("term_202460", "term_week").is_some());
/// ```
pub fn build_registry(term_ids: &[i32]) -> Result<TableRegistry> {
    let mut registry = TableRegistry::new();
    for table in [term()?, hold_type()?, zip_code()?, school()?, parameter()?] {
        registry.register(table)?;
    }
    for &term_id in term_ids {
        registry.register(term_tables::declare_term_week(term_id)?)?;
    }

    tracing::info!(
        "Declared {} tables across {} terms",
        registry.len(),
        term_ids.len()
    );
    Ok(registry)
}
