//! Backend implementation contract.
//!
//! An [`Implementation`] executes selections, updates and inserts against
//! one kind of backend. The connection passed to each call decides which
//! environment is addressed. Callers hold implementations as
//! `Arc<dyn Implementation>` and never branch on the concrete backend.

use crate::Result;
use crate::connection::GeneralConnection;
use crate::criteria::SelectionCriteria;
use crate::record::{Record, UpdatedValues};
use crate::schema::Table;
use crate::validation::TableValidationStatus;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// What `validate_table` may do about discrepancies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableValidationAction {
    /// Report only
    CheckOnly,
    /// Create a missing schema, table or columns
    BuildIfMissing,
    /// Also alter column types, nullability and primary keys
    BuildOrRepairIfInvalid,
}

impl TableValidationAction {
    /// True if missing structure may be created.
    pub fn builds(self) -> bool {
        !matches!(self, Self::CheckOnly)
    }

    /// True if existing structure may be altered.
    pub fn repairs(self) -> bool {
        matches!(self, Self::BuildOrRepairIfInvalid)
    }
}

/// Operations every backend provides.
///
/// Every failure is reported as a [`crate::PersistenceError`]; driver errors
/// never cross this boundary. Each method documents how rows are affected
/// when a call fails part way.
#[async_trait]
pub trait Implementation: Send + Sync {
    /// Short backend name used in errors and logs.
    fn name(&self) -> &'static str;

    /// Capability check: can this implementation drive `conn`?
    fn supports(&self, conn: &mut dyn GeneralConnection) -> bool;

    /// Compares the live table with `table` and acts per `action`.
    async fn validate_table(
        &self,
        conn: &mut dyn GeneralConnection,
        table: &Table,
        action: TableValidationAction,
    ) -> Result<TableValidationStatus>;

    /// Number of rows matching `criteria`.
    async fn count(
        &self,
        conn: &mut dyn GeneralConnection,
        criteria: &SelectionCriteria,
    ) -> Result<u64>;

    /// Rows matching `criteria`.
    async fn query(
        &self,
        conn: &mut dyn GeneralConnection,
        criteria: &SelectionCriteria,
    ) -> Result<Vec<Record>>;

    /// Removes rows matching `criteria`; returns how many.
    async fn delete(
        &self,
        conn: &mut dyn GeneralConnection,
        criteria: &SelectionCriteria,
    ) -> Result<u64>;

    /// Applies `new_values` to rows matching `criteria`; returns how many.
    ///
    /// `new_values` and `criteria` must target the same table.
    async fn update(
        &self,
        conn: &mut dyn GeneralConnection,
        new_values: &UpdatedValues,
        criteria: &SelectionCriteria,
    ) -> Result<u64>;

    /// Inserts `records` into `table`; returns how many rows were added.
    async fn insert(
        &self,
        conn: &mut dyn GeneralConnection,
        table: &Table,
        records: &[Record],
    ) -> Result<u64>;
}
