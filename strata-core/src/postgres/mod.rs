//! PostgreSQL implementation.
//!
//! # Module Structure
//! - `naming`: Physical schema derivation per context
//! - `sql`: Statement generation and literal rendering
//! - `type_mapping`: Logical to PostgreSQL column types and back
//! - `marshal`: Result rows to records
//! - `validate`: Live structure checks and repairs
//!
//! # Failure Policy
//! - Every statement runs under the connection's statement deadline
//! - A failed statement is logged with its text and returned as
//!   `PersistenceError::Statement`; results are never silently empty
//! - `insert` sends one multi-row statement: all records are inserted or
//!   none are. `update` and `delete` are single statements and equally atomic

mod marshal;
mod naming;
pub mod sql;
mod type_mapping;
mod validate;


use crate::connection::{Context, GeneralConnection};
use crate::criteria::SelectionCriteria;
use crate::error::{PersistenceError, Result};
use crate::implementation::{Implementation, TableValidationAction};
use crate::record::{Record, UpdatedValues};
use crate::schema::Table;
use crate::validation::TableValidationStatus;
use async_trait::async_trait;
use sqlx::PgConnection;
use std::future::Future;
use std::time::Duration;

pub use naming::{
    DEV_SUFFIX, TERM_DEV_SCHEMA, TERM_PREFIX, TERM_TEST_SCHEMA, TEST_SUFFIX,
    physical_schema_name, qualified_table_name,
};
pub use type_mapping::{is_compatible, logical_type, native_type};

const IMPLEMENTATION_NAME: &str = "PostgreSQL";

/// Where a statement runs and how long it may take.
#[derive(Debug, Clone)]
pub(crate) struct StatementScope {
    table: String,
    context: Context,
    timeout: Option<Duration>,
}

impl StatementScope {
    fn new(conn: &dyn GeneralConnection, table: &Table) -> Self {
        Self {
            table: table.qualified_name(),
            context: conn.context(),
            timeout: conn.statement_timeout(),
        }
    }

    pub(crate) fn context(&self) -> Context {
        self.context
    }

    /// Awaits `operation` under the deadline, converting driver errors.
    pub(crate) async fn run<T, F>(&self, statement: &str, operation: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, sqlx::Error>>,
    {
        tracing::debug!("[{}] {}", self.context, statement);

        let outcome = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, operation).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    tracing::warn!(
                        "Statement on {} ({}) timed out after {:?}: {}",
                        self.table,
                        self.context,
                        limit,
                        statement
                    );
                    return Err(PersistenceError::Timeout {
                        table: self.table.clone(),
                        context: self.context,
                        statement: statement.to_string(),
                        timeout: limit,
                    });
                }
            },
            None => operation.await,
        };

        outcome.map_err(|e| {
            tracing::warn!(
                "Statement on {} ({}) failed: {}: {}",
                self.table,
                self.context,
                statement,
                e
            );
            PersistenceError::statement_failed(self.table.clone(), self.context, statement, e)
        })
    }
}

/// Resolves the PostgreSQL handle behind `conn`.
fn postgres_handle(conn: &mut dyn GeneralConnection) -> Result<&mut PgConnection> {
    let product = conn.database_product();
    conn.as_postgres().ok_or_else(|| {
        PersistenceError::unsupported_connection(IMPLEMENTATION_NAME, product.to_string())
    })
}

fn row_count(count: i64, scope: &StatementScope) -> Result<u64> {
    u64::try_from(count).map_err(|_| {
        PersistenceError::decode(scope.table.clone(), "count", format!("negative count {}", count))
    })
}

/// SQL-generating implementation for PostgreSQL.
///
/// # Example
/// ```rust,no_run
/// use strata_core::{
///     Context, Implementation, PgGeneralConnection, PostgresImplementation, SelectionCriteria,
/// };
/// # use strata_core::{Field, FieldRole, FieldType, Table};
///
/// # async fn run() -> strata_core::Result<()> {
/// # let table = Table::builder("main", "main", "school")
/// #     .field(Field::new("ceeb_code", FieldType::Integer, FieldRole::PartitionKey, ""))
/// #     .build()?;
/// let mut conn = PgGeneralConnection::connect("postgres://app@localhost/registrar", Context::Testing).await?;
/// let rows = PostgresImplementation::new()
///     .count(&mut conn, &SelectionCriteria::all(table))
///     .await?;
/// conn.close().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresImplementation;

impl PostgresImplementation {
    /// Creates the implementation. It holds no state.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Implementation for PostgresImplementation {
    fn name(&self) -> &'static str {
        IMPLEMENTATION_NAME
    }

    fn supports(&self, conn: &mut dyn GeneralConnection) -> bool {
        conn.as_postgres().is_some()
    }

    async fn validate_table(
        &self,
        conn: &mut dyn GeneralConnection,
        table: &Table,
        action: TableValidationAction,
    ) -> Result<TableValidationStatus> {
        let scope = StatementScope::new(conn, table);
        let pg = postgres_handle(conn)?;
        validate::validate_table(pg, &scope, table, action).await
    }

    async fn count(
        &self,
        conn: &mut dyn GeneralConnection,
        criteria: &SelectionCriteria,
    ) -> Result<u64> {
        let scope = StatementScope::new(conn, criteria.table());
        let statement = sql::count_statement(criteria, scope.context);
        let pg = postgres_handle(conn)?;

        let count: i64 = scope
            .run(
                &statement,
                sqlx::query_scalar::<_, i64>(&statement)
                    .persistent(false)
                    .fetch_one(&mut *pg),
            )
            .await?;
        row_count(count, &scope)
    }

    async fn query(
        &self,
        conn: &mut dyn GeneralConnection,
        criteria: &SelectionCriteria,
    ) -> Result<Vec<Record>> {
        let scope = StatementScope::new(conn, criteria.table());
        let statement = sql::select_statement(criteria, scope.context);
        let pg = postgres_handle(conn)?;

        let rows = scope
            .run(
                &statement,
                sqlx::query(&statement).persistent(false).fetch_all(&mut *pg),
            )
            .await?;

        let records = rows
            .iter()
            .map(|row| marshal::row_to_record(row, criteria.table()))
            .collect::<Result<Vec<_>>>()?;
        tracing::debug!("Query on {} returned {} rows", scope.table, records.len());
        Ok(records)
    }

    async fn delete(
        &self,
        conn: &mut dyn GeneralConnection,
        criteria: &SelectionCriteria,
    ) -> Result<u64> {
        let scope = StatementScope::new(conn, criteria.table());
        let statement = sql::delete_statement(criteria, scope.context);
        let pg = postgres_handle(conn)?;

        let done = scope
            .run(
                &statement,
                sqlx::query(&statement).persistent(false).execute(&mut *pg),
            )
            .await?;
        Ok(done.rows_affected())
    }

    async fn update(
        &self,
        conn: &mut dyn GeneralConnection,
        new_values: &UpdatedValues,
        criteria: &SelectionCriteria,
    ) -> Result<u64> {
        if !new_values.table().is_same_table(criteria.table()) {
            return Err(PersistenceError::configuration(format!(
                "update values target '{}' but criteria target '{}'",
                new_values.table().qualified_name(),
                criteria.table().qualified_name()
            )));
        }

        let scope = StatementScope::new(conn, criteria.table());
        let statement = sql::update_statement(new_values, criteria, scope.context);
        let pg = postgres_handle(conn)?;

        let done = scope
            .run(
                &statement,
                sqlx::query(&statement).persistent(false).execute(&mut *pg),
            )
            .await?;
        Ok(done.rows_affected())
    }

    async fn insert(
        &self,
        conn: &mut dyn GeneralConnection,
        table: &Table,
        records: &[Record],
    ) -> Result<u64> {
        if let Some(foreign) = records.iter().find(|r| !r.table().is_same_table(table)) {
            return Err(PersistenceError::configuration(format!(
                "record for '{}' cannot be inserted into '{}'",
                foreign.table().qualified_name(),
                table.qualified_name()
            )));
        }

        let scope = StatementScope::new(conn, table);
        let pg = postgres_handle(conn)?;
        let Some(statement) = sql::insert_statement(table, records, scope.context) else {
            return Ok(0);
        };

        let done = scope
            .run(
                &statement,
                sqlx::query(&statement).persistent(false).execute(&mut *pg),
            )
            .await?;
        Ok(done.rows_affected())
    }
}
