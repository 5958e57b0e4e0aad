//! Live structure validation and repair.

use super::StatementScope;
use super::naming::physical_schema_name;
use super::sql;
use super::type_mapping::{is_compatible, native_type};
use crate::Result;
use crate::implementation::TableValidationAction;
use crate::schema::{Field, Table};
use crate::validation::{TableValidationStatus, ValidationReport};
use sqlx::PgConnection;
use std::collections::HashMap;

const SCHEMA_EXISTS: &str =
    "SELECT EXISTS (SELECT 1 FROM pg_catalog.pg_namespace WHERE nspname = $1)";

const TABLE_EXISTS: &str = "SELECT EXISTS (SELECT 1 FROM information_schema.tables \
     WHERE table_schema = $1 AND table_name = $2)";

const COLUMNS: &str = "SELECT column_name::text, data_type::text, is_nullable::text \
     FROM information_schema.columns \
     WHERE table_schema = $1 AND table_name = $2 \
     ORDER BY ordinal_position";

const PRIMARY_KEY: &str = "SELECT kcu.column_name::text \
     FROM information_schema.table_constraints tc \
     JOIN information_schema.key_column_usage kcu \
       ON tc.constraint_name = kcu.constraint_name \
      AND tc.table_schema = kcu.table_schema \
      AND tc.table_name = kcu.table_name \
     WHERE tc.constraint_type = 'PRIMARY KEY' \
       AND tc.table_schema = $1 AND tc.table_name = $2 \
     ORDER BY kcu.ordinal_position";

/// A column as reported by `information_schema.columns`.
#[derive(Debug)]
struct LiveColumn {
    data_type: String,
    nullable: bool,
}

/// Executes a corrective statement and records it.
async fn apply(
    pg: &mut PgConnection,
    scope: &StatementScope,
    report: &mut ValidationReport,
    statement: String,
) -> Result<()> {
    scope
        .run(
            &statement,
            sqlx::query(&statement).persistent(false).execute(&mut *pg),
        )
        .await?;
    report.action(statement);
    Ok(())
}

pub(super) async fn validate_table(
    pg: &mut PgConnection,
    scope: &StatementScope,
    table: &Table,
    action: TableValidationAction,
) -> Result<TableValidationStatus> {
    let context = scope.context();
    let schema = physical_schema_name(table.schema(), context);
    let mut report = ValidationReport::new(format!("{}.{}", schema, table.name()), context);

    let schema_exists: bool = scope
        .run(
            SCHEMA_EXISTS,
            sqlx::query_scalar(SCHEMA_EXISTS)
                .bind(&schema)
                .fetch_one(&mut *pg),
        )
        .await?;

    if !schema_exists {
        if action.builds() {
            apply(pg, scope, &mut report, sql::create_schema_statement(&schema)).await?;
        } else {
            report.error(format!("schema '{}' does not exist", schema));
        }
    }

    let table_exists: bool = schema_exists
        && scope
            .run(
                TABLE_EXISTS,
                sqlx::query_scalar(TABLE_EXISTS)
                    .bind(&schema)
                    .bind(table.name())
                    .fetch_one(&mut *pg),
            )
            .await?;

    if !table_exists {
        if action.builds() {
            apply(pg, scope, &mut report, sql::create_table_statement(table, context)).await?;
        } else {
            report.error(format!("table '{}.{}' does not exist", schema, table.name()));
        }
        return Ok(report.finish());
    }
    report.table_present();

    let rows: Vec<(String, String, String)> = scope
        .run(
            COLUMNS,
            sqlx::query_as(COLUMNS)
                .bind(&schema)
                .bind(table.name())
                .fetch_all(&mut *pg),
        )
        .await?;
    let live: HashMap<String, LiveColumn> = rows
        .into_iter()
        .map(|(name, data_type, is_nullable)| {
            (
                name,
                LiveColumn {
                    data_type,
                    nullable: is_nullable.eq_ignore_ascii_case("YES"),
                },
            )
        })
        .collect();

    for field in table.fields() {
        let Some(column) = live.get(field.name()) else {
            if action.builds() {
                apply(pg, scope, &mut report, sql::add_column_statement(table, field, context))
                    .await?;
            } else {
                report.error(format!("column '{}' is missing", field.name()));
            }
            continue;
        };

        if !is_compatible(field.field_type(), &column.data_type) {
            if action.repairs() {
                apply(
                    pg,
                    scope,
                    &mut report,
                    sql::alter_column_type_statement(table, field, context),
                )
                .await?;
            } else {
                report.error(format!(
                    "column '{}' has type '{}', expected '{}' for {}",
                    field.name(),
                    column.data_type,
                    native_type(field.field_type()),
                    field.field_type()
                ));
            }
        }

        if column.nullable != field.is_nullable() {
            if action.repairs() {
                apply(
                    pg,
                    scope,
                    &mut report,
                    sql::alter_nullability_statement(table, field, context),
                )
                .await?;
            } else if field.is_nullable() {
                report.error(format!(
                    "column '{}' is NOT NULL but is declared {}",
                    field.name(),
                    field.role()
                ));
            } else {
                report.error(format!(
                    "column '{}' allows NULL but is declared {}",
                    field.name(),
                    field.role()
                ));
            }
        }
    }

    for name in live.keys().filter(|name| table.field_by_name(name).is_none()) {
        tracing::debug!("Column '{}' of {}.{} is not declared", name, schema, table.name());
    }

    let live_key: Vec<String> = scope
        .run(
            PRIMARY_KEY,
            sqlx::query_scalar(PRIMARY_KEY)
                .bind(&schema)
                .bind(table.name())
                .fetch_all(&mut *pg),
        )
        .await?;
    let declared_key: Vec<&str> = table.key_fields().into_iter().map(Field::name).collect();

    if live_key != declared_key {
        if live_key.is_empty() && action.repairs() {
            apply(pg, scope, &mut report, sql::add_primary_key_statement(table, context)).await?;
        } else {
            report.error(format!(
                "primary key is ({}), expected ({})",
                live_key.join(", "),
                declared_key.join(", ")
            ));
        }
    }

    Ok(report.finish())
}
