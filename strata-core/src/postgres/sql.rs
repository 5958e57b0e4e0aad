//! PostgreSQL statement generation.
//!
//! Every statement is a single string with values rendered as literals.
//! Identifiers are always double-quoted. Generated statements are pure
//! functions of their inputs and the context, which keeps them testable
//! without a server.

use std::fmt::Write;

use crate::connection::Context;
use crate::criteria::{Comparison, FieldCriterion, SelectionCriteria};
use crate::record::{Record, UpdatedValues};
use crate::schema::{Field, Table};
use crate::types::FieldValue;

use super::naming::qualified_table_name;
use super::type_mapping::native_type;

/// Double-quotes an identifier, doubling embedded quotes.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Renders an escape string literal (`E'...'`), doubling backslashes and
/// single quotes.
///
/// The `E` form reads the same whatever `standard_conforming_strings` is
/// set to, so a backslash in a value can never end the literal early.
pub fn quote_string(value: &str) -> String {
    format!("E'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
}

fn float_text(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "Infinity".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else {
        value.to_string()
    }
}

fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len().saturating_mul(2));
    for byte in bytes {
        let _ = write!(out, "{:02x}", byte);
    }
    out
}

/// Renders a value as a literal for a column of `field`'s type.
///
/// `None` renders as `NULL`. A value of the wrong type is a programming
/// error upstream; it is logged and rendered as `NULL` so the statement
/// stays well-formed.
pub fn render_literal(field: &Field, value: Option<&FieldValue>) -> String {
    let Some(value) = value else {
        return "NULL".to_string();
    };
    if value.field_type() != field.field_type() {
        tracing::warn!(
            "Value of type {} supplied for {} field '{}'; rendering NULL",
            value.field_type(),
            field.field_type(),
            field.name()
        );
        return "NULL".to_string();
    }

    match value {
        FieldValue::String(v) => quote_string(v),
        FieldValue::Boolean(true) => "TRUE".to_string(),
        FieldValue::Boolean(false) => "FALSE".to_string(),
        FieldValue::Byte(v) => v.to_string(),
        FieldValue::Integer(v) => v.to_string(),
        FieldValue::Long(v) => v.to_string(),
        FieldValue::Float(v) => {
            // f32 Display is the shortest text that reads back as the same f32
            let text = if v.is_finite() {
                v.to_string()
            } else {
                float_text(f64::from(*v))
            };
            format!("'{}'::real", text)
        }
        FieldValue::Double(v) => format!("'{}'::double precision", float_text(*v)),
        FieldValue::Blob(v) => format!("E'\\\\x{}'::bytea", hex(v)),
        FieldValue::LocalDate(v) => format!("DATE '{}'", v.format("%Y-%m-%d")),
        FieldValue::LocalTime(v) => format!("TIME '{}'", v.format("%H:%M:%S%.6f")),
        FieldValue::LocalDateTime(v) => {
            format!("TIMESTAMP '{}'", v.format("%Y-%m-%d %H:%M:%S%.6f"))
        }
    }
}

/// Escapes `%`, `_` and `\` so a prefix matches literally under LIKE.
fn like_prefix(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len().saturating_add(1));
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    quote_string(&pattern)
}

fn literal_list(field: &Field, values: &[FieldValue], lower: bool) -> String {
    values
        .iter()
        .map(|v| {
            let literal = render_literal(field, Some(v));
            if lower {
                format!("LOWER({})", literal)
            } else {
                literal
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Renders one criterion as a boolean SQL expression.
pub fn predicate(criterion: &FieldCriterion) -> String {
    let field = criterion.field();
    let column = quote_identifier(field.name());
    let values = criterion.values();
    let first = || render_literal(field, values.first());

    match criterion.comparison() {
        Comparison::IsNull => format!("{} IS NULL", column),
        Comparison::IsNotNull => format!("{} IS NOT NULL", column),
        Comparison::IsTrue => format!("{} = TRUE", column),
        Comparison::IsFalse => format!("{} = FALSE", column),
        Comparison::In { case_insensitive } => {
            if case_insensitive {
                format!("LOWER({}) IN ({})", column, literal_list(field, values, true))
            } else {
                format!("{} IN ({})", column, literal_list(field, values, false))
            }
        }
        Comparison::NotIn { case_insensitive } => {
            if case_insensitive {
                format!("LOWER({}) NOT IN ({})", column, literal_list(field, values, true))
            } else {
                format!("{} NOT IN ({})", column, literal_list(field, values, false))
            }
        }
        Comparison::StartsWith { case_insensitive } => {
            let operator = if case_insensitive { "ILIKE" } else { "LIKE" };
            prefix_matches(&column, operator, values, " OR ")
        }
        Comparison::NotStartsWith { case_insensitive } => {
            let operator = if case_insensitive { "NOT ILIKE" } else { "NOT LIKE" };
            prefix_matches(&column, operator, values, " AND ")
        }
        Comparison::GreaterThan => format!("{} > {}", column, first()),
        Comparison::GreaterThanOrEqual => format!("{} >= {}", column, first()),
        Comparison::LessThan => format!("{} < {}", column, first()),
        Comparison::LessThanOrEqual => format!("{} <= {}", column, first()),
        Comparison::Between {
            include_lower,
            include_upper,
        } => {
            let lower = first();
            let upper = render_literal(field, values.get(1));
            if include_lower && include_upper {
                format!("{} BETWEEN {} AND {}", column, lower, upper)
            } else {
                let lower_op = if include_lower { ">=" } else { ">" };
                let upper_op = if include_upper { "<=" } else { "<" };
                format!(
                    "({} {} {} AND {} {} {})",
                    column, lower_op, lower, column, upper_op, upper
                )
            }
        }
    }
}

fn prefix_matches(column: &str, operator: &str, values: &[FieldValue], joiner: &str) -> String {
    let terms: Vec<String> = values
        .iter()
        .map(|v| {
            let prefix = v.as_str().unwrap_or_default();
            format!("{} {} {} ESCAPE E'\\\\'", column, operator, like_prefix(prefix))
        })
        .collect();
    if terms.len() == 1 {
        terms.concat()
    } else {
        format!("({})", terms.join(joiner))
    }
}

/// ` WHERE p1 AND p2 ...`, or an empty string when there are no criteria.
pub fn where_clause(criteria: &SelectionCriteria) -> String {
    if criteria.is_empty() {
        return String::new();
    }
    let predicates: Vec<String> = criteria.criteria().iter().map(predicate).collect();
    format!(" WHERE {}", predicates.join(" AND "))
}

fn column_list(table: &Table) -> String {
    table
        .fields()
        .iter()
        .map(|f| quote_identifier(f.name()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `SELECT COUNT(*) FROM ...`
pub fn count_statement(criteria: &SelectionCriteria, context: Context) -> String {
    format!(
        "SELECT COUNT(*) FROM {}{}",
        qualified_table_name(criteria.table(), context),
        where_clause(criteria)
    )
}

/// `SELECT <fields> FROM ...`, ordered by primary key when one is declared.
pub fn select_statement(criteria: &SelectionCriteria, context: Context) -> String {
    let table = criteria.table();
    let mut sql = format!(
        "SELECT {} FROM {}{}",
        column_list(table),
        qualified_table_name(table, context),
        where_clause(criteria)
    );
    let keys = table.key_fields();
    if !keys.is_empty() {
        let order: Vec<String> = keys.iter().map(|f| quote_identifier(f.name())).collect();
        sql.push_str(" ORDER BY ");
        sql.push_str(&order.join(", "));
    }
    sql
}

/// `DELETE FROM ...`
pub fn delete_statement(criteria: &SelectionCriteria, context: Context) -> String {
    format!(
        "DELETE FROM {}{}",
        qualified_table_name(criteria.table(), context),
        where_clause(criteria)
    )
}

/// `UPDATE ... SET ...` using the criteria's table.
pub fn update_statement(
    values: &UpdatedValues,
    criteria: &SelectionCriteria,
    context: Context,
) -> String {
    let assignments: Vec<String> = values
        .changes()
        .map(|(field, value)| {
            format!(
                "{} = {}",
                quote_identifier(field.name()),
                render_literal(field, value)
            )
        })
        .collect();
    format!(
        "UPDATE {} SET {}{}",
        qualified_table_name(criteria.table(), context),
        assignments.join(", "),
        where_clause(criteria)
    )
}

/// Multi-row `INSERT` with columns in field order and one literal per field.
///
/// Values are looked up by `table`'s field names, so each literal lines up
/// with its column. Returns `None` when there are no records.
pub fn insert_statement(table: &Table, records: &[Record], context: Context) -> Option<String> {
    if records.is_empty() {
        return None;
    }
    let rows: Vec<String> = records
        .iter()
        .map(|record| {
            let literals: Vec<String> = table
                .fields()
                .iter()
                .map(|field| render_literal(field, record.value_by_name(field.name())))
                .collect();
            format!("({})", literals.join(", "))
        })
        .collect();
    Some(format!(
        "INSERT INTO {} ({}) VALUES {}",
        qualified_table_name(table, context),
        column_list(table),
        rows.join(", ")
    ))
}

fn column_definition(field: &Field) -> String {
    let mut definition = format!(
        "{} {}",
        quote_identifier(field.name()),
        native_type(field.field_type())
    );
    if !field.is_nullable() {
        definition.push_str(" NOT NULL");
    }
    definition
}

fn key_list(table: &Table) -> String {
    table
        .key_fields()
        .iter()
        .map(|f| quote_identifier(f.name()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `CREATE SCHEMA IF NOT EXISTS ...`
pub fn create_schema_statement(physical_schema: &str) -> String {
    format!("CREATE SCHEMA IF NOT EXISTS {}", quote_identifier(physical_schema))
}

/// `CREATE TABLE` with every field and the primary key, if any.
pub fn create_table_statement(table: &Table, context: Context) -> String {
    let mut parts: Vec<String> = table.fields().iter().map(column_definition).collect();
    if !table.key_fields().is_empty() {
        parts.push(format!("PRIMARY KEY ({})", key_list(table)));
    }
    format!(
        "CREATE TABLE {} ({})",
        qualified_table_name(table, context),
        parts.join(", ")
    )
}

/// `ALTER TABLE ... ADD COLUMN ...`
pub fn add_column_statement(table: &Table, field: &Field, context: Context) -> String {
    format!(
        "ALTER TABLE {} ADD COLUMN {}",
        qualified_table_name(table, context),
        column_definition(field)
    )
}

/// `ALTER TABLE ... ALTER COLUMN ... TYPE ... USING ...`
pub fn alter_column_type_statement(table: &Table, field: &Field, context: Context) -> String {
    let column = quote_identifier(field.name());
    let native = native_type(field.field_type());
    format!(
        "ALTER TABLE {} ALTER COLUMN {} TYPE {} USING {}::{}",
        qualified_table_name(table, context),
        column,
        native,
        column,
        native
    )
}

/// `ALTER TABLE ... ALTER COLUMN ... SET NOT NULL` or `DROP NOT NULL`.
pub fn alter_nullability_statement(table: &Table, field: &Field, context: Context) -> String {
    let change = if field.is_nullable() {
        "DROP NOT NULL"
    } else {
        "SET NOT NULL"
    };
    format!(
        "ALTER TABLE {} ALTER COLUMN {} {}",
        qualified_table_name(table, context),
        quote_identifier(field.name()),
        change
    )
}

/// `ALTER TABLE ... ADD PRIMARY KEY (...)`
pub fn add_primary_key_statement(table: &Table, context: Context) -> String {
    format!(
        "ALTER TABLE {} ADD PRIMARY KEY ({})",
        qualified_table_name(table, context),
        key_list(table)
    )
}
