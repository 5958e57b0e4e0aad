//! Result rows to logical records.

use crate::error::{PersistenceError, Result};
use crate::record::Record;
use crate::schema::{Field, Table};
use crate::types::{FieldType, FieldValue};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::Row;
use sqlx::postgres::PgRow;
use std::sync::Arc;

/// Extension trait for extracting nullable typed columns from rows with
/// consistent error context.
pub(crate) trait RowExt {
    /// Reads column `field_name`, mapping SQL NULL to `None`.
    fn get_nullable<'r, T>(&'r self, field_name: &str, table: &str) -> Result<Option<T>>
    where
        T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>;
}

impl RowExt for PgRow {
    fn get_nullable<'r, T>(&'r self, field_name: &str, table: &str) -> Result<Option<T>>
    where
        T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
    {
        self.try_get::<Option<T>, _>(field_name)
            .map_err(|e| PersistenceError::decode(table, field_name, e.to_string()))
    }
}

/// Reads one field's column as a logical value.
fn read_field(row: &PgRow, field: &Field, table: &str) -> Result<Option<FieldValue>> {
    let name = field.name();
    let value = match field.field_type() {
        FieldType::String => row.get_nullable::<String>(name, table)?.map(FieldValue::String),
        FieldType::Boolean => row.get_nullable::<bool>(name, table)?.map(FieldValue::Boolean),
        FieldType::Byte => match row.get_nullable::<i16>(name, table)? {
            Some(stored) => Some(FieldValue::Byte(i8::try_from(stored).map_err(|_| {
                PersistenceError::decode(
                    table,
                    name,
                    format!("stored value {} does not fit in a BYTE", stored),
                )
            })?)),
            None => None,
        },
        FieldType::Integer => row.get_nullable::<i32>(name, table)?.map(FieldValue::Integer),
        FieldType::Long => row.get_nullable::<i64>(name, table)?.map(FieldValue::Long),
        FieldType::Float => row.get_nullable::<f32>(name, table)?.map(FieldValue::Float),
        FieldType::Double => row.get_nullable::<f64>(name, table)?.map(FieldValue::Double),
        FieldType::Blob => row.get_nullable::<Vec<u8>>(name, table)?.map(FieldValue::Blob),
        FieldType::LocalDate => row
            .get_nullable::<NaiveDate>(name, table)?
            .map(FieldValue::LocalDate),
        FieldType::LocalTime => row
            .get_nullable::<NaiveTime>(name, table)?
            .map(FieldValue::LocalTime),
        FieldType::LocalDateTime => row
            .get_nullable::<NaiveDateTime>(name, table)?
            .map(FieldValue::LocalDateTime),
    };
    Ok(value)
}

/// Builds a record from a row selected with the table's column list.
pub(crate) fn row_to_record(row: &PgRow, table: &Arc<Table>) -> Result<Record> {
    let qualified = table.qualified_name();
    let values = table
        .fields()
        .iter()
        .map(|field| read_field(row, field, &qualified))
        .collect::<Result<Vec<_>>>()?;
    Record::from_backend(Arc::clone(table), values)
}
