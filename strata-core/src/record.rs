//! Row values aligned to a table's field order.

use crate::error::{PersistenceError, Result};
use crate::schema::{Field, Table};
use crate::types::FieldValue;
use std::sync::Arc;

/// One row of a table.
///
/// Values are positionally aligned to the table's fields. `None` is null.
#[derive(Debug, Clone)]
pub struct Record {
    table: Arc<Table>,
    values: Vec<Option<FieldValue>>,
}

impl Record {
    /// Builds a record from values in field order.
    ///
    /// Fewer values than fields is allowed; the remaining fields are null.
    ///
    /// # Errors
    /// - `Configuration` when there are more values than fields
    /// - `TypeMismatch` when a value is not of its field's type
    /// - `NullViolation` when a non-nullable field is null
    /// - `ConstraintViolation` when a value fails a field constraint
    pub fn new(table: Arc<Table>, values: Vec<Option<FieldValue>>) -> Result<Self> {
        let values = Self::aligned(&table, values)?;
        for (field, value) in table.fields().iter().zip(&values) {
            field.check_optional(value.as_ref())?;
        }
        Ok(Self { table, values })
    }

    /// Builds a record read back from a backend.
    ///
    /// Only arity and types are checked; nullability and constraints are
    /// enforced by the backend's own schema.
    pub(crate) fn from_backend(table: Arc<Table>, values: Vec<Option<FieldValue>>) -> Result<Self> {
        let values = Self::aligned(&table, values)?;
        for (field, value) in table.fields().iter().zip(&values) {
            if let Some(value) = value
                && value.field_type() != field.field_type()
            {
                return Err(PersistenceError::TypeMismatch {
                    field: field.name().to_string(),
                    expected: field.field_type(),
                    found: value.field_type(),
                });
            }
        }
        Ok(Self { table, values })
    }

    fn aligned(table: &Table, mut values: Vec<Option<FieldValue>>) -> Result<Vec<Option<FieldValue>>> {
        if values.len() > table.field_count() {
            return Err(PersistenceError::configuration(format!(
                "record for '{}' has {} values but the table has {} fields",
                table.qualified_name(),
                values.len(),
                table.field_count()
            )));
        }
        values.resize(table.field_count(), None);
        Ok(values)
    }

    /// The table this record belongs to.
    pub fn table(&self) -> &Arc<Table> {
        &self.table
    }

    /// All values in field order.
    pub fn values(&self) -> &[Option<FieldValue>] {
        &self.values
    }

    /// Value at `index`; `None` for null or out of range.
    pub fn value(&self, index: usize) -> Option<&FieldValue> {
        self.values.get(index).and_then(Option::as_ref)
    }

    /// Value of the named field; `None` for null or unknown names.
    pub fn value_by_name(&self, name: &str) -> Option<&FieldValue> {
        self.table.field_index(name).and_then(|i| self.value(i))
    }

    /// Pairs each field with its value.
    pub fn iter(&self) -> impl Iterator<Item = (&Field, Option<&FieldValue>)> {
        self.table
            .fields()
            .iter()
            .zip(self.values.iter().map(Option::as_ref))
    }

    /// Consumes the record, returning its values.
    pub fn into_values(self) -> Vec<Option<FieldValue>> {
        self.values
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.table.is_same_table(&other.table) && self.values == other.values
    }
}

/// What an update does to one field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    /// Leave the column as it is
    Keep,
    /// Set the column to NULL
    SetNull,
    /// Set the column to a value
    Set(FieldValue),
}

/// New values for an update, aligned to a table's field order.
#[derive(Debug, Clone)]
pub struct UpdatedValues {
    table: Arc<Table>,
    updates: Vec<FieldUpdate>,
}

impl UpdatedValues {
    /// Starts a set of updates against `table`.
    pub fn builder(table: Arc<Table>) -> UpdatedValuesBuilder {
        UpdatedValuesBuilder {
            table,
            assignments: Vec::new(),
        }
    }

    /// The table being updated.
    pub fn table(&self) -> &Arc<Table> {
        &self.table
    }

    /// Per-field update in field order.
    pub fn updates(&self) -> &[FieldUpdate] {
        &self.updates
    }

    /// Fields that change, with their new value (`None` meaning NULL).
    pub fn changes(&self) -> impl Iterator<Item = (&Field, Option<&FieldValue>)> {
        self.table
            .fields()
            .iter()
            .zip(&self.updates)
            .filter_map(|(field, update)| match update {
                FieldUpdate::Keep => None,
                FieldUpdate::SetNull => Some((field, None)),
                FieldUpdate::Set(value) => Some((field, Some(value))),
            })
    }
}

/// Builder returned by [`UpdatedValues::builder`].
#[derive(Debug)]
pub struct UpdatedValuesBuilder {
    table: Arc<Table>,
    assignments: Vec<(String, Option<FieldValue>)>,
}

impl UpdatedValuesBuilder {
    /// Sets the named field to `value`.
    pub fn set(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.assignments.push((field.into(), Some(value.into())));
        self
    }

    /// Sets the named field to NULL.
    pub fn set_null(mut self, field: impl Into<String>) -> Self {
        self.assignments.push((field.into(), None));
        self
    }

    /// Validates every assignment.
    ///
    /// # Errors
    /// - `Binding` for a field name the table does not have
    /// - `Configuration` when nothing changes or a field is assigned twice
    /// - `NullViolation`, `TypeMismatch`, `ConstraintViolation` per value
    pub fn build(self) -> Result<UpdatedValues> {
        if self.assignments.is_empty() {
            return Err(PersistenceError::configuration(format!(
                "update of '{}' must change at least one field",
                self.table.qualified_name()
            )));
        }

        let mut updates = vec![FieldUpdate::Keep; self.table.field_count()];
        for (name, value) in self.assignments {
            let (index, field) = self
                .table
                .field_index(&name)
                .and_then(|i| self.table.field(i).map(|f| (i, f)))
                .ok_or_else(|| PersistenceError::binding(self.table.qualified_name(), &name))?;
            field.check_optional(value.as_ref())?;

            let slot = &mut updates[index];
            if *slot != FieldUpdate::Keep {
                return Err(PersistenceError::configuration(format!(
                    "field '{}' is assigned more than once",
                    name
                )));
            }
            *slot = value.map_or(FieldUpdate::SetNull, FieldUpdate::Set);
        }

        Ok(UpdatedValues {
            table: self.table,
            updates,
        })
    }
}
