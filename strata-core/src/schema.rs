//! Table and field metamodel.
//!
//! Tables are declared once through [`TableBuilder`] and shared as
//! `Arc<Table>` for the life of the process. Nothing here can be mutated
//! after `build()`.

use crate::constraint::FieldConstraint;
use crate::error::{PersistenceError, Result};
use crate::types::{FieldRole, FieldType, FieldValue};
use std::collections::HashMap;
use std::sync::Arc;

/// PostgreSQL truncates identifiers beyond this length.
pub const MAX_IDENTIFIER_LENGTH: usize = 63;

/// Suffixes the non-production contexts append to logical schema names.
pub const RESERVED_SCHEMA_SUFFIXES: [&str; 2] = ["_d", "_t"];

/// Returns true if `name` starts with a lower-case ASCII letter and contains
/// only lower-case letters, digits and underscores.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_lowercase() => {}
        _ => return false,
    }
    name.len() <= MAX_IDENTIFIER_LENGTH
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

fn require_identifier(kind: &str, name: &str) -> Result<()> {
    if is_valid_identifier(name) {
        Ok(())
    } else {
        Err(PersistenceError::configuration(format!(
            "{} name '{}' must match [a-z][a-z0-9_]* and be at most {} characters",
            kind, name, MAX_IDENTIFIER_LENGTH
        )))
    }
}

/// One column of a table.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: String,
    field_type: FieldType,
    role: FieldRole,
    description: String,
    constraints: Vec<FieldConstraint>,
}

impl Field {
    /// Declares a field. The name is validated when the owning table is built.
    pub fn new(
        name: impl Into<String>,
        field_type: FieldType,
        role: FieldRole,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            field_type,
            role,
            description: description.into(),
            constraints: Vec::new(),
        }
    }

    /// Builder method to attach a constraint.
    pub fn with_constraint(mut self, constraint: FieldConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Logical type.
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Key/nullability role.
    pub fn role(&self) -> FieldRole {
        self.role
    }

    /// Documentation text.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Attached constraints, in declaration order.
    pub fn constraints(&self) -> &[FieldConstraint] {
        &self.constraints
    }

    /// Shorthand for `role().is_nullable()`.
    pub fn is_nullable(&self) -> bool {
        self.role.is_nullable()
    }

    /// Checks that `value` has this field's type and satisfies its constraints.
    ///
    /// # Errors
    /// `TypeMismatch`, `Unrepresentable` or `ConstraintViolation`.
    pub fn check_value(&self, value: &FieldValue) -> Result<()> {
        if value.field_type() != self.field_type {
            return Err(PersistenceError::TypeMismatch {
                field: self.name.clone(),
                expected: self.field_type,
                found: value.field_type(),
            });
        }
        if let Some(message) = value.storage_issue() {
            return Err(PersistenceError::Unrepresentable {
                field: self.name.clone(),
                message,
            });
        }
        for constraint in &self.constraints {
            constraint.check(&self.name, value)?;
        }
        Ok(())
    }

    /// Like [`Field::check_value`], also rejecting null for non-nullable roles.
    pub fn check_optional(&self, value: Option<&FieldValue>) -> Result<()> {
        match value {
            Some(value) => self.check_value(value),
            None if self.is_nullable() => Ok(()),
            None => Err(PersistenceError::NullViolation {
                field: self.name.clone(),
            }),
        }
    }

    fn validate_declaration(&self) -> Result<()> {
        require_identifier("field", &self.name)?;
        let mut seen: Vec<&str> = Vec::with_capacity(self.constraints.len());
        for constraint in &self.constraints {
            if constraint.field_type() != self.field_type {
                return Err(PersistenceError::configuration(format!(
                    "constraint '{}' applies to {} but field '{}' is {}",
                    constraint.name(),
                    constraint.field_type(),
                    self.name,
                    self.field_type
                )));
            }
            if seen.contains(&constraint.name()) {
                return Err(PersistenceError::configuration(format!(
                    "field '{}' declares constraint '{}' twice",
                    self.name,
                    constraint.name()
                )));
            }
            seen.push(constraint.name());
        }
        Ok(())
    }
}

/// Immutable table declaration.
#[derive(Debug)]
pub struct Table {
    tablespace: String,
    schema: String,
    name: String,
    description: String,
    examples: Option<String>,
    fields: Vec<Field>,
    index: HashMap<String, usize>,
}

impl Table {
    /// Starts a table declaration.
    ///
    /// # Example
    /// ```rust
    /// use strata_core::{Field, FieldRole, FieldType, Table};
    ///
    /// let table = Table::builder("term", "term_202410", "term_week")
    ///     .description("Weeks of one academic term")
    ///     .field(Field::new("week_nbr", FieldType::Integer, FieldRole::PartitionKey, "Week number"))
    ///     .field(Field::new("start_date", FieldType::LocalDate, FieldRole::NotNull, "First day"))
    ///     .build()
    ///     .unwrap();
    ///
    /// assert_eq!(table.field_count(), 2);
    /// assert_eq!(table.field_by_name("start_date").unwrap().field_type(), FieldType::LocalDate);
    /// ```
    pub fn builder(
        tablespace: impl Into<String>,
        schema: impl Into<String>,
        name: impl Into<String>,
    ) -> TableBuilder {
        TableBuilder {
            tablespace: tablespace.into(),
            schema: schema.into(),
            name: name.into(),
            description: String::new(),
            examples: None,
            fields: Vec::new(),
        }
    }

    /// Logical grouping of related schemas.
    pub fn tablespace(&self) -> &str {
        &self.tablespace
    }

    /// Logical (production) schema name.
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `schema.name`, for messages.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }

    /// Documentation text.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Optional free-form usage examples.
    pub fn examples(&self) -> Option<&str> {
        self.examples.as_deref()
    }

    /// Number of fields.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Field at `index`, if any.
    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    /// Field with exactly this name (case-sensitive), if any.
    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.index.get(name).and_then(|&i| self.fields.get(i))
    }

    /// Position of the named field.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// All fields in declaration order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// True if `other` declares the same logical table with the same
    /// fields in the same order.
    pub fn is_same_table(&self, other: &Table) -> bool {
        std::ptr::eq(self, other)
            || (self.schema == other.schema && self.name == other.name && self.fields == other.fields)
    }

    /// Returns true if `field` is one of this table's fields.
    pub fn contains(&self, field: &Field) -> bool {
        self.field_by_name(field.name()) == Some(field)
    }

    /// Primary key fields: partition keys, then clustering keys, each in
    /// declaration order.
    pub fn key_fields(&self) -> Vec<&Field> {
        let partition = self
            .fields
            .iter()
            .filter(|f| f.role() == FieldRole::PartitionKey);
        let clustering = self
            .fields
            .iter()
            .filter(|f| f.role() == FieldRole::ClusteringKey);
        partition.chain(clustering).collect()
    }
}

/// Builder returned by [`Table::builder`].
#[derive(Debug)]
pub struct TableBuilder {
    tablespace: String,
    schema: String,
    name: String,
    description: String,
    examples: Option<String>,
    fields: Vec<Field>,
}

impl TableBuilder {
    /// Sets the documentation text.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets usage examples.
    pub fn examples(mut self, examples: impl Into<String>) -> Self {
        self.examples = Some(examples.into());
        self
    }

    /// Appends a field.
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Validates the declaration and freezes it.
    ///
    /// # Errors
    /// Returns `Configuration` if any name is not a valid identifier, the
    /// schema name ends in a reserved environment suffix, there are no
    /// fields, two fields share a name, or a constraint does not fit its
    /// field.
    pub fn build(self) -> Result<Arc<Table>> {
        require_identifier("tablespace", &self.tablespace)?;
        require_identifier("schema", &self.schema)?;
        require_identifier("table", &self.name)?;

        if let Some(suffix) = RESERVED_SCHEMA_SUFFIXES
            .iter()
            .find(|suffix| self.schema.ends_with(*suffix))
        {
            return Err(PersistenceError::configuration(format!(
                "schema name '{}' ends with '{}', which is reserved for non-production schemas",
                self.schema, suffix
            )));
        }

        if self.fields.is_empty() {
            return Err(PersistenceError::configuration(format!(
                "table '{}.{}' must declare at least one field",
                self.schema, self.name
            )));
        }

        let mut index = HashMap::with_capacity(self.fields.len());
        for (position, field) in self.fields.iter().enumerate() {
            field.validate_declaration()?;
            if index.insert(field.name().to_string(), position).is_some() {
                return Err(PersistenceError::configuration(format!(
                    "table '{}.{}' declares field '{}' twice",
                    self.schema,
                    self.name,
                    field.name()
                )));
            }
        }

        Ok(Arc::new(Table {
            tablespace: self.tablespace,
            schema: self.schema,
            name: self.name,
            description: self.description,
            examples: self.examples,
            fields: self.fields,
            index,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term_week() -> Arc<Table> {
        Table::builder("term", "term_202410", "term_week")
            .field(Field::new("week_nbr", FieldType::Integer, FieldRole::PartitionKey, ""))
            .field(Field::new("start_date", FieldType::LocalDate, FieldRole::NotNull, ""))
            .field(Field::new("end_date", FieldType::LocalDate, FieldRole::NotNull, ""))
            .build()
            .unwrap()
    }

    #[test]
    fn test_index_and_name_lookup_agree() {
        let table = term_week();
        for i in 0..table.field_count() {
            let by_index = table.field(i).unwrap();
            let by_name = table.field_by_name(by_index.name()).unwrap();
            assert_eq!(by_index.name(), by_name.name());
            assert_eq!(table.field_index(by_index.name()), Some(i));
        }
        assert!(table.field(table.field_count()).is_none());
    }

    #[test]
    fn test_name_lookup_is_case_sensitive() {
        let table = term_week();
        assert!(table.field_by_name("week_nbr").is_some());
        assert!(table.field_by_name("WEEK_NBR").is_none());
        assert!(table.field_by_name("missing").is_none());
    }

    #[test]
    fn test_identifier_rules() {
        assert!(is_valid_identifier("term_202410"));
        assert!(is_valid_identifier("a"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("1abc"));
        assert!(!is_valid_identifier("_abc"));
        assert!(!is_valid_identifier("Abc"));
        assert!(!is_valid_identifier("a-b"));
        assert!(!is_valid_identifier(&"a".repeat(64)));
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let result = Table::builder("main", "main", "dup")
            .field(Field::new("a", FieldType::String, FieldRole::Nullable, ""))
            .field(Field::new("a", FieldType::Integer, FieldRole::Nullable, ""))
            .build();
        assert!(matches!(result, Err(PersistenceError::Configuration { .. })));
    }

    #[test]
    fn test_empty_table_rejected() {
        let result = Table::builder("main", "main", "empty").build();
        assert!(matches!(result, Err(PersistenceError::Configuration { .. })));
    }

    #[test]
    fn test_reserved_schema_suffix_rejected() {
        for schema in ["term_d", "term_t", "main_d", "main_t"] {
            let result = Table::builder("main", schema, "x")
                .field(Field::new("a", FieldType::String, FieldRole::Nullable, ""))
                .build();
            assert!(result.is_err(), "schema {} should be rejected", schema);
        }
    }

    #[test]
    fn test_constraint_must_fit_field_type() {
        let result = Table::builder("main", "main", "x")
            .field(
                Field::new("a", FieldType::String, FieldRole::Nullable, "")
                    .with_constraint(FieldConstraint::integer_range("r", 0, 1).unwrap()),
            )
            .build();
        assert!(result.is_err());

        let result = Table::builder("main", "main", "x")
            .field(
                Field::new("a", FieldType::String, FieldRole::Nullable, "")
                    .with_constraint(FieldConstraint::string_length("len", 0, 4).unwrap())
                    .with_constraint(FieldConstraint::string_length("len", 1, 2).unwrap()),
            )
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_key_fields_partition_then_clustering() {
        let table = Table::builder("main", "main", "keys")
            .field(Field::new("c", FieldType::Integer, FieldRole::ClusteringKey, ""))
            .field(Field::new("v", FieldType::String, FieldRole::Nullable, ""))
            .field(Field::new("p", FieldType::Integer, FieldRole::PartitionKey, ""))
            .build()
            .unwrap();
        let keys: Vec<_> = table.key_fields().into_iter().map(Field::name).collect();
        assert_eq!(keys, vec!["p", "c"]);
    }

    #[test]
    fn test_contains_requires_identical_field() {
        let table = term_week();
        let own = table.field(0).unwrap().clone();
        let lookalike = Field::new("week_nbr", FieldType::Long, FieldRole::PartitionKey, "");
        assert!(table.contains(&own));
        assert!(!table.contains(&lookalike));
    }

    #[test]
    fn test_same_table_requires_same_layout() {
        let table = term_week();
        assert!(table.is_same_table(&term_week()));

        let reordered = Table::builder("term", "term_202410", "term_week")
            .field(Field::new("week_nbr", FieldType::Integer, FieldRole::PartitionKey, ""))
            .field(Field::new("end_date", FieldType::LocalDate, FieldRole::NotNull, ""))
            .field(Field::new("start_date", FieldType::LocalDate, FieldRole::NotNull, ""))
            .build()
            .unwrap();
        assert!(!table.is_same_table(&reordered));

        let retyped = Table::builder("term", "term_202410", "term_week")
            .field(Field::new("week_nbr", FieldType::Long, FieldRole::PartitionKey, ""))
            .field(Field::new("start_date", FieldType::LocalDate, FieldRole::NotNull, ""))
            .field(Field::new("end_date", FieldType::LocalDate, FieldRole::NotNull, ""))
            .build()
            .unwrap();
        assert!(!table.is_same_table(&retyped));
    }

    #[test]
    fn test_inexact_temporal_values_rejected() {
        let table = Table::builder("main", "main", "times")
            .field(Field::new("at", FieldType::LocalTime, FieldRole::Nullable, ""))
            .field(Field::new("day", FieldType::LocalDate, FieldRole::Nullable, ""))
            .build()
            .unwrap();
        let at = table.field(0).unwrap();
        let day = table.field(1).unwrap();

        let micros = chrono::NaiveTime::from_hms_micro_opt(8, 0, 0, 123_456).unwrap();
        let nanos = chrono::NaiveTime::from_hms_nano_opt(8, 0, 0, 123_456_789).unwrap();
        assert!(at.check_value(&micros.into()).is_ok());
        assert!(matches!(
            at.check_value(&nanos.into()),
            Err(PersistenceError::Unrepresentable { ref field, .. }) if field == "at"
        ));

        let far = chrono::NaiveDate::from_ymd_opt(10_000, 1, 1).unwrap();
        assert!(matches!(
            day.check_value(&far.into()),
            Err(PersistenceError::Unrepresentable { .. })
        ));
    }

    #[test]
    fn test_check_optional() {
        let table = term_week();
        let week = table.field(0).unwrap();
        assert!(week.check_optional(Some(&FieldValue::Integer(1))).is_ok());
        assert!(matches!(
            week.check_optional(None),
            Err(PersistenceError::NullViolation { .. })
        ));
        assert!(matches!(
            week.check_optional(Some(&FieldValue::Long(1))),
            Err(PersistenceError::TypeMismatch { .. })
        ));
    }
}
