//! Reference tables in the `main` schema.
//!
//! Each table is declared on first use and every later call returns the
//! same `Arc`.

use std::sync::{Arc, LazyLock};
use strata_core::{Field, FieldConstraint, FieldRole, FieldType, PersistenceError, Result, Table};

/// Tablespace and schema of every table in this module.
pub const MAIN: &str = "main";

type Declared = LazyLock<std::result::Result<Arc<Table>, String>>;

static TERM: Declared = LazyLock::new(|| declare_term().map_err(|e| e.to_string()));
static HOLD_TYPE: Declared = LazyLock::new(|| declare_hold_type().map_err(|e| e.to_string()));
static ZIP_CODE: Declared = LazyLock::new(|| declare_zip_code().map_err(|e| e.to_string()));
static SCHOOL: Declared = LazyLock::new(|| declare_school().map_err(|e| e.to_string()));
static PARAMETER: Declared = LazyLock::new(|| declare_parameter().map_err(|e| e.to_string()));

fn shared(declared: &Declared) -> Result<Arc<Table>> {
    match &**declared {
        Ok(table) => Ok(Arc::clone(table)),
        Err(message) => Err(PersistenceError::configuration(message.clone())),
    }
}

/// Academic terms, keyed by six-digit term ID (`YYYYNN`, NN being 30 for
/// Spring, 60 for Summer and 90 for Fall).
pub fn term() -> Result<Arc<Table>> {
    shared(&TERM)
}

fn declare_term() -> Result<Arc<Table>> {
    Table::builder(MAIN, MAIN, "term")
        .description("One row per academic term. Term date ranges do not overlap.")
        .field(
            Field::new(
                "term",
                FieldType::Integer,
                FieldRole::PartitionKey,
                "Term ID in the form YYYYNN",
            )
            .with_constraint(FieldConstraint::integer_range("term_id_range", 100_000, 999_999)?),
        )
        .field(Field::new(
            "start_date",
            FieldType::LocalDate,
            FieldRole::NotNull,
            "First day of the term (not the first day of classes)",
        ))
        .field(Field::new(
            "end_date",
            FieldType::LocalDate,
            FieldRole::NotNull,
            "Last day of the term (not the last day of classes)",
        ))
        .field(
            Field::new(
                "academic_year",
                FieldType::Integer,
                FieldRole::NotNull,
                "Academic year, such as 2324 for 2023-2024",
            )
            .with_constraint(FieldConstraint::integer_range("academic_year_range", 1000, 9999)?),
        )
        .field(Field::new(
            "active_index",
            FieldType::Integer,
            FieldRole::NotNull,
            "0 for the active term, +1 for the next, -1 for the prior, and so on",
        ))
        .field(Field::new(
            "drop_deadline",
            FieldType::LocalDate,
            FieldRole::NotNull,
            "Last day to drop courses",
        ))
        .field(Field::new(
            "withdraw_deadline",
            FieldType::LocalDate,
            FieldRole::NotNull,
            "Last day to withdraw from courses",
        ))
        .build()
}

/// Kinds of holds that can be placed on a student account.
pub fn hold_type() -> Result<Arc<Table>> {
    shared(&HOLD_TYPE)
}

fn declare_hold_type() -> Result<Arc<Table>> {
    Table::builder(MAIN, MAIN, "hold_type")
        .description("Each row defines one type of hold and who may manage it.")
        .examples("hold_id '06', severity 'F', hold_category 'DISCIPLINE'")
        .field(
            Field::new("hold_id", FieldType::String, FieldRole::PartitionKey, "Two-character hold ID")
                .with_constraint(FieldConstraint::string_length("hold_id_length", 2, 2)?),
        )
        .field(
            Field::new(
                "severity",
                FieldType::String,
                FieldRole::NotNull,
                "F for fatal holds that block work, N for non-fatal",
            )
            .with_constraint(FieldConstraint::string_length("severity_length", 1, 1)?)
            .with_constraint(FieldConstraint::string_enumerated("severity_value", ["F", "N"])?),
        )
        .field(
            Field::new("hold_category", FieldType::String, FieldRole::NotNull, "Hold category")
                .with_constraint(FieldConstraint::string_length("hold_category_length", 1, 32)?),
        )
        .field(Field::new(
            "add_perm_lvl",
            FieldType::Integer,
            FieldRole::NotNull,
            "Minimum permission level to add a hold of this type",
        ))
        .field(Field::new(
            "remove_perm_lvl",
            FieldType::Integer,
            FieldRole::NotNull,
            "Minimum permission level to remove a hold of this type",
        ))
        .field(Field::new(
            "suspend_perm_lvl",
            FieldType::Integer,
            FieldRole::NotNull,
            "Minimum permission level to suspend a hold of this type",
        ))
        .field(Field::new(
            "times_to_display",
            FieldType::Integer,
            FieldRole::Nullable,
            "Displays before the hold is removed automatically; null for never",
        ))
        .build()
}

/// Postal codes with their city and state.
pub fn zip_code() -> Result<Arc<Table>> {
    shared(&ZIP_CODE)
}

fn declare_zip_code() -> Result<Arc<Table>> {
    Table::builder(MAIN, MAIN, "zip_code")
        .description("City and state for each zip code.")
        .field(
            Field::new("zip_code", FieldType::String, FieldRole::PartitionKey, "5-digit or 5+4 zip code")
                .with_constraint(FieldConstraint::string_length("zip_code_length", 5, 10)?),
        )
        .field(
            Field::new("city", FieldType::String, FieldRole::NotNull, "City name")
                .with_constraint(FieldConstraint::string_length("city_length", 1, 32)?),
        )
        .field(
            Field::new("state", FieldType::String, FieldRole::NotNull, "Two-letter state code")
                .with_constraint(FieldConstraint::string_length("state_length", 2, 2)?),
        )
        .build()
}

/// K-12 schools students graduated from, keyed by CEEB code.
pub fn school() -> Result<Arc<Table>> {
    shared(&SCHOOL)
}

fn declare_school() -> Result<Arc<Table>> {
    Table::builder(MAIN, MAIN, "school")
        .description("Each row is one K-12 school, used for readiness reports to schools.")
        .field(
            Field::new("ceeb_code", FieldType::Integer, FieldRole::PartitionKey, "CEEB code")
                .with_constraint(FieldConstraint::integer_range("ceeb_code_range", 0, 999_999)?),
        )
        .field(Field::new("name", FieldType::String, FieldRole::NotNull, "School name"))
        .field(
            Field::new("mailing_addr", FieldType::String, FieldRole::NotNull, "Mailing address")
                .with_constraint(FieldConstraint::string_length("mailing_addr_length", 1, 32)?),
        )
        .field(
            Field::new("city", FieldType::String, FieldRole::NotNull, "Mailing city")
                .with_constraint(FieldConstraint::string_length("city_length", 1, 32)?),
        )
        .field(
            Field::new("state", FieldType::String, FieldRole::NotNull, "Two-letter state code")
                .with_constraint(FieldConstraint::string_length("state_length", 2, 2)?),
        )
        .field(
            Field::new("zip_code", FieldType::String, FieldRole::NotNull, "5-digit or 5+4 zip code")
                .with_constraint(FieldConstraint::string_length("zip_code_length", 5, 10)?),
        )
        .build()
}

/// Named parameter sets with a few typed slots each.
pub fn parameter() -> Result<Arc<Table>> {
    shared(&PARAMETER)
}

fn declare_parameter() -> Result<Arc<Table>> {
    let mut builder = Table::builder(MAIN, MAIN, "parameter")
        .description("Named sets of configuration values.")
        .field(Field::new("name", FieldType::String, FieldRole::PartitionKey, "Parameter set name"));

    for i in 1..=5 {
        builder = builder.field(Field::new(
            format!("string_{}", i),
            FieldType::String,
            FieldRole::Nullable,
            format!("String parameter {}", i),
        ));
    }
    for i in 1..=5 {
        builder = builder.field(Field::new(
            format!("integer_{}", i),
            FieldType::Integer,
            FieldRole::Nullable,
            format!("Integer parameter {}", i),
        ));
    }
    for i in 1..=2 {
        builder = builder
            .field(Field::new(
                format!("date_{}", i),
                FieldType::LocalDate,
                FieldRole::Nullable,
                format!("Date parameter {}", i),
            ))
            .field(Field::new(
                format!("time_{}", i),
                FieldType::LocalTime,
                FieldRole::Nullable,
                format!("Time parameter {}", i),
            ));
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::{FieldValue, PersistenceError, Record};

    #[test]
    fn test_every_table_declares() {
        for table in [term(), hold_type(), zip_code(), school(), parameter()] {
            let table = table.unwrap();
            assert_eq!(table.tablespace(), MAIN);
            assert_eq!(table.key_fields().len(), 1);
        }
    }

    #[test]
    fn test_tables_are_declared_once() {
        assert!(Arc::ptr_eq(&term().unwrap(), &term().unwrap()));
        assert!(Arc::ptr_eq(&school().unwrap(), &school().unwrap()));
        assert!(!Arc::ptr_eq(&term().unwrap(), &declare_term().unwrap()));
        assert!(term().unwrap().is_same_table(&declare_term().unwrap()));
    }

    #[test]
    fn test_parameter_layout() {
        let table = parameter().unwrap();
        assert_eq!(table.field_count(), 15);
        assert_eq!(table.field(14).unwrap().name(), "time_2");
    }

    #[test]
    fn test_hold_severity_is_enumerated() {
        let table = hold_type().unwrap();
        let hold = |severity: &str| {
            Record::new(
                table.clone(),
                vec![
                    Some("06".into()),
                    Some(severity.into()),
                    Some("DISCIPLINE".into()),
                    Some(FieldValue::Integer(3)),
                    Some(FieldValue::Integer(3)),
                    Some(FieldValue::Integer(3)),
                ],
            )
        };
        assert!(hold("F").is_ok());
        assert!(matches!(
            hold("X"),
            Err(PersistenceError::ConstraintViolation { .. })
        ));
    }

    #[test]
    fn test_term_id_range() {
        let table = term().unwrap();
        let term_field = table.field_by_name("term").unwrap();
        assert!(term_field.check_value(&FieldValue::Integer(202410)).is_ok());
        assert!(term_field.check_value(&FieldValue::Integer(99_999)).is_err());
    }
}
