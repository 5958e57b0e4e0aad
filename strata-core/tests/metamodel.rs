//! Metamodel and criteria tests through the public API, no database required.

use std::sync::Arc;
use strata_core::{
    Context, DatabaseValidationResult, Field, FieldConstraint, FieldCriterion, FieldRole,
    FieldType, NumericMatchType, PersistenceError, Record, SelectionCriteria, StringMatchType,
    Table, TableRegistry, ValidationStatus,
};

fn school() -> Arc<Table> {
    Table::builder("main", "main", "school")
        .description("Secondary schools by CEEB code")
        .field(
            Field::new("ceeb_code", FieldType::Integer, FieldRole::PartitionKey, "")
                .with_constraint(FieldConstraint::integer_range("ceeb_range", 0, 999_999).unwrap()),
        )
        .field(Field::new("name", FieldType::String, FieldRole::NotNull, ""))
        .field(Field::new("state", FieldType::String, FieldRole::Nullable, ""))
        .build()
        .unwrap()
}

#[test]
fn test_registry_lookup_and_duplicates() {
    let mut registry = TableRegistry::new();
    registry.register(school()).unwrap();
    assert!(registry.get("main", "school").is_some());
    assert!(registry.get("main", "term").is_none());

    let duplicate = registry.register(school());
    assert!(matches!(duplicate, Err(PersistenceError::Configuration { .. })));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_reserved_schema_suffix_is_rejected() {
    for schema in ["main_d", "main_t"] {
        let result = Table::builder("main", schema, "school")
            .field(Field::new("ceeb_code", FieldType::Integer, FieldRole::PartitionKey, ""))
            .build();
        assert!(result.is_err(), "{} should be rejected", schema);
    }
}

#[test]
fn test_criteria_bind_to_their_table() {
    let school = school();
    let other = Table::builder("main", "main", "zip_code")
        .field(Field::new("state", FieldType::String, FieldRole::PartitionKey, ""))
        .build()
        .unwrap();

    let foreign = FieldCriterion::string(
        other.field_by_name("state").unwrap(),
        StringMatchType::ExactIn,
        ["WA"],
    )
    .unwrap();
    let result = SelectionCriteria::new(school.clone(), vec![foreign]);
    assert!(matches!(result, Err(PersistenceError::Binding { .. })));

    let local = FieldCriterion::string(
        school.field_by_name("state").unwrap(),
        StringMatchType::ExactIn,
        ["WA"],
    )
    .unwrap();
    let criteria = SelectionCriteria::new(school, vec![local]).unwrap();
    assert_eq!(criteria.criteria().len(), 1);
}

#[test]
fn test_criterion_shape_errors() {
    let school = school();
    let ceeb = school.field_by_name("ceeb_code").unwrap();
    let name = school.field_by_name("name").unwrap();

    // wrong comparand type
    assert!(matches!(
        FieldCriterion::numeric(ceeb, NumericMatchType::ExactIn, [1_i64]),
        Err(PersistenceError::TypeMismatch { .. })
    ));
    // numeric match on a string field
    assert!(matches!(
        FieldCriterion::numeric(name, NumericMatchType::ExactIn, [1_i32]),
        Err(PersistenceError::InvalidCriterion { .. })
    ));
    // inverted range
    assert!(matches!(
        FieldCriterion::numeric(ceeb, NumericMatchType::BetweenIncludeBounds, [9_i32, 1]),
        Err(PersistenceError::InvalidCriterion { .. })
    ));
    // empty IN list
    assert!(FieldCriterion::string(name, StringMatchType::ExactIn, Vec::<&str>::new()).is_err());
}

#[test]
fn test_record_enforces_constraints() {
    let school = school();
    let ok = Record::new(school.clone(), vec![Some(480_345_i32.into()), Some("Roosevelt".into())]);
    assert!(ok.is_ok());

    let out_of_range = Record::new(school, vec![Some(1_000_000_i32.into()), Some("X".into())]);
    assert!(matches!(
        out_of_range,
        Err(PersistenceError::ConstraintViolation { .. })
    ));
}

#[test]
fn test_validation_result_json() {
    let result = DatabaseValidationResult::new(
        ValidationStatus::Invalid,
        &["column 'name' is missing".to_string()],
        &[],
    );
    let json = result.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["status"], "INVALID");
    assert_eq!(value["errors"][0], "column 'name' is missing");
    assert!(value["actions_taken"].as_array().unwrap().is_empty());
}

#[test]
fn test_context_parsing() {
    assert_eq!("prod".parse::<Context>().unwrap(), Context::Production);
    assert_eq!("Testing".parse::<Context>().unwrap(), Context::Testing);
    assert!("staging".parse::<Context>().is_err());
}
