//! Mapping between logical field types and PostgreSQL column types.

use crate::types::FieldType;

/// Column type used when creating a column of `field_type`.
pub fn native_type(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::String => "text",
        FieldType::Boolean => "boolean",
        FieldType::Byte => "smallint",
        FieldType::Integer => "integer",
        FieldType::Long => "bigint",
        FieldType::Float => "real",
        FieldType::Double => "double precision",
        FieldType::Blob => "bytea",
        FieldType::LocalDate => "date",
        FieldType::LocalTime => "time without time zone",
        FieldType::LocalDateTime => "timestamp without time zone",
    }
}

/// Logical type of an `information_schema.columns.data_type` value.
///
/// Returns `None` for column types with no logical counterpart.
pub fn logical_type(data_type: &str) -> Option<FieldType> {
    let field_type = match data_type.to_lowercase().as_str() {
        "text" | "character varying" | "varchar" | "character" | "char" => FieldType::String,
        "boolean" | "bool" => FieldType::Boolean,
        "smallint" | "int2" => FieldType::Byte,
        "integer" | "int" | "int4" => FieldType::Integer,
        "bigint" | "int8" => FieldType::Long,
        "real" | "float4" => FieldType::Float,
        "double precision" | "float8" => FieldType::Double,
        "bytea" => FieldType::Blob,
        "date" => FieldType::LocalDate,
        "time without time zone" | "time" => FieldType::LocalTime,
        "timestamp without time zone" | "timestamp" => FieldType::LocalDateTime,
        _ => return None,
    };
    Some(field_type)
}

/// True if a column reported as `data_type` can hold `field_type` values.
pub fn is_compatible(field_type: FieldType, data_type: &str) -> bool {
    logical_type(data_type) == Some(field_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_native_type_maps_back() {
        for field_type in FieldType::ALL {
            assert_eq!(
                logical_type(native_type(field_type)),
                Some(field_type),
                "{}",
                field_type
            );
        }
    }

    #[test]
    fn test_string_accepts_character_types() {
        assert!(is_compatible(FieldType::String, "character varying"));
        assert!(is_compatible(FieldType::String, "character"));
        assert!(is_compatible(FieldType::String, "TEXT"));
    }

    #[test]
    fn test_incompatible_types() {
        assert!(!is_compatible(FieldType::Integer, "bigint"));
        assert!(!is_compatible(FieldType::LocalDateTime, "timestamp with time zone"));
        assert_eq!(logical_type("jsonb"), None);
        assert_eq!(logical_type("numeric"), None);
    }
}
