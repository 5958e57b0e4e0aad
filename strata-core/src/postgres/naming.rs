//! Environment-aware physical schema names.
//!
//! Every logical schema exists three times, once per context. Term-shaped
//! schemas (`term_<id>`) share a single development and a single testing
//! schema, since only one term is active outside production.

use crate::connection::Context;
use crate::schema::Table;

use super::sql::quote_identifier;

/// Prefix marking a per-term logical schema.
pub const TERM_PREFIX: &str = "term_";
/// Development schema shared by every term schema.
pub const TERM_DEV_SCHEMA: &str = "term_d";
/// Testing schema shared by every term schema.
pub const TERM_TEST_SCHEMA: &str = "term_t";
/// Suffix appended to other schemas in development.
pub const DEV_SUFFIX: &str = "_d";
/// Suffix appended to other schemas in testing.
pub const TEST_SUFFIX: &str = "_t";

/// Physical schema holding logical schema `schema` in `context`.
///
/// # Example
/// ```rust
/// use strata_core::Context;
/// use strata_core::postgres::physical_schema_name;
///
/// assert_eq!(physical_schema_name("main", Context::Production), "main");
/// assert_eq!(physical_schema_name("main", Context::Development), "main_d");
/// assert_eq!(physical_schema_name("term_202410", Context::Testing), "term_t");
/// ```
pub fn physical_schema_name(schema: &str, context: Context) -> String {
    let is_term = schema.starts_with(TERM_PREFIX);
    match (context, is_term) {
        (Context::Production, _) => schema.to_string(),
        (Context::Development, true) => TERM_DEV_SCHEMA.to_string(),
        (Context::Development, false) => format!("{}{}", schema, DEV_SUFFIX),
        (Context::Testing, true) => TERM_TEST_SCHEMA.to_string(),
        (Context::Testing, false) => format!("{}{}", schema, TEST_SUFFIX),
    }
}

/// Quoted `"schema"."table"` for `table` in `context`.
pub fn qualified_table_name(table: &Table, context: Context) -> String {
    format!(
        "{}.{}",
        quote_identifier(&physical_schema_name(table.schema(), context)),
        quote_identifier(table.name())
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_is_identity() {
        for schema in ["main", "term_202410", "registrar"] {
            assert_eq!(physical_schema_name(schema, Context::Production), schema);
        }
    }

    #[test]
    fn test_non_production_never_equals_production() {
        for schema in ["main", "term_202410", "term_1", "x"] {
            let prod = physical_schema_name(schema, Context::Production);
            let dev = physical_schema_name(schema, Context::Development);
            let test = physical_schema_name(schema, Context::Testing);
            assert_ne!(dev, prod, "{}", schema);
            assert_ne!(test, prod, "{}", schema);
            assert_ne!(dev, test, "{}", schema);
        }
    }

    #[test]
    fn test_term_schemas_collapse() {
        assert_eq!(physical_schema_name("term_202410", Context::Development), "term_d");
        assert_eq!(physical_schema_name("term_202420", Context::Development), "term_d");
        assert_eq!(physical_schema_name("term_202410", Context::Testing), "term_t");
        assert_ne!(
            physical_schema_name("term_202410", Context::Development),
            "term_202410_d"
        );
    }

    #[test]
    fn test_suffixes() {
        assert_eq!(physical_schema_name("main", Context::Development), "main_d");
        assert_eq!(physical_schema_name("main", Context::Testing), "main_t");
        // "term" without the underscore is not term-shaped
        assert_eq!(physical_schema_name("terms", Context::Testing), "terms_t");
    }

    #[test]
    fn test_derivation_is_deterministic() {
        for context in Context::ALL {
            assert_eq!(
                physical_schema_name("main", context),
                physical_schema_name("main", context)
            );
        }
    }
}
