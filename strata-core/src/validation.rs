//! Outcome of comparing live database structure with a declared table.

use crate::connection::Context;
use crate::error::{PersistenceError, Result};
use serde::{Deserialize, Serialize};

/// Overall verdict of a validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationStatus {
    /// Live structure matches the declaration (possibly after repairs)
    Valid,
    /// At least one discrepancy remains
    Invalid,
}

/// Errors found and corrective statements executed during one validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseValidationResult {
    status: ValidationStatus,
    errors: Vec<String>,
    actions_taken: Vec<String>,
}

impl DatabaseValidationResult {
    /// Builds a result from copies of the given lists.
    pub fn new(status: ValidationStatus, errors: &[String], actions_taken: &[String]) -> Self {
        Self {
            status,
            errors: errors.to_vec(),
            actions_taken: actions_taken.to_vec(),
        }
    }

    /// Overall verdict.
    pub fn status(&self) -> ValidationStatus {
        self.status
    }

    /// True when the status is `Valid`.
    pub fn is_valid(&self) -> bool {
        self.status == ValidationStatus::Valid
    }

    /// Discrepancies that were not repaired.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Statements executed to repair the structure.
    pub fn actions_taken(&self) -> &[String] {
        &self.actions_taken
    }

    /// Renders the result as pretty-printed JSON for reports.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|source| PersistenceError::Serialization {
            context: "validation result".to_string(),
            source,
        })
    }
}

/// How a table compared with its declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableValidity {
    /// Matched without changes
    Valid,
    /// Matches now; structure was created or repaired
    ValidAfterChanges,
    /// Exists but differs from the declaration
    PresentAndInvalid,
    /// Does not exist
    NotPresent,
}

/// Result of validating one table in one context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableValidationStatus {
    /// Physical `schema.table` that was inspected
    pub physical_table: String,
    /// Context the connection addressed
    pub context: Context,
    /// Classification of the outcome
    pub validity: TableValidity,
    /// Errors and actions
    pub result: DatabaseValidationResult,
}

/// Collects findings while a validation runs. Consumed by `finish`.
#[derive(Debug)]
pub(crate) struct ValidationReport {
    physical_table: String,
    context: Context,
    table_present: bool,
    errors: Vec<String>,
    actions_taken: Vec<String>,
}

impl ValidationReport {
    pub(crate) fn new(physical_table: String, context: Context) -> Self {
        Self {
            physical_table,
            context,
            table_present: false,
            errors: Vec::new(),
            actions_taken: Vec::new(),
        }
    }

    /// Marks the table as existing before validation made any change.
    pub(crate) fn table_present(&mut self) {
        self.table_present = true;
    }

    pub(crate) fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!("Validation of {}: {}", self.physical_table, message);
        self.errors.push(message);
    }

    pub(crate) fn action(&mut self, statement: impl Into<String>) {
        let statement = statement.into();
        tracing::info!("Validation of {} executed: {}", self.physical_table, statement);
        self.actions_taken.push(statement);
    }

    pub(crate) fn finish(self) -> TableValidationStatus {
        let (status, validity) = match (
            self.errors.is_empty(),
            self.actions_taken.is_empty(),
            self.table_present,
        ) {
            (false, _, true) => (ValidationStatus::Invalid, TableValidity::PresentAndInvalid),
            (false, _, false) => (ValidationStatus::Invalid, TableValidity::NotPresent),
            (true, false, _) => (ValidationStatus::Valid, TableValidity::ValidAfterChanges),
            (true, true, _) => (ValidationStatus::Valid, TableValidity::Valid),
        };

        TableValidationStatus {
            physical_table: self.physical_table,
            context: self.context,
            validity,
            result: DatabaseValidationResult::new(status, &self.errors, &self.actions_taken),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> ValidationReport {
        ValidationReport::new("main_t.school".to_string(), Context::Testing)
    }

    #[test]
    fn test_clean_report_is_valid() {
        let mut report = report();
        report.table_present();
        let status = report.finish();
        assert_eq!(status.validity, TableValidity::Valid);
        assert!(status.result.is_valid());
        assert!(status.result.errors().is_empty());
        assert!(status.result.actions_taken().is_empty());
    }

    #[test]
    fn test_actions_only_is_valid_after_changes() {
        let mut report = report();
        report.action("CREATE TABLE ...");
        let status = report.finish();
        assert_eq!(status.validity, TableValidity::ValidAfterChanges);
        assert_eq!(status.result.status(), ValidationStatus::Valid);
        assert_eq!(status.result.actions_taken().len(), 1);
    }

    #[test]
    fn test_errors_classify_by_presence() {
        let mut missing = report();
        missing.error("table does not exist");
        assert_eq!(missing.finish().validity, TableValidity::NotPresent);

        let mut present = report();
        present.table_present();
        present.error("column city is missing");
        let status = present.finish();
        assert_eq!(status.validity, TableValidity::PresentAndInvalid);
        assert_eq!(status.result.status(), ValidationStatus::Invalid);
    }

    #[test]
    fn test_result_holds_copies() {
        let mut errors = vec!["a".to_string()];
        let result = DatabaseValidationResult::new(ValidationStatus::Invalid, &errors, &[]);
        errors.push("b".to_string());
        assert_eq!(result.errors(), ["a".to_string()]);
    }

    #[test]
    fn test_result_json() {
        let result = DatabaseValidationResult::new(
            ValidationStatus::Valid,
            &[],
            &["CREATE SCHEMA IF NOT EXISTS \"main_t\"".to_string()],
        );
        let json = result.to_json().unwrap();
        assert!(json.contains("\"VALID\""));
        assert!(json.contains("actions_taken"));
    }
}
