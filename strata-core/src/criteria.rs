//! Dialect-neutral selection criteria.
//!
//! A [`FieldCriterion`] matches one field against a condition; a
//! [`SelectionCriteria`] is the conjunction of criteria bound to one table.
//! There is no OR and no nesting, so every backend can translate any
//! selection into a single conjunctive filter.

use crate::error::{PersistenceError, Result};
use crate::schema::{Field, Table};
use crate::types::{FieldType, FieldValue};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;

/// Matches for BOOLEAN fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BooleanMatchType {
    /// Value is NULL
    IsNull,
    /// Value is not NULL
    IsNotNull,
    /// Value is TRUE
    IsTrue,
    /// Value is FALSE
    IsFalse,
}

/// Matches for BYTE, INTEGER, LONG, FLOAT and DOUBLE fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NumericMatchType {
    /// Value is NULL
    IsNull,
    /// Value is not NULL
    IsNotNull,
    /// Value equals one of the comparands
    ExactIn,
    /// Value equals none of the comparands
    ExactNotIn,
    /// Value > comparand
    GreaterThan,
    /// Value >= comparand
    GreaterThanOrEqual,
    /// Value < comparand
    LessThan,
    /// Value <= comparand
    LessThanOrEqual,
    /// lower < value < upper
    BetweenExcludeBounds,
    /// lower < value <= upper
    BetweenExcludeLowerBound,
    /// lower <= value < upper
    BetweenExcludeUpperBound,
    /// lower <= value <= upper
    BetweenIncludeBounds,
}

/// Matches for LOCAL_DATE, LOCAL_TIME and LOCAL_DATE_TIME fields.
///
/// Ordering is chronological; the variants mirror [`NumericMatchType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TemporalMatchType {
    /// Value is NULL
    IsNull,
    /// Value is not NULL
    IsNotNull,
    /// Value equals one of the comparands
    ExactIn,
    /// Value equals none of the comparands
    ExactNotIn,
    /// Value is after the comparand
    GreaterThan,
    /// Value is on or after the comparand
    GreaterThanOrEqual,
    /// Value is before the comparand
    LessThan,
    /// Value is on or before the comparand
    LessThanOrEqual,
    /// lower < value < upper
    BetweenExcludeBounds,
    /// lower < value <= upper
    BetweenExcludeLowerBound,
    /// lower <= value < upper
    BetweenExcludeUpperBound,
    /// lower <= value <= upper
    BetweenIncludeBounds,
}

/// Matches for STRING fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StringMatchType {
    /// Value is NULL
    IsNull,
    /// Value is not NULL
    IsNotNull,
    /// Value equals one of the comparands
    ExactIn,
    /// Value equals none of the comparands
    ExactNotIn,
    /// Value equals one of the comparands, ignoring case
    CaseInsensitiveIn,
    /// Value equals none of the comparands, ignoring case
    CaseInsensitiveNotIn,
    /// Value starts with one of the comparands
    ExactStartsWith,
    /// Value starts with none of the comparands
    ExactNotStartsWith,
    /// Value starts with one of the comparands, ignoring case
    CaseInsensitiveStartsWith,
    /// Value starts with none of the comparands, ignoring case
    CaseInsensitiveNotStartsWith,
}

/// The condition a criterion applies, independent of the field family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    /// No comparands
    IsNull,
    /// No comparands
    IsNotNull,
    /// BOOLEAN only, no comparands
    IsTrue,
    /// BOOLEAN only, no comparands
    IsFalse,
    /// Membership in one or more comparands
    In {
        /// Compare lower-cased strings
        case_insensitive: bool,
    },
    /// Exclusion from one or more comparands
    NotIn {
        /// Compare lower-cased strings
        case_insensitive: bool,
    },
    /// Prefix match against any of one or more comparands
    StartsWith {
        /// Match prefixes ignoring case
        case_insensitive: bool,
    },
    /// Matches none of one or more prefixes
    NotStartsWith {
        /// Match prefixes ignoring case
        case_insensitive: bool,
    },
    /// Exactly one comparand
    GreaterThan,
    /// Exactly one comparand
    GreaterThanOrEqual,
    /// Exactly one comparand
    LessThan,
    /// Exactly one comparand
    LessThanOrEqual,
    /// Exactly two comparands, lower bound first
    Between {
        /// Lower bound matches
        include_lower: bool,
        /// Upper bound matches
        include_upper: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Arity {
    None,
    AtLeastOne,
    Exactly(usize),
}

impl Comparison {
    fn arity(self) -> Arity {
        match self {
            Self::IsNull | Self::IsNotNull | Self::IsTrue | Self::IsFalse => Arity::None,
            Self::In { .. }
            | Self::NotIn { .. }
            | Self::StartsWith { .. }
            | Self::NotStartsWith { .. } => Arity::AtLeastOne,
            Self::GreaterThan | Self::GreaterThanOrEqual | Self::LessThan | Self::LessThanOrEqual => {
                Arity::Exactly(1)
            }
            Self::Between { .. } => Arity::Exactly(2),
        }
    }
}

/// Numeric and temporal matches share one set of conditions.
macro_rules! ordered_comparison {
    ($match_type:ident) => {
        impl From<$match_type> for Comparison {
            fn from(match_type: $match_type) -> Self {
                match match_type {
                    $match_type::IsNull => Self::IsNull,
                    $match_type::IsNotNull => Self::IsNotNull,
                    $match_type::ExactIn => Self::In {
                        case_insensitive: false,
                    },
                    $match_type::ExactNotIn => Self::NotIn {
                        case_insensitive: false,
                    },
                    $match_type::GreaterThan => Self::GreaterThan,
                    $match_type::GreaterThanOrEqual => Self::GreaterThanOrEqual,
                    $match_type::LessThan => Self::LessThan,
                    $match_type::LessThanOrEqual => Self::LessThanOrEqual,
                    $match_type::BetweenExcludeBounds => Self::Between {
                        include_lower: false,
                        include_upper: false,
                    },
                    $match_type::BetweenExcludeLowerBound => Self::Between {
                        include_lower: false,
                        include_upper: true,
                    },
                    $match_type::BetweenExcludeUpperBound => Self::Between {
                        include_lower: true,
                        include_upper: false,
                    },
                    $match_type::BetweenIncludeBounds => Self::Between {
                        include_lower: true,
                        include_upper: true,
                    },
                }
            }
        }
    };
}

ordered_comparison!(NumericMatchType);
ordered_comparison!(TemporalMatchType);

impl From<BooleanMatchType> for Comparison {
    fn from(match_type: BooleanMatchType) -> Self {
        match match_type {
            BooleanMatchType::IsNull => Self::IsNull,
            BooleanMatchType::IsNotNull => Self::IsNotNull,
            BooleanMatchType::IsTrue => Self::IsTrue,
            BooleanMatchType::IsFalse => Self::IsFalse,
        }
    }
}

impl From<StringMatchType> for Comparison {
    fn from(match_type: StringMatchType) -> Self {
        match match_type {
            StringMatchType::IsNull => Self::IsNull,
            StringMatchType::IsNotNull => Self::IsNotNull,
            StringMatchType::ExactIn => Self::In {
                case_insensitive: false,
            },
            StringMatchType::ExactNotIn => Self::NotIn {
                case_insensitive: false,
            },
            StringMatchType::CaseInsensitiveIn => Self::In {
                case_insensitive: true,
            },
            StringMatchType::CaseInsensitiveNotIn => Self::NotIn {
                case_insensitive: true,
            },
            StringMatchType::ExactStartsWith => Self::StartsWith {
                case_insensitive: false,
            },
            StringMatchType::ExactNotStartsWith => Self::NotStartsWith {
                case_insensitive: false,
            },
            StringMatchType::CaseInsensitiveStartsWith => Self::StartsWith {
                case_insensitive: true,
            },
            StringMatchType::CaseInsensitiveNotStartsWith => Self::NotStartsWith {
                case_insensitive: true,
            },
        }
    }
}

/// A single field-level predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldCriterion {
    field: Field,
    comparison: Comparison,
    values: Vec<FieldValue>,
}

impl FieldCriterion {
    /// Criterion on a BYTE, INTEGER, LONG, FLOAT or DOUBLE field.
    ///
    /// # Example
    /// ```rust
    /// use strata_core::{Field, FieldCriterion, FieldRole, FieldType, NumericMatchType};
    ///
    /// let week = Field::new("week_nbr", FieldType::Integer, FieldRole::PartitionKey, "");
    /// let criterion = FieldCriterion::numeric(&week, NumericMatchType::ExactIn, [0_i32, 1]).unwrap();
    /// assert_eq!(criterion.values().len(), 2);
    ///
    /// // a range needs exactly two bounds
    /// assert!(FieldCriterion::numeric(&week, NumericMatchType::BetweenIncludeBounds, [1_i32]).is_err());
    /// ```
    pub fn numeric<I, V>(field: &Field, match_type: NumericMatchType, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<FieldValue>,
    {
        Self::require_family(field, FieldType::is_numeric, "numeric")?;
        Self::build(field, match_type.into(), values)
    }

    /// Criterion on a LOCAL_DATE, LOCAL_TIME or LOCAL_DATE_TIME field.
    pub fn temporal<I, V>(field: &Field, match_type: TemporalMatchType, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<FieldValue>,
    {
        Self::require_family(field, FieldType::is_temporal, "temporal")?;
        Self::build(field, match_type.into(), values)
    }

    /// Criterion on a STRING field.
    pub fn string<I, V>(field: &Field, match_type: StringMatchType, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<FieldValue>,
    {
        Self::require_family(field, |t| t == FieldType::String, "string")?;
        Self::build(field, match_type.into(), values)
    }

    /// Criterion on a BOOLEAN field. Boolean matches take no comparands.
    pub fn boolean(field: &Field, match_type: BooleanMatchType) -> Result<Self> {
        Self::require_family(field, |t| t == FieldType::Boolean, "boolean")?;
        Self::build(field, match_type.into(), Vec::<FieldValue>::new())
    }

    /// Matches rows where the field is NULL. Valid for every field type.
    pub fn is_null(field: &Field) -> Self {
        Self {
            field: field.clone(),
            comparison: Comparison::IsNull,
            values: Vec::new(),
        }
    }

    /// Matches rows where the field is not NULL. Valid for every field type.
    pub fn is_not_null(field: &Field) -> Self {
        Self {
            field: field.clone(),
            comparison: Comparison::IsNotNull,
            values: Vec::new(),
        }
    }

    fn require_family(field: &Field, accepts: impl Fn(FieldType) -> bool, family: &str) -> Result<()> {
        if accepts(field.field_type()) {
            Ok(())
        } else {
            Err(PersistenceError::invalid_criterion(
                field.name(),
                format!("{} match on a {} field", family, field.field_type()),
            ))
        }
    }

    fn build<I, V>(field: &Field, comparison: Comparison, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<FieldValue>,
    {
        let values: Vec<FieldValue> = values.into_iter().map(Into::into).collect();

        for value in &values {
            if value.field_type() != field.field_type() {
                return Err(PersistenceError::TypeMismatch {
                    field: field.name().to_string(),
                    expected: field.field_type(),
                    found: value.field_type(),
                });
            }
            if let Some(message) = value.storage_issue() {
                return Err(PersistenceError::Unrepresentable {
                    field: field.name().to_string(),
                    message,
                });
            }
        }

        let arity_ok = match comparison.arity() {
            Arity::None => values.is_empty(),
            Arity::AtLeastOne => !values.is_empty(),
            Arity::Exactly(n) => values.len() == n,
        };
        if !arity_ok {
            return Err(PersistenceError::invalid_criterion(
                field.name(),
                format!("{:?} cannot take {} comparand(s)", comparison, values.len()),
            ));
        }

        if let (Comparison::Between { .. }, [lower, upper]) = (comparison, values.as_slice()) {
            match lower.partial_cmp(upper) {
                Some(Ordering::Less | Ordering::Equal) => {}
                _ => {
                    return Err(PersistenceError::invalid_criterion(
                        field.name(),
                        "lower bound must not exceed upper bound",
                    ));
                }
            }
        }

        Ok(Self {
            field: field.clone(),
            comparison,
            values,
        })
    }

    /// The field being matched.
    pub fn field(&self) -> &Field {
        &self.field
    }

    /// The condition applied.
    pub fn comparison(&self) -> Comparison {
        self.comparison
    }

    /// Comparands, all of the field's type.
    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }
}

/// A conjunction of criteria over one table.
#[derive(Debug, Clone)]
pub struct SelectionCriteria {
    table: Arc<Table>,
    criteria: Vec<FieldCriterion>,
}

impl SelectionCriteria {
    /// Binds `criteria` to `table`.
    ///
    /// # Errors
    /// `Binding` if a criterion's field is not a field of `table`.
    pub fn new(table: Arc<Table>, criteria: Vec<FieldCriterion>) -> Result<Self> {
        if let Some(foreign) = criteria.iter().find(|c| !table.contains(c.field())) {
            return Err(PersistenceError::binding(
                table.qualified_name(),
                foreign.field().name(),
            ));
        }
        Ok(Self { table, criteria })
    }

    /// Selects every row of `table`.
    pub fn all(table: Arc<Table>) -> Self {
        Self {
            table,
            criteria: Vec::new(),
        }
    }

    /// Adds one more criterion.
    ///
    /// # Errors
    /// `Binding` if the criterion's field is not a field of this table.
    pub fn and(mut self, criterion: FieldCriterion) -> Result<Self> {
        if !self.table.contains(criterion.field()) {
            return Err(PersistenceError::binding(
                self.table.qualified_name(),
                criterion.field().name(),
            ));
        }
        self.criteria.push(criterion);
        Ok(self)
    }

    /// The bound table.
    pub fn table(&self) -> &Arc<Table> {
        &self.table
    }

    /// Criteria in the order supplied.
    pub fn criteria(&self) -> &[FieldCriterion] {
        &self.criteria
    }

    /// True when no criteria restrict the selection.
    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldRole;
    use chrono::NaiveDate;

    fn term_week() -> Arc<Table> {
        Table::builder("term", "term_202410", "term_week")
            .field(Field::new("week_nbr", FieldType::Integer, FieldRole::PartitionKey, ""))
            .field(Field::new("start_date", FieldType::LocalDate, FieldRole::NotNull, ""))
            .field(Field::new("label", FieldType::String, FieldRole::Nullable, ""))
            .field(Field::new("active", FieldType::Boolean, FieldRole::Nullable, ""))
            .build()
            .unwrap()
    }

    fn field(table: &Table, name: &str) -> Field {
        table.field_by_name(name).unwrap().clone()
    }

    #[test]
    fn test_family_mismatch_rejected() {
        let table = term_week();
        let label = field(&table, "label");
        let result = FieldCriterion::numeric(&label, NumericMatchType::ExactIn, [1_i32]);
        assert!(matches!(result, Err(PersistenceError::InvalidCriterion { .. })));

        let week = field(&table, "week_nbr");
        assert!(FieldCriterion::boolean(&week, BooleanMatchType::IsTrue).is_err());
    }

    #[test]
    fn test_comparand_type_must_match_field() {
        let table = term_week();
        let week = field(&table, "week_nbr");
        let result = FieldCriterion::numeric(&week, NumericMatchType::ExactIn, [1_i64]);
        assert!(matches!(result, Err(PersistenceError::TypeMismatch { .. })));
    }

    #[test]
    fn test_inexact_comparand_rejected() {
        let table = term_week();
        let start = field(&table, "start_date");
        let bce = NaiveDate::from_ymd_opt(-1, 12, 31).unwrap();
        let result = FieldCriterion::temporal(&start, TemporalMatchType::GreaterThan, [bce]);
        assert!(matches!(result, Err(PersistenceError::Unrepresentable { .. })));
    }

    #[test]
    fn test_arity_rules() {
        let table = term_week();
        let week = field(&table, "week_nbr");
        let none: [i32; 0] = [];

        assert!(FieldCriterion::numeric(&week, NumericMatchType::IsNull, none).is_ok());
        assert!(FieldCriterion::numeric(&week, NumericMatchType::IsNull, [1_i32]).is_err());
        assert!(FieldCriterion::numeric(&week, NumericMatchType::ExactIn, none).is_err());
        assert!(FieldCriterion::numeric(&week, NumericMatchType::GreaterThan, [1_i32, 2]).is_err());
        assert!(FieldCriterion::numeric(&week, NumericMatchType::BetweenExcludeBounds, [1_i32, 5]).is_ok());
        assert!(FieldCriterion::numeric(&week, NumericMatchType::BetweenExcludeBounds, [5_i32, 1]).is_err());

        let label = field(&table, "label");
        assert!(FieldCriterion::string(&label, StringMatchType::ExactStartsWith, ["a", "b"]).is_ok());
    }

    #[test]
    fn test_between_maps_bounds() {
        let table = term_week();
        let start = field(&table, "start_date");
        let from = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let criterion =
            FieldCriterion::temporal(&start, TemporalMatchType::BetweenExcludeLowerBound, [from, to]).unwrap();
        assert_eq!(
            criterion.comparison(),
            Comparison::Between {
                include_lower: false,
                include_upper: true
            }
        );
    }

    #[test]
    fn test_selection_rejects_foreign_field() {
        let table = term_week();
        let other = Table::builder("main", "main", "school")
            .field(Field::new("ceeb_code", FieldType::Integer, FieldRole::PartitionKey, ""))
            .build()
            .unwrap();
        let foreign = FieldCriterion::is_null(other.field(0).unwrap());

        let result = SelectionCriteria::new(table.clone(), vec![foreign.clone()]);
        assert!(matches!(result, Err(PersistenceError::Binding { .. })));
        assert!(SelectionCriteria::all(table).and(foreign).is_err());
    }

    #[test]
    fn test_selection_keeps_order() {
        let table = term_week();
        let week = field(&table, "week_nbr");
        let active = field(&table, "active");
        let selection = SelectionCriteria::all(table)
            .and(FieldCriterion::numeric(&week, NumericMatchType::ExactIn, [0_i32]).unwrap())
            .unwrap()
            .and(FieldCriterion::boolean(&active, BooleanMatchType::IsTrue).unwrap())
            .unwrap();
        assert_eq!(selection.criteria().len(), 2);
        assert_eq!(selection.criteria()[0].field().name(), "week_nbr");
        assert!(!selection.is_empty());
    }

    #[test]
    fn test_blob_supports_null_checks() {
        let table = Table::builder("main", "main", "blobs")
            .field(Field::new("data", FieldType::Blob, FieldRole::Nullable, ""))
            .build()
            .unwrap();
        let data = table.field(0).unwrap();
        let criteria = SelectionCriteria::new(
            table.clone(),
            vec![FieldCriterion::is_null(data), FieldCriterion::is_not_null(data)],
        );
        assert!(criteria.is_ok());
    }
}
