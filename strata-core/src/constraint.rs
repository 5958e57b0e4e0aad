//! Value constraints attached to field declarations.
//!
//! A constraint is checked whenever a record or an update is built, so a
//! value that reaches a backend has already satisfied every constraint of
//! its field.

use crate::error::{PersistenceError, Result};
use crate::types::{FieldType, FieldValue};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Which non-finite floating point values a range constraint lets through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FloatingPointAllow {
    /// NaN and both infinities pass without a range check
    AllValues,
    /// Infinities pass, NaN is rejected
    AllButNan,
    /// NaN passes, infinities are rejected
    AllButInfinities,
    /// Only finite values inside the range pass
    FiniteOnly,
}

impl FloatingPointAllow {
    fn allows_nan(self) -> bool {
        matches!(self, Self::AllValues | Self::AllButInfinities)
    }

    fn allows_infinite(self) -> bool {
        matches!(self, Self::AllValues | Self::AllButNan)
    }
}

/// The rule a constraint enforces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConstraintKind {
    /// Inclusive BYTE range
    ByteRange { min: i8, max: i8 },
    /// Inclusive INTEGER range
    IntegerRange { min: i32, max: i32 },
    /// Inclusive LONG range
    LongRange { min: i64, max: i64 },
    /// Inclusive FLOAT range
    FloatRange {
        min: f32,
        max: f32,
        allow: FloatingPointAllow,
    },
    /// Inclusive DOUBLE range
    DoubleRange {
        min: f64,
        max: f64,
        allow: FloatingPointAllow,
    },
    /// Inclusive bounds on the number of characters of a STRING
    StringLength { min: usize, max: usize },
    /// STRING must be one of a fixed set
    StringEnumerated { allowed: Vec<String> },
}

/// A named constraint. Names are unique within one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldConstraint {
    name: String,
    kind: ConstraintKind,
}

fn ordered_bounds<T: PartialOrd + Display>(name: &str, min: T, max: T) -> Result<()> {
    if min > max {
        return Err(PersistenceError::configuration(format!(
            "constraint '{}' has minimum {} greater than maximum {}",
            name, min, max
        )));
    }
    Ok(())
}

fn check_floating<T>(value: T, min: T, max: T, allow: FloatingPointAllow) -> std::result::Result<(), String>
where
    T: PartialOrd + Display + Copy,
    f64: From<T>,
{
    let wide = f64::from(value);
    if wide.is_nan() {
        return if allow.allows_nan() {
            Ok(())
        } else {
            Err("NaN is not allowed".to_string())
        };
    }
    if wide.is_infinite() {
        return if allow.allows_infinite() {
            Ok(())
        } else {
            Err(format!("{} is not allowed", value))
        };
    }
    if value < min || value > max {
        return Err(format!("{} is outside [{}, {}]", value, min, max));
    }
    Ok(())
}

fn check_range<T: PartialOrd + Display>(value: T, min: T, max: T) -> std::result::Result<(), String> {
    if value < min || value > max {
        Err(format!("{} is outside [{}, {}]", value, min, max))
    } else {
        Ok(())
    }
}

impl FieldConstraint {
    fn named(name: impl Into<String>, kind: ConstraintKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Inclusive BYTE range.
    pub fn byte_range(name: impl Into<String>, min: i8, max: i8) -> Result<Self> {
        let name = name.into();
        ordered_bounds(&name, min, max)?;
        Ok(Self::named(name, ConstraintKind::ByteRange { min, max }))
    }

    /// Inclusive INTEGER range.
    pub fn integer_range(name: impl Into<String>, min: i32, max: i32) -> Result<Self> {
        let name = name.into();
        ordered_bounds(&name, min, max)?;
        Ok(Self::named(name, ConstraintKind::IntegerRange { min, max }))
    }

    /// Inclusive LONG range.
    pub fn long_range(name: impl Into<String>, min: i64, max: i64) -> Result<Self> {
        let name = name.into();
        ordered_bounds(&name, min, max)?;
        Ok(Self::named(name, ConstraintKind::LongRange { min, max }))
    }

    /// Inclusive FLOAT range with a policy for NaN and infinities.
    pub fn float_range(
        name: impl Into<String>,
        min: f32,
        max: f32,
        allow: FloatingPointAllow,
    ) -> Result<Self> {
        let name = name.into();
        if !min.is_finite() || !max.is_finite() {
            return Err(PersistenceError::configuration(format!(
                "constraint '{}' bounds must be finite",
                name
            )));
        }
        ordered_bounds(&name, min, max)?;
        Ok(Self::named(name, ConstraintKind::FloatRange { min, max, allow }))
    }

    /// Inclusive DOUBLE range with a policy for NaN and infinities.
    pub fn double_range(
        name: impl Into<String>,
        min: f64,
        max: f64,
        allow: FloatingPointAllow,
    ) -> Result<Self> {
        let name = name.into();
        if !min.is_finite() || !max.is_finite() {
            return Err(PersistenceError::configuration(format!(
                "constraint '{}' bounds must be finite",
                name
            )));
        }
        ordered_bounds(&name, min, max)?;
        Ok(Self::named(name, ConstraintKind::DoubleRange { min, max, allow }))
    }

    /// Character count of a STRING between `min` and `max`, inclusive.
    pub fn string_length(name: impl Into<String>, min: usize, max: usize) -> Result<Self> {
        let name = name.into();
        ordered_bounds(&name, min, max)?;
        Ok(Self::named(name, ConstraintKind::StringLength { min, max }))
    }

    /// STRING restricted to `allowed`.
    pub fn string_enumerated<I, S>(name: impl Into<String>, allowed: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let allowed: Vec<String> = allowed.into_iter().map(Into::into).collect();
        if allowed.is_empty() {
            return Err(PersistenceError::configuration(format!(
                "constraint '{}' must allow at least one value",
                name
            )));
        }
        Ok(Self::named(name, ConstraintKind::StringEnumerated { allowed }))
    }

    /// Constraint name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Constraint rule.
    pub fn kind(&self) -> &ConstraintKind {
        &self.kind
    }

    /// The only field type this constraint can be attached to.
    pub fn field_type(&self) -> FieldType {
        match self.kind {
            ConstraintKind::ByteRange { .. } => FieldType::Byte,
            ConstraintKind::IntegerRange { .. } => FieldType::Integer,
            ConstraintKind::LongRange { .. } => FieldType::Long,
            ConstraintKind::FloatRange { .. } => FieldType::Float,
            ConstraintKind::DoubleRange { .. } => FieldType::Double,
            ConstraintKind::StringLength { .. } | ConstraintKind::StringEnumerated { .. } => {
                FieldType::String
            }
        }
    }

    /// Checks a value already known to be of the right type.
    ///
    /// # Errors
    /// Returns `ConstraintViolation` naming `field` when the value fails.
    pub fn check(&self, field: &str, value: &FieldValue) -> Result<()> {
        let outcome = match (&self.kind, value) {
            (ConstraintKind::ByteRange { min, max }, FieldValue::Byte(v)) => {
                check_range(*v, *min, *max)
            }
            (ConstraintKind::IntegerRange { min, max }, FieldValue::Integer(v)) => {
                check_range(*v, *min, *max)
            }
            (ConstraintKind::LongRange { min, max }, FieldValue::Long(v)) => {
                check_range(*v, *min, *max)
            }
            (ConstraintKind::FloatRange { min, max, allow }, FieldValue::Float(v)) => {
                check_floating(*v, *min, *max, *allow)
            }
            (ConstraintKind::DoubleRange { min, max, allow }, FieldValue::Double(v)) => {
                check_floating(*v, *min, *max, *allow)
            }
            (ConstraintKind::StringLength { min, max }, FieldValue::String(v)) => {
                let length = v.chars().count();
                if length < *min || length > *max {
                    Err(format!(
                        "length {} is outside [{}, {}]",
                        length, min, max
                    ))
                } else {
                    Ok(())
                }
            }
            (ConstraintKind::StringEnumerated { allowed }, FieldValue::String(v)) => {
                if allowed.iter().any(|a| a == v) {
                    Ok(())
                } else {
                    Err(format!("'{}' is not one of {:?}", v, allowed))
                }
            }
            (_, other) => Err(format!(
                "applies to {} values, got {}",
                self.field_type(),
                other.field_type()
            )),
        };

        outcome.map_err(|message| PersistenceError::ConstraintViolation {
            field: field.to_string(),
            constraint: self.name.clone(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_range_is_inclusive() {
        let c = FieldConstraint::integer_range("term_range", 100_000, 999_999).unwrap();
        assert!(c.check("term", &FieldValue::Integer(100_000)).is_ok());
        assert!(c.check("term", &FieldValue::Integer(999_999)).is_ok());

        let err = c.check("term", &FieldValue::Integer(99_999)).unwrap_err();
        assert!(matches!(
            err,
            PersistenceError::ConstraintViolation { ref field, ref constraint, .. }
                if field == "term" && constraint == "term_range"
        ));
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        assert!(FieldConstraint::integer_range("r", 10, 1).is_err());
        assert!(FieldConstraint::string_length("len", 5, 2).is_err());
        assert!(FieldConstraint::double_range("d", 0.0, f64::NAN, FloatingPointAllow::AllValues).is_err());
    }

    #[test]
    fn test_floating_point_allowances() {
        let finite = FieldConstraint::double_range("d", -1.0, 1.0, FloatingPointAllow::FiniteOnly).unwrap();
        assert!(finite.check("x", &FieldValue::Double(0.5)).is_ok());
        assert!(finite.check("x", &FieldValue::Double(f64::NAN)).is_err());
        assert!(finite.check("x", &FieldValue::Double(f64::INFINITY)).is_err());
        assert!(finite.check("x", &FieldValue::Double(2.0)).is_err());

        let no_nan = FieldConstraint::float_range("f", 0.0, 1.0, FloatingPointAllow::AllButNan).unwrap();
        assert!(no_nan.check("x", &FieldValue::Float(f32::NEG_INFINITY)).is_ok());
        assert!(no_nan.check("x", &FieldValue::Float(f32::NAN)).is_err());

        let no_inf = FieldConstraint::float_range("f", 0.0, 1.0, FloatingPointAllow::AllButInfinities).unwrap();
        assert!(no_inf.check("x", &FieldValue::Float(f32::NAN)).is_ok());
        assert!(no_inf.check("x", &FieldValue::Float(f32::INFINITY)).is_err());
    }

    #[test]
    fn test_string_length_counts_characters() {
        let c = FieldConstraint::string_length("state_len", 2, 2).unwrap();
        assert!(c.check("state", &FieldValue::from("WA")).is_ok());
        assert!(c.check("state", &FieldValue::from("WAS")).is_err());
        assert!(c.check("state", &FieldValue::from("é!")).is_ok());
    }

    #[test]
    fn test_string_enumerated() {
        let c = FieldConstraint::string_enumerated("severity_values", ["F", "N"]).unwrap();
        assert!(c.check("severity", &FieldValue::from("F")).is_ok());
        assert!(c.check("severity", &FieldValue::from("f")).is_err());
        assert!(FieldConstraint::string_enumerated("empty", Vec::<String>::new()).is_err());
    }

    #[test]
    fn test_field_type_and_foreign_values() {
        let c = FieldConstraint::byte_range("b", 0, 10).unwrap();
        assert_eq!(c.field_type(), FieldType::Byte);
        assert!(c.check("x", &FieldValue::Integer(5)).is_err());
    }
}
