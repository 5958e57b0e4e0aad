//! Logical type system shared by every backend.
//!
//! `FieldType` is the closed set of column types a table may declare,
//! `FieldRole` tags each field with its key/nullability semantics and
//! `FieldValue` carries one non-null value of a logical type. Null is always
//! represented as `Option::None` around a `FieldValue`.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
    /// Variable-length text
    String,
    /// True/false flag
    Boolean,
    /// Signed 8-bit integer
    Byte,
    /// Signed 32-bit integer
    Integer,
    /// Signed 64-bit integer
    Long,
    /// Single precision floating point
    Float,
    /// Double precision floating point
    Double,
    /// Opaque binary data
    Blob,
    /// Calendar date without zone
    LocalDate,
    /// Wall-clock time without zone
    LocalTime,
    /// Date and time without zone
    LocalDateTime,
}

impl FieldType {
    /// Every logical type, in declaration order.
    pub const ALL: [FieldType; 11] = [
        FieldType::String,
        FieldType::Boolean,
        FieldType::Byte,
        FieldType::Integer,
        FieldType::Long,
        FieldType::Float,
        FieldType::Double,
        FieldType::Blob,
        FieldType::LocalDate,
        FieldType::LocalTime,
        FieldType::LocalDateTime,
    ];

    /// Returns true for the integer and floating point types.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::Byte | Self::Integer | Self::Long | Self::Float | Self::Double
        )
    }

    /// Returns true for the date and time types.
    pub fn is_temporal(self) -> bool {
        matches!(self, Self::LocalDate | Self::LocalTime | Self::LocalDateTime)
    }

    /// Upper-case name used in messages and reports.
    pub fn name(self) -> &'static str {
        match self {
            Self::String => "STRING",
            Self::Boolean => "BOOLEAN",
            Self::Byte => "BYTE",
            Self::Integer => "INTEGER",
            Self::Long => "LONG",
            Self::Float => "FLOAT",
            Self::Double => "DOUBLE",
            Self::Blob => "BLOB",
            Self::LocalDate => "LOCAL_DATE",
            Self::LocalTime => "LOCAL_TIME",
            Self::LocalDateTime => "LOCAL_DATE_TIME",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Key and nullability role of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldRole {
    /// Part of the table's natural key
    PartitionKey,
    /// Key component that orders rows within a partition
    ClusteringKey,
    /// Required, non-key
    NotNull,
    /// Optional
    Nullable,
}

impl FieldRole {
    /// Only `Nullable` fields accept null.
    pub fn is_nullable(self) -> bool {
        matches!(self, Self::Nullable)
    }

    /// Partition and clustering keys together form the primary key.
    pub fn is_key(self) -> bool {
        matches!(self, Self::PartitionKey | Self::ClusteringKey)
    }
}

impl fmt::Display for FieldRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PartitionKey => "PARTITION_KEY",
            Self::ClusteringKey => "CLUSTERING_KEY",
            Self::NotNull => "NOT_NULL",
            Self::Nullable => "NULLABLE",
        };
        f.write_str(name)
    }
}

/// Earliest year a temporal value may carry.
pub const MIN_YEAR: i32 = 1;
/// Latest year a temporal value may carry.
pub const MAX_YEAR: i32 = 9999;

fn year_issue(year: i32) -> Option<String> {
    if (MIN_YEAR..=MAX_YEAR).contains(&year) {
        None
    } else {
        Some(format!(
            "year {} is outside {}..={}",
            year, MIN_YEAR, MAX_YEAR
        ))
    }
}

fn time_issue(time: NaiveTime) -> Option<String> {
    let nanos = time.nanosecond();
    if nanos >= 1_000_000_000 {
        Some(format!("{} is a leap second", time))
    } else if !nanos.is_multiple_of(1_000) {
        Some(format!("{} is finer than a microsecond", time))
    } else {
        None
    }
}

/// A single non-null value of one of the logical types.
///
/// Values of the same variant compare by content; values of different
/// variants are never equal.
#[derive(Debug, Clone, PartialEq, PartialOrd, Serialize, Deserialize)]
pub enum FieldValue {
    /// STRING value
    String(String),
    /// BOOLEAN value
    Boolean(bool),
    /// BYTE value
    Byte(i8),
    /// INTEGER value
    Integer(i32),
    /// LONG value
    Long(i64),
    /// FLOAT value
    Float(f32),
    /// DOUBLE value
    Double(f64),
    /// BLOB value
    Blob(Vec<u8>),
    /// LOCAL_DATE value
    LocalDate(NaiveDate),
    /// LOCAL_TIME value
    LocalTime(NaiveTime),
    /// LOCAL_DATE_TIME value
    LocalDateTime(NaiveDateTime),
}

impl FieldValue {
    /// The logical type this value belongs to.
    pub fn field_type(&self) -> FieldType {
        match self {
            Self::String(_) => FieldType::String,
            Self::Boolean(_) => FieldType::Boolean,
            Self::Byte(_) => FieldType::Byte,
            Self::Integer(_) => FieldType::Integer,
            Self::Long(_) => FieldType::Long,
            Self::Float(_) => FieldType::Float,
            Self::Double(_) => FieldType::Double,
            Self::Blob(_) => FieldType::Blob,
            Self::LocalDate(_) => FieldType::LocalDate,
            Self::LocalTime(_) => FieldType::LocalTime,
            Self::LocalDateTime(_) => FieldType::LocalDateTime,
        }
    }

    /// Why this value cannot be stored exactly, if it cannot.
    ///
    /// Temporal values are held to whole microseconds within years
    /// [`MIN_YEAR`] to [`MAX_YEAR`]. Every other value is storable.
    pub fn storage_issue(&self) -> Option<String> {
        match self {
            Self::LocalDate(date) => year_issue(date.year()),
            Self::LocalTime(time) => time_issue(*time),
            Self::LocalDateTime(stamp) => {
                year_issue(stamp.year()).or_else(|| time_issue(stamp.time()))
            }
            _ => None,
        }
    }

    /// Returns the text if this is a STRING value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the number if this is an INTEGER value.
    pub fn as_integer(&self) -> Option<i32> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the date if this is a LOCAL_DATE value.
    pub fn as_local_date(&self) -> Option<NaiveDate> {
        match self {
            Self::LocalDate(value) => Some(*value),
            _ => None,
        }
    }
}

macro_rules! impl_from_for_field_value {
    ($($source:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$source> for FieldValue {
                fn from(value: $source) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

impl_from_for_field_value! {
    String => String,
    bool => Boolean,
    i8 => Byte,
    i32 => Integer,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    Vec<u8> => Blob,
    NaiveDate => LocalDate,
    NaiveTime => LocalTime,
    NaiveDateTime => LocalDateTime,
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}
