//! Core persistence abstractions for Strata.
//!
//! This crate provides the schema metamodel, dialect-neutral selection
//! criteria and the backend implementation contract shared by every
//! application that stores data through Strata. One logical schema is
//! mapped onto three physically separate environments (production,
//! development and testing) chosen by the connection's [`Context`].
//!
//! # Architecture
//! - Tables and fields are declared once at startup and shared immutably
//! - Criteria are validated against their table when they are built
//! - Backends implement [`Implementation`]; callers never see driver errors
//! - Non-production contexts can never address production schemas

pub mod config;
pub mod connection;
pub mod constraint;
pub mod criteria;
pub mod error;
pub mod implementation;
pub mod logging;
pub mod record;
pub mod registry;
pub mod schema;
pub mod types;
pub mod validation;

#[cfg(feature = "postgresql")]
pub mod postgres;

// Re-export commonly used types
pub use config::ConnectionConfig;
pub use connection::{Context, DatabaseProduct, GeneralConnection};
pub use constraint::{ConstraintKind, FieldConstraint, FloatingPointAllow};
pub use criteria::{
    BooleanMatchType, Comparison, FieldCriterion, NumericMatchType, SelectionCriteria,
    StringMatchType, TemporalMatchType,
};
pub use error::{PersistenceError, Result};
pub use implementation::{Implementation, TableValidationAction};
pub use record::{FieldUpdate, Record, UpdatedValues};
pub use registry::TableRegistry;
pub use schema::{Field, Table, TableBuilder};
pub use types::{FieldRole, FieldType, FieldValue};
pub use validation::{
    DatabaseValidationResult, TableValidationStatus, TableValidity, ValidationStatus,
};

#[cfg(feature = "postgresql")]
pub use connection::PgGeneralConnection;
#[cfg(feature = "postgresql")]
pub use postgres::PostgresImplementation;
