//! Process-wide collection of declared tables.

use crate::error::{PersistenceError, Result};
use crate::schema::Table;
use std::sync::Arc;

/// Tables declared at startup, in registration order.
///
/// Lookups are by logical `(schema, name)`; a pair may be registered only
/// once.
#[derive(Debug, Default, Clone)]
pub struct TableRegistry {
    tables: Vec<Arc<Table>>,
}

impl TableRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table.
    ///
    /// # Errors
    /// `Configuration` if a table with the same schema and name exists.
    pub fn register(&mut self, table: Arc<Table>) -> Result<()> {
        if self.get(table.schema(), table.name()).is_some() {
            return Err(PersistenceError::configuration(format!(
                "table '{}' is already registered",
                table.qualified_name()
            )));
        }
        tracing::debug!("Registered table {}", table.qualified_name());
        self.tables.push(table);
        Ok(())
    }

    /// Looks up a table by logical schema and name.
    pub fn get(&self, schema: &str, name: &str) -> Option<&Arc<Table>> {
        self.tables
            .iter()
            .find(|t| t.schema() == schema && t.name() == name)
    }

    /// Tables grouped under `tablespace`.
    pub fn in_tablespace<'a>(&'a self, tablespace: &'a str) -> impl Iterator<Item = &'a Arc<Table>> + 'a {
        self.tables.iter().filter(move |t| t.tablespace() == tablespace)
    }

    /// All tables in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Table>> {
        self.tables.iter()
    }

    /// Number of registered tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
