//! Connection abstraction.
//!
//! A [`GeneralConnection`] is a live, caller-owned backend connection plus
//! the environment it targets. Implementations ask the connection for the
//! handle they need through capability methods instead of downcasting.

use crate::error::PersistenceError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

#[cfg(feature = "postgresql")]
use crate::Result;
#[cfg(feature = "postgresql")]
use crate::config::ConnectionConfig;
#[cfg(feature = "postgresql")]
use sqlx::{Connection, PgConnection};

/// Deployment environment a connection addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Context {
    /// Live data
    #[serde(rename = "prod")]
    Production,
    /// Shared development area
    #[serde(rename = "dev")]
    Development,
    /// Automated and manual testing area
    #[serde(rename = "test")]
    Testing,
}

impl Context {
    /// Every context.
    pub const ALL: [Context; 3] = [Context::Production, Context::Development, Context::Testing];

    /// Short name: `prod`, `dev` or `test`.
    pub fn short_name(self) -> &'static str {
        match self {
            Self::Production => "prod",
            Self::Development => "dev",
            Self::Testing => "test",
        }
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

impl FromStr for Context {
    type Err = PersistenceError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "prod" | "production" => Ok(Self::Production),
            "dev" | "development" => Ok(Self::Development),
            "test" | "testing" => Ok(Self::Testing),
            other => Err(PersistenceError::configuration(format!(
                "unknown context '{}': expected prod, dev or test",
                other
            ))),
        }
    }
}

/// Database engines a connection can front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatabaseProduct {
    /// IBM Informix
    Informix,
    /// Oracle Database
    Oracle,
    /// PostgreSQL
    PostgreSql,
    /// MySQL or MariaDB
    MySql,
    /// Apache Cassandra
    Cassandra,
}

impl fmt::Display for DatabaseProduct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Informix => "Informix",
            Self::Oracle => "Oracle",
            Self::PostgreSql => "PostgreSQL",
            Self::MySql => "MySQL",
            Self::Cassandra => "Cassandra",
        };
        f.write_str(name)
    }
}

/// A live backend connection bound to one context.
///
/// Connections are owned by the caller and used by one operation at a time.
pub trait GeneralConnection: Send {
    /// Environment this connection addresses.
    fn context(&self) -> Context;

    /// Engine behind the connection.
    fn database_product(&self) -> DatabaseProduct;

    /// Deadline applied to each statement, if any.
    fn statement_timeout(&self) -> Option<Duration> {
        None
    }

    /// PostgreSQL handle, for connections that have one.
    #[cfg(feature = "postgresql")]
    fn as_postgres(&mut self) -> Option<&mut PgConnection> {
        None
    }
}

/// A single PostgreSQL connection.
#[cfg(feature = "postgresql")]
pub struct PgGeneralConnection {
    connection: PgConnection,
    context: Context,
    statement_timeout: Option<Duration>,
}

#[cfg(feature = "postgresql")]
impl fmt::Debug for PgGeneralConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgGeneralConnection")
            .field("context", &self.context)
            .field("statement_timeout", &self.statement_timeout)
            .finish_non_exhaustive()
    }
}

/// Statements run on every connection opened through [`PgGeneralConnection::connect_with`].
#[cfg(feature = "postgresql")]
fn session_settings(config: &ConnectionConfig) -> Vec<String> {
    vec![
        "SET standard_conforming_strings = on".to_string(),
        format!(
            "SET statement_timeout = '{}ms'",
            config.statement_timeout.as_millis()
        ),
        format!(
            "SET application_name = {}",
            crate::postgres::sql::quote_string(&config.application_name)
        ),
        "SET timezone = 'UTC'".to_string(),
    ]
}

#[cfg(feature = "postgresql")]
impl PgGeneralConnection {
    /// Wraps an already-open connection.
    ///
    /// No session settings are applied. Generated literals are escape
    /// strings, so they read the same under any server configuration.
    pub fn new(connection: PgConnection, context: Context) -> Self {
        Self {
            connection,
            context,
            statement_timeout: None,
        }
    }

    /// Builder method to bound every statement by `timeout`.
    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = Some(timeout);
        self
    }

    /// Opens a connection from a `postgres://` URL and applies session settings.
    ///
    /// # Errors
    /// `Configuration` for a malformed URL, `Connection` if the server
    /// cannot be reached within the configured connect timeout.
    pub async fn connect(url: &str, context: Context) -> Result<Self> {
        let config = ConnectionConfig::from_url(url, context)?;
        Self::connect_with(url, &config).await
    }

    /// Opens a connection using an already-parsed configuration.
    pub async fn connect_with(url: &str, config: &ConnectionConfig) -> Result<Self> {
        config.validate()?;

        let connection = tokio::time::timeout(config.connect_timeout, PgConnection::connect(url))
            .await
            .map_err(|_| {
                PersistenceError::connection_failed(
                    config.context,
                    url,
                    std::io::Error::new(
                        std::io::ErrorKind::TimedOut,
                        format!("no connection after {:?}", config.connect_timeout),
                    ),
                )
            })?
            .map_err(|e| PersistenceError::connection_failed(config.context, url, e))?;

        let mut conn = Self::new(connection, config.context)
            .with_statement_timeout(config.statement_timeout);
        conn.apply_session_settings(config, url).await?;

        tracing::debug!("Connected to {} ({} context)", config, config.context);
        Ok(conn)
    }

    async fn apply_session_settings(&mut self, config: &ConnectionConfig, url: &str) -> Result<()> {
        let settings = session_settings(config);
        for statement in &settings {
            sqlx::query(statement)
                .execute(&mut self.connection)
                .await
                .map_err(|e| PersistenceError::connection_failed(self.context, url, e))?;
        }
        Ok(())
    }

    /// Closes the connection gracefully. Dropping it also closes the socket.
    pub async fn close(self) -> Result<()> {
        let context = self.context;
        self.connection
            .close()
            .await
            .map_err(|e| PersistenceError::Connection {
                context,
                target: "closing connection".to_string(),
                source: Box::new(e),
            })
    }
}

#[cfg(feature = "postgresql")]
impl GeneralConnection for PgGeneralConnection {
    fn context(&self) -> Context {
        self.context
    }

    fn database_product(&self) -> DatabaseProduct {
        DatabaseProduct::PostgreSql
    }

    fn statement_timeout(&self) -> Option<Duration> {
        self.statement_timeout
    }

    fn as_postgres(&mut self) -> Option<&mut PgConnection> {
        Some(&mut self.connection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_round_trips_through_short_name() {
        for context in Context::ALL {
            let parsed: Context = context.short_name().parse().unwrap();
            assert_eq!(parsed, context);
        }
        assert_eq!("PRODUCTION".parse::<Context>().unwrap(), Context::Production);
        assert!("staging".parse::<Context>().is_err());
    }

    #[test]
    fn test_context_serializes_short_name() {
        let json = serde_json::to_string(&Context::Development).unwrap();
        assert_eq!(json, "\"dev\"");
        let back: Context = serde_json::from_str("\"test\"").unwrap();
        assert_eq!(back, Context::Testing);
    }

    #[cfg(feature = "postgresql")]
    #[test]
    fn test_session_settings() {
        let mut config = ConnectionConfig::new("localhost".to_string(), Context::Testing)
            .with_statement_timeout(Duration::from_millis(1500));
        config.application_name = "o'neil\\".to_string();
        let settings = session_settings(&config);
        assert_eq!(settings[0], "SET standard_conforming_strings = on");
        assert_eq!(settings[1], "SET statement_timeout = '1500ms'");
        assert_eq!(settings[2], "SET application_name = E'o''neil\\\\'");
        assert_eq!(settings[3], "SET timezone = 'UTC'");
    }

    #[test]
    fn test_product_display() {
        assert_eq!(DatabaseProduct::PostgreSql.to_string(), "PostgreSQL");
        assert_eq!(DatabaseProduct::Cassandra.to_string(), "Cassandra");
    }
}
