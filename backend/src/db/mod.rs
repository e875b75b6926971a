//! # Database Module
//!
//! PostgreSQL storage for the LifeVault backend. The schema holds:
//!
//! - Users (owners, nominees, admins)
//! - Assets and trading accounts
//! - Nominees and their allocation percentages
//! - Vault requests and the documents attached to them
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      DATABASE LAYER                              │
//! │                                                                  │
//! │  ┌──────────────────────────────────────────────────────────┐   │
//! │  │                   Connection Pool                         │   │
//! │  │                  (deadpool-postgres)                      │   │
//! │  └──────────────────────────────────────────────────────────┘   │
//! │                              │                                   │
//! │         ┌──────────────┬─────┴────────┬──────────────┐          │
//! │         ▼              ▼              ▼              ▼          │
//! │  ┌────────────┐ ┌────────────┐ ┌────────────┐ ┌────────────┐   │
//! │  │   users    │ │  assets    │ │  nominees  │ │  vault_    │   │
//! │  │            │ │  trading_  │ │            │ │  requests  │   │
//! │  │            │ │  accounts  │ │            │ │  documents │   │
//! │  └────────────┘ └────────────┘ └────────────┘ └────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod models;
pub mod queries;

use deadpool_postgres::{Config, Pool, Runtime};
use tokio_postgres::error::SqlState;
use tokio_postgres::{Config as TokioConfig, NoTls};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Database-related errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to connect to the database
    #[error("Database connection failed: {0}")]
    ConnectionError(String),

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryError(tokio_postgres::Error),

    /// A unique constraint rejected the write
    #[error("Duplicate value: {0}")]
    UniqueViolation(String),

    /// A stored value could not be mapped back to a model
    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    /// Migration failed
    #[error("Migration failed: {0}")]
    MigrationError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

impl From<tokio_postgres::Error> for DatabaseError {
    fn from(e: tokio_postgres::Error) -> Self {
        if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
            let detail = e
                .as_db_error()
                .and_then(|db| db.constraint().map(str::to_string))
                .unwrap_or_else(|| e.to_string());
            return DatabaseError::UniqueViolation(detail);
        }
        DatabaseError::QueryError(e)
    }
}

impl From<models::UnknownVariant> for DatabaseError {
    fn from(e: models::UnknownVariant) -> Self {
        DatabaseError::InvalidData(e.to_string())
    }
}

/// Database connection wrapper.
///
/// Wraps the deadpool connection pool. Cloning is cheap; all clones share
/// the same pool.
///
/// ## Usage
///
/// ```rust,ignore
/// let db = Database::connect("postgres://...").await?;
/// let user = queries::find_user_by_email(db.pool(), "asha@example.com").await?;
/// ```
#[derive(Clone)]
pub struct Database {
    pool: Pool,
}

impl Database {
    /// Connect to the PostgreSQL database.
    ///
    /// Creates a pool of at most 10 connections and runs `SELECT 1`
    /// to make sure the server is reachable.
    pub async fn connect(database_url: &str) -> Result<Self, DatabaseError> {
        info!("Connecting to database...");

        let tokio_config = database_url
            .parse::<TokioConfig>()
            .map_err(|e| DatabaseError::ConfigError(format!("Invalid database URL: {}", e)))?;

        let mut config = Config::new();

        if let Some(dbname) = tokio_config.get_dbname() {
            config.dbname = Some(dbname.to_string());
        }
        if let Some(user) = tokio_config.get_user() {
            config.user = Some(user.to_string());
        }
        if let Some(password) = tokio_config.get_password() {
            config.password = Some(String::from_utf8_lossy(password).to_string());
        }
        if let Some(tokio_postgres::config::Host::Tcp(host)) = tokio_config.get_hosts().first() {
            config.host = Some(host.clone());
        }
        if let Some(port) = tokio_config.get_ports().first() {
            config.port = Some(*port);
        }

        config.pool = Some(deadpool_postgres::PoolConfig {
            max_size: 10,
            ..Default::default()
        });

        let pool = config
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        let client = pool
            .get()
            .await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        client
            .query("SELECT 1", &[])
            .await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        info!("Database connection established");

        Ok(Self { pool })
    }

    /// Apply the schema file at `path` (`~` is expanded).
    ///
    /// The whole file runs as one batch. Errors about objects that already
    /// exist are tolerated so the service can restart against a migrated
    /// database.
    pub async fn run_migrations(&self, path: &str) -> Result<(), DatabaseError> {
        let expanded = shellexpand::full(path)
            .map_err(|e| DatabaseError::MigrationError(format!("Invalid migrations path: {}", e)))?;

        info!("Running database migrations from {}", expanded);

        let migration_sql = std::fs::read_to_string(expanded.as_ref()).map_err(|e| {
            error!("Could not read migration file {}: {}", expanded, e);
            DatabaseError::MigrationError(format!("Could not read {}: {}", expanded, e))
        })?;

        let cleaned_sql = strip_sql_comments(&migration_sql);
        debug!("Executing migration SQL ({} bytes)", cleaned_sql.len());

        let client = self
            .pool
            .get()
            .await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        match client.batch_execute(&cleaned_sql).await {
            Ok(()) => {
                info!("Migrations completed successfully");
                Ok(())
            }
            Err(e) => {
                // 42P07 = duplicate_table, 42710 = duplicate_object
                let already_exists = e
                    .code()
                    .map(|code| *code == SqlState::DUPLICATE_TABLE || *code == SqlState::DUPLICATE_OBJECT)
                    .unwrap_or(false)
                    || e.to_string().contains("already exists");

                if already_exists {
                    warn!("Some database objects already exist, continuing: {}", e);
                    Ok(())
                } else {
                    let detail = e
                        .as_db_error()
                        .and_then(|db| db.detail())
                        .unwrap_or("no detail");
                    error!("Migration execution error: {} ({})", e, detail);
                    Err(DatabaseError::MigrationError(format!("{} ({})", e, detail)))
                }
            }
        }
    }

    /// Whether a pooled connection can be checked out.
    pub async fn ping(&self) -> bool {
        match self.pool.get().await {
            Ok(client) => client.query_one("SELECT 1", &[]).await.is_ok(),
            Err(e) => {
                warn!("Database ping failed: {}", e);
                false
            }
        }
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool {
        &self.pool
    }
}

/// Drop full-line and trailing `--` comments, keeping statement layout.
fn strip_sql_comments(sql: &str) -> String {
    sql.lines()
        .map(|line| {
            if line.trim_start().starts_with("--") {
                ""
            } else if let Some(pos) = line.find("--") {
                line[..pos].trim_end()
            } else {
                line.trim_end()
            }
        })
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

pub use models::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_sql_comments() {
        let sql = "-- header\nCREATE TABLE t (\n  id UUID PRIMARY KEY -- key\n);\n\n";
        assert_eq!(strip_sql_comments(sql), "CREATE TABLE t (\n  id UUID PRIMARY KEY\n);");
    }
}
