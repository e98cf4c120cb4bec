//! PostgreSQL client implementation
//!
//! Connection pooling through deadpool, TLS through native-tls according to
//! the configured `ssl_mode`.

use crate::config::schema::PostgreSQLConfig;
use crate::domain::{Result, SyncError};
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use secrecy::ExposeSecret;
use std::time::Duration;
use tokio_postgres::{NoTls, Row};

/// PostgreSQL client for profile-sync storage
pub struct PostgresClient {
    pool: Pool,
    config: PostgreSQLConfig,
}

impl PostgresClient {
    /// Create a new PostgreSQL client
    ///
    /// # Errors
    ///
    /// Returns an error if the connection string is invalid or the pool
    /// cannot be built. No connection is opened here.
    pub async fn new(config: PostgreSQLConfig) -> Result<Self> {
        let pg_config: tokio_postgres::Config = config
            .connection_string
            .expose_secret()
            .parse()
            .map_err(|e| {
                SyncError::Configuration(format!("Invalid PostgreSQL connection string: {e}"))
            })?;

        let manager_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };

        let manager = match config.ssl_mode.as_str() {
            "disable" => Manager::from_config(pg_config, NoTls, manager_config),
            mode => {
                let mut pg_config = pg_config;
                pg_config.ssl_mode(if mode == "require" {
                    tokio_postgres::config::SslMode::Require
                } else {
                    tokio_postgres::config::SslMode::Prefer
                });
                let connector = TlsConnector::builder().build().map_err(|e| {
                    SyncError::Configuration(format!("Failed to build TLS connector: {e}"))
                })?;
                Manager::from_config(pg_config, MakeTlsConnector::new(connector), manager_config)
            }
        };

        let timeout = Duration::from_secs(config.connection_timeout_seconds);
        let pool = Pool::builder(manager)
            .max_size(config.max_connections)
            .wait_timeout(Some(timeout))
            .create_timeout(Some(timeout))
            .recycle_timeout(Some(timeout))
            .runtime(deadpool_postgres::Runtime::Tokio1)
            .build()
            .map_err(|e| SyncError::Storage(format!("Failed to create connection pool: {e}")))?;

        Ok(Self { pool, config })
    }

    /// Test the connection to PostgreSQL
    pub async fn test_connection(&self) -> Result<()> {
        let client = self.get_connection().await?;
        client
            .query_one("SELECT 1", &[])
            .await
            .map_err(|e| SyncError::Storage(format!("Connection test failed: {e}")))?;

        tracing::info!("PostgreSQL connection test successful");
        Ok(())
    }

    /// Creates the tables and indexes if they don't exist
    pub async fn ensure_schema(&self) -> Result<()> {
        let client = self.get_connection().await?;

        let migration_sql = include_str!("../../../migrations/001_initial_schema.sql");
        client
            .batch_execute(migration_sql)
            .await
            .map_err(|e| SyncError::Storage(format!("Failed to execute migration: {e}")))?;

        tracing::info!("PostgreSQL schema initialized successfully");
        Ok(())
    }

    /// Get a connection from the pool
    pub async fn get_connection(&self) -> Result<deadpool_postgres::Object> {
        self.pool
            .get()
            .await
            .map_err(|e| SyncError::Storage(format!("Failed to get connection from pool: {e}")))
    }

    async fn prepared_connection(&self) -> Result<deadpool_postgres::Object> {
        let client = self.get_connection().await?;
        let timeout_query = format!(
            "SET statement_timeout = {}",
            self.config.statement_timeout_seconds * 1000
        );
        client
            .batch_execute(&timeout_query)
            .await
            .map_err(|e| SyncError::Storage(format!("Failed to set statement timeout: {e}")))?;
        Ok(client)
    }

    /// Execute a query and return rows
    pub async fn query(
        &self,
        query: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> Result<Vec<Row>> {
        self.prepared_connection()
            .await?
            .query(query, params)
            .await
            .map_err(|e| SyncError::Storage(format!("Query failed: {e}")))
    }

    /// Execute a statement and return the number of affected rows
    pub async fn execute(
        &self,
        statement: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> Result<u64> {
        self.prepared_connection()
            .await?
            .execute(statement, params)
            .await
            .map_err(|e| SyncError::Storage(format!("Statement execution failed: {e}")))
    }

    /// Connection target with the credentials redacted
    pub fn connection_string_safe(&self) -> String {
        redact_connection_string(self.config.connection_string.expose_secret().as_ref())
    }

    pub fn pool_status(&self) -> deadpool_postgres::Status {
        self.pool.status()
    }
}

fn redact_connection_string(connection_string: &str) -> String {
    connection_string
        .rsplit_once('@')
        .map(|(_, host)| format!("postgresql://***@{host}"))
        .unwrap_or_else(|| "postgresql://***".to_string())
}
