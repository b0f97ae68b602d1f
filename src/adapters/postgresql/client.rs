//! PostgreSQL client implementation
//!
//! This module provides the pooled client for the relational tier.

use crate::config::schema::PostgreSQLConfig;
use crate::domain::{Result, TierflowError};
use deadpool_postgres::{
    Manager, ManagerConfig, Object, Pool, PoolError, RecyclingMethod, Status,
};
use postgres_native_tls::MakeTlsConnector;
use secrecy::ExposeSecret;
use std::time::Duration;
use tokio_postgres::config::SslMode;
use tokio_postgres::error::SqlState;
use tokio_postgres::types::ToSql;
use tokio_postgres::{NoTls, Row};

/// PostgreSQL client for Tierflow
///
/// Owns the connection pool for one pipeline run. Every operation borrows a
/// connection that goes back to the pool when dropped; [`close`](Self::close)
/// shuts the pool down.
pub struct PostgreSQLClient {
    /// Connection pool
    pool: Pool,

    /// Configuration
    config: PostgreSQLConfig,
}

impl PostgreSQLClient {
    /// Create a new PostgreSQL client
    ///
    /// No connection is opened until the first operation.
    ///
    /// # Arguments
    ///
    /// * `config` - PostgreSQL configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS connector or the pool cannot be built.
    pub async fn new(config: PostgreSQLConfig) -> Result<Self> {
        let mut pg_config = tokio_postgres::Config::new();
        pg_config
            .host(&config.host)
            .port(config.port)
            .dbname(&config.database)
            .user(&config.user)
            .password(config.password.expose_secret().as_str())
            .connect_timeout(Duration::from_secs(config.connection_timeout_seconds));

        let manager_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };

        let manager = match config.ssl_mode.as_str() {
            "disable" => {
                pg_config.ssl_mode(SslMode::Disable);
                Manager::from_config(pg_config, NoTls, manager_config)
            }
            mode => {
                pg_config.ssl_mode(if mode == "require" {
                    SslMode::Require
                } else {
                    SslMode::Prefer
                });
                let connector = native_tls::TlsConnector::builder().build().map_err(|e| {
                    TierflowError::Configuration(format!("Failed to build TLS connector: {}", e))
                })?;
                Manager::from_config(pg_config, MakeTlsConnector::new(connector), manager_config)
            }
        };

        let timeout = Some(Duration::from_secs(config.connection_timeout_seconds));
        let pool = Pool::builder(manager)
            .max_size(config.max_connections)
            .wait_timeout(timeout)
            .create_timeout(timeout)
            .recycle_timeout(timeout)
            .runtime(deadpool_postgres::Runtime::Tokio1)
            .build()
            .map_err(|e| {
                TierflowError::Database(format!("Failed to create connection pool: {}", e))
            })?;

        tracing::debug!(
            target_db = %config.connection_string_safe(),
            max_connections = config.max_connections,
            "PostgreSQL pool created"
        );

        Ok(Self { pool, config })
    }

    /// Test the connection to PostgreSQL
    ///
    /// # Returns
    ///
    /// The server version string
    pub async fn test_connection(&self) -> Result<String> {
        let client = self.get_connection().await?;

        let row = client
            .query_one("SELECT version()", &[])
            .await
            .map_err(|e| self.map_query_error(e, "connection test"))?;
        let version: String = row
            .try_get(0)
            .map_err(|e| TierflowError::Database(format!("Connection test failed: {}", e)))?;

        tracing::info!(version = %version, "PostgreSQL connection test successful");
        Ok(version)
    }

    /// Get a connection from the pool with the statement timeout applied
    ///
    /// # Errors
    ///
    /// Returns `Timeout` if the pool wait expires, `Authentication` if the
    /// server rejects the credentials and `Connection` for any other failure
    /// to reach the server.
    pub async fn get_connection(&self) -> Result<Object> {
        let client = self.pool.get().await.map_err(|e| self.map_pool_error(e))?;

        client
            .batch_execute(&format!(
                "SET statement_timeout = {}",
                self.config.statement_timeout_seconds * 1000
            ))
            .await
            .map_err(|e| self.map_query_error(e, "set statement timeout"))?;

        Ok(client)
    }

    /// Execute a query and return rows
    ///
    /// # Arguments
    ///
    /// * `query` - SQL query
    /// * `params` - Query parameters
    pub async fn query(&self, query: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Vec<Row>> {
        let client = self.get_connection().await?;
        client
            .query(query, params)
            .await
            .map_err(|e| self.map_query_error(e, "query"))
    }

    /// Execute a statement and return the number of affected rows
    ///
    /// # Arguments
    ///
    /// * `statement` - SQL statement
    /// * `params` - Statement parameters
    pub async fn execute(&self, statement: &str, params: &[&(dyn ToSql + Sync)]) -> Result<u64> {
        let client = self.get_connection().await?;
        client
            .execute(statement, params)
            .await
            .map_err(|e| self.map_query_error(e, "statement"))
    }

    /// Host and port of the server
    pub fn endpoint(&self) -> String {
        self.config.endpoint()
    }

    /// Get the connection string (without password)
    pub fn connection_string_safe(&self) -> String {
        self.config.connection_string_safe()
    }

    /// Get the pool statistics
    pub fn pool_status(&self) -> Status {
        self.pool.status()
    }

    /// Close the pool; idle connections are dropped and later gets fail
    pub fn close(&self) {
        self.pool.close();
        tracing::debug!(endpoint = %self.endpoint(), "PostgreSQL pool closed");
    }

    /// Whether [`close`](Self::close) has been called
    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    pub(crate) fn map_pool_error(&self, err: PoolError) -> TierflowError {
        match err {
            PoolError::Timeout(kind) => TierflowError::Timeout {
                endpoint: self.endpoint(),
                operation: format!("acquire connection ({:?})", kind),
            },
            PoolError::Backend(e) => {
                let auth_failed = e.code().is_some_and(|code| {
                    *code == SqlState::INVALID_PASSWORD
                        || *code == SqlState::INVALID_AUTHORIZATION_SPECIFICATION
                });
                if auth_failed {
                    TierflowError::Authentication(format!(
                        "PostgreSQL rejected credentials for {}: {}",
                        self.connection_string_safe(),
                        e
                    ))
                } else {
                    TierflowError::Connection {
                        endpoint: self.endpoint(),
                        message: e.to_string(),
                    }
                }
            }
            PoolError::Closed => TierflowError::Connection {
                endpoint: self.endpoint(),
                message: "connection pool is closed".to_string(),
            },
            other => TierflowError::Connection {
                endpoint: self.endpoint(),
                message: other.to_string(),
            },
        }
    }

    pub(crate) fn map_query_error(&self, err: tokio_postgres::Error, operation: &str) -> TierflowError {
        if err.code() == Some(&SqlState::QUERY_CANCELED) {
            return TierflowError::Timeout {
                endpoint: self.endpoint(),
                operation: operation.to_string(),
            };
        }
        if err.is_closed() {
            return TierflowError::Connection {
                endpoint: self.endpoint(),
                message: err.to_string(),
            };
        }
        TierflowError::Database(format!("{} failed: {}", operation, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::secret_string;

    fn config(ssl_mode: &str) -> PostgreSQLConfig {
        PostgreSQLConfig {
            host: "127.0.0.1".to_string(),
            port: 9,
            database: "nppes".to_string(),
            user: "postgres".to_string(),
            password: secret_string("password".to_string()),
            max_connections: 2,
            connection_timeout_seconds: 2,
            statement_timeout_seconds: 60,
            ssl_mode: ssl_mode.to_string(),
        }
    }

    #[tokio::test]
    async fn test_connection_string_safe() {
        let client = PostgreSQLClient::new(config("disable")).await.unwrap();
        let safe_str = client.connection_string_safe();
        assert!(!safe_str.contains("password@"));
        assert!(safe_str.contains("127.0.0.1:9/nppes"));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_connection_error() {
        let client = PostgreSQLClient::new(config("disable")).await.unwrap();
        let err = client.test_connection().await.unwrap_err();
        assert!(matches!(
            err,
            TierflowError::Connection { .. } | TierflowError::Timeout { .. }
        ));
        assert_eq!(err.exit_code(), 4);
    }

    #[tokio::test]
    async fn test_close_marks_pool_closed() {
        let client = PostgreSQLClient::new(config("require")).await.unwrap();
        assert!(!client.is_closed());
        client.close();
        assert!(client.is_closed());
        assert_eq!(client.pool_status().size, 0);
    }
}
