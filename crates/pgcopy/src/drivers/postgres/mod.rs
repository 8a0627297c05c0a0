//! PostgreSQL driver.
//!
//! - [`PostgresDialect`]: SQL syntax strategy for PostgreSQL
//! - [`PostgresDatabase`]: pooled connections plus catalog queries for one schema
//! - [`PostgresSession`]: one connection running explicit transactions

mod catalog;
mod dialect;
mod session;

use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod};
use tracing::{info, warn};

use crate::config::DatabaseConfig;
use crate::core::{CatalogReader, ColumnDescriptor, Database, Dialect, Session, TriggerRef};
use crate::drivers::common::TlsBuilder;
use crate::error::{Result, SyncError};

pub use dialect::PostgresDialect;
pub use session::{PostgresCursor, PostgresSession};

/// One side of a run: a connection pool scoped to a schema.
pub struct PostgresDatabase {
    pool: Pool,
    schema: String,
    label: String,
    dialect: PostgresDialect,
}

impl PostgresDatabase {
    /// Build the pool and check that a connection can be made.
    ///
    /// `side` names the database in errors ("source" or "destination").
    pub async fn connect(config: &DatabaseConfig, side: &str) -> Result<Self> {
        let pg_config = config.pg_config();
        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };

        let tls = TlsBuilder::parse(&config.ssl_mode)?;
        let mgr = match tls.build()? {
            Some(connector) => Manager::from_config(pg_config, connector, mgr_config),
            None => {
                warn!(
                    "TLS is disabled for the {} database. Credentials will be transmitted in plaintext.",
                    side
                );
                Manager::from_config(pg_config, tokio_postgres::NoTls, mgr_config)
            }
        };
        let pool = Pool::builder(mgr)
            .max_size(config.max_connections.max(1))
            .build()
            .map_err(|e| SyncError::pool(e, format!("creating {} pool", side)))?;

        // Test connection
        let client = pool
            .get()
            .await
            .map_err(|e| SyncError::connection(side, e))?;
        client
            .simple_query("SELECT 1")
            .await
            .map_err(|e| SyncError::connection(side, e))?;

        info!(
            "Connected to {} database: {}:{}/{} (schema {})",
            side, config.host, config.port, config.database, config.schema
        );

        Ok(Self {
            pool,
            schema: config.schema.clone(),
            label: config.label(),
            dialect: PostgresDialect::new(),
        })
    }

    async fn client(&self) -> Result<Object> {
        self.pool
            .get()
            .await
            .map_err(|e| SyncError::pool(e, format!("getting connection for {}", self.label)))
    }

    /// Run a catalog query and collect its first column as names.
    async fn names(&self, sql: &str, table: Option<&str>) -> Result<Vec<String>> {
        let client = self.client().await?;
        let rows = match table {
            Some(table) => client.query(sql, &[&self.schema, &table]).await?,
            None => client.query(sql, &[&self.schema]).await?,
        };
        Ok(rows.iter().map(|r| r.get::<_, String>(0)).collect())
    }
}

#[async_trait]
impl CatalogReader for PostgresDatabase {
    async fn list_tables(&self) -> Result<Vec<String>> {
        self.names(catalog::LIST_TABLES, None).await
    }

    async fn table_columns(&self, table: &str) -> Result<Vec<String>> {
        self.names(catalog::TABLE_COLUMNS, Some(table)).await
    }

    async fn primary_key(&self, table: &str) -> Result<Vec<String>> {
        self.names(catalog::PRIMARY_KEY, Some(table)).await
    }

    async fn foreign_key_targets(&self, table: &str) -> Result<Vec<String>> {
        self.names(catalog::FOREIGN_KEY_TARGETS, Some(table)).await
    }

    async fn check_dependencies(&self, table: &str) -> Result<Vec<String>> {
        self.names(catalog::CHECK_DEPENDENCIES, Some(table)).await
    }

    async fn generators(&self) -> Result<Vec<String>> {
        self.names(catalog::GENERATORS, None).await
    }

    async fn column_descriptor(&self, table: &str, column: &str) -> Result<ColumnDescriptor> {
        let client = self.client().await?;
        let row = client
            .query_opt(catalog::COLUMN_DESCRIPTOR, &[&self.schema, &table, &column])
            .await?
            .ok_or_else(|| SyncError::metadata(table, format!("column {} not found", column)))?;

        Ok(catalog::decode_descriptor(
            column,
            row.get::<_, u32>(0),
            row.get::<_, i32>(1),
            row.get::<_, bool>(2),
            row.get::<_, String>(3),
        ))
    }

    async fn active_triggers(&self) -> Result<Vec<TriggerRef>> {
        let client = self.client().await?;
        let rows = client.query(catalog::ACTIVE_TRIGGERS, &[&self.schema]).await?;
        Ok(rows
            .iter()
            .map(|r| TriggerRef {
                table: r.get(0),
                name: r.get(1),
            })
            .collect())
    }
}

#[async_trait]
impl Database for PostgresDatabase {
    fn label(&self) -> &str {
        &self.label
    }

    fn dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    async fn session(&self) -> Result<Box<dyn Session>> {
        let client = self.client().await?;
        client
            .batch_execute(&format!(
                "SET search_path TO {}",
                self.dialect.quote_ident(&self.schema)
            ))
            .await?;
        Ok(Box::new(PostgresSession::new(client)))
    }
}
