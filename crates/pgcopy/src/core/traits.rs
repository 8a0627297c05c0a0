//! Core traits for database-agnostic comparison and copying.
//!
//! This module defines the seams between the algorithms and a concrete engine:
//!
//! - [`CatalogReader`]: read-only catalog queries (tables, columns, keys, dependencies)
//! - [`Database`]: a catalog plus a factory for transactional [`Session`]s
//! - [`Session`]: transactions, savepoints, cursors and parameterised statements
//! - [`RowCursor`]: a forward-only stream of rows
//! - [`Dialect`]: SQL syntax strategy (quoting, placeholders, engine-specific DDL)
//!
//! The resolver, comparator, executor and differ only ever see these traits,
//! which is what lets them run against the in-memory backend in tests.

use async_trait::async_trait;

use crate::error::Result;

use super::schema::{ColumnDescriptor, TriggerRef};
use super::value::{DataKind, Row, Value};

/// Transaction access mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    ReadWrite,
}

/// Name and kind of a result column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorColumn {
    pub name: String,
    pub kind: DataKind,
}

impl CursorColumn {
    pub fn new(name: impl Into<String>, kind: DataKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Forward-only row stream produced by [`Session::open_cursor`].
#[async_trait]
pub trait RowCursor: Send {
    /// Result columns, available before the first fetch.
    fn columns(&self) -> &[CursorColumn];

    /// Fetch the next row, or `None` once the stream is exhausted.
    async fn next_row(&mut self) -> Result<Option<Row>>;
}

/// One connection to a database, used by a single task at a time.
///
/// Transactions are explicit: nothing is committed unless [`Session::commit`]
/// is called.
#[async_trait]
pub trait Session: Send {
    /// Start a transaction.
    async fn begin(&mut self, mode: AccessMode) -> Result<()>;

    /// Commit the current transaction.
    async fn commit(&mut self) -> Result<()>;

    /// Roll back the current transaction.
    async fn rollback(&mut self) -> Result<()>;

    /// Run one or more statements without parameters or results.
    async fn batch_execute(&mut self, sql: &str) -> Result<()>;

    /// Run a query and return its rows as a cursor.
    async fn open_cursor(&mut self, sql: &str) -> Result<Box<dyn RowCursor>>;

    /// Kinds of the positional parameters of `sql`, in order.
    async fn parameter_kinds(&mut self, sql: &str) -> Result<Vec<DataKind>>;

    /// Execute a statement with positional parameters; returns affected rows.
    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64>;

    /// Open a failure boundary inside the current transaction.
    async fn savepoint(&mut self, name: &str) -> Result<()> {
        self.batch_execute(&format!("SAVEPOINT {}", name)).await
    }

    /// Undo everything since the named failure boundary.
    async fn rollback_to_savepoint(&mut self, name: &str) -> Result<()> {
        self.batch_execute(&format!("ROLLBACK TO SAVEPOINT {}", name))
            .await
    }

    /// Close the named failure boundary, keeping its work.
    async fn release_savepoint(&mut self, name: &str) -> Result<()> {
        self.batch_execute(&format!("RELEASE SAVEPOINT {}", name))
            .await
    }
}

/// Read-only catalog queries against one database.
///
/// Names are returned exactly as the catalog stores them.
#[async_trait]
pub trait CatalogReader: Send + Sync {
    /// User tables, excluding views and system relations, ordered by name.
    async fn list_tables(&self) -> Result<Vec<String>>;

    /// Non-computed column names of `table`, ordered by name. Empty if the
    /// table does not exist.
    async fn table_columns(&self, table: &str) -> Result<Vec<String>>;

    /// Primary-key column names in key order (empty if none).
    async fn primary_key(&self, table: &str) -> Result<Vec<String>>;

    /// Tables referenced by foreign keys of `table`.
    async fn foreign_key_targets(&self, table: &str) -> Result<Vec<String>>;

    /// Tables referenced by check constraints of `table`.
    async fn check_dependencies(&self, table: &str) -> Result<Vec<String>>;

    /// User generators (sequences), ordered by name.
    async fn generators(&self) -> Result<Vec<String>>;

    /// Type descriptor of one column.
    async fn column_descriptor(&self, table: &str, column: &str) -> Result<ColumnDescriptor>;

    /// Enabled user triggers.
    async fn active_triggers(&self) -> Result<Vec<TriggerRef>>;
}

/// A database the engine can read from or write to.
#[async_trait]
pub trait Database: CatalogReader {
    /// `user@host:database`, for reports and log lines.
    fn label(&self) -> &str;

    /// SQL syntax of this engine.
    fn dialect(&self) -> &dyn Dialect;

    /// Open a new session.
    async fn session(&self) -> Result<Box<dyn Session>>;
}

/// SQL dialect abstraction for engine-specific syntax.
pub trait Dialect: Send + Sync {
    /// Dialect name (e.g., "postgres").
    fn name(&self) -> &str;

    /// Quote an identifier.
    fn quote_ident(&self, name: &str) -> String;

    /// Placeholder for the 1-based parameter `index`.
    fn param_placeholder(&self, index: usize) -> String;

    /// ORDER BY term that sorts a text expression by its bytes.
    fn byte_order(&self, expr: &str) -> String;

    /// Query returning the current value of a generator as one row, one column.
    fn generator_value_sql(&self, generator: &str) -> String;

    /// Statement setting a generator to `value`.
    fn set_generator_sql(&self, generator: &str, value: i64) -> String;

    /// Statement enabling or disabling a trigger.
    fn set_trigger_enabled_sql(&self, trigger: &TriggerRef, enabled: bool) -> String;
}
