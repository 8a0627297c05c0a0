//! Error types for the sync library.

use thiserror::Error;

/// Process exit code for usage and configuration errors.
pub const EXIT_USAGE: u8 = 1;
/// Process exit code for connection failures.
pub const EXIT_CONNECTION: u8 = 2;
/// Process exit code for database-level faults during a run.
pub const EXIT_DATABASE: u8 = 3;
/// Process exit code for anything else.
pub const EXIT_OTHER: u8 = 4;

/// Main error type for sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid combination of operation and options
    #[error("Usage error: {0}")]
    Usage(String),

    /// Could not connect to one side
    #[error("Connection to {side} database failed: {message}")]
    Connection { side: String, message: String },

    /// Database query or statement error
    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    /// Connection pool error with context
    #[error("Pool error: {message}\n  Context: {context}")]
    Pool { message: String, context: String },

    /// Catalog data that makes a table unusable (the table is skipped)
    #[error("Metadata error for table {table}: {message}")]
    Metadata { table: String, message: String },

    /// Copying a table was aborted
    #[error("Copy failed for table {table}: {message}")]
    Transfer { table: String, message: String },

    /// A value could not be converted to the destination kind
    #[error(transparent)]
    Conversion(#[from] crate::core::value::ConversionError),

    /// IO error (file operations, report output)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SyncError {
    /// Create a Pool error with context about where it occurred
    pub fn pool(message: impl ToString, context: impl Into<String>) -> Self {
        SyncError::Pool {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Create a Connection error for one side
    pub fn connection(side: impl Into<String>, message: impl ToString) -> Self {
        SyncError::Connection {
            side: side.into(),
            message: message.to_string(),
        }
    }

    /// Create a Metadata error
    pub fn metadata(table: impl Into<String>, message: impl Into<String>) -> Self {
        SyncError::Metadata {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create a Transfer error
    pub fn transfer(table: impl Into<String>, message: impl Into<String>) -> Self {
        SyncError::Transfer {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            SyncError::Config(_) | SyncError::Usage(_) | SyncError::Yaml(_) => EXIT_USAGE,
            SyncError::Connection { .. } | SyncError::Pool { .. } => EXIT_CONNECTION,
            SyncError::Database(_)
            | SyncError::Metadata { .. }
            | SyncError::Transfer { .. }
            | SyncError::Conversion(_) => EXIT_DATABASE,
            SyncError::Io(_) | SyncError::Json(_) => EXIT_OTHER,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
