//! # pgcopy
//!
//! Dependency-ordered schema diff, data comparison and copy between two
//! PostgreSQL databases.
//!
//! - **Dependency order**: tables are visited after the tables their foreign
//!   keys and check constraints refer to
//! - **Schema diff**: definition lines or CREATE/ALTER TABLE DDL for what the
//!   destination lacks
//! - **Row comparison**: a merge-join over both sides classifying every row as
//!   same, different, missing or extra
//! - **Copy**: transactional inserts with update fallback and keep-going
//!   accounting, destination triggers suspended for the duration
//!
//! ## Example
//!
//! ```rust,no_run
//! use pgcopy::{Config, Operation, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> pgcopy::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let orchestrator = Orchestrator::connect(config, Operation::Compare).await?;
//!     let input = std::io::stdin().lock();
//!     let summary = orchestrator.run(Operation::Compare, input, std::io::stdout()).await?;
//!     eprintln!("Compared {} tables", summary.tables.len());
//!     Ok(())
//! }
//! ```

pub mod compare;
pub mod config;
pub mod core;
pub mod definition;
pub mod dependency;
pub mod drivers;
pub mod error;
pub mod orchestrator;
pub mod report;
pub mod schema_diff;
pub mod transfer;
pub mod typemap;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenient access
pub use compare::{ComparisonCounts, RowClassification};
pub use config::{Config, DatabaseConfig, Operation, RunConfig, ShowRows};
pub use error::{Result, SyncError};
pub use orchestrator::{Orchestrator, RunSummary};
pub use transfer::{CopyOptions, CopyOutcome};
