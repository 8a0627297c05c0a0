//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database rows are read from.
    pub source: DatabaseConfig,

    /// Database rows are written to.
    pub destination: DatabaseConfig,

    /// Run behaviour.
    #[serde(default)]
    pub run: RunConfig,
}

/// Connection settings for one side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database host.
    pub host: String,

    /// Database port (default: 5432).
    #[serde(default = "default_pg_port")]
    pub port: u16,

    /// Database name.
    pub database: String,

    /// Username.
    pub user: String,

    /// Password.
    #[serde(default)]
    pub password: String,

    /// Schema holding the tables and sequences (default: "public").
    #[serde(default = "default_public_schema")]
    pub schema: String,

    /// SSL mode (default: "disable").
    #[serde(default = "default_disable")]
    pub ssl_mode: String,

    /// Maximum pooled connections (default: 4).
    #[serde(default = "default_pool_size")]
    pub max_connections: usize,
}

/// Run behaviour. Every field can be overridden from the command line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Continue past rows that cannot be copied.
    #[serde(default)]
    pub keep_going: bool,

    /// Try an UPDATE by primary key when an INSERT fails.
    #[serde(default)]
    pub update_fallback: bool,

    /// One transaction per side for the whole run.
    #[serde(default)]
    pub single_transaction: bool,

    /// Leave destination triggers enabled while copying.
    #[serde(default)]
    pub fire_triggers: bool,

    /// Omit NOT NULL from generated ALTER TABLE ADD statements.
    #[serde(default)]
    pub relaxed_nulls: bool,

    /// Log generated SQL and every row error.
    #[serde(default)]
    pub verbose: bool,

    /// Commit the destination at every checkpoint.
    #[serde(default)]
    pub commit_on_checkpoint: bool,

    /// Rows between checkpoint notifications (default: 2000).
    #[serde(default = "default_checkpoint_interval")]
    pub checkpoint_interval: u64,

    /// Render reports as HTML.
    #[serde(default)]
    pub html: bool,

    /// Hide HTML tables with nothing to display.
    #[serde(default)]
    pub limited: bool,

    /// Row classes listed in HTML compare reports.
    #[serde(default)]
    pub show: Vec<ShowRows>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            keep_going: false,
            update_fallback: false,
            single_transaction: false,
            fire_triggers: false,
            relaxed_nulls: false,
            verbose: false,
            commit_on_checkpoint: false,
            checkpoint_interval: default_checkpoint_interval(),
            html: false,
            limited: false,
            show: Vec::new(),
        }
    }
}

impl RunConfig {
    /// Bit set of the requested display classes.
    pub fn display_flags(&self) -> u8 {
        self.show.iter().fold(0, |flags, s| flags | s.flag())
    }
}

/// Row classes an HTML compare report can list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShowRows {
    Same,
    Missing,
    Extra,
    Different,
}

impl ShowRows {
    /// Display flag bit: same=1, missing=2, extra=4, different=8.
    pub fn flag(self) -> u8 {
        match self {
            ShowRows::Same => 1,
            ShowRows::Missing => 2,
            ShowRows::Extra => 4,
            ShowRows::Different => 8,
        }
    }
}

/// What a run does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Emit definition lines (or an HTML column comparison).
    Define,
    /// Emit CREATE/ALTER TABLE statements for missing tables and columns.
    Alter,
    /// Copy the tables and generators named on the definition stream.
    Copy,
    /// Define and copy every table in one pass.
    Single,
    /// Compare the rows of the tables named on the definition stream.
    Compare,
}

impl Operation {
    /// Whether the operation writes rows to the destination.
    pub fn writes(self) -> bool {
        matches!(self, Operation::Copy | Operation::Single)
    }

    /// Whether the operation reads definition lines from its input.
    pub fn reads_definitions(self) -> bool {
        matches!(self, Operation::Copy | Operation::Compare)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Define => "define",
            Operation::Alter => "alter",
            Operation::Copy => "copy",
            Operation::Single => "single",
            Operation::Compare => "compare",
        };
        f.write_str(name)
    }
}

fn default_pg_port() -> u16 {
    5432
}

fn default_public_schema() -> String {
    "public".to_string()
}

fn default_disable() -> String {
    "disable".to_string()
}

fn default_pool_size() -> usize {
    4
}

fn default_checkpoint_interval() -> u64 {
    2000
}
