//! Run orchestration.
//!
//! Sequences trigger suspension, transaction scope, dependency traversal and
//! the per-table work of each operation, then handles generators.

use std::collections::BTreeSet;
use std::io::{BufRead, Write};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::compare::{compare_generator_values, compare_table, ComparisonCounts, RowClassification};
use crate::config::{Config, Operation};
use crate::core::{AccessMode, DataKind, Database, Session, TableDescriptor};
use crate::definition::{Definition, DefinitionReader};
use crate::dependency::DependencyForest;
use crate::drivers::PostgresDatabase;
use crate::error::{Result, SyncError};
use crate::report::ReportWriter;
use crate::schema_diff::{alter_statements, diff_table};
use crate::transfer::{copy_generator, copy_table, read_generator, CopyOptions, CopyOutcome};

/// Run orchestrator over a source and a destination database.
pub struct Orchestrator<S = PostgresDatabase, D = PostgresDatabase> {
    config: Config,
    source: S,
    destination: D,
}

/// What one table contributed to a run.
#[derive(Debug, Clone, Serialize)]
pub struct TableSummary {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copy: Option<CopyOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<ComparisonCounts>,
}

/// A table or generator left out of a run.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedObject {
    pub name: String,
    pub reason: String,
}

/// What one generator contributed to a run.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratorSummary {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_value: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_value: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<RowClassification>,
}

/// Result of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Operation that was run.
    pub operation: Operation,

    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// When the run completed.
    pub completed_at: DateTime<Utc>,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// Tables visited, in processing order.
    pub tables: Vec<TableSummary>,

    /// Tables and generators that were skipped.
    pub skipped: Vec<SkippedObject>,

    /// Generators handled after the tables.
    pub generators: Vec<GeneratorSummary>,
}

impl RunSummary {
    fn new(operation: Operation) -> Self {
        let now = Utc::now();
        Self {
            operation,
            started_at: now,
            completed_at: now,
            duration_seconds: 0.0,
            tables: Vec::new(),
            skipped: Vec::new(),
            generators: Vec::new(),
        }
    }

    fn visited(&mut self, name: &str) -> &mut TableSummary {
        self.tables.push(TableSummary {
            name: name.to_string(),
            copy: None,
            comparison: None,
        });
        let last = self.tables.len() - 1;
        &mut self.tables[last]
    }

    fn skip(&mut self, name: &str, reason: impl Into<String>) {
        self.skipped.push(SkippedObject {
            name: name.to_string(),
            reason: reason.into(),
        });
    }

    fn generator(&mut self, source: &str, destination: Option<&str>) -> &mut GeneratorSummary {
        self.generators.push(GeneratorSummary {
            source: source.to_string(),
            destination: destination.map(str::to_string),
            source_value: None,
            destination_value: None,
            classification: None,
        });
        let last = self.generators.len() - 1;
        &mut self.generators[last]
    }

    /// Rows written across all tables.
    pub fn rows_copied(&self) -> u64 {
        self.tables
            .iter()
            .filter_map(|t| t.copy.as_ref())
            .map(|c| c.copied)
            .sum()
    }

    /// Serialize as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Destination triggers disabled for the write phase.
///
/// Holds the statements that re-enable them; [`SuspendedTriggers::restore`]
/// must run on every exit path once anything has been disabled.
#[derive(Default)]
struct SuspendedTriggers {
    enable_statements: Vec<String>,
    restored: bool,
}

impl SuspendedTriggers {
    async fn suspend(&mut self, destination: &dyn Database) -> Result<()> {
        let triggers = destination.active_triggers().await?;
        if triggers.is_empty() {
            return Ok(());
        }
        let dialect = destination.dialect();
        let mut session = destination.session().await?;
        for trigger in &triggers {
            session
                .batch_execute(&dialect.set_trigger_enabled_sql(trigger, false))
                .await?;
            self.enable_statements
                .push(dialect.set_trigger_enabled_sql(trigger, true));
        }
        info!("Suspended {} destination triggers", triggers.len());
        Ok(())
    }

    /// Re-enable every suspended trigger. Returns the statements that failed.
    async fn restore(&mut self, destination: &dyn Database) -> Vec<String> {
        self.restored = true;
        if self.enable_statements.is_empty() {
            return Vec::new();
        }

        let mut session = match destination.session().await {
            Ok(session) => session,
            Err(e) => {
                warn!("Could not open a session to re-enable triggers: {}", e);
                return self.enable_statements.clone();
            }
        };
        let mut failed = Vec::new();
        for statement in &self.enable_statements {
            if let Err(e) = session.batch_execute(statement).await {
                warn!("{}: {}", statement, e);
                failed.push(statement.clone());
            }
        }
        if failed.is_empty() {
            info!("Re-enabled {} destination triggers", self.enable_statements.len());
        }
        failed
    }
}

impl Drop for SuspendedTriggers {
    fn drop(&mut self) {
        if !self.restored && !self.enable_statements.is_empty() {
            warn!(
                "Destination triggers left disabled: {}",
                self.enable_statements.join("; ")
            );
        }
    }
}

/// One session per side for the data phase of a run.
struct Sessions {
    source: Box<dyn Session>,
    destination: Box<dyn Session>,
    /// Both sessions run a single transaction for the whole run.
    shared: bool,
}

impl Sessions {
    async fn open(
        source: &dyn Database,
        destination: &dyn Database,
        shared: bool,
        destination_mode: AccessMode,
    ) -> Result<Self> {
        let mut sessions = Self {
            source: source.session().await?,
            destination: destination.session().await?,
            shared,
        };
        if shared {
            sessions.source.begin(AccessMode::ReadOnly).await?;
            if let Err(e) = sessions.destination.begin(destination_mode).await {
                let _ = sessions.source.rollback().await;
                return Err(e);
            }
        }
        Ok(sessions)
    }

    /// Start a read transaction on both sides unless the run shares one.
    async fn begin_read(&mut self) -> Result<()> {
        if !self.shared {
            self.source.begin(AccessMode::ReadOnly).await?;
            self.destination.begin(AccessMode::ReadOnly).await?;
        }
        Ok(())
    }

    /// End what [`Sessions::begin_read`] started.
    async fn end_read(&mut self) -> Result<()> {
        if !self.shared {
            self.source.commit().await?;
            self.destination.commit().await?;
        }
        Ok(())
    }

    /// Commit or roll back the shared transaction according to `outcome`.
    async fn finish(mut self, outcome: &Result<()>) -> Result<()> {
        if !self.shared {
            return Ok(());
        }
        if outcome.is_ok() {
            self.destination.commit().await?;
            self.source.commit().await?;
            info!("Committed run transaction");
        } else {
            if let Err(e) = self.destination.rollback().await {
                warn!("Rollback of run transaction failed: {}", e);
            }
            let _ = self.source.rollback().await;
        }
        Ok(())
    }
}

impl Orchestrator<PostgresDatabase, PostgresDatabase> {
    /// Validate the configuration for `operation` and connect both sides.
    pub async fn connect(config: Config, operation: Operation) -> Result<Self> {
        config.validate()?;
        config.validate_for(operation)?;
        let source = PostgresDatabase::connect(&config.source, "source").await?;
        let destination = PostgresDatabase::connect(&config.destination, "destination").await?;
        Ok(Self::new(config, source, destination))
    }
}

impl<S: Database, D: Database> Orchestrator<S, D> {
    /// Create an orchestrator over already connected databases.
    pub fn new(config: Config, source: S, destination: D) -> Self {
        Self {
            config,
            source,
            destination,
        }
    }

    /// Run `operation`, reading definition lines from `input` and writing the report to `out`.
    pub async fn run<R: BufRead, W: Write>(
        &self,
        operation: Operation,
        input: R,
        out: W,
    ) -> Result<RunSummary> {
        self.config.validate()?;
        self.config.validate_for(operation)?;

        let started = Instant::now();
        let mut summary = RunSummary::new(operation);
        let mut report = ReportWriter::new(
            out,
            &self.config.run,
            self.source.label(),
            self.destination.label(),
        );
        info!(
            "Starting {}: {} -> {}",
            operation,
            self.source.label(),
            self.destination.label()
        );

        let mut triggers = SuspendedTriggers::default();
        let result = if operation.writes() && !self.config.run.fire_triggers {
            match triggers.suspend(&self.destination).await {
                Ok(()) => self.dispatch(operation, input, &mut report, &mut summary).await,
                Err(e) => Err(e),
            }
        } else {
            self.dispatch(operation, input, &mut report, &mut summary).await
        };

        let failed = triggers.restore(&self.destination).await;
        let recovery = if failed.is_empty() {
            Ok(())
        } else {
            report.trigger_recovery(&failed)
        };
        result?;
        recovery?;

        summary.completed_at = Utc::now();
        summary.duration_seconds = started.elapsed().as_secs_f64();
        info!(
            "Finished {} in {:.2}s: {} tables, {} skipped, {} generators",
            operation,
            summary.duration_seconds,
            summary.tables.len(),
            summary.skipped.len(),
            summary.generators.len()
        );
        Ok(summary)
    }

    async fn dispatch<R: BufRead, W: Write>(
        &self,
        operation: Operation,
        input: R,
        report: &mut ReportWriter<W>,
        summary: &mut RunSummary,
    ) -> Result<()> {
        match operation {
            Operation::Define | Operation::Alter => self.schema_pass(operation, report, summary).await,
            Operation::Single => {
                let mut sessions = self.open_sessions(AccessMode::ReadWrite).await?;
                let result = self.single_pass(&mut sessions, report, summary).await;
                sessions.finish(&result).await?;
                result
            }
            Operation::Copy => {
                let mut sessions = self.open_sessions(AccessMode::ReadWrite).await?;
                let result = self.copy_pass(&mut sessions, input, report, summary).await;
                sessions.finish(&result).await?;
                result
            }
            Operation::Compare => {
                let mut sessions = self.open_sessions(AccessMode::ReadOnly).await?;
                let result = self.compare_pass(&mut sessions, input, report, summary).await;
                sessions.finish(&result).await?;
                result
            }
        }
    }

    async fn open_sessions(&self, destination_mode: AccessMode) -> Result<Sessions> {
        Sessions::open(
            &self.source,
            &self.destination,
            self.config.run.single_transaction,
            destination_mode,
        )
        .await
    }

    fn copy_options(&self) -> CopyOptions {
        CopyOptions::from_run(&self.config.run)
    }

    /// Source tables in dependency order.
    async fn ordered_tables(&self) -> Result<Vec<String>> {
        let tables = self.source.list_tables().await?;
        info!("Found {} tables in {}", tables.len(), self.source.label());
        let forest = DependencyForest::build(&self.source, &tables).await?;
        let order = forest.post_order();
        debug!("Table order: {}", order.join(", "));
        Ok(order)
    }

    /// Source generators paired with the destination generator of the same name.
    async fn paired_generators(&self) -> Result<Vec<(String, Option<String>)>> {
        let destination: BTreeSet<String> =
            self.destination.generators().await?.into_iter().collect();
        Ok(self
            .source
            .generators()
            .await?
            .into_iter()
            .map(|g| {
                let paired = destination.contains(&g).then(|| g.clone());
                (g, paired)
            })
            .collect())
    }

    // -- define / alter ---------------------------------------------------

    async fn schema_pass<W: Write>(
        &self,
        operation: Operation,
        report: &mut ReportWriter<W>,
        summary: &mut RunSummary,
    ) -> Result<()> {
        report.begin_schema(operation)?;
        let tables = self.ordered_tables().await?;
        for name in &tables {
            let table = diff_table(&self.source, &self.destination, name).await?;
            summary.visited(name);
            if operation == Operation::Define {
                report.table_definition(&table)?;
                continue;
            }
            match alter_statements(
                &self.source,
                self.destination.dialect(),
                &table,
                self.config.run.relaxed_nulls,
            )
            .await
            {
                Ok(Some(ddl)) => report.table_alteration(&table, &ddl)?,
                Ok(None) => {}
                Err(SyncError::Metadata { message, .. }) => {
                    warn!("Skipping table {}: {}", name, message);
                    summary.skip(name, message);
                }
                Err(e) => return Err(e),
            }
        }

        let generators = self.paired_generators().await?;
        for (generator, destination) in &generators {
            report.generator_definition(operation, generator, destination.as_deref())?;
            summary.generator(generator, destination.as_deref());
        }
        report.end_schema(tables.len(), generators.len())
    }

    // -- single -----------------------------------------------------------

    async fn single_pass<W: Write>(
        &self,
        sessions: &mut Sessions,
        report: &mut ReportWriter<W>,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let mut options = self.copy_options();
        options.update_fallback = false;

        for name in self.ordered_tables().await? {
            let table = diff_table(&self.source, &self.destination, &name).await?;
            if table.common.is_empty() {
                report.no_common_fields(&name)?;
                summary.skip(&name, "no common fields");
                continue;
            }
            self.copy_one(sessions, &table, &options, report, summary)
                .await?;
        }

        for (generator, destination) in self.paired_generators().await? {
            match destination {
                Some(destination) => {
                    self.copy_one_generator(&generator, &destination, report, summary)
                        .await?
                }
                None => {
                    warn!("Generator {} does not exist in destination db, skipping.", generator);
                    summary.skip(&generator, "not found in destination");
                }
            }
        }
        Ok(())
    }

    // -- copy -------------------------------------------------------------

    async fn copy_pass<R: BufRead, W: Write>(
        &self,
        sessions: &mut Sessions,
        input: R,
        report: &mut ReportWriter<W>,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let options = self.copy_options();
        for definition in DefinitionReader::new(input) {
            match definition? {
                Definition::Table {
                    name,
                    columns,
                    filter,
                } => {
                    let table = self.described(&name, columns, filter).await?;
                    self.copy_one(sessions, &table, &options, report, summary)
                        .await?;
                }
                Definition::Generator {
                    source,
                    destination,
                } => {
                    self.copy_one_generator(&source, &destination, report, summary)
                        .await?
                }
            }
        }
        Ok(())
    }

    async fn described(
        &self,
        name: &str,
        columns: Vec<String>,
        filter: Option<String>,
    ) -> Result<TableDescriptor> {
        let primary_key = self.source.primary_key(name).await?;
        let mut text_keys = Vec::new();
        for key in &primary_key {
            if self.source.column_descriptor(name, key).await?.kind == DataKind::String {
                text_keys.push(key.clone());
            }
        }
        Ok(TableDescriptor::with_columns(name, columns)
            .with_primary_key(primary_key)
            .with_text_keys(text_keys)
            .with_filter(filter))
    }

    async fn copy_one<W: Write>(
        &self,
        sessions: &mut Sessions,
        table: &TableDescriptor,
        options: &CopyOptions,
        report: &mut ReportWriter<W>,
        summary: &mut RunSummary,
    ) -> Result<()> {
        report.copy_started(&table.name)?;
        let outcome = copy_table(
            sessions.source.as_mut(),
            sessions.destination.as_mut(),
            self.destination.dialect(),
            table,
            options,
        )
        .await?;
        report.copy_finished(&outcome)?;
        info!("{}: {}", table.name, outcome.summary_line());
        summary.visited(&table.name).copy = Some(outcome);
        Ok(())
    }

    async fn copy_one_generator<W: Write>(
        &self,
        source: &str,
        destination: &str,
        report: &mut ReportWriter<W>,
        summary: &mut RunSummary,
    ) -> Result<()> {
        match copy_generator(&self.source, &self.destination, source, destination).await {
            Ok(value) => {
                report.generator_copied(source, destination, value)?;
                let entry = summary.generator(source, Some(destination));
                entry.source_value = Some(value);
                entry.destination_value = Some(value);
                Ok(())
            }
            Err(SyncError::Metadata { message, .. }) => {
                warn!("Skipping generator {}: {}", source, message);
                summary.skip(source, message);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    // -- compare ----------------------------------------------------------

    async fn compare_pass<R: BufRead, W: Write>(
        &self,
        sessions: &mut Sessions,
        input: R,
        report: &mut ReportWriter<W>,
        summary: &mut RunSummary,
    ) -> Result<()> {
        report.begin_compare()?;
        for definition in DefinitionReader::new(input) {
            match definition? {
                Definition::Table {
                    name,
                    columns,
                    filter,
                } => {
                    let table = self.described(&name, columns, filter).await?;
                    self.compare_one(sessions, &table, report, summary).await?;
                }
                Definition::Generator {
                    source,
                    destination,
                } => {
                    self.compare_one_generator(sessions, &source, &destination, report, summary)
                        .await?
                }
            }
        }
        report.end_compare()
    }

    async fn compare_one<W: Write>(
        &self,
        sessions: &mut Sessions,
        table: &TableDescriptor,
        report: &mut ReportWriter<W>,
        summary: &mut RunSummary,
    ) -> Result<()> {
        sessions.begin_read().await?;
        let result = compare_table(
            sessions.source.as_mut(),
            sessions.destination.as_mut(),
            self.source.dialect(),
            table,
            report,
        )
        .await;
        sessions.end_read().await?;

        match result {
            Ok(comparison) => {
                report.compare_finished(&comparison.counts)?;
                summary.visited(&table.name).comparison = Some(comparison.counts);
                Ok(())
            }
            Err(SyncError::Metadata { message, .. }) => {
                warn!("Skipping table {}: {}", table.name, message);
                report.table_skipped(&table.name, &message)?;
                summary.skip(&table.name, message);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn compare_one_generator<W: Write>(
        &self,
        sessions: &mut Sessions,
        source: &str,
        destination: &str,
        report: &mut ReportWriter<W>,
        summary: &mut RunSummary,
    ) -> Result<()> {
        sessions.begin_read().await?;
        let values = async {
            let src = read_generator(sessions.source.as_mut(), self.source.dialect(), source).await?;
            let dst = read_generator(
                sessions.destination.as_mut(),
                self.destination.dialect(),
                destination,
            )
            .await?;
            Ok::<_, SyncError>((src, dst))
        }
        .await;
        sessions.end_read().await?;

        let (src, dst) = match values {
            Ok(values) => values,
            Err(SyncError::Metadata { message, .. }) => {
                warn!("Skipping generator {}: {}", source, message);
                summary.skip(source, message);
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        let classification = compare_generator_values(src, dst).await?;
        report.generator_compared(source, src, dst, classification)?;
        let entry = summary.generator(source, Some(destination));
        entry.source_value = Some(src);
        entry.destination_value = Some(dst);
        entry.classification = Some(classification);
        Ok(())
    }
}
