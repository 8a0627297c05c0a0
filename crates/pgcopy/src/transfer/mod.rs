//! Row copy executor.
//!
//! Streams the SELECT of a table from the source and replays every row as
//! an INSERT on the destination, optionally falling back to an UPDATE by
//! primary key. Rows that fail are either fatal or counted, depending on
//! the keep-going policy.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::RunConfig;
use crate::core::{AccessMode, Database, DataKind, Dialect, Row, Session, TableDescriptor, Value};
use crate::error::{Result, SyncError};

/// Savepoint wrapping each row when failures are tolerated.
const ROW_SAVEPOINT: &str = "pgcopy_row";

/// Policy for copying one table.
#[derive(Debug, Clone)]
pub struct CopyOptions {
    /// Count failed rows instead of aborting.
    pub keep_going: bool,

    /// Try an UPDATE by primary key when an INSERT fails.
    pub update_fallback: bool,

    /// Log SQL text and every row error.
    pub verbose: bool,

    /// Commit the destination at every checkpoint.
    pub commit_on_checkpoint: bool,

    /// Rows between checkpoints.
    pub checkpoint_interval: u64,

    /// Begin and commit a transaction per table on both sessions.
    /// Off when the caller holds one transaction for the whole run.
    pub per_table_transactions: bool,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            keep_going: false,
            update_fallback: false,
            verbose: false,
            commit_on_checkpoint: false,
            checkpoint_interval: 2000,
            per_table_transactions: true,
        }
    }
}

impl CopyOptions {
    pub fn from_run(run: &RunConfig) -> Self {
        Self {
            keep_going: run.keep_going,
            update_fallback: run.update_fallback,
            verbose: run.verbose,
            commit_on_checkpoint: run.commit_on_checkpoint,
            checkpoint_interval: run.checkpoint_interval.max(1),
            per_table_transactions: !run.single_transaction,
        }
    }
}

/// Result of copying one table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyOutcome {
    /// Rows written, including partial ones.
    pub copied: u64,
    /// Rows written with at least one column replaced by NULL.
    pub partial: u64,
    /// Rows that could not be written at all.
    pub failed: u64,
    /// The destination transaction for this table was committed.
    pub committed: bool,
}

impl CopyOutcome {
    /// `N records copied[ (M only partially)][ and commited][. Failed to copy K records].`
    pub fn summary_line(&self) -> String {
        let mut line = format!("{} records copied", self.copied);
        if self.partial > 0 {
            line.push_str(&format!(" ({} only partially)", self.partial));
        }
        if self.committed {
            line.push_str(" and commited");
        }
        if self.failed > 0 {
            line.push_str(&format!(". Failed to copy {} records", self.failed));
        }
        line.push('.');
        line
    }
}

/// Statements and parameter layout for one table.
struct CopyPlan<'a> {
    table: &'a TableDescriptor,
    columns: Vec<String>,
    select: String,
    insert: String,
    update: Option<String>,
    /// Update parameter slot of the WHERE clause for each selected column in the key.
    key_slots: Vec<Option<usize>>,
}

impl<'a> CopyPlan<'a> {
    fn new(table: &'a TableDescriptor, dialect: &dyn Dialect, options: &CopyOptions) -> Self {
        let columns = table.columns();
        let update = if options.update_fallback {
            let sql = table.update_sql(dialect);
            if sql.is_none() {
                warn!("{}: no primary key, update fallback disabled", table.name);
            }
            sql
        } else {
            None
        };
        let key_slots = columns
            .iter()
            .map(|c| {
                table
                    .primary_key
                    .iter()
                    .position(|k| k == c)
                    .map(|k| columns.len() + k)
            })
            .collect();
        Self {
            table,
            select: table.select_sql(dialect),
            insert: table.insert_sql(dialect),
            update,
            key_slots,
            columns,
        }
    }

    fn update_len(&self) -> usize {
        self.columns.len() + self.table.primary_key.len()
    }
}

/// Copy every row of `table` from `source` to `destination`.
pub async fn copy_table(
    source: &mut dyn Session,
    destination: &mut dyn Session,
    dialect: &dyn Dialect,
    table: &TableDescriptor,
    options: &CopyOptions,
) -> Result<CopyOutcome> {
    let plan = CopyPlan::new(table, dialect, options);
    if options.verbose {
        info!("{}", plan.select);
        info!("{}", plan.insert);
        if let Some(ref update) = plan.update {
            info!("{}", update);
        }
    }

    if !options.per_table_transactions {
        return copy_rows(source, destination, &plan, options).await;
    }

    source.begin(AccessMode::ReadOnly).await?;
    if let Err(e) = destination.begin(AccessMode::ReadWrite).await {
        let _ = source.rollback().await;
        return Err(e);
    }

    match copy_rows(source, destination, &plan, options).await {
        Ok(mut outcome) => {
            destination.commit().await?;
            source.commit().await?;
            outcome.committed = true;
            Ok(outcome)
        }
        Err(e) => {
            if let Err(rollback) = destination.rollback().await {
                warn!("{}: rollback failed: {}", table.name, rollback);
            }
            let _ = source.rollback().await;
            Err(e)
        }
    }
}

async fn copy_rows(
    source: &mut dyn Session,
    destination: &mut dyn Session,
    plan: &CopyPlan<'_>,
    options: &CopyOptions,
) -> Result<CopyOutcome> {
    let table = &plan.table.name;
    let kinds = destination.parameter_kinds(&plan.insert).await?;
    if kinds.len() != plan.columns.len() {
        return Err(SyncError::transfer(
            table,
            format!(
                "insert expects {} parameters, {} columns selected",
                kinds.len(),
                plan.columns.len()
            ),
        ));
    }

    let guarded = options.keep_going || plan.update.is_some();
    let mut cursor = source.open_cursor(&plan.select).await?;
    let mut outcome = CopyOutcome::default();
    let mut rows: u64 = 0;

    while let Some(row) = cursor.next_row().await? {
        rows += 1;
        let bound = bind_row(plan, &kinds, row, options)?;

        if guarded {
            if let Err(e) = execute_guarded(destination, plan, &bound).await {
                if !options.keep_going {
                    return Err(SyncError::transfer(table, format!("row {}: {}", rows, e)));
                }
                if options.verbose {
                    warn!("{}: row {} failed: {}", table, rows, e);
                } else {
                    debug!("{}: row {} failed: {}", table, rows, e);
                }
                outcome.failed += 1;
                continue;
            }
        } else {
            destination
                .execute(&plan.insert, &bound.insert)
                .await
                .map_err(|e| SyncError::transfer(table, format!("row {}: {}", rows, e)))?;
        }

        if bound.partial {
            outcome.partial += 1;
        }

        if rows % options.checkpoint_interval == 0 {
            info!("Checkpoint at {} rows", rows);
            if options.commit_on_checkpoint {
                destination.commit().await?;
                destination.begin(AccessMode::ReadWrite).await?;
            }
        }
    }

    outcome.copied = rows - outcome.failed;
    Ok(outcome)
}

struct BoundRow {
    insert: Vec<Value>,
    update: Option<Vec<Value>>,
    partial: bool,
}

/// Convert one source row into insert and update parameters.
///
/// A NULL source value leaves every slot it maps to NULL. A value that
/// cannot be converted is fatal unless keep-going is set, in which case
/// NULL is bound and the row is marked partial.
fn bind_row(
    plan: &CopyPlan<'_>,
    kinds: &[DataKind],
    row: Row,
    options: &CopyOptions,
) -> Result<BoundRow> {
    let mut bound = BoundRow {
        insert: vec![Value::Null; plan.columns.len()],
        update: plan.update.as_ref().map(|_| vec![Value::Null; plan.update_len()]),
        partial: false,
    };

    for (i, value) in row.into_iter().enumerate().take(plan.columns.len()) {
        if value.is_null() {
            continue;
        }
        let converted = match value.coerce_to(kinds[i]) {
            Ok(v) => v,
            Err(e) => {
                if !options.keep_going {
                    return Err(SyncError::transfer(
                        &plan.table.name,
                        format!("column {}: {}", plan.columns[i], e),
                    ));
                }
                if options.verbose {
                    warn!("{}.{}: {}", plan.table.name, plan.columns[i], e);
                }
                bound.partial = true;
                continue;
            }
        };
        if let Some(ref mut update) = bound.update {
            update[i] = converted.clone();
            if let Some(slot) = plan.key_slots[i] {
                update[slot] = converted.clone();
            }
        }
        bound.insert[i] = converted;
    }

    Ok(bound)
}

/// INSERT inside a savepoint, then UPDATE if the insert fails and a fallback exists.
async fn execute_guarded(
    destination: &mut dyn Session,
    plan: &CopyPlan<'_>,
    bound: &BoundRow,
) -> Result<()> {
    destination.savepoint(ROW_SAVEPOINT).await?;

    let mut result = destination.execute(&plan.insert, &bound.insert).await.map(|_| ());
    if let Err(ref insert_error) = result {
        destination.rollback_to_savepoint(ROW_SAVEPOINT).await?;
        if let (Some(sql), Some(params)) = (&plan.update, &bound.update) {
            debug!("{}: insert failed ({}), trying update", plan.table.name, insert_error);
            result = destination.execute(sql, params).await.map(|_| ());
            if result.is_err() {
                destination.rollback_to_savepoint(ROW_SAVEPOINT).await?;
            }
        }
    }

    destination.release_savepoint(ROW_SAVEPOINT).await?;
    result
}

/// Current value of `generator` read through `session`.
pub async fn read_generator(
    session: &mut dyn Session,
    dialect: &dyn Dialect,
    generator: &str,
) -> Result<i64> {
    let mut cursor = session
        .open_cursor(&dialect.generator_value_sql(generator))
        .await?;
    cursor
        .next_row()
        .await?
        .and_then(|row| row.first().and_then(Value::as_i64))
        .ok_or_else(|| SyncError::metadata(generator, "generator has no value"))
}

/// Copy the value of a source generator to a destination generator.
///
/// Uses dedicated sessions on both sides, each committed immediately.
pub async fn copy_generator(
    source: &dyn Database,
    destination: &dyn Database,
    source_name: &str,
    destination_name: &str,
) -> Result<i64> {
    let mut reader = source.session().await?;
    reader.begin(AccessMode::ReadOnly).await?;
    let value = read_generator(reader.as_mut(), source.dialect(), source_name).await;
    reader.commit().await?;
    let value = value?;

    let mut writer = destination.session().await?;
    writer.begin(AccessMode::ReadWrite).await?;
    let sql = destination.dialect().set_generator_sql(destination_name, value);
    debug!("{}", sql);
    if let Err(e) = writer.execute(&sql, &[]).await {
        let _ = writer.rollback().await;
        return Err(e);
    }
    writer.commit().await?;
    Ok(value)
}
