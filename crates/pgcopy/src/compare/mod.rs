//! Merge-join row comparison.
//!
//! Two cursors running the same query, ordered by the same primary-key
//! columns, are advanced in lock step and every row is classified as
//! same, different, missing (source only) or extra (destination only).

use std::cmp::Ordering;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{CursorColumn, DataKind, Dialect, Row, RowCursor, Session, TableDescriptor, Value};
use crate::error::{Result, SyncError};

/// Classification of one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowClassification {
    Same,
    Different,
    Missing,
    Extra,
}

/// A classified row, handed to the per-row callback.
#[derive(Debug, Clone, Copy)]
pub enum RowEvent<'a> {
    Same(&'a Row),
    Different {
        source: &'a Row,
        destination: &'a Row,
    },
    Missing(&'a Row),
    Extra(&'a Row),
}

impl RowEvent<'_> {
    pub fn classification(&self) -> RowClassification {
        match self {
            RowEvent::Same(_) => RowClassification::Same,
            RowEvent::Different { .. } => RowClassification::Different,
            RowEvent::Missing(_) => RowClassification::Missing,
            RowEvent::Extra(_) => RowClassification::Extra,
        }
    }
}

/// Row counts per classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonCounts {
    pub same: u64,
    pub different: u64,
    pub missing: u64,
    pub extra: u64,
}

impl ComparisonCounts {
    fn record(&mut self, class: RowClassification) {
        match class {
            RowClassification::Same => self.same += 1,
            RowClassification::Different => self.different += 1,
            RowClassification::Missing => self.missing += 1,
            RowClassification::Extra => self.extra += 1,
        }
    }

    /// Count for one classification.
    pub fn get(&self, class: RowClassification) -> u64 {
        match class {
            RowClassification::Same => self.same,
            RowClassification::Different => self.different,
            RowClassification::Missing => self.missing,
            RowClassification::Extra => self.extra,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Fetching,
    Comparing,
    DrainSource,
    DrainDest,
    Done,
}

/// Compare two cursors ordered by their first `key_len` columns.
///
/// `on_row` sees every classified row as it is produced; an error from it
/// stops the comparison.
pub async fn compare_cursors<F>(
    source: &mut dyn RowCursor,
    destination: &mut dyn RowCursor,
    key_len: usize,
    mut on_row: F,
) -> Result<ComparisonCounts>
where
    F: FnMut(RowEvent<'_>) -> Result<()>,
{
    let mut counts = ComparisonCounts::default();

    // A row held here was fetched but not yet classified.
    let mut pending_source: Option<Row> = None;
    let mut pending_dest: Option<Row> = None;
    let mut state = State::Fetching;

    loop {
        state = match state {
            State::Fetching => {
                if pending_source.is_none() {
                    pending_source = source.next_row().await?;
                }
                if pending_dest.is_none() {
                    pending_dest = destination.next_row().await?;
                }
                match (&pending_source, &pending_dest) {
                    (Some(_), Some(_)) => State::Comparing,
                    (Some(_), None) => State::DrainSource,
                    (None, Some(_)) => State::DrainDest,
                    (None, None) => State::Done,
                }
            }
            State::Comparing => {
                let (Some(src), Some(dst)) = (pending_source.take(), pending_dest.take()) else {
                    state = State::Fetching;
                    continue;
                };
                match compare_keys(&src, &dst, key_len) {
                    Ordering::Less => {
                        emit(&mut on_row, &mut counts, RowEvent::Missing(&src))?;
                        pending_dest = Some(dst);
                    }
                    Ordering::Greater => {
                        emit(&mut on_row, &mut counts, RowEvent::Extra(&dst))?;
                        pending_source = Some(src);
                    }
                    Ordering::Equal => {
                        if first_difference(&src, &dst, key_len).is_some() {
                            emit(
                                &mut on_row,
                                &mut counts,
                                RowEvent::Different {
                                    source: &src,
                                    destination: &dst,
                                },
                            )?;
                        } else {
                            emit(&mut on_row, &mut counts, RowEvent::Same(&src))?;
                        }
                    }
                }
                State::Fetching
            }
            State::DrainSource => {
                if let Some(row) = pending_source.take() {
                    emit(&mut on_row, &mut counts, RowEvent::Missing(&row))?;
                }
                while let Some(row) = source.next_row().await? {
                    emit(&mut on_row, &mut counts, RowEvent::Missing(&row))?;
                }
                State::Done
            }
            State::DrainDest => {
                if let Some(row) = pending_dest.take() {
                    emit(&mut on_row, &mut counts, RowEvent::Extra(&row))?;
                }
                while let Some(row) = destination.next_row().await? {
                    emit(&mut on_row, &mut counts, RowEvent::Extra(&row))?;
                }
                State::Done
            }
            State::Done => break,
        };
    }

    Ok(counts)
}

fn emit<F>(on_row: &mut F, counts: &mut ComparisonCounts, event: RowEvent<'_>) -> Result<()>
where
    F: FnMut(RowEvent<'_>) -> Result<()>,
{
    counts.record(event.classification());
    on_row(event)
}

/// Compare the key prefix of two rows column by column.
pub fn compare_keys(source: &Row, destination: &Row, key_len: usize) -> Ordering {
    source
        .iter()
        .zip(destination.iter())
        .take(key_len)
        .map(|(s, d)| s.compare(d))
        .find(|o| *o != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

/// Index of the first non-key column whose values differ.
pub fn first_difference(source: &Row, destination: &Row, key_len: usize) -> Option<usize> {
    source
        .iter()
        .zip(destination.iter())
        .enumerate()
        .skip(key_len)
        .find(|(_, (s, d))| s.compare(d) != Ordering::Equal)
        .map(|(i, _)| i)
}

/// Fail if a key column cannot be ordered (blobs and unsupported kinds).
pub fn check_key_columns(table: &str, columns: &[CursorColumn], key_len: usize) -> Result<()> {
    for column in columns.iter().take(key_len) {
        if !column.kind.is_comparable_key() {
            return Err(SyncError::metadata(
                table,
                format!(
                    "primary key column {} is of kind {} and cannot be compared",
                    column.name, column.kind
                ),
            ));
        }
    }
    Ok(())
}

/// Columns and counts of one compared table.
#[derive(Debug, Clone)]
pub struct TableComparison {
    pub columns: Vec<CursorColumn>,
    pub counts: ComparisonCounts,
}

/// Receiver of the rows of one table comparison.
pub trait ComparisonSink {
    /// Called with the result columns before the first row is classified.
    fn start(&mut self, table: &TableDescriptor, columns: &[CursorColumn]) -> Result<()>;

    /// Called for every classified row.
    fn row(&mut self, event: RowEvent<'_>) -> Result<()>;
}

/// Run the comparison query for `table` on both sessions and classify the rows.
pub async fn compare_table(
    source: &mut dyn Session,
    destination: &mut dyn Session,
    dialect: &dyn Dialect,
    table: &TableDescriptor,
    sink: &mut dyn ComparisonSink,
) -> Result<TableComparison> {
    if table.primary_key.is_empty() {
        return Err(SyncError::metadata(&table.name, "table has no primary key"));
    }
    let key_len = table.primary_key.len();
    let sql = table.compare_sql(dialect);
    debug!("Compare query for {}: {}", table.name, sql);

    let mut src = source.open_cursor(&sql).await?;
    let mut dst = destination.open_cursor(&sql).await?;
    let columns = src.columns().to_vec();
    check_key_columns(&table.name, &columns, key_len)?;
    check_key_columns(&table.name, dst.columns(), key_len)?;

    sink.start(table, &columns)?;
    let counts =
        compare_cursors(src.as_mut(), dst.as_mut(), key_len, |event| sink.row(event)).await?;
    Ok(TableComparison { columns, counts })
}

/// Compare two generator values as a one-row comparison without key columns.
pub async fn compare_generator_values(source: i64, destination: i64) -> Result<RowClassification> {
    let columns = vec![CursorColumn::new("value", DataKind::LargeInt)];
    let mut src = VecCursor::new(columns.clone(), vec![vec![Value::LargeInt(source)]]);
    let mut dst = VecCursor::new(columns, vec![vec![Value::LargeInt(destination)]]);
    let counts = compare_cursors(&mut src, &mut dst, 0, |_| Ok(())).await?;
    Ok(if counts.same == 1 {
        RowClassification::Same
    } else {
        RowClassification::Different
    })
}

/// Cursor over rows already held in memory.
#[derive(Debug, Clone)]
pub struct VecCursor {
    columns: Vec<CursorColumn>,
    rows: std::vec::IntoIter<Row>,
}

impl VecCursor {
    pub fn new(columns: Vec<CursorColumn>, rows: Vec<Row>) -> Self {
        Self {
            columns,
            rows: rows.into_iter(),
        }
    }
}

#[async_trait]
impl RowCursor for VecCursor {
    fn columns(&self) -> &[CursorColumn] {
        &self.columns
    }

    async fn next_row(&mut self) -> Result<Option<Row>> {
        Ok(self.rows.next())
    }
}
