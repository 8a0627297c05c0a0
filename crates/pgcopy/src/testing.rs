//! In-memory backend used by unit tests.
//!
//! Understands exactly the SQL the engine generates (quoted identifiers,
//! `$n` placeholders, `ORDER BY <key columns>`), stores rows per table and
//! records every statement it runs so tests can assert on transaction flow.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::compare::VecCursor;
use crate::core::{
    AccessMode, CatalogReader, ColumnDescriptor, CursorColumn, DataKind, Database, Dialect, Row,
    RowCursor, Session, TriggerRef, Value,
};
use crate::drivers::postgres::PostgresDialect;
use crate::error::{Result, SyncError};

type FailurePredicate = Box<dyn Fn(&str, &[Value]) -> bool + Send>;

#[derive(Default)]
pub(crate) struct MemoryTable {
    pub columns: Vec<ColumnDescriptor>,
    pub primary_key: Vec<String>,
    pub foreign_keys: Vec<String>,
    pub check_refs: Vec<String>,
    pub rows: Vec<BTreeMap<String, Value>>,
}

#[derive(Default)]
pub(crate) struct MemoryState {
    pub tables: BTreeMap<String, MemoryTable>,
    pub generators: BTreeMap<String, i64>,
    pub triggers: Vec<(TriggerRef, bool)>,
    pub log: Vec<String>,
    failures: Vec<FailurePredicate>,
}

impl MemoryState {
    fn fails(&self, sql: &str, params: &[Value]) -> bool {
        self.failures.iter().any(|f| f(sql, params))
    }
}

/// Column descriptor with a type code matching `kind`.
pub(crate) fn column(name: &str, kind: DataKind) -> ColumnDescriptor {
    let (type_code, type_name) = match kind {
        DataKind::String => (1043, "character varying"),
        DataKind::SmallInt => (21, "smallint"),
        DataKind::Int => (23, "integer"),
        DataKind::LargeInt => (20, "bigint"),
        DataKind::Float => (700, "real"),
        DataKind::Double => (701, "double precision"),
        DataKind::Numeric => (1700, "numeric"),
        DataKind::Boolean => (16, "boolean"),
        DataKind::Date => (1082, "date"),
        DataKind::Time => (1083, "time without time zone"),
        DataKind::Timestamp => (1114, "timestamp without time zone"),
        DataKind::TimestampTz => (1184, "timestamp with time zone"),
        DataKind::Blob => (17, "bytea"),
        DataKind::Uuid => (2950, "uuid"),
        DataKind::Unsupported => (3614, "tsvector"),
    };
    ColumnDescriptor {
        name: name.to_string(),
        kind,
        type_code,
        type_name: type_name.to_string(),
        subtype: if kind == DataKind::Numeric { 1 } else { 0 },
        length: if kind == DataKind::String { 40 } else { 0 },
        precision: 0,
        scale: 0,
        not_null: false,
    }
}

/// Identifiers quoted with double quotes, in order of appearance.
pub(crate) fn quoted_idents(sql: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut chars = sql.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '"' {
            continue;
        }
        let mut ident = String::new();
        while let Some(c) = chars.next() {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    ident.push('"');
                } else {
                    break;
                }
            } else {
                ident.push(c);
            }
        }
        out.push(ident);
    }
    out
}

#[derive(Clone)]
pub(crate) struct MemoryDatabase {
    label: String,
    dialect: PostgresDialect,
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryDatabase {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            dialect: PostgresDialect::new(),
            state: Arc::new(Mutex::new(MemoryState::default())),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap()
    }

    pub fn table(self, name: &str, columns: &[(&str, DataKind)], primary_key: &[&str]) -> Self {
        self.state().tables.insert(
            name.to_string(),
            MemoryTable {
                columns: columns.iter().map(|(n, k)| column(n, *k)).collect(),
                primary_key: primary_key.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            },
        );
        self
    }

    pub fn descriptor(self, table: &str, descriptor: ColumnDescriptor) -> Self {
        if let Some(t) = self.state().tables.get_mut(table) {
            t.columns.retain(|c| c.name != descriptor.name);
            t.columns.push(descriptor);
        }
        self
    }

    pub fn foreign_key(self, table: &str, target: &str) -> Self {
        if let Some(t) = self.state().tables.get_mut(table) {
            t.foreign_keys.push(target.to_string());
        }
        self
    }

    pub fn check_ref(self, table: &str, target: &str) -> Self {
        if let Some(t) = self.state().tables.get_mut(table) {
            t.check_refs.push(target.to_string());
        }
        self
    }

    /// Rows given in declared column order.
    pub fn rows(self, table: &str, rows: Vec<Row>) -> Self {
        if let Some(t) = self.state().tables.get_mut(table) {
            for row in rows {
                let map = t
                    .columns
                    .iter()
                    .map(|c| c.name.clone())
                    .zip(row)
                    .collect();
                t.rows.push(map);
            }
        }
        self
    }

    pub fn generator(self, name: &str, value: i64) -> Self {
        self.state().generators.insert(name.to_string(), value);
        self
    }

    pub fn trigger(self, table: &str, name: &str) -> Self {
        self.state().triggers.push((
            TriggerRef {
                table: table.to_string(),
                name: name.to_string(),
            },
            true,
        ));
        self
    }

    /// Make every statement matching `predicate` fail.
    pub fn fail_when<F>(self, predicate: F) -> Self
    where
        F: Fn(&str, &[Value]) -> bool + Send + 'static,
    {
        self.state().failures.push(Box::new(predicate));
        self
    }

    /// Rows of `table` in declared column order, sorted by primary key.
    pub fn table_rows(&self, table: &str) -> Vec<Row> {
        let state = self.state();
        let Some(t) = state.tables.get(table) else {
            return Vec::new();
        };
        let mut rows: Vec<Row> = t
            .rows
            .iter()
            .map(|r| {
                t.columns
                    .iter()
                    .map(|c| r.get(&c.name).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();
        let key: Vec<usize> = t
            .primary_key
            .iter()
            .filter_map(|k| t.columns.iter().position(|c| &c.name == k))
            .collect();
        rows.sort_by(|a, b| {
            key.iter()
                .map(|&i| a[i].compare(&b[i]))
                .find(|o| o.is_ne())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        rows
    }

    pub fn log(&self) -> Vec<String> {
        self.state().log.clone()
    }

    pub fn generator_value(&self, name: &str) -> Option<i64> {
        self.state().generators.get(name).copied()
    }

    pub fn trigger_enabled(&self, name: &str) -> Option<bool> {
        self.state()
            .triggers
            .iter()
            .find(|(t, _)| t.name == name)
            .map(|(_, enabled)| *enabled)
    }
}

fn injected(sql: &str) -> SyncError {
    SyncError::transfer("memory", format!("injected failure: {}", sql))
}

#[async_trait]
impl CatalogReader for MemoryDatabase {
    async fn list_tables(&self) -> Result<Vec<String>> {
        Ok(self.state().tables.keys().cloned().collect())
    }

    async fn table_columns(&self, table: &str) -> Result<Vec<String>> {
        let state = self.state();
        let mut names: Vec<String> = state
            .tables
            .get(table)
            .map(|t| t.columns.iter().map(|c| c.name.clone()).collect())
            .unwrap_or_default();
        names.sort();
        Ok(names)
    }

    async fn primary_key(&self, table: &str) -> Result<Vec<String>> {
        Ok(self
            .state()
            .tables
            .get(table)
            .map(|t| t.primary_key.clone())
            .unwrap_or_default())
    }

    async fn foreign_key_targets(&self, table: &str) -> Result<Vec<String>> {
        Ok(self
            .state()
            .tables
            .get(table)
            .map(|t| t.foreign_keys.clone())
            .unwrap_or_default())
    }

    async fn check_dependencies(&self, table: &str) -> Result<Vec<String>> {
        Ok(self
            .state()
            .tables
            .get(table)
            .map(|t| t.check_refs.clone())
            .unwrap_or_default())
    }

    async fn generators(&self) -> Result<Vec<String>> {
        Ok(self.state().generators.keys().cloned().collect())
    }

    async fn column_descriptor(&self, table: &str, column: &str) -> Result<ColumnDescriptor> {
        self.state()
            .tables
            .get(table)
            .and_then(|t| t.columns.iter().find(|c| c.name == column).cloned())
            .ok_or_else(|| SyncError::metadata(table, format!("no column {}", column)))
    }

    async fn active_triggers(&self) -> Result<Vec<TriggerRef>> {
        Ok(self
            .state()
            .triggers
            .iter()
            .filter(|(_, enabled)| *enabled)
            .map(|(t, _)| t.clone())
            .collect())
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    fn label(&self) -> &str {
        &self.label
    }

    fn dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    async fn session(&self) -> Result<Box<dyn Session>> {
        Ok(Box::new(MemorySession {
            state: Arc::clone(&self.state),
        }))
    }
}

pub(crate) struct MemorySession {
    state: Arc<Mutex<MemoryState>>,
}

impl MemorySession {
    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap()
    }

    fn record(&self, sql: &str, params: &[Value]) -> Result<()> {
        let mut state = self.state();
        if state.fails(sql, params) {
            return Err(injected(sql));
        }
        state.log.push(sql.to_string());
        Ok(())
    }
}

#[async_trait]
impl Session for MemorySession {
    async fn begin(&mut self, mode: AccessMode) -> Result<()> {
        let sql = match mode {
            AccessMode::ReadOnly => "BEGIN READ ONLY",
            AccessMode::ReadWrite => "BEGIN",
        };
        self.record(sql, &[])
    }

    async fn commit(&mut self) -> Result<()> {
        self.record("COMMIT", &[])
    }

    async fn rollback(&mut self) -> Result<()> {
        self.record("ROLLBACK", &[])
    }

    async fn batch_execute(&mut self, sql: &str) -> Result<()> {
        self.record(sql, &[])?;
        if sql.starts_with("ALTER TABLE") && sql.contains(" TRIGGER ") {
            let idents = quoted_idents(sql);
            let enabled = sql.contains(" ENABLE TRIGGER ");
            let mut state = self.state();
            for (t, on) in state.triggers.iter_mut() {
                if idents.len() == 2 && t.table == idents[0] && t.name == idents[1] {
                    *on = enabled;
                }
            }
        }
        Ok(())
    }

    async fn open_cursor(&mut self, sql: &str) -> Result<Box<dyn RowCursor>> {
        let state = self.state();
        if state.fails(sql, &[]) {
            return Err(injected(sql));
        }

        if sql.starts_with("SELECT last_value FROM") {
            let name = quoted_idents(sql).pop().unwrap_or_default();
            let value = state
                .generators
                .get(&name)
                .copied()
                .ok_or_else(|| SyncError::metadata(&name, "no such generator"))?;
            return Ok(Box::new(VecCursor::new(
                vec![CursorColumn::new("last_value", DataKind::LargeInt)],
                vec![vec![Value::LargeInt(value)]],
            )));
        }

        let (head, tail) = sql
            .split_once(" FROM ")
            .ok_or_else(|| SyncError::metadata("memory", format!("unsupported query: {}", sql)))?;
        let columns = quoted_idents(head);
        let table_name = quoted_idents(tail).into_iter().next().unwrap_or_default();
        let table = state
            .tables
            .get(&table_name)
            .ok_or_else(|| SyncError::metadata(&table_name, "no such table"))?;
        let key_len = tail
            .split_once(" ORDER BY ")
            .map(|(_, order)| order.split(',').count())
            .unwrap_or(0);

        let mut cursor_columns = Vec::new();
        for name in &columns {
            let desc = table
                .columns
                .iter()
                .find(|c| &c.name == name)
                .ok_or_else(|| SyncError::metadata(&table_name, format!("no column {}", name)))?;
            cursor_columns.push(CursorColumn::new(name.clone(), desc.kind));
        }
        let mut rows: Vec<Row> = table
            .rows
            .iter()
            .map(|r| {
                columns
                    .iter()
                    .map(|c| r.get(c).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();
        rows.sort_by(|a, b| crate::compare::compare_keys(a, b, key_len));
        Ok(Box::new(VecCursor::new(cursor_columns, rows)))
    }

    async fn parameter_kinds(&mut self, sql: &str) -> Result<Vec<DataKind>> {
        let state = self.state();
        let idents = quoted_idents(sql);
        let Some((table_name, columns)) = idents.split_first() else {
            return Ok(Vec::new());
        };
        let table = state
            .tables
            .get(table_name)
            .ok_or_else(|| SyncError::metadata(table_name, "no such table"))?;
        columns
            .iter()
            .map(|name| {
                table
                    .columns
                    .iter()
                    .find(|c| &c.name == name)
                    .map(|c| c.kind)
                    .ok_or_else(|| SyncError::metadata(table_name, format!("no column {}", name)))
            })
            .collect()
    }

    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64> {
        self.record(sql, params)?;
        let mut state = self.state();
        let idents = quoted_idents(sql);

        if sql.starts_with("SELECT setval(") {
            let name = idents.into_iter().next().unwrap_or_default();
            let value = sql
                .rsplit(", ")
                .next()
                .and_then(|v| v.trim_end_matches(')').trim().parse::<i64>().ok())
                .ok_or_else(|| SyncError::metadata(&name, "bad setval"))?;
            state.generators.insert(name, value);
            return Ok(1);
        }

        let Some((table_name, columns)) = idents.split_first() else {
            return Ok(0);
        };
        let table = state
            .tables
            .get_mut(table_name)
            .ok_or_else(|| SyncError::metadata(table_name, "no such table"))?;

        for (name, value) in columns.iter().zip(params) {
            let kind = table
                .columns
                .iter()
                .find(|c| &c.name == name)
                .map(|c| c.kind)
                .unwrap_or(DataKind::Unsupported);
            if !value.is_null() && value.kind() != kind {
                return Err(SyncError::transfer(
                    table_name,
                    format!("parameter for {} has kind {}, expected {}", name, value.kind(), kind),
                ));
            }
        }

        if sql.starts_with("INSERT") {
            let row: BTreeMap<String, Value> =
                columns.iter().cloned().zip(params.iter().cloned()).collect();
            let duplicate = !table.primary_key.is_empty()
                && table.rows.iter().any(|r| {
                    table.primary_key.iter().all(|k| {
                        matches!((r.get(k), row.get(k)), (Some(a), Some(b)) if a.compare(b).is_eq())
                    })
                });
            if duplicate {
                return Err(SyncError::transfer(table_name, "duplicate key value"));
            }
            table.rows.push(row);
            return Ok(1);
        }

        if sql.starts_with("UPDATE") {
            let set_count = sql
                .split(" WHERE ")
                .next()
                .map(|set| set.matches("= $").count())
                .unwrap_or(0);
            let (set_cols, key_cols) = columns.split_at(set_count.min(columns.len()));
            let (set_vals, key_vals) = params.split_at(set_count.min(params.len()));
            let mut updated = 0;
            for r in table.rows.iter_mut() {
                let matches = key_cols
                    .iter()
                    .zip(key_vals)
                    .all(|(k, v)| r.get(k).map(|x| x.compare(v).is_eq()).unwrap_or(false));
                if matches {
                    for (c, v) in set_cols.iter().zip(set_vals) {
                        r.insert(c.clone(), v.clone());
                    }
                    updated += 1;
                }
            }
            return Ok(updated);
        }

        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_idents() {
        assert_eq!(
            quoted_idents(r#"UPDATE "a""b" SET "x" = $1 WHERE "id" = $2"#),
            vec!["a\"b", "x", "id"]
        );
    }

    #[tokio::test]
    async fn test_insert_then_select_ordered() {
        let db = MemoryDatabase::new("mem").table("t", &[("id", DataKind::Int), ("v", DataKind::String)], &["id"]);
        let mut s = db.session().await.unwrap();
        s.execute(r#"INSERT INTO "t" ("id", "v") VALUES ($1, $2)"#, &[Value::Int(2), Value::from("b")])
            .await
            .unwrap();
        s.execute(r#"INSERT INTO "t" ("id", "v") VALUES ($1, $2)"#, &[Value::Int(1), Value::from("a")])
            .await
            .unwrap();
        let mut c = s.open_cursor(r#"SELECT "id", "v" FROM "t" ORDER BY 1"#).await.unwrap();
        assert_eq!(c.next_row().await.unwrap().unwrap()[0], Value::Int(1));
        assert!(s
            .execute(r#"INSERT INTO "t" ("id", "v") VALUES ($1, $2)"#, &[Value::Int(1), Value::from("z")])
            .await
            .is_err());
    }
}
