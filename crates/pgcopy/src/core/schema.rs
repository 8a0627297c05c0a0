//! Table, column and trigger metadata, and the SQL text derived from it.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::traits::Dialect;
use super::value::DataKind;

/// Type descriptor of a single catalog column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name.
    pub name: String,
    /// Kind used for conversion and comparison.
    pub kind: DataKind,
    /// Catalog type code.
    pub type_code: u32,
    /// Catalog type name, used when the code has no fixed mapping.
    pub type_name: String,
    /// 1 = NUMERIC, 2 = DECIMAL for fixed-point columns, 0 otherwise.
    pub subtype: i16,
    /// Declared length for character types (0 if unbounded).
    pub length: i32,
    /// Declared precision for fixed-point types (0 if unset).
    pub precision: i32,
    /// Scale; negative for fixed-point values (true value = integer * 10^scale).
    pub scale: i32,
    /// Declared NOT NULL.
    pub not_null: bool,
}

impl ColumnDescriptor {
    /// Fixed-point column, i.e. stored as a scaled integer.
    pub fn is_fixed_point(&self) -> bool {
        self.kind == DataKind::Numeric || self.scale < 0
    }
}

/// A user trigger on one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerRef {
    pub table: String,
    pub name: String,
}

/// Column sets of one table on both sides, plus what is needed to build its SQL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    /// Table name (same on both sides).
    pub name: String,
    /// Primary-key columns of the source table, in key order.
    pub primary_key: Vec<String>,
    /// Columns present on both sides.
    pub common: BTreeSet<String>,
    /// Columns only on the source.
    pub missing: BTreeSet<String>,
    /// Columns only on the destination.
    pub extra: BTreeSet<String>,
    /// Optional filter appended after the FROM clause (e.g. `WHERE id > 100`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    /// Primary-key columns holding text, ordered bytewise when compared.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub text_keys: BTreeSet<String>,
}

impl TableDescriptor {
    /// Build a descriptor from the column names found on each side.
    pub fn from_columns<S, D>(name: impl Into<String>, source: S, destination: D) -> Self
    where
        S: IntoIterator<Item = String>,
        D: IntoIterator<Item = String>,
    {
        let source: BTreeSet<String> = source.into_iter().collect();
        let destination: BTreeSet<String> = destination.into_iter().collect();
        Self {
            name: name.into(),
            primary_key: Vec::new(),
            common: source.intersection(&destination).cloned().collect(),
            missing: source.difference(&destination).cloned().collect(),
            extra: destination.difference(&source).cloned().collect(),
            filter: None,
            text_keys: BTreeSet::new(),
        }
    }

    /// Descriptor for a table whose column list was given explicitly.
    pub fn with_columns<I>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            name: name.into(),
            common: columns.into_iter().collect(),
            ..Default::default()
        }
    }

    /// Set the primary key.
    pub fn with_primary_key(mut self, primary_key: Vec<String>) -> Self {
        self.primary_key = primary_key;
        self
    }

    /// Mark primary-key columns that hold text.
    pub fn with_text_keys<I>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        self.text_keys = keys.into_iter().collect();
        self
    }

    /// Set the row filter. Blank filters are dropped.
    pub fn with_filter(mut self, filter: Option<String>) -> Self {
        self.filter = filter
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty());
        self
    }

    /// The table does not exist on the destination at all.
    pub fn absent_on_destination(&self) -> bool {
        self.common.is_empty() && self.extra.is_empty()
    }

    /// Columns copied or compared, in a stable order.
    pub fn columns(&self) -> Vec<String> {
        self.common.iter().cloned().collect()
    }

    fn column_list(&self, dialect: &dyn Dialect, columns: &[String]) -> String {
        columns
            .iter()
            .map(|c| dialect.quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn from_clause(&self, dialect: &dyn Dialect) -> String {
        let mut sql = format!("FROM {}", dialect.quote_ident(&self.name));
        if let Some(ref filter) = self.filter {
            sql.push(' ');
            sql.push_str(filter);
        }
        sql
    }

    /// `SELECT <columns> FROM <table> [filter]`
    pub fn select_sql(&self, dialect: &dyn Dialect) -> String {
        format!(
            "SELECT {} {}",
            self.column_list(dialect, &self.columns()),
            self.from_clause(dialect)
        )
    }

    /// `INSERT INTO <table> (<columns>) VALUES (<params>)`, one parameter per selected column.
    pub fn insert_sql(&self, dialect: &dyn Dialect) -> String {
        let columns = self.columns();
        let params = (1..=columns.len())
            .map(|i| dialect.param_placeholder(i))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            dialect.quote_ident(&self.name),
            self.column_list(dialect, &columns),
            params
        )
    }

    /// `UPDATE <table> SET <columns> WHERE <primary key>`.
    ///
    /// SET parameters come first, one per selected column, followed by one
    /// WHERE parameter per primary-key column. `None` without a primary key.
    pub fn update_sql(&self, dialect: &dyn Dialect) -> Option<String> {
        if self.primary_key.is_empty() {
            return None;
        }
        let columns = self.columns();
        let set = columns
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{} = {}", dialect.quote_ident(c), dialect.param_placeholder(i + 1)))
            .collect::<Vec<_>>()
            .join(", ");
        let key = self
            .primary_key
            .iter()
            .enumerate()
            .map(|(k, c)| {
                format!(
                    "{} = {}",
                    dialect.quote_ident(c),
                    dialect.param_placeholder(columns.len() + k + 1)
                )
            })
            .collect::<Vec<_>>()
            .join(" AND ");
        Some(format!(
            "UPDATE {} SET {} WHERE {}",
            dialect.quote_ident(&self.name),
            set,
            key
        ))
    }

    /// Primary-key columns first, then the remaining compared columns, ordered by key.
    ///
    /// Text keys sort bytewise so the server returns rows in the order
    /// [`Value::compare`](super::Value::compare) expects.
    pub fn compare_sql(&self, dialect: &dyn Dialect) -> String {
        let mut columns = self.primary_key.clone();
        columns.extend(
            self.common
                .iter()
                .filter(|c| !self.primary_key.contains(c))
                .cloned(),
        );
        let order = self
            .primary_key
            .iter()
            .map(|key| {
                let ident = dialect.quote_ident(key);
                if self.text_keys.contains(key) {
                    dialect.byte_order(&ident)
                } else {
                    ident
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "SELECT {} {} ORDER BY {}",
            self.column_list(dialect, &columns),
            self.from_clause(dialect),
            order
        )
    }
}
