//! Column-set differences and the DDL that closes them.

use tracing::debug;

use crate::core::{CatalogReader, ColumnDescriptor, Dialect, TableDescriptor};
use crate::error::Result;
use crate::typemap;

/// Compare the columns of `table` on both sides. The primary key comes from the source.
pub async fn diff_table(
    source: &dyn CatalogReader,
    destination: &dyn CatalogReader,
    table: &str,
) -> Result<TableDescriptor> {
    let source_columns = source.table_columns(table).await?;
    let destination_columns = destination.table_columns(table).await?;
    let primary_key = source.primary_key(table).await?;
    let descriptor = TableDescriptor::from_columns(table, source_columns, destination_columns)
        .with_primary_key(primary_key);
    debug!(
        "{}: {} common, {} missing, {} extra",
        table,
        descriptor.common.len(),
        descriptor.missing.len(),
        descriptor.extra.len()
    );
    Ok(descriptor)
}

/// `"a","b"` with embedded quotes doubled.
pub fn quoted_list<'a, I>(names: I) -> String
where
    I: IntoIterator<Item = &'a String>,
{
    names
        .into_iter()
        .map(|n| format!("\"{}\"", n.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(",")
}

/// `#T:<table>:<common>:<missing>:<extra>:`
pub fn definition_line(table: &TableDescriptor) -> String {
    format!(
        "#T:{}:{}:{}:{}:",
        table.name,
        quoted_list(&table.common),
        quoted_list(&table.missing),
        quoted_list(&table.extra)
    )
}

/// `#G:<generator>:<destination generator or empty>:`
pub fn generator_line(generator: &str, destination: Option<&str>) -> String {
    format!("#G:{}:{}:", generator, destination.unwrap_or(""))
}

/// DDL adding the columns of `table` missing on the destination.
///
/// A table absent on the destination gets a CREATE TABLE with a primary
/// key clause; otherwise every missing column gets an ALTER TABLE ADD.
/// Returns `None` when nothing is missing.
pub async fn alter_statements(
    source: &dyn CatalogReader,
    dialect: &dyn Dialect,
    table: &TableDescriptor,
    relaxed_nulls: bool,
) -> Result<Option<String>> {
    if table.missing.is_empty() {
        return Ok(None);
    }

    let mut columns = Vec::with_capacity(table.missing.len());
    for name in &table.missing {
        columns.push(source.column_descriptor(&table.name, name).await?);
    }

    let ddl = if table.absent_on_destination() {
        create_table_sql(dialect, &table.name, &columns, &table.primary_key)
    } else {
        columns
            .iter()
            .map(|c| {
                format!(
                    "ALTER TABLE {} ADD {};",
                    dialect.quote_ident(&table.name),
                    column_definition(dialect, c, !relaxed_nulls)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };
    Ok(Some(ddl))
}

fn column_definition(dialect: &dyn Dialect, column: &ColumnDescriptor, not_null: bool) -> String {
    let mut def = format!(
        "{} {}",
        dialect.quote_ident(&column.name),
        typemap::column_type(column)
    );
    if not_null && column.not_null {
        def.push_str(" NOT NULL");
    }
    def
}

fn create_table_sql(
    dialect: &dyn Dialect,
    table: &str,
    columns: &[ColumnDescriptor],
    primary_key: &[String],
) -> String {
    let mut body: Vec<String> = columns
        .iter()
        .map(|c| format!("  {}", column_definition(dialect, c, true)))
        .collect();
    if !primary_key.is_empty() {
        let key = primary_key
            .iter()
            .map(|k| dialect.quote_ident(k))
            .collect::<Vec<_>>()
            .join(", ");
        body.push(format!("  PRIMARY KEY({})", key));
    }
    format!(
        "CREATE TABLE {}\n(\n{}\n);",
        dialect.quote_ident(table),
        body.join(",\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DataKind, Database};
    use crate::testing::{column, MemoryDatabase};

    fn source() -> MemoryDatabase {
        MemoryDatabase::new("src")
            .table(
                "orders",
                &[("id", DataKind::Int), ("total", DataKind::Numeric), ("note", DataKind::String)],
                &["id"],
            )
            .descriptor(
                "orders",
                ColumnDescriptor {
                    not_null: true,
                    ..column("id", DataKind::Int)
                },
            )
            .descriptor(
                "orders",
                ColumnDescriptor {
                    not_null: true,
                    precision: 12,
                    scale: -2,
                    ..column("total", DataKind::Numeric)
                },
            )
    }

    #[tokio::test]
    async fn test_diff_and_definition_line() {
        let src = source();
        let dst = MemoryDatabase::new("dst").table(
            "orders",
            &[("id", DataKind::Int), ("legacy", DataKind::String)],
            &["id"],
        );
        let t = diff_table(&src, &dst, "orders").await.unwrap();
        assert_eq!(t.primary_key, vec!["id"]);
        assert_eq!(
            definition_line(&t),
            r#"#T:orders:"id":"note","total":"legacy":"#
        );
    }

    #[tokio::test]
    async fn test_alter_existing_table() {
        let src = source();
        let dst = MemoryDatabase::new("dst").table("orders", &[("id", DataKind::Int)], &["id"]);
        let t = diff_table(&src, &dst, "orders").await.unwrap();

        let ddl = alter_statements(&src, src.dialect(), &t, false).await.unwrap().unwrap();
        assert_eq!(
            ddl,
            "ALTER TABLE \"orders\" ADD \"note\" VARCHAR(40);\n\
             ALTER TABLE \"orders\" ADD \"total\" NUMERIC(12, 2) NOT NULL;"
        );

        let relaxed = alter_statements(&src, src.dialect(), &t, true).await.unwrap().unwrap();
        assert!(!relaxed.contains("NOT NULL"));
    }

    #[tokio::test]
    async fn test_create_absent_table() {
        let src = source();
        let dst = MemoryDatabase::new("dst");
        let t = diff_table(&src, &dst, "orders").await.unwrap();
        assert!(t.absent_on_destination());

        let ddl = alter_statements(&src, src.dialect(), &t, true).await.unwrap().unwrap();
        assert_eq!(
            ddl,
            "CREATE TABLE \"orders\"\n(\n  \"id\" INTEGER NOT NULL,\n  \"note\" VARCHAR(40),\n  \
             \"total\" NUMERIC(12, 2) NOT NULL,\n  PRIMARY KEY(\"id\")\n);"
        );
    }

    #[tokio::test]
    async fn test_nothing_missing() {
        let src = source();
        let t = diff_table(&src, &src, "orders").await.unwrap();
        assert_eq!(alter_statements(&src, src.dialect(), &t, false).await.unwrap(), None);
    }

    #[test]
    fn test_generator_line() {
        assert_eq!(generator_line("seq", Some("seq")), "#G:seq:seq:");
        assert_eq!(generator_line("seq", None), "#G:seq::");
    }

    #[test]
    fn test_quoted_list_escapes_quotes() {
        let names = ["a\"b".to_string(), "c".to_string()];
        assert_eq!(quoted_list(&names), r#""a""b","c""#);
    }
}
