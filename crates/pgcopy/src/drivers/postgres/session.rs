//! PostgreSQL sessions, row cursors and value conversion.

use std::error::Error;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use deadpool_postgres::Object;
use futures::StreamExt;
use rust_decimal::Decimal;
use tokio_postgres::types::{to_sql_checked, FromSql, IsNull, ToSql, Type};
use tokio_postgres::RowStream;
use uuid::Uuid;

use crate::core::{AccessMode, ConversionError, CursorColumn, DataKind, Row, RowCursor, Session, Value};
use crate::error::{Result, SyncError};
use crate::typemap::kind_for_type_code;

/// One pooled connection with its search path set to the configured schema.
pub struct PostgresSession {
    client: Object,
}

impl PostgresSession {
    pub(super) fn new(client: Object) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Session for PostgresSession {
    async fn begin(&mut self, mode: AccessMode) -> Result<()> {
        let sql = match mode {
            AccessMode::ReadOnly => "BEGIN READ ONLY",
            AccessMode::ReadWrite => "BEGIN",
        };
        self.client.batch_execute(sql).await?;
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        self.client.batch_execute("COMMIT").await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.client.batch_execute("ROLLBACK").await?;
        Ok(())
    }

    async fn batch_execute(&mut self, sql: &str) -> Result<()> {
        self.client.batch_execute(sql).await?;
        Ok(())
    }

    async fn open_cursor(&mut self, sql: &str) -> Result<Box<dyn RowCursor>> {
        let statement = self.client.prepare(sql).await?;
        let columns = statement
            .columns()
            .iter()
            .map(|c| CursorColumn::new(c.name(), kind_for_type_code(c.type_().oid())))
            .collect();
        let stream = self
            .client
            .query_raw(&statement, std::iter::empty::<&(dyn ToSql + Sync)>())
            .await?;
        Ok(Box::new(PostgresCursor {
            columns,
            stream: Box::pin(stream),
        }))
    }

    async fn parameter_kinds(&mut self, sql: &str) -> Result<Vec<DataKind>> {
        let statement = self.client.prepare_cached(sql).await?;
        Ok(statement
            .params()
            .iter()
            .map(|t| kind_for_type_code(t.oid()))
            .collect())
    }

    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64> {
        let statement = self.client.prepare_cached(sql).await?;
        let boxed = params
            .iter()
            .map(to_param)
            .collect::<Result<Vec<_>>>()?;
        let refs: Vec<&(dyn ToSql + Sync)> = boxed
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect();
        Ok(self.client.execute(&statement, &refs).await?)
    }
}

/// Rows streamed from a prepared SELECT.
pub struct PostgresCursor {
    columns: Vec<CursorColumn>,
    stream: Pin<Box<RowStream>>,
}

#[async_trait]
impl RowCursor for PostgresCursor {
    fn columns(&self) -> &[CursorColumn] {
        &self.columns
    }

    async fn next_row(&mut self) -> Result<Option<Row>> {
        match self.stream.next().await {
            Some(row) => Ok(Some(convert_row(&row?)?)),
            None => Ok(None),
        }
    }
}

fn convert_row(row: &tokio_postgres::Row) -> Result<Row> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| read_value(row, idx, column.type_()))
        .collect()
}

/// Read one column as the value of its kind.
fn read_value(row: &tokio_postgres::Row, idx: usize, ty: &Type) -> Result<Value> {
    let value = match kind_for_type_code(ty.oid()) {
        DataKind::Boolean => row.try_get::<_, Option<bool>>(idx)?.map(Value::Boolean),
        DataKind::SmallInt => row.try_get::<_, Option<i16>>(idx)?.map(Value::SmallInt),
        DataKind::Int => row.try_get::<_, Option<i32>>(idx)?.map(Value::Int),
        DataKind::LargeInt => row.try_get::<_, Option<i64>>(idx)?.map(Value::LargeInt),
        DataKind::Float => row.try_get::<_, Option<f32>>(idx)?.map(Value::Float),
        DataKind::Double => row.try_get::<_, Option<f64>>(idx)?.map(Value::Double),
        DataKind::Numeric => row.try_get::<_, Option<Decimal>>(idx)?.map(Value::Numeric),
        DataKind::String => row.try_get::<_, Option<String>>(idx)?.map(Value::Text),
        DataKind::Blob => row.try_get::<_, Option<Vec<u8>>>(idx)?.map(Value::Bytes),
        DataKind::Date => row.try_get::<_, Option<NaiveDate>>(idx)?.map(Value::Date),
        DataKind::Time => row.try_get::<_, Option<NaiveTime>>(idx)?.map(Value::Time),
        DataKind::Timestamp => row
            .try_get::<_, Option<NaiveDateTime>>(idx)?
            .map(Value::Timestamp),
        DataKind::TimestampTz => row
            .try_get::<_, Option<DateTime<Utc>>>(idx)?
            .map(Value::TimestampTz),
        DataKind::Uuid => row.try_get::<_, Option<Uuid>>(idx)?.map(Value::Uuid),
        DataKind::Unsupported => row
            .try_get::<_, Option<Opaque>>(idx)?
            .map(|Opaque(raw)| Value::Unsupported {
                type_name: ty.name().to_string(),
                raw,
            }),
    };
    Ok(value.unwrap_or(Value::Null))
}

/// Raw bytes of any non-null value of a type without a conversion.
struct Opaque(Vec<u8>);

impl<'a> FromSql<'a> for Opaque {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> std::result::Result<Self, Box<dyn Error + Sync + Send>> {
        Ok(Opaque(raw.to_vec()))
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

/// NULL for a parameter of any type.
#[derive(Debug)]
struct Null;

impl ToSql for Null {
    fn to_sql(
        &self,
        _ty: &Type,
        _out: &mut BytesMut,
    ) -> std::result::Result<IsNull, Box<dyn Error + Sync + Send>> {
        Ok(IsNull::Yes)
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

/// Box a value for binding. Values are already coerced to the parameter kind.
fn to_param(value: &Value) -> Result<Box<dyn ToSql + Sync + Send>> {
    Ok(match value {
        Value::Null => Box::new(Null),
        Value::Boolean(v) => Box::new(*v),
        Value::SmallInt(v) => Box::new(*v),
        Value::Int(v) => Box::new(*v),
        Value::LargeInt(v) => Box::new(*v),
        Value::Float(v) => Box::new(*v),
        Value::Double(v) => Box::new(*v),
        Value::Numeric(v) => Box::new(*v),
        Value::Text(v) => Box::new(v.clone()),
        Value::Bytes(v) => Box::new(v.clone()),
        Value::Date(v) => Box::new(*v),
        Value::Time(v) => Box::new(*v),
        Value::Timestamp(v) => Box::new(*v),
        Value::TimestampTz(v) => Box::new(*v),
        Value::Uuid(v) => Box::new(*v),
        Value::Unsupported { type_name, .. } => {
            return Err(SyncError::Conversion(ConversionError {
                from: DataKind::Unsupported,
                to: DataKind::Unsupported,
                reason: format!("values of type {} cannot be written", type_name),
            }))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_accepts_every_type() {
        assert!(<Null as ToSql>::accepts(&Type::INT4));
        assert!(<Null as ToSql>::accepts(&Type::JSONB));
        let mut buf = BytesMut::new();
        assert!(matches!(Null.to_sql(&Type::TEXT, &mut buf), Ok(IsNull::Yes)));
    }

    #[test]
    fn test_to_param_rejects_unsupported() {
        assert!(to_param(&Value::Int(1)).is_ok());
        assert!(to_param(&Value::Null).is_ok());
        assert!(matches!(
            to_param(&Value::Unsupported {
                type_name: "tsvector".into(),
                raw: b"'a'".to_vec(),
            }),
            Err(SyncError::Conversion(_))
        ));
    }

    #[test]
    fn test_opaque_keeps_wire_bytes() {
        let raw = [1u8, b'{', b'}'];
        let Opaque(kept) = Opaque::from_sql(&Type::JSONB, &raw).unwrap();
        assert_eq!(kept, raw.to_vec());
        assert!(<Opaque as FromSql>::accepts(&Type::INTERVAL));
    }
}
