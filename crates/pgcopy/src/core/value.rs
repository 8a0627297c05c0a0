//! Column kinds and row values.
//!
//! Every value read from either side is turned into a [`Value`] before it is
//! compared or bound. The set of kinds is closed: anything the driver does not
//! recognise becomes [`Value::Unsupported`], which keeps the raw wire bytes for
//! comparison and fails to convert, so the copy executor can degrade the row
//! instead of aborting.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Data kind of a column or parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    String,
    SmallInt,
    Int,
    LargeInt,
    Float,
    Double,
    /// Fixed-point decimal.
    Numeric,
    Boolean,
    Date,
    Time,
    Timestamp,
    TimestampTz,
    Blob,
    Uuid,
    Unsupported,
}

impl DataKind {
    /// Whether values of this kind render as numbers (right-aligned in reports).
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            DataKind::SmallInt
                | DataKind::Int
                | DataKind::LargeInt
                | DataKind::Float
                | DataKind::Double
                | DataKind::Numeric
        )
    }

    /// Whether a column of this kind can take part in key comparison.
    pub fn is_comparable_key(self) -> bool {
        !matches!(self, DataKind::Blob | DataKind::Unsupported)
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataKind::String => "string",
            DataKind::SmallInt => "smallint",
            DataKind::Int => "integer",
            DataKind::LargeInt => "bigint",
            DataKind::Float => "float",
            DataKind::Double => "double",
            DataKind::Numeric => "numeric",
            DataKind::Boolean => "boolean",
            DataKind::Date => "date",
            DataKind::Time => "time",
            DataKind::Timestamp => "timestamp",
            DataKind::TimestampTz => "timestamptz",
            DataKind::Blob => "blob",
            DataKind::Uuid => "uuid",
            DataKind::Unsupported => "unsupported",
        };
        f.write_str(name)
    }
}

/// A single column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    SmallInt(i16),
    Int(i32),
    LargeInt(i64),
    Float(f32),
    Double(f64),
    Numeric(Decimal),
    Text(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Uuid(Uuid),
    /// A non-null value of a type the driver cannot read.
    Unsupported {
        /// Catalog type name.
        type_name: String,
        /// Value as received on the wire.
        raw: Vec<u8>,
    },
}

/// A value could not be converted to the requested kind.
#[derive(Debug, Clone, Error)]
#[error("cannot convert {from} value to {to}: {reason}")]
pub struct ConversionError {
    pub from: DataKind,
    pub to: DataKind,
    pub reason: String,
}

impl ConversionError {
    fn new(from: DataKind, to: DataKind, reason: impl Into<String>) -> Self {
        Self {
            from,
            to,
            reason: reason.into(),
        }
    }
}

impl Value {
    /// Returns true if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Kind of the value. NULL reports as `Unsupported` since it has no kind of its own.
    pub fn kind(&self) -> DataKind {
        match self {
            Value::Null | Value::Unsupported { .. } => DataKind::Unsupported,
            Value::Boolean(_) => DataKind::Boolean,
            Value::SmallInt(_) => DataKind::SmallInt,
            Value::Int(_) => DataKind::Int,
            Value::LargeInt(_) => DataKind::LargeInt,
            Value::Float(_) => DataKind::Float,
            Value::Double(_) => DataKind::Double,
            Value::Numeric(_) => DataKind::Numeric,
            Value::Text(_) => DataKind::String,
            Value::Bytes(_) => DataKind::Blob,
            Value::Date(_) => DataKind::Date,
            Value::Time(_) => DataKind::Time,
            Value::Timestamp(_) => DataKind::Timestamp,
            Value::TimestampTz(_) => DataKind::TimestampTz,
            Value::Uuid(_) => DataKind::Uuid,
        }
    }

    /// Integer view of the value, if it has an exact one.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::SmallInt(v) => Some(i64::from(*v)),
            Value::Int(v) => Some(i64::from(*v)),
            Value::LargeInt(v) => Some(*v),
            Value::Numeric(d) if d.fract().is_zero() => d.to_i64(),
            _ => None,
        }
    }

    /// Convert to a value of `kind`, as needed to bind it to a parameter of that kind.
    pub fn coerce_to(&self, kind: DataKind) -> Result<Value, ConversionError> {
        let from = self.kind();
        if self.is_null() {
            return Ok(Value::Null);
        }
        if let Value::Unsupported { type_name, .. } = self {
            return Err(ConversionError::new(
                from,
                kind,
                format!("values of type {} cannot be read", type_name),
            ));
        }
        if from == kind {
            return Ok(self.clone());
        }

        let fail = |reason: &str| ConversionError::new(from, kind, reason);
        let converted = match kind {
            DataKind::String => match self {
                Value::Bytes(b) => Value::Text(
                    String::from_utf8(b.clone()).map_err(|_| fail("blob is not valid UTF-8"))?,
                ),
                other => Value::Text(other.to_string()),
            },
            DataKind::SmallInt => {
                let v = self.to_integer().ok_or_else(|| fail("not an integer"))?;
                Value::SmallInt(i16::try_from(v).map_err(|_| fail("out of range"))?)
            }
            DataKind::Int => {
                let v = self.to_integer().ok_or_else(|| fail("not an integer"))?;
                Value::Int(i32::try_from(v).map_err(|_| fail("out of range"))?)
            }
            DataKind::LargeInt => {
                Value::LargeInt(self.to_integer().ok_or_else(|| fail("not an integer"))?)
            }
            DataKind::Float => {
                Value::Float(self.to_double().ok_or_else(|| fail("not a number"))? as f32)
            }
            DataKind::Double => Value::Double(self.to_double().ok_or_else(|| fail("not a number"))?),
            DataKind::Numeric => Value::Numeric(self.to_decimal().ok_or_else(|| fail("not a number"))?),
            DataKind::Boolean => match self {
                Value::Text(s) => match s.trim().to_lowercase().as_str() {
                    "t" | "true" | "1" | "y" | "yes" | "on" => Value::Boolean(true),
                    "f" | "false" | "0" | "n" | "no" | "off" => Value::Boolean(false),
                    _ => return Err(fail("not a boolean")),
                },
                other => match other.to_integer() {
                    Some(0) => Value::Boolean(false),
                    Some(1) => Value::Boolean(true),
                    _ => return Err(fail("not a boolean")),
                },
            },
            DataKind::Date => match self {
                Value::Timestamp(ts) => Value::Date(ts.date()),
                Value::TimestampTz(ts) => Value::Date(ts.naive_utc().date()),
                Value::Text(s) => Value::Date(
                    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                        .map_err(|e| fail(&e.to_string()))?,
                ),
                _ => return Err(fail("not a date")),
            },
            DataKind::Time => match self {
                Value::Timestamp(ts) => Value::Time(ts.time()),
                Value::Text(s) => Value::Time(
                    NaiveTime::parse_from_str(s.trim(), "%H:%M:%S%.f")
                        .map_err(|e| fail(&e.to_string()))?,
                ),
                _ => return Err(fail("not a time")),
            },
            DataKind::Timestamp => match self {
                Value::Date(d) => Value::Timestamp(midnight(d).ok_or_else(|| fail("invalid date"))?),
                Value::TimestampTz(ts) => Value::Timestamp(ts.naive_utc()),
                Value::Text(s) => Value::Timestamp(parse_timestamp(s).ok_or_else(|| fail("not a timestamp"))?),
                _ => return Err(fail("not a timestamp")),
            },
            DataKind::TimestampTz => match self {
                Value::Date(d) => Value::TimestampTz(Utc.from_utc_datetime(
                    &midnight(d).ok_or_else(|| fail("invalid date"))?,
                )),
                Value::Timestamp(ts) => Value::TimestampTz(Utc.from_utc_datetime(ts)),
                Value::Text(s) => match DateTime::parse_from_rfc3339(s.trim()) {
                    Ok(ts) => Value::TimestampTz(ts.with_timezone(&Utc)),
                    Err(_) => Value::TimestampTz(Utc.from_utc_datetime(
                        &parse_timestamp(s).ok_or_else(|| fail("not a timestamp"))?,
                    )),
                },
                _ => return Err(fail("not a timestamp")),
            },
            DataKind::Blob => match self {
                Value::Text(s) => Value::Bytes(s.clone().into_bytes()),
                _ => return Err(fail("only text converts to a blob")),
            },
            DataKind::Uuid => match self {
                Value::Text(s) => {
                    Value::Uuid(Uuid::parse_str(s.trim()).map_err(|e| fail(&e.to_string()))?)
                }
                _ => return Err(fail("not a uuid")),
            },
            DataKind::Unsupported => return Err(fail("destination type is not supported")),
        };
        Ok(converted)
    }

    /// Order two values from the same column.
    ///
    /// Both NULL compare equal; a NULL sorts after any non-NULL value, so a
    /// NULL on the left returns `Greater`. Numeric kinds compare across widths.
    /// Strings, blobs and values of unsupported types compare by bytes.
    pub fn compare(&self, other: &Value) -> Ordering {
        use Value::*;
        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Null, _) => Ordering::Greater,
            (_, Null) => Ordering::Less,
            (Unsupported { type_name: ta, raw: a }, Unsupported { type_name: tb, raw: b }) => {
                ta.cmp(tb).then_with(|| a.cmp(b))
            }
            (Text(a), Text(b)) => a.as_bytes().cmp(b.as_bytes()),
            (Bytes(a), Bytes(b)) => a.cmp(b),
            (Boolean(a), Boolean(b)) => a.cmp(b),
            (Date(a), Date(b)) => a.cmp(b),
            (Time(a), Time(b)) => a.cmp(b),
            (Timestamp(a), Timestamp(b)) => a.cmp(b),
            (TimestampTz(a), TimestampTz(b)) => a.cmp(b),
            (Timestamp(a), TimestampTz(b)) => a.cmp(&b.naive_utc()),
            (TimestampTz(a), Timestamp(b)) => a.naive_utc().cmp(b),
            (Uuid(a), Uuid(b)) => a.cmp(b),
            (a, b) if a.kind().is_numeric() && b.kind().is_numeric() => compare_numbers(a, b),
            (a, b) => kind_rank(a).cmp(&kind_rank(b)),
        }
    }

    fn to_integer(&self) -> Option<i64> {
        match self {
            Value::Float(f) => float_to_integer(f64::from(*f)),
            Value::Double(f) => float_to_integer(*f),
            Value::Text(s) => s.trim().parse().ok(),
            Value::Boolean(b) => Some(i64::from(*b)),
            other => other.as_i64(),
        }
    }

    fn to_double(&self) -> Option<f64> {
        match self {
            Value::SmallInt(v) => Some(f64::from(*v)),
            Value::Int(v) => Some(f64::from(*v)),
            Value::LargeInt(v) => Some(*v as f64),
            Value::Float(v) => Some(f64::from(*v)),
            Value::Double(v) => Some(*v),
            Value::Numeric(d) => d.to_f64(),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn to_decimal(&self) -> Option<Decimal> {
        match self {
            Value::SmallInt(v) => Some(Decimal::from(*v)),
            Value::Int(v) => Some(Decimal::from(*v)),
            Value::LargeInt(v) => Some(Decimal::from(*v)),
            Value::Float(v) => Decimal::try_from(*v).ok(),
            Value::Double(v) => Decimal::try_from(*v).ok(),
            Value::Numeric(d) => Some(*d),
            Value::Text(s) => Decimal::from_str(s.trim()).ok(),
            _ => None,
        }
    }
}

fn float_to_integer(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn midnight(d: &NaiveDate) -> Option<NaiveDateTime> {
    d.and_hms_opt(0, 0, 0)
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
}

fn compare_numbers(a: &Value, b: &Value) -> Ordering {
    if let (Some(x), Some(y)) = (integer_of(a), integer_of(b)) {
        return x.cmp(&y);
    }
    let is_float = |v: &Value| matches!(v, Value::Float(_) | Value::Double(_));
    if !is_float(a) && !is_float(b) {
        if let (Some(x), Some(y)) = (a.to_decimal(), b.to_decimal()) {
            return x.cmp(&y);
        }
    }
    match (a.to_double(), b.to_double()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => Ordering::Equal,
    }
}

fn integer_of(v: &Value) -> Option<i64> {
    match v {
        Value::SmallInt(_) | Value::Int(_) | Value::LargeInt(_) => v.as_i64(),
        _ => None,
    }
}

fn kind_rank(v: &Value) -> u8 {
    v.kind() as u8
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::SmallInt(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::LargeInt(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Numeric(d) => write!(f, "{}", d),
            Value::Text(s) => f.write_str(s),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Time(t) => write!(f, "{}", t.format("%H:%M:%S")),
            Value::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S")),
            Value::TimestampTz(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S%:z")),
            Value::Uuid(u) => write!(f, "{}", u),
            Value::Unsupported { type_name, .. } => write!(f, "<{}>", type_name),
        }
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::SmallInt(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::LargeInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// A row as read from a cursor.
pub type Row = Vec<Value>;
