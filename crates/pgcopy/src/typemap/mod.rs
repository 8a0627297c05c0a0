//! Catalog type codes to column kinds and SQL type keywords.

use crate::core::{ColumnDescriptor, DataKind};

/// PostgreSQL type OIDs with a fixed mapping.
pub mod oid {
    pub const BOOL: u32 = 16;
    pub const BYTEA: u32 = 17;
    pub const INT8: u32 = 20;
    pub const INT2: u32 = 21;
    pub const INT4: u32 = 23;
    pub const TEXT: u32 = 25;
    pub const FLOAT4: u32 = 700;
    pub const FLOAT8: u32 = 701;
    pub const BPCHAR: u32 = 1042;
    pub const VARCHAR: u32 = 1043;
    pub const DATE: u32 = 1082;
    pub const TIME: u32 = 1083;
    pub const TIMESTAMP: u32 = 1114;
    pub const TIMESTAMPTZ: u32 = 1184;
    pub const NUMERIC: u32 = 1700;
    pub const UUID: u32 = 2950;
}

/// Largest precision written into generated fixed-point types.
pub const MAX_PRECISION: i32 = 18;

/// Column kind for a catalog type code.
pub fn kind_for_type_code(type_code: u32) -> DataKind {
    match type_code {
        oid::BOOL => DataKind::Boolean,
        oid::BYTEA => DataKind::Blob,
        oid::INT2 => DataKind::SmallInt,
        oid::INT4 => DataKind::Int,
        oid::INT8 => DataKind::LargeInt,
        oid::FLOAT4 => DataKind::Float,
        oid::FLOAT8 => DataKind::Double,
        oid::NUMERIC => DataKind::Numeric,
        oid::TEXT | oid::BPCHAR | oid::VARCHAR => DataKind::String,
        oid::DATE => DataKind::Date,
        oid::TIME => DataKind::Time,
        oid::TIMESTAMP => DataKind::Timestamp,
        oid::TIMESTAMPTZ => DataKind::TimestampTz,
        oid::UUID => DataKind::Uuid,
        _ => DataKind::Unsupported,
    }
}

/// SQL type used in generated CREATE/ALTER TABLE statements.
///
/// Fixed-point columns become NUMERIC or DECIMAL by subtype, with the
/// precision clamped to [`MAX_PRECISION`] when unset or out of range and
/// the scale written as its absolute value.
pub fn column_type(column: &ColumnDescriptor) -> String {
    if column.is_fixed_point() {
        let keyword = if column.subtype == 2 { "DECIMAL" } else { "NUMERIC" };
        let precision = if column.precision <= 0 || column.precision > MAX_PRECISION {
            MAX_PRECISION
        } else {
            column.precision
        };
        return format!("{}({}, {})", keyword, precision, column.scale.abs());
    }

    match column.type_code {
        oid::INT2 => "SMALLINT".to_string(),
        oid::INT4 => "INTEGER".to_string(),
        oid::INT8 => "BIGINT".to_string(),
        oid::FLOAT4 => "REAL".to_string(),
        oid::FLOAT8 => "DOUBLE PRECISION".to_string(),
        oid::DATE => "DATE".to_string(),
        oid::TIME => "TIME".to_string(),
        oid::TIMESTAMP => "TIMESTAMP".to_string(),
        oid::TIMESTAMPTZ => "TIMESTAMP WITH TIME ZONE".to_string(),
        oid::BPCHAR => format!("CHAR({})", column.length.max(1)),
        oid::VARCHAR if column.length > 0 => format!("VARCHAR({})", column.length),
        oid::VARCHAR => "VARCHAR".to_string(),
        oid::TEXT => "TEXT".to_string(),
        oid::BYTEA => "BYTEA".to_string(),
        oid::BOOL => "BOOLEAN".to_string(),
        oid::UUID => "UUID".to_string(),
        _ => column.type_name.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(type_code: u32) -> ColumnDescriptor {
        ColumnDescriptor {
            name: "c".into(),
            kind: kind_for_type_code(type_code),
            type_code,
            type_name: "whatever".into(),
            subtype: 0,
            length: 0,
            precision: 0,
            scale: 0,
            not_null: false,
        }
    }

    #[test]
    fn test_integer_types() {
        assert_eq!(column_type(&desc(oid::INT2)), "SMALLINT");
        assert_eq!(column_type(&desc(oid::INT4)), "INTEGER");
        assert_eq!(column_type(&desc(oid::INT8)), "BIGINT");
    }

    #[test]
    fn test_string_types() {
        let mut c = desc(oid::VARCHAR);
        assert_eq!(column_type(&c), "VARCHAR");
        c.length = 40;
        assert_eq!(column_type(&c), "VARCHAR(40)");
        let mut c = desc(oid::BPCHAR);
        c.length = 3;
        assert_eq!(column_type(&c), "CHAR(3)");
        assert_eq!(column_type(&desc(oid::TEXT)), "TEXT");
    }

    #[test]
    fn test_fixed_point_types() {
        let mut c = desc(oid::NUMERIC);
        c.subtype = 1;
        c.precision = 10;
        c.scale = -2;
        assert_eq!(column_type(&c), "NUMERIC(10, 2)");

        c.subtype = 2;
        c.precision = 0;
        assert_eq!(column_type(&c), "DECIMAL(18, 2)");

        c.precision = 30;
        assert_eq!(column_type(&c), "DECIMAL(18, 2)");

        // scaled integer reported by an integer type code
        let mut c = desc(oid::INT8);
        c.scale = -4;
        c.precision = 12;
        assert_eq!(column_type(&c), "NUMERIC(12, 4)");
    }

    #[test]
    fn test_unmapped_type_uses_catalog_name() {
        let mut c = desc(3614);
        c.type_name = "tsvector".into();
        assert_eq!(column_type(&c), "tsvector");
        assert_eq!(c.kind, DataKind::Unsupported);
    }

    #[test]
    fn test_kinds() {
        assert_eq!(kind_for_type_code(oid::TIMESTAMPTZ), DataKind::TimestampTz);
        assert_eq!(kind_for_type_code(oid::UUID), DataKind::Uuid);
        assert_eq!(kind_for_type_code(oid::BYTEA), DataKind::Blob);
    }
}
