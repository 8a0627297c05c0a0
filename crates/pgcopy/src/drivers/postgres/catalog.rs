//! Catalog queries, all scoped to one schema passed as `$1`.

use crate::core::ColumnDescriptor;
use crate::typemap::{self, oid};

pub(super) const LIST_TABLES: &str = r#"
    SELECT c.relname
    FROM pg_catalog.pg_class c
    JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
    WHERE n.nspname = $1 AND c.relkind = 'r'
    ORDER BY 1
"#;

pub(super) const TABLE_COLUMNS: &str = r#"
    SELECT a.attname
    FROM pg_catalog.pg_attribute a
    JOIN pg_catalog.pg_class c ON c.oid = a.attrelid
    JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
    WHERE n.nspname = $1 AND c.relname = $2
      AND a.attnum > 0
      AND NOT a.attisdropped
      AND a.attgenerated = ''
    ORDER BY 1
"#;

pub(super) const PRIMARY_KEY: &str = r#"
    SELECT a.attname
    FROM pg_catalog.pg_constraint con
    JOIN pg_catalog.pg_class c ON c.oid = con.conrelid
    JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
    CROSS JOIN LATERAL unnest(con.conkey) WITH ORDINALITY AS k(attnum, ord)
    JOIN pg_catalog.pg_attribute a ON a.attrelid = c.oid AND a.attnum = k.attnum
    WHERE n.nspname = $1 AND c.relname = $2 AND con.contype = 'p'
    ORDER BY k.ord
"#;

pub(super) const FOREIGN_KEY_TARGETS: &str = r#"
    SELECT DISTINCT rt.relname
    FROM pg_catalog.pg_constraint con
    JOIN pg_catalog.pg_class t ON t.oid = con.conrelid
    JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
    JOIN pg_catalog.pg_class rt ON rt.oid = con.confrelid
    JOIN pg_catalog.pg_namespace rn ON rn.oid = rt.relnamespace
    WHERE n.nspname = $1 AND t.relname = $2
      AND con.contype = 'f'
      AND rn.nspname = $1
    ORDER BY 1
"#;

pub(super) const CHECK_DEPENDENCIES: &str = r#"
    SELECT DISTINCT rc.relname
    FROM pg_catalog.pg_constraint con
    JOIN pg_catalog.pg_class t ON t.oid = con.conrelid
    JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
    JOIN pg_catalog.pg_depend d
      ON d.classid = 'pg_catalog.pg_constraint'::regclass
     AND d.objid = con.oid
     AND d.refclassid = 'pg_catalog.pg_class'::regclass
    JOIN pg_catalog.pg_class rc ON rc.oid = d.refobjid AND rc.relkind = 'r'
    JOIN pg_catalog.pg_namespace rn ON rn.oid = rc.relnamespace
    WHERE n.nspname = $1 AND t.relname = $2
      AND con.contype = 'c'
      AND rc.oid <> t.oid
      AND rn.nspname = $1
    ORDER BY 1
"#;

pub(super) const GENERATORS: &str = r#"
    SELECT c.relname
    FROM pg_catalog.pg_class c
    JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
    WHERE n.nspname = $1 AND c.relkind = 'S'
    ORDER BY 1
"#;

pub(super) const COLUMN_DESCRIPTOR: &str = r#"
    SELECT a.atttypid, a.atttypmod, a.attnotnull, pg_catalog.format_type(a.atttypid, a.atttypmod)
    FROM pg_catalog.pg_attribute a
    JOIN pg_catalog.pg_class c ON c.oid = a.attrelid
    JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
    WHERE n.nspname = $1 AND c.relname = $2 AND a.attname = $3
      AND NOT a.attisdropped
"#;

pub(super) const ACTIVE_TRIGGERS: &str = r#"
    SELECT c.relname, tg.tgname
    FROM pg_catalog.pg_trigger tg
    JOIN pg_catalog.pg_class c ON c.oid = tg.tgrelid
    JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
    WHERE n.nspname = $1
      AND NOT tg.tgisinternal
      AND tg.tgenabled <> 'D'
    ORDER BY 1, 2
"#;

/// Build a descriptor from `atttypid`, `atttypmod` and `attnotnull`.
///
/// Character types carry `length + 4` in the modifier; numeric carries
/// `((precision << 16) | scale) + 4`. The scale is stored negated.
pub(super) fn decode_descriptor(
    name: &str,
    type_code: u32,
    type_mod: i32,
    not_null: bool,
    type_name: String,
) -> ColumnDescriptor {
    let mut descriptor = ColumnDescriptor {
        name: name.to_string(),
        kind: typemap::kind_for_type_code(type_code),
        type_code,
        type_name,
        subtype: 0,
        length: 0,
        precision: 0,
        scale: 0,
        not_null,
    };

    match type_code {
        oid::BPCHAR | oid::VARCHAR if type_mod >= 4 => {
            descriptor.length = type_mod - 4;
        }
        oid::NUMERIC => {
            descriptor.subtype = 1;
            if type_mod >= 4 {
                let modifier = type_mod - 4;
                descriptor.precision = (modifier >> 16) & 0xffff;
                descriptor.scale = -(modifier & 0xffff);
            }
        }
        _ => {}
    }
    descriptor
}
