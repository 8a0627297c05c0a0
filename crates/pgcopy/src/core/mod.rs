//! Core abstractions shared by every stage of a run.
//!
//! - [`schema`]: column descriptors, table descriptors and the SQL derived from them
//! - [`value`]: the closed set of column kinds and row values
//! - [`traits`]: catalog, session, cursor and dialect traits implemented by drivers

pub mod schema;
pub mod traits;
pub mod value;

pub use schema::{ColumnDescriptor, TableDescriptor, TriggerRef};
pub use traits::{
    AccessMode, CatalogReader, CursorColumn, Database, Dialect, RowCursor, Session,
};
pub use value::{ConversionError, DataKind, Row, Value};
