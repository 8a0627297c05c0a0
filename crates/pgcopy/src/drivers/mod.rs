//! Database drivers.
//!
//! - [`postgres`]: catalog, sessions and dialect for PostgreSQL
//! - [`common`]: shared utilities (TLS)

pub mod common;
pub mod postgres;

pub use common::{SslMode, TlsBuilder};
pub use postgres::{PostgresDatabase, PostgresDialect};
