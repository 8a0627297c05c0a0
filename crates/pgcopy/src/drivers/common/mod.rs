//! Helpers shared by driver implementations.
//!
//! - [`tls`]: rustls connector setup for PostgreSQL

pub mod tls;

pub use tls::{SslMode, TlsBuilder};
