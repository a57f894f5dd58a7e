//! Common utilities shared across database drivers.
//!
//! - [`odbc`]: ODBC session and the dialect-driven target catalog

#[cfg(feature = "odbc")]
pub mod odbc;

#[cfg(feature = "odbc")]
pub use odbc::{OdbcSession, OdbcTarget};
