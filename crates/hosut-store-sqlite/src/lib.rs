//! SQLite backend for hosut's entry store.
//!
//! A persistent cookie jar: the same flat, size-limited, expiring key/value
//! contract as a browser's cookies, kept in one SQLite file. Wraps
//! [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime.

mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteJar;
