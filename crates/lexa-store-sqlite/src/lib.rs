//! SQLite backend for the Lexa vocabulary store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every write is one transaction.

mod encode;
mod schema;
mod store;
mod tables;

pub mod config;
pub mod error;

pub use config::StoreConfig;
pub use error::{Error, Result};
pub use store::SqliteStore;
