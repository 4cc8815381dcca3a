//! SQLite backend for the proposal engine.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every service operation runs inside
//! one `BEGIN IMMEDIATE` transaction on that thread.

mod encode;
mod repos;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
