//! SQLite backend for the Convus ratings store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every multi-statement write runs inside
//! one transaction on that thread.

mod encode;
mod queries;
mod schema;
mod store;

pub mod error;
pub mod worker;

pub use error::{Error, Result};
pub use store::SqliteStore;
pub use worker::{WorkerQueue, spawn_worker};

#[cfg(test)]
mod tests;
