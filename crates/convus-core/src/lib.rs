//! Core types and algorithms for the Convus ratings store.
//!
//! Everything that decides *what* should be written (listing orders, topic
//! association diffs, orphan status, slugs) lives here as plain functions over
//! snapshots of state. Storage backends (e.g. `convus-store-sqlite`) load the
//! snapshot, call into this crate, and apply the result.

pub mod citation;
pub mod dedup;
pub mod error;
pub mod event;
pub mod investigation;
pub mod jobs;
pub mod ranking;
pub mod reconcile;
pub mod review;
pub mod score;
pub mod slug;
pub mod store;
pub mod topic;
pub mod user;
pub mod vote;

pub use error::{Error, FieldError, Result};
