//! Cache Partition Store.
//!
//! Named partitions map a request identity to a stored response snapshot.
//! The policy layer only sees the [`CacheStore`] trait; two stores ship here:
//!
//! - [`MemoryStore`]: in-process, for tests and throwaway hosts
//! - [`CacheDb`]: SQLite via tokio-rusqlite, durable across restarts, with
//!   automatic schema migrations and WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod hash;
pub mod memory;
pub mod migrations;
pub mod partition;
pub mod store;

pub use crate::Error;

pub use connection::CacheDb;
pub use hash::{compute_request_key, request_key};
pub use memory::MemoryStore;
pub use partition::{Partition, lookup_any};
pub use store::{CacheStore, StoredResponse};
