//! Core types and shared functionality for the dashboard request cache.
//!
//! This crate provides:
//! - Partition Registry (live partition names and the Static Asset List)
//! - Request/response value types and the network capability
//! - Cache Partition Store trait with in-memory and SQLite backends
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod location;
pub mod net;
pub mod registry;

pub use cache::{CacheDb, CacheStore, MemoryStore, Partition, StoredResponse};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use http::{Destination, FailureCause, Request, RequestMode, Response, ResponseKind, ResponseOutcome};
pub use net::Network;
pub use registry::{PartitionNames, PartitionRegistry};
