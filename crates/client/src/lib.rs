//! Client code for the dashboard request cache.
//!
//! This crate provides the HTTP implementation of the network capability
//! used by the caching strategies.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig};
