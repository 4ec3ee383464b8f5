//! Request-caching worker for the market dashboard.
//!
//! This crate provides:
//! - Request Router (four ordered policy classes)
//! - Caching strategies (refresh-behind, cache-first, network-first)
//! - Lifecycle Manager (setup and activation transitions)
//! - Background task queue and the host capability
//! - The `ServiceWorker` facade and the harness event protocol

pub mod events;
pub mod host;
pub mod lifecycle;
pub mod router;
pub mod strategy;
pub mod tasks;
pub mod worker;

#[cfg(test)]
mod testing;

pub use events::{EventReply, HostEvent};
pub use host::{Host, LocalHost};
pub use lifecycle::{ActivateReport, InstallReport, Lifecycle};
pub use router::{RequestClass, Router};
pub use tasks::{BackgroundTask, TaskOutcome, TaskQueue};
pub use worker::{PartitionSummary, Served, ServiceWorker, WorkerState};
