//! Host capability: the signals a worker sends to its hosting environment.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use swcache_core::Error;

/// Lifecycle signals delivered to the host.
#[async_trait]
pub trait Host: Send + Sync {
    /// Take over from a previous instance without waiting for its pages to close.
    async fn skip_waiting(&self);

    /// Become the controller of every open page. Returns how many were claimed.
    async fn claim_clients(&self) -> Result<usize, Error>;
}

/// In-process host that records the signals it receives.
#[derive(Debug, Default)]
pub struct LocalHost {
    open_clients: AtomicUsize,
    skipped_waiting: AtomicBool,
    claimed: AtomicUsize,
}

impl LocalHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// A host with `n` pages already open.
    pub fn with_clients(n: usize) -> Self {
        Self { open_clients: AtomicUsize::new(n), ..Self::default() }
    }

    pub fn skipped_waiting(&self) -> bool {
        self.skipped_waiting.load(Ordering::SeqCst)
    }

    pub fn claimed(&self) -> usize {
        self.claimed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Host for LocalHost {
    async fn skip_waiting(&self) {
        self.skipped_waiting.store(true, Ordering::SeqCst);
    }

    async fn claim_clients(&self) -> Result<usize, Error> {
        let n = self.open_clients.load(Ordering::SeqCst);
        self.claimed.store(n, Ordering::SeqCst);
        Ok(n)
    }
}
