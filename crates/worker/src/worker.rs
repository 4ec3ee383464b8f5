//! The worker facade: lifecycle state plus request interception.

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use swcache_core::{CacheStore, Error, Network, Partition, PartitionRegistry, Request, Response};
use url::Url;

use crate::host::Host;
use crate::lifecycle::{ActivateReport, InstallReport, Lifecycle};
use crate::router::{RequestClass, Router};
use crate::strategy::{self, Source};
use crate::tasks::{TaskOutcome, TaskQueue};

/// Lifecycle position of a worker instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    /// Setup failed; this instance never takes over.
    Redundant,
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        };
        f.write_str(s)
    }
}

/// The response handed back to the page for one intercepted request.
#[derive(Debug, Clone)]
pub struct Served {
    pub class: RequestClass,
    pub source: Source,
    pub response: Response,
}

/// One partition and how many entries it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionSummary {
    pub name: String,
    pub entries: usize,
}

/// Routes intercepted requests to their strategies and owns the background queue.
pub struct ServiceWorker {
    origin: Url,
    router: Router,
    lifecycle: Lifecycle,
    store: Arc<dyn CacheStore>,
    network: Arc<dyn Network>,
    tasks: TaskQueue,
    state: Mutex<WorkerState>,
}

impl ServiceWorker {
    pub fn new(
        registry: PartitionRegistry, origin: Url, store: Arc<dyn CacheStore>, network: Arc<dyn Network>,
        host: Arc<dyn Host>,
    ) -> Self {
        let registry = Arc::new(registry);
        let lifecycle = Lifecycle::new(registry.clone(), origin.clone(), store.clone(), network.clone(), host);
        Self {
            origin,
            router: Router::new(registry),
            lifecycle,
            store,
            network,
            tasks: TaskQueue::new(),
            state: Mutex::new(WorkerState::Parsed),
        }
    }

    pub fn state(&self) -> WorkerState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, next: WorkerState) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = std::mem::replace(&mut *state, next);
        tracing::debug!(from = %previous, to = %next, "worker state");
    }

    /// Origin the dashboard is served from; relative request URLs resolve against it.
    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn tasks(&self) -> &TaskQueue {
        &self.tasks
    }

    /// Run setup. A failure leaves the worker redundant.
    ///
    /// Running setup again on an installed worker rewrites the same entries.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        match self.state() {
            WorkerState::Parsed | WorkerState::Installed => {}
            state => return Err(Error::InvalidInput(format!("cannot install a worker that is {state}"))),
        }

        self.set_state(WorkerState::Installing);
        match self.lifecycle.install().await {
            Ok(report) => {
                self.set_state(WorkerState::Installed);
                Ok(report)
            }
            Err(e) => {
                tracing::error!(error = %e, "setup failed");
                self.set_state(WorkerState::Redundant);
                Err(e)
            }
        }
    }

    /// Run activation. Only an installed (or already active) worker activates.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        let previous = self.state();
        match previous {
            WorkerState::Installed | WorkerState::Activated => {}
            state => return Err(Error::InvalidInput(format!("cannot activate a worker that is {state}"))),
        }

        self.set_state(WorkerState::Activating);
        match self.lifecycle.activate().await {
            Ok(report) => {
                self.set_state(WorkerState::Activated);
                Ok(report)
            }
            Err(e) => {
                tracing::error!(error = %e, "activation failed");
                self.set_state(previous);
                Err(e)
            }
        }
    }

    /// Produce the response for `request`. Background work is scheduled, not awaited.
    pub async fn intercept(&self, request: &Request) -> Result<Served, Error> {
        if self.state() != WorkerState::Activated {
            tracing::debug!(state = %self.state(), url = %request.url, "intercepting before activation");
        }

        let route = self.router.route(request);
        let partition = Partition::new(self.store.clone(), route.partition);
        tracing::debug!(url = %request.url, class = ?route.class, partition = route.partition, "routed");

        let handled = match route.class {
            RequestClass::DataFile => strategy::refresh_behind::handle(request, &partition, &self.network).await?,
            RequestClass::StaticAsset | RequestClass::Fallback => {
                strategy::cache_first::handle(request, self.store.as_ref(), &partition, &self.network).await?
            }
            RequestClass::Document => {
                strategy::network_first::handle(request, self.store.as_ref(), &partition, &self.network).await?
            }
        };

        if let Some(task) = handled.background {
            self.tasks.schedule(task);
        }

        Ok(Served { class: route.class, source: handled.source, response: handled.response })
    }

    /// Every partition in the store, in creation order.
    pub async fn partitions(&self) -> Result<Vec<PartitionSummary>, Error> {
        let mut summaries = Vec::new();
        for name in self.store.keys().await? {
            let entries = self.store.entries(&name).await?.len();
            summaries.push(PartitionSummary { name, entries });
        }
        Ok(summaries)
    }

    /// Wait for every scheduled background task.
    pub async fn wait_idle(&self) -> Vec<TaskOutcome> {
        self.tasks.wait_idle().await
    }
}
