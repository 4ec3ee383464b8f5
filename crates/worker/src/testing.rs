//! Scripted network stub and fixtures shared by the worker tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use swcache_core::{CacheStore, Error, MemoryStore, Network, Request, Response, ResponseKind};
use tokio::sync::Semaphore;
use url::Url;

pub const ORIGIN: &str = "http://localhost:8000";

pub fn origin() -> Url {
    Url::parse(ORIGIN).unwrap()
}

pub fn url(path_or_url: &str) -> Url {
    origin().join(path_or_url).unwrap()
}

pub fn memory_store() -> Arc<dyn CacheStore> {
    Arc::new(MemoryStore::new())
}

#[derive(Debug, Clone)]
enum Script {
    Respond { status: u16, body: String },
    Fail,
}

/// Network stub answering per URL; unscripted URLs behave as offline.
#[derive(Debug)]
pub struct StubNetwork {
    origin: Url,
    scripts: Mutex<HashMap<String, Script>>,
    calls: Mutex<Vec<Url>>,
    count: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
}

impl StubNetwork {
    pub fn new() -> Self {
        Self {
            origin: origin(),
            scripts: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            count: AtomicUsize::new(0),
            gate: None,
        }
    }

    /// Every fetch waits for one permit on the returned semaphore before answering.
    pub fn gated() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        (Self { gate: Some(gate.clone()), ..Self::new() }, gate)
    }

    pub fn respond(&self, url: &Url, status: u16, body: &str) {
        self.scripts
            .lock()
            .unwrap()
            .insert(url.to_string(), Script::Respond { status, body: body.to_string() });
    }

    pub fn fail(&self, url: &Url) {
        self.scripts.lock().unwrap().insert(url.to_string(), Script::Fail);
    }

    pub fn calls(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, url: &Url) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl Network for StubNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        self.count.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push(request.url.clone());

        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }

        let script = self.scripts.lock().unwrap().get(request.url.as_str()).cloned();
        match script {
            Some(Script::Respond { status, body }) => {
                let kind = ResponseKind::for_request(request, &self.origin);
                Ok(Response::new(request.url.clone(), status, body, kind))
            }
            Some(Script::Fail) | None => Err(Error::Network(format!("offline: {}", request.url))),
        }
    }
}

/// Body of a response as text.
pub fn text(response: &Response) -> &str {
    std::str::from_utf8(&response.body).unwrap()
}
