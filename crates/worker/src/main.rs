//! market-sw harness entry point.
//!
//! Runs setup and activation against the configured store and origin, then
//! answers newline-delimited JSON events from stdin, one reply per line on
//! stdout. Logging goes to stderr to keep stdout for the protocol.

use std::sync::Arc;

use anyhow::{Context, Result};
use swcache_client::{FetchClient, FetchConfig};
use swcache_core::{AppConfig, CacheDb, CacheStore, Network};
use swcache_worker::{EventReply, LocalHost, ServiceWorker, events};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    let origin = config.origin_url()?;
    tracing::info!(origin = %origin, db_path = %config.db_path.display(), "starting market-sw");

    let store: Arc<dyn CacheStore> = Arc::new(CacheDb::open(&config.db_path).await?);
    let network: Arc<dyn Network> = Arc::new(FetchClient::new(FetchConfig::from_app(&config)?)?);
    let worker = ServiceWorker::new(config.registry, origin, store, network, Arc::new(LocalHost::new()));

    let mut stdout = tokio::io::stdout();

    let installed = worker.install().await.context("setup failed")?;
    write_reply(&mut stdout, &EventReply::Installed(installed)).await?;
    let activated = worker.activate().await.context("activation failed")?;
    write_reply(&mut stdout, &EventReply::Activated(activated)).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let reply = match events::parse(&line) {
            Ok(event) => events::dispatch(&worker, event).await,
            Err(e) => EventReply::from(e),
        };
        write_reply(&mut stdout, &reply).await?;
    }

    let outcomes = worker.wait_idle().await;
    tracing::info!(tasks = outcomes.len(), "background work drained");
    write_reply(&mut stdout, &EventReply::Idle { outcomes }).await?;

    Ok(())
}

async fn write_reply(stdout: &mut tokio::io::Stdout, reply: &EventReply) -> Result<()> {
    let mut line = serde_json::to_vec(reply)?;
    line.push(b'\n');
    stdout.write_all(&line).await?;
    stdout.flush().await?;
    Ok(())
}
