//! Request Router: picks the policy class for an intercepted request.
//!
//! Rules are checked in order and the first match wins:
//!
//! 1. data file (`.csv` path, or the legacy `ina.csv` fragment) -> data partition
//! 2. static asset (full URL or path listed verbatim) -> static partition
//! 3. document navigation -> generic partition, network first
//! 4. anything else -> generic partition, cache first

use std::sync::Arc;

use serde::Serialize;
use swcache_core::{Destination, PartitionRegistry, Request};

/// Legacy data filename fragment matched anywhere in the path.
const LEGACY_DATA_FRAGMENT: &str = "ina.csv";

/// Policy class of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestClass {
    /// Refresh-behind against the data partition.
    DataFile,
    /// Cache-first against the static partition.
    StaticAsset,
    /// Network-first with cache fallback against the generic partition.
    Document,
    /// Cache-first against the generic partition.
    Fallback,
}

/// A classified request and the partition its strategy writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route<'a> {
    pub class: RequestClass,
    pub partition: &'a str,
}

/// Classifies requests against a fixed registry.
#[derive(Debug, Clone)]
pub struct Router {
    registry: Arc<PartitionRegistry>,
}

impl Router {
    pub fn new(registry: Arc<PartitionRegistry>) -> Self {
        Self { registry }
    }

    /// Policy class of `request`. Pure; depends only on URL and destination.
    pub fn classify(&self, request: &Request) -> RequestClass {
        let path = request.url.path();

        if is_data_file(path) {
            RequestClass::DataFile
        } else if self.registry.is_static_asset(request.url.as_str(), path) {
            RequestClass::StaticAsset
        } else if request.destination == Destination::Document {
            RequestClass::Document
        } else {
            RequestClass::Fallback
        }
    }

    pub fn route(&self, request: &Request) -> Route<'_> {
        let class = self.classify(request);
        let names = &self.registry.partitions;
        let partition = match class {
            RequestClass::DataFile => names.data.as_str(),
            RequestClass::StaticAsset => names.static_assets.as_str(),
            RequestClass::Document | RequestClass::Fallback => names.generic.as_str(),
        };
        Route { class, partition }
    }
}

/// Whether a URL path names a data file.
pub fn is_data_file(path: &str) -> bool {
    path.ends_with(".csv") || path.contains(LEGACY_DATA_FRAGMENT)
}
