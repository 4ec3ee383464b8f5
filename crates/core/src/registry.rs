//! Partition Registry: the three live partition names and the Static Asset List.
//!
//! Partition names embed a version suffix; bumping it on redeploy makes every
//! older partition stale so activation garbage-collects it.

use serde::{Deserialize, Serialize};

/// Generic partition for documents and uncategorized requests.
pub const GENERIC_PARTITION: &str = "market-dashboard-v1.1.0";

/// Partition pre-populated with the Static Asset List during setup.
pub const STATIC_PARTITION: &str = "market-static-v1.1.0";

/// Partition for periodically updated data files.
pub const DATA_PARTITION: &str = "market-data-v1.1.0";

/// Assets written into the static partition at setup.
pub const STATIC_ASSETS: &[&str] = &[
    "/",
    "/market.html",
    "/tabel.html",
    "https://cdn.tailwindcss.com",
    "https://cdn.jsdelivr.net/npm/chart.js",
    "https://cdn.jsdelivr.net/npm/chartjs-plugin-datalabels",
];

/// The three live partition names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionNames {
    #[serde(default = "default_generic")]
    pub generic: String,
    #[serde(default = "default_static", rename = "static")]
    pub static_assets: String,
    #[serde(default = "default_data")]
    pub data: String,
}

fn default_generic() -> String {
    GENERIC_PARTITION.into()
}

fn default_static() -> String {
    STATIC_PARTITION.into()
}

fn default_data() -> String {
    DATA_PARTITION.into()
}

impl Default for PartitionNames {
    fn default() -> Self {
        Self { generic: default_generic(), static_assets: default_static(), data: default_data() }
    }
}

impl PartitionNames {
    /// All live names, in generic/static/data order.
    pub fn live(&self) -> [&str; 3] {
        [&self.generic, &self.static_assets, &self.data]
    }

    /// Whether `name` is one of the live partitions.
    pub fn is_live(&self, name: &str) -> bool {
        self.live().contains(&name)
    }
}

/// Static configuration handed to the lifecycle manager and the router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionRegistry {
    #[serde(default)]
    pub partitions: PartitionNames,

    /// Root-relative paths and absolute URLs, matched by exact string comparison.
    #[serde(default = "default_static_assets")]
    pub static_assets: Vec<String>,
}

fn default_static_assets() -> Vec<String> {
    STATIC_ASSETS.iter().map(|s| s.to_string()).collect()
}

impl Default for PartitionRegistry {
    fn default() -> Self {
        Self { partitions: PartitionNames::default(), static_assets: default_static_assets() }
    }
}

impl PartitionRegistry {
    pub fn new(partitions: PartitionNames, static_assets: Vec<String>) -> Self {
        Self { partitions, static_assets }
    }

    /// Whether the full URL or the path is listed verbatim in the Static Asset List.
    pub fn is_static_asset(&self, href: &str, path: &str) -> bool {
        self.static_assets.iter().any(|asset| asset == href || asset == path)
    }
}
