//! Provider-agnostic trait seams
//!
//! All provider-specific calls sit behind these traits so the classification
//! and pricing logic stays provider-agnostic and unit-testable with mocks.
//! AWS implementations live in `src/providers/aws.rs`.

use crate::error::Result;
use crate::model::{ResourceDescriptor, ResourceKind, UtilizationSample};
use async_trait::async_trait;

/// Inventory source: enumerates resources of one kind in one region.
///
/// Implementations apply the kind's "active" filter themselves (running
/// instances, available databases); stopped or terminated resources are out
/// of scope for waste detection.
#[async_trait]
pub trait InventorySource: Send + Sync {
    async fn list_resources(
        &self,
        kind: ResourceKind,
        region: &str,
    ) -> Result<Vec<ResourceDescriptor>>;

    /// Manual database snapshots, scanned by the database scanner for stale
    /// backups. A separate listing because snapshots are not themselves a
    /// `ResourceKind`.
    async fn list_database_snapshots(&self, region: &str) -> Result<Vec<ResourceDescriptor>>;
}

/// Metrics source: utilization signal over a lookback window.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Mean of the metric's datapoints over the window (CPU %, connections).
    async fn get_average(
        &self,
        resource: &ResourceDescriptor,
        metric_name: &str,
        lookback_days: u32,
    ) -> Result<UtilizationSample>;

    /// Window total for count metrics (I/O ops, requests). The total is
    /// carried in `average_value`; `sample_count` is still the number of
    /// datapoints, so "no data" stays distinguishable from "zero activity".
    async fn get_sum(
        &self,
        resource: &ResourceDescriptor,
        metric_name: &str,
        lookback_days: u32,
    ) -> Result<UtilizationSample>;
}

/// Live pricing source: returns the provider-shaped nested price document
/// for one (kind, region, attribute signature). The pricing resolver
/// normalizes it; a `Null` document means the source has nothing for this
/// key and the resolver falls back to the static table.
#[async_trait]
pub trait PricingSource: Send + Sync {
    async fn query_price(
        &self,
        kind: ResourceKind,
        region: &str,
        signature: &str,
    ) -> Result<serde_json::Value>;
}

/// Durable report persistence (object storage).
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn put(&self, key: &str, body: Vec<u8>) -> Result<()>;
}

/// Pub/sub notification (run summaries and run-failure messages).
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn publish(&self, subject: &str, message: &str) -> Result<()>;
}
