//! Resource scanners
//!
//! One scanner per resource kind, all with the same shape: list inventory
//! (bounded retry, `ScannerUnavailable` on exhaustion), fetch the kind's
//! utilization signal per resource, classify against thresholds, and attach
//! a cost estimate for wasteful resources. Per-resource problems become
//! findings, never errors: a missing metric is an `insufficient-data`
//! finding, a missing price is a null-cost finding.

pub mod compute;
pub mod database;
pub mod object_store;
pub mod volume;

pub use compute::ComputeScanner;
pub use database::DatabaseScanner;
pub use object_store::ObjectStoreScanner;
pub use volume::VolumeScanner;

use crate::error::{Result, WastectlError};
use crate::model::{Finding, PriceQuote, ResourceKind};
use async_trait::async_trait;
use tracing::warn;

/// Polymorphic scanner capability. `scan` errors only with
/// `ScannerUnavailable` (account-wide failure for this kind); everything
/// per-resource is expressed as a finding.
#[async_trait]
pub trait ResourceScanner: Send + Sync {
    fn kind(&self) -> ResourceKind;

    async fn scan(&self, region: &str) -> Result<Vec<Finding>>;
}

/// Escalate an inventory failure: the whole kind is unscannable.
pub(crate) fn inventory_unavailable(kind: ResourceKind, err: WastectlError) -> WastectlError {
    WastectlError::ScannerUnavailable {
        kind,
        message: format!("inventory listing failed: {}", err),
        source: Some(Box::new(err)),
    }
}

/// Downgrade a pricing failure to "unpriced". Detection is primary; cost is
/// supplementary, so a wasteful finding is kept with `None` instead of being
/// dropped.
pub(crate) fn quote_or_unpriced(
    resource_id: &str,
    result: Result<PriceQuote>,
) -> Option<PriceQuote> {
    match result {
        Ok(quote) => Some(quote),
        Err(WastectlError::PricingUnavailable { kind, signature, .. }) => {
            warn!(
                resource_id,
                %kind, signature, "no price available, reporting without cost estimate"
            );
            None
        }
        Err(e) => {
            warn!(resource_id, "pricing lookup failed, reporting without cost estimate: {}", e);
            None
        }
    }
}
