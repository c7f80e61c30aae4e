//! Volume (EBS) scanner
//!
//! Two heuristics with different code paths:
//! - an unattached volume is always wasteful — it has no utilization signal
//!   at all, so no metric fetch happens;
//! - an attached volume with combined read+write operations below the I/O
//!   threshold over the window is wasteful.

use crate::config::VolumeSettings;
use crate::error::Result;
use crate::model::{Finding, FindingReason, ReasonCode, ResourceKind, UtilizationSample};
use crate::pricing::{cost, PricingResolver};
use crate::provider::{InventorySource, MetricsSource};
use crate::retry::{ExponentialBackoffPolicy, RetryPolicy};
use crate::scanners::{inventory_unavailable, quote_or_unpriced, ResourceScanner};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct VolumeScanner {
    inventory: Arc<dyn InventorySource>,
    metrics: Arc<dyn MetricsSource>,
    pricing: Arc<PricingResolver>,
    settings: VolumeSettings,
    retry: ExponentialBackoffPolicy,
}

impl VolumeScanner {
    pub fn new(
        inventory: Arc<dyn InventorySource>,
        metrics: Arc<dyn MetricsSource>,
        pricing: Arc<PricingResolver>,
        settings: VolumeSettings,
    ) -> Self {
        Self {
            inventory,
            metrics,
            pricing,
            settings,
            retry: ExponentialBackoffPolicy::default_policy(),
        }
    }

    async fn monthly_cost(&self, region: &str, volume: &crate::model::ResourceDescriptor) -> Option<f64> {
        let volume_type = volume.attr_str("volume_type").unwrap_or("gp2");
        let quote = quote_or_unpriced(
            &volume.resource_id,
            self.pricing
                .get_unit_price(ResourceKind::Volume, region, volume_type)
                .await,
        )?;
        cost::volume_monthly_cost(
            &quote,
            volume_type,
            volume.attr_i64("size_gb").unwrap_or(0),
            volume.attr_i64("iops"),
            volume.attr_i64("throughput_mbps"),
        )
    }
}

#[async_trait]
impl ResourceScanner for VolumeScanner {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Volume
    }

    async fn scan(&self, region: &str) -> Result<Vec<Finding>> {
        let volumes = self
            .retry
            .execute_with_retry(|| self.inventory.list_resources(ResourceKind::Volume, region))
            .await
            .map_err(|e| inventory_unavailable(ResourceKind::Volume, e))?;

        info!(region, count = volumes.len(), "analyzing volumes");

        let mut findings = Vec::with_capacity(volumes.len());
        for volume in volumes {
            // Unattached volumes are a distinct path: always wasteful, no
            // utilization signal exists for them.
            if volume.attr_str("state") == Some("available") {
                let monthly_cost = self.monthly_cost(region, &volume).await;
                let detail = format!(
                    "{} GB {} volume not attached to any instance",
                    volume.attr_i64("size_gb").unwrap_or(0),
                    volume.attr_str("volume_type").unwrap_or("unknown"),
                );
                warn!(volume_id = %volume.resource_id, "{}", detail);
                findings.push(Finding::wasteful(
                    volume,
                    FindingReason::new(ReasonCode::UnattachedVolume, detail),
                    monthly_cost,
                    None,
                ));
                continue;
            }

            let read = self
                .metrics
                .get_sum(&volume, "VolumeReadOps", self.settings.lookback_days)
                .await;
            let write = self
                .metrics
                .get_sum(&volume, "VolumeWriteOps", self.settings.lookback_days)
                .await;
            let (read, write) = match (read, write) {
                (Ok(r), Ok(w)) => (r, w),
                (Err(e), _) | (_, Err(e)) => {
                    warn!(volume_id = %volume.resource_id, "I/O metric fetch failed: {}", e);
                    findings.push(Finding::insufficient_data(
                        volume,
                        format!("I/O metrics could not be fetched: {}", e),
                        None,
                    ));
                    continue;
                }
            };

            if !read.has_data() && !write.has_data() {
                let evidence = UtilizationSample {
                    metric_name: "VolumeReadOps+VolumeWriteOps".to_string(),
                    ..read
                };
                findings.push(Finding::insufficient_data(
                    volume,
                    format!(
                        "no I/O datapoints over the last {} days",
                        self.settings.lookback_days
                    ),
                    Some(evidence),
                ));
                continue;
            }

            let total_io = read.average_value + write.average_value;
            let evidence = UtilizationSample {
                metric_name: "VolumeReadOps+VolumeWriteOps".to_string(),
                window_start: read.window_start,
                window_end: read.window_end,
                average_value: total_io,
                sample_count: read.sample_count + write.sample_count,
            };

            if total_io < self.settings.io_threshold {
                let monthly_cost = self.monthly_cost(region, &volume).await;
                let detail = format!(
                    "{:.0} total I/O operations over {} days, below the {:.0} threshold",
                    total_io, self.settings.lookback_days, self.settings.io_threshold
                );
                warn!(volume_id = %volume.resource_id, "{}", detail);
                findings.push(Finding::wasteful(
                    volume,
                    FindingReason::new(ReasonCode::LowIoVolume, detail),
                    monthly_cost,
                    Some(evidence),
                ));
            } else {
                debug!(volume_id = %volume.resource_id, total_io, "volume in active use");
                let detail = format!(
                    "{:.0} total I/O operations over {} days",
                    total_io, self.settings.lookback_days
                );
                findings.push(Finding::healthy(volume, detail, Some(evidence)));
            }
        }

        info!(
            region,
            wasteful = findings.iter().filter(|f| f.is_wasteful).count(),
            total = findings.len(),
            "volume scan complete"
        );
        Ok(findings)
    }
}
