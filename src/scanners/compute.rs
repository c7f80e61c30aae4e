//! Compute (EC2) scanner
//!
//! The template scanner: running instances with average CPU below the idle
//! threshold over the lookback window are wasteful. Instances with no CPU
//! datapoints at all (freshly launched, agentless edge cases) are reported
//! as `insufficient-data`, never assumed idle.

use crate::config::ComputeSettings;
use crate::error::Result;
use crate::model::{Finding, FindingReason, ReasonCode, ResourceKind};
use crate::pricing::{cost, PricingResolver};
use crate::provider::{InventorySource, MetricsSource};
use crate::retry::{ExponentialBackoffPolicy, RetryPolicy};
use crate::scanners::{inventory_unavailable, quote_or_unpriced, ResourceScanner};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct ComputeScanner {
    inventory: Arc<dyn InventorySource>,
    metrics: Arc<dyn MetricsSource>,
    pricing: Arc<PricingResolver>,
    settings: ComputeSettings,
    retry: ExponentialBackoffPolicy,
}

impl ComputeScanner {
    pub fn new(
        inventory: Arc<dyn InventorySource>,
        metrics: Arc<dyn MetricsSource>,
        pricing: Arc<PricingResolver>,
        settings: ComputeSettings,
    ) -> Self {
        Self {
            inventory,
            metrics,
            pricing,
            settings,
            retry: ExponentialBackoffPolicy::default_policy(),
        }
    }

    async fn monthly_cost(&self, region: &str, instance_type: &str, resource_id: &str) -> Option<f64> {
        let signature = format!("{}/Linux", instance_type);
        let quote = quote_or_unpriced(
            resource_id,
            self.pricing
                .get_unit_price(ResourceKind::Compute, region, &signature)
                .await,
        )?;
        cost::instance_monthly_cost(&quote)
    }
}

#[async_trait]
impl ResourceScanner for ComputeScanner {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Compute
    }

    async fn scan(&self, region: &str) -> Result<Vec<Finding>> {
        let instances = self
            .retry
            .execute_with_retry(|| self.inventory.list_resources(ResourceKind::Compute, region))
            .await
            .map_err(|e| inventory_unavailable(ResourceKind::Compute, e))?;

        info!(
            region,
            count = instances.len(),
            threshold = self.settings.cpu_idle_threshold,
            "analyzing running instances for idle CPU"
        );

        let mut findings = Vec::with_capacity(instances.len());
        for instance in instances {
            let sample = match self
                .metrics
                .get_average(&instance, "CPUUtilization", self.settings.lookback_days)
                .await
            {
                Ok(sample) => sample,
                Err(e) => {
                    warn!(instance_id = %instance.resource_id, "CPU metric fetch failed: {}", e);
                    findings.push(Finding::insufficient_data(
                        instance,
                        format!("CPU metrics could not be fetched: {}", e),
                        None,
                    ));
                    continue;
                }
            };

            if !sample.has_data() {
                findings.push(Finding::insufficient_data(
                    instance,
                    format!(
                        "no CPU datapoints over the last {} days",
                        self.settings.lookback_days
                    ),
                    Some(sample),
                ));
                continue;
            }

            if sample.average_value < self.settings.cpu_idle_threshold {
                let instance_type = instance.attr_str("instance_type").unwrap_or("unknown");
                let monthly_cost = self
                    .monthly_cost(region, instance_type, &instance.resource_id)
                    .await;
                let detail = format!(
                    "average CPU {:.2}% over {} days, below the {:.1}% idle threshold",
                    sample.average_value, self.settings.lookback_days, self.settings.cpu_idle_threshold
                );
                warn!(instance_id = %instance.resource_id, instance_type, "{}", detail);
                findings.push(Finding::wasteful(
                    instance,
                    FindingReason::new(ReasonCode::IdleCpu, detail),
                    monthly_cost,
                    Some(sample),
                ));
            } else {
                debug!(
                    instance_id = %instance.resource_id,
                    avg_cpu = sample.average_value,
                    "instance in active use"
                );
                let detail = format!(
                    "average CPU {:.2}% over {} days",
                    sample.average_value, self.settings.lookback_days
                );
                findings.push(Finding::healthy(instance, detail, Some(sample)));
            }
        }

        info!(
            region,
            wasteful = findings.iter().filter(|f| f.is_wasteful).count(),
            total = findings.len(),
            "compute scan complete"
        );
        Ok(findings)
    }
}
