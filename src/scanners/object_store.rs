//! Object store (S3) scanner
//!
//! A bucket with request activity at or below the threshold over a long
//! window is inactive. Request metrics are opt-in on the provider side, so
//! a bucket with zero datapoints is reported as `insufficient-data` — it is
//! never silently skipped and never assumed inactive.

use crate::config::ObjectStoreSettings;
use crate::error::Result;
use crate::model::{Finding, FindingReason, ReasonCode, ResourceDescriptor, ResourceKind};
use crate::pricing::{cost, PricingResolver};
use crate::provider::{InventorySource, MetricsSource};
use crate::retry::{ExponentialBackoffPolicy, RetryPolicy};
use crate::scanners::{inventory_unavailable, quote_or_unpriced, ResourceScanner};
use crate::utils::format_bytes;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

// Storage metrics are published daily; a two-day window guarantees at least
// one datapoint.
const STORAGE_METRIC_LOOKBACK_DAYS: u32 = 2;

pub struct ObjectStoreScanner {
    inventory: Arc<dyn InventorySource>,
    metrics: Arc<dyn MetricsSource>,
    pricing: Arc<PricingResolver>,
    settings: ObjectStoreSettings,
    retry: ExponentialBackoffPolicy,
}

impl ObjectStoreScanner {
    pub fn new(
        inventory: Arc<dyn InventorySource>,
        metrics: Arc<dyn MetricsSource>,
        pricing: Arc<PricingResolver>,
        settings: ObjectStoreSettings,
    ) -> Self {
        Self {
            inventory,
            metrics,
            pricing,
            settings,
            retry: ExponentialBackoffPolicy::default_policy(),
        }
    }

    /// Bucket size in bytes from the daily storage metric, if available.
    async fn bucket_size_bytes(&self, bucket: &ResourceDescriptor) -> Option<u64> {
        match self
            .metrics
            .get_average(bucket, "BucketSizeBytes", STORAGE_METRIC_LOOKBACK_DAYS)
            .await
        {
            Ok(sample) if sample.has_data() => Some(sample.average_value.max(0.0) as u64),
            Ok(_) => None,
            Err(e) => {
                warn!(bucket = %bucket.resource_id, "storage metric fetch failed: {}", e);
                None
            }
        }
    }

    async fn monthly_cost(
        &self,
        region: &str,
        bucket: &ResourceDescriptor,
        size_bytes: u64,
    ) -> Option<f64> {
        let storage_class = bucket.attr_str("storage_class").unwrap_or("STANDARD");
        let quote = quote_or_unpriced(
            &bucket.resource_id,
            self.pricing
                .get_unit_price(ResourceKind::ObjectStore, region, storage_class)
                .await,
        )?;
        cost::bucket_monthly_cost(&quote, size_bytes)
    }
}

#[async_trait]
impl ResourceScanner for ObjectStoreScanner {
    fn kind(&self) -> ResourceKind {
        ResourceKind::ObjectStore
    }

    async fn scan(&self, region: &str) -> Result<Vec<Finding>> {
        let buckets = self
            .retry
            .execute_with_retry(|| self.inventory.list_resources(ResourceKind::ObjectStore, region))
            .await
            .map_err(|e| inventory_unavailable(ResourceKind::ObjectStore, e))?;

        info!(
            region,
            count = buckets.len(),
            threshold = self.settings.request_threshold,
            "analyzing buckets for activity"
        );

        let mut findings = Vec::with_capacity(buckets.len());
        for bucket in buckets {
            let requests = match self
                .metrics
                .get_sum(&bucket, "AllRequests", self.settings.lookback_days)
                .await
            {
                Ok(sample) => sample,
                Err(e) => {
                    warn!(bucket = %bucket.resource_id, "request metric fetch failed: {}", e);
                    findings.push(Finding::insufficient_data(
                        bucket,
                        format!("request metrics could not be fetched: {}", e),
                        None,
                    ));
                    continue;
                }
            };

            if !requests.has_data() {
                // Zero datapoints means request metrics are not enabled on
                // the bucket — ambiguous, not confirmed-inactive.
                findings.push(Finding::insufficient_data(
                    bucket,
                    "request metrics not enabled; enable them to monitor bucket activity",
                    Some(requests),
                ));
                continue;
            }

            if requests.average_value <= self.settings.request_threshold {
                let size = self.bucket_size_bytes(&bucket).await;
                let monthly_cost = match size {
                    Some(bytes) => self.monthly_cost(region, &bucket, bytes).await,
                    None => None,
                };
                let detail = format!(
                    "{:.0} requests over {} days ({} stored)",
                    requests.average_value,
                    self.settings.lookback_days,
                    size.map(format_bytes).unwrap_or_else(|| "unknown size".to_string()),
                );
                warn!(bucket = %bucket.resource_id, "inactive bucket: {}", detail);
                findings.push(Finding::wasteful(
                    bucket,
                    FindingReason::new(ReasonCode::InactiveBucket, detail),
                    monthly_cost,
                    Some(requests),
                ));
            } else {
                debug!(bucket = %bucket.resource_id, requests = requests.average_value, "bucket active");
                let detail = format!(
                    "{:.0} requests over {} days",
                    requests.average_value, self.settings.lookback_days
                );
                findings.push(Finding::healthy(bucket, detail, Some(requests)));
            }
        }

        info!(
            region,
            wasteful = findings.iter().filter(|f| f.is_wasteful).count(),
            total = findings.len(),
            "object store scan complete"
        );
        Ok(findings)
    }
}
