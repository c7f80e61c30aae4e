//! Database (RDS) scanner
//!
//! Two waste categories from one scanner:
//! - idle instances: average connections at or below the connections
//!   threshold AND average CPU below the CPU threshold over the window;
//! - stale manual snapshots: older than the retention threshold.
//!
//! Missing either metric sample means `insufficient-data` — idleness is
//! never inferred from an absent signal.

use crate::config::DatabaseSettings;
use crate::error::Result;
use crate::model::{Finding, FindingReason, ReasonCode, ResourceDescriptor, ResourceKind};
use crate::pricing::{cost, PricingResolver};
use crate::provider::{InventorySource, MetricsSource};
use crate::retry::{ExponentialBackoffPolicy, RetryPolicy};
use crate::scanners::{inventory_unavailable, quote_or_unpriced, ResourceScanner};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct DatabaseScanner {
    inventory: Arc<dyn InventorySource>,
    metrics: Arc<dyn MetricsSource>,
    pricing: Arc<PricingResolver>,
    settings: DatabaseSettings,
    retry: ExponentialBackoffPolicy,
}

impl DatabaseScanner {
    pub fn new(
        inventory: Arc<dyn InventorySource>,
        metrics: Arc<dyn MetricsSource>,
        pricing: Arc<PricingResolver>,
        settings: DatabaseSettings,
    ) -> Self {
        Self {
            inventory,
            metrics,
            pricing,
            settings,
            retry: ExponentialBackoffPolicy::default_policy(),
        }
    }

    async fn instance_monthly_cost(&self, region: &str, db: &ResourceDescriptor) -> Option<f64> {
        let class = db.attr_str("db_instance_class").unwrap_or("unknown");
        let engine = db.attr_str("engine").unwrap_or("postgres");
        let multi_az = db.attr_bool("multi_az").unwrap_or(false);
        let deployment = if multi_az { "multi-az" } else { "single-az" };
        let signature = format!("{}/{}/{}", class, engine, deployment);

        let quote = quote_or_unpriced(
            &db.resource_id,
            self.pricing
                .get_unit_price(ResourceKind::Database, region, &signature)
                .await,
        )?;
        cost::database_monthly_cost(
            &quote,
            db.attr_str("storage_type").unwrap_or("gp2"),
            db.attr_i64("allocated_storage_gb").unwrap_or(0),
            multi_az,
        )
    }

    async fn scan_instances(&self, region: &str, findings: &mut Vec<Finding>) -> Result<()> {
        let instances = self
            .retry
            .execute_with_retry(|| self.inventory.list_resources(ResourceKind::Database, region))
            .await
            .map_err(|e| inventory_unavailable(ResourceKind::Database, e))?;

        info!(
            region,
            count = instances.len(),
            cpu_threshold = self.settings.cpu_threshold,
            connections_threshold = self.settings.connections_threshold,
            "analyzing database instances"
        );

        for db in instances {
            let connections = self
                .metrics
                .get_average(&db, "DatabaseConnections", self.settings.lookback_days)
                .await;
            let cpu = self
                .metrics
                .get_average(&db, "CPUUtilization", self.settings.lookback_days)
                .await;
            let (connections, cpu) = match (connections, cpu) {
                (Ok(c), Ok(u)) => (c, u),
                (Err(e), _) | (_, Err(e)) => {
                    warn!(db_instance_id = %db.resource_id, "metric fetch failed: {}", e);
                    findings.push(Finding::insufficient_data(
                        db,
                        format!("database metrics could not be fetched: {}", e),
                        None,
                    ));
                    continue;
                }
            };

            if !connections.has_data() || !cpu.has_data() {
                findings.push(Finding::insufficient_data(
                    db,
                    format!(
                        "insufficient metric datapoints over the last {} days",
                        self.settings.lookback_days
                    ),
                    Some(connections),
                ));
                continue;
            }

            let idle = connections.average_value <= self.settings.connections_threshold
                && cpu.average_value < self.settings.cpu_threshold;

            if idle {
                let monthly_cost = self.instance_monthly_cost(region, &db).await;
                let detail = format!(
                    "average {:.2} connections and {:.2}% CPU over {} days",
                    connections.average_value, cpu.average_value, self.settings.lookback_days
                );
                warn!(db_instance_id = %db.resource_id, "idle database: {}", detail);
                findings.push(Finding::wasteful(
                    db,
                    FindingReason::new(ReasonCode::IdleDatabase, detail),
                    monthly_cost,
                    Some(connections),
                ));
            } else {
                debug!(db_instance_id = %db.resource_id, "database in active use");
                let detail = format!(
                    "average {:.2} connections and {:.2}% CPU over {} days",
                    connections.average_value, cpu.average_value, self.settings.lookback_days
                );
                findings.push(Finding::healthy(db, detail, Some(connections)));
            }
        }
        Ok(())
    }

    async fn scan_snapshots(&self, region: &str, findings: &mut Vec<Finding>) -> Result<()> {
        let snapshots = self
            .retry
            .execute_with_retry(|| self.inventory.list_database_snapshots(region))
            .await
            .map_err(|e| inventory_unavailable(ResourceKind::Database, e))?;

        info!(region, count = snapshots.len(), "analyzing manual snapshots");

        let now = Utc::now();
        for snapshot in snapshots {
            let created = snapshot
                .attr_str("snapshot_create_time")
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc));
            let Some(created) = created else {
                findings.push(Finding::insufficient_data(
                    snapshot,
                    "snapshot has no creation timestamp",
                    None,
                ));
                continue;
            };

            let age_days = (now - created).num_days();
            if age_days > self.settings.snapshot_age_days as i64 {
                let size_gb = snapshot.attr_i64("allocated_storage_gb").unwrap_or(0);
                let quote = quote_or_unpriced(
                    &snapshot.resource_id,
                    self.pricing
                        .get_unit_price(ResourceKind::Database, region, "snapshot")
                        .await,
                );
                let monthly_cost = quote.and_then(|q| cost::snapshot_monthly_cost(&q, size_gb));
                let detail = format!(
                    "manual snapshot is {} days old ({} GB), past the {}-day retention threshold",
                    age_days, size_gb, self.settings.snapshot_age_days
                );
                warn!(snapshot_id = %snapshot.resource_id, "{}", detail);
                findings.push(Finding::wasteful(
                    snapshot,
                    FindingReason::new(ReasonCode::StaleSnapshot, detail),
                    monthly_cost,
                    None,
                ));
            } else {
                let detail = format!("manual snapshot is {} days old", age_days);
                findings.push(Finding::healthy(snapshot, detail, None));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ResourceScanner for DatabaseScanner {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Database
    }

    async fn scan(&self, region: &str) -> Result<Vec<Finding>> {
        let mut findings = Vec::new();
        self.scan_instances(region, &mut findings).await?;
        self.scan_snapshots(region, &mut findings).await?;

        info!(
            region,
            wasteful = findings.iter().filter(|f| f.is_wasteful).count(),
            total = findings.len(),
            "database scan complete"
        );
        Ok(findings)
    }
}
