//! AWS implementations of the provider traits
//!
//! All the SDK plumbing lives here: EC2/RDS/S3 inventory, CloudWatch
//! metrics, the Price List API, S3 report persistence, and SNS
//! notifications. Everything above this module is provider-agnostic.

use crate::error::{Result, WastectlError};
use crate::model::{ResourceDescriptor, ResourceKind, UtilizationSample};
use crate::provider::{InventorySource, MetricsSource, Notifier, PricingSource, ReportStore};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_cloudwatch::types::{Dimension, Statistic};
use aws_sdk_pricing::types::{Filter as PricingFilter, FilterType};
use aws_sdk_s3::primitives::ByteStream;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};

type SmithyDateTime = aws_sdk_cloudwatch::primitives::DateTime;

fn to_smithy(ts: DateTime<Utc>) -> SmithyDateTime {
    SmithyDateTime::from_secs(ts.timestamp())
}

fn from_smithy(ts: &SmithyDateTime) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(ts.secs(), ts.subsec_nanos()).single()
}

fn lookback_window(lookback_days: u32) -> (DateTime<Utc>, DateTime<Utc>) {
    let end = Utc::now();
    (end - Duration::days(lookback_days as i64), end)
}

/// Verify credentials before anything else runs. A failure here is
/// run-fatal: nothing can be scanned without a valid identity.
pub async fn verify_credentials(config: &SdkConfig) -> Result<String> {
    let sts = aws_sdk_sts::Client::new(config);
    let identity = sts
        .get_caller_identity()
        .send()
        .await
        .map_err(|e| WastectlError::Aws(format!("Credential check failed: {}", e)))?;
    let account = identity.account().unwrap_or("unknown").to_string();
    info!(account, "credentials verified");
    Ok(account)
}

/// Inventory from EC2, RDS, and S3.
pub struct AwsInventory {
    ec2: aws_sdk_ec2::Client,
    rds: aws_sdk_rds::Client,
    s3: aws_sdk_s3::Client,
}

impl AwsInventory {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            ec2: aws_sdk_ec2::Client::new(config),
            rds: aws_sdk_rds::Client::new(config),
            s3: aws_sdk_s3::Client::new(config),
        }
    }

    async fn list_instances(&self, region: &str) -> Result<Vec<ResourceDescriptor>> {
        let response = self
            .ec2
            .describe_instances()
            .filters(
                aws_sdk_ec2::types::Filter::builder()
                    .name("instance-state-name")
                    .values("running")
                    .build(),
            )
            .send()
            .await
            .map_err(|e| WastectlError::Aws(format!("Failed to list EC2 instances: {}", e)))?;

        let mut resources = Vec::new();
        for reservation in response.reservations() {
            for instance in reservation.instances() {
                let Some(instance_id) = instance.instance_id() else {
                    continue;
                };
                let instance_type = instance
                    .instance_type()
                    .map(|t| t.as_str().to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                resources.push(
                    ResourceDescriptor::new(instance_id, ResourceKind::Compute, region)
                        .with_attr("instance_type", instance_type),
                );
            }
        }
        debug!(region, count = resources.len(), "listed running instances");
        Ok(resources)
    }

    async fn list_volumes(&self, region: &str) -> Result<Vec<ResourceDescriptor>> {
        let response = self
            .ec2
            .describe_volumes()
            .send()
            .await
            .map_err(|e| WastectlError::Aws(format!("Failed to list volumes: {}", e)))?;

        let mut resources = Vec::new();
        for volume in response.volumes() {
            let Some(volume_id) = volume.volume_id() else {
                continue;
            };
            let mut desc = ResourceDescriptor::new(volume_id, ResourceKind::Volume, region)
                .with_attr(
                    "volume_type",
                    volume
                        .volume_type()
                        .map(|t| t.as_str().to_string())
                        .unwrap_or_else(|| "unknown".to_string()),
                )
                .with_attr(
                    "state",
                    volume
                        .state()
                        .map(|s| s.as_str().to_string())
                        .unwrap_or_else(|| "unknown".to_string()),
                )
                .with_attr("size_gb", i64::from(volume.size().unwrap_or(0)));
            if let Some(iops) = volume.iops() {
                desc = desc.with_attr("iops", i64::from(iops));
            }
            if let Some(throughput) = volume.throughput() {
                desc = desc.with_attr("throughput_mbps", i64::from(throughput));
            }
            resources.push(desc);
        }
        debug!(region, count = resources.len(), "listed volumes");
        Ok(resources)
    }

    async fn list_databases(&self, region: &str) -> Result<Vec<ResourceDescriptor>> {
        let response = self
            .rds
            .describe_db_instances()
            .send()
            .await
            .map_err(|e| WastectlError::Aws(format!("Failed to list RDS instances: {}", e)))?;

        let mut resources = Vec::new();
        for db in response.db_instances() {
            // Only available instances accrue compute waste; stopped
            // instances are billed differently and are out of scope.
            if db.db_instance_status() != Some("available") {
                continue;
            }
            let Some(db_id) = db.db_instance_identifier() else {
                continue;
            };
            resources.push(
                ResourceDescriptor::new(db_id, ResourceKind::Database, region)
                    .with_attr(
                        "db_instance_class",
                        db.db_instance_class().unwrap_or("unknown").to_string(),
                    )
                    .with_attr("engine", db.engine().unwrap_or("unknown").to_string())
                    .with_attr("multi_az", db.multi_az().unwrap_or(false))
                    .with_attr(
                        "allocated_storage_gb",
                        i64::from(db.allocated_storage().unwrap_or(0)),
                    )
                    .with_attr("storage_type", db.storage_type().unwrap_or("gp2").to_string()),
            );
        }
        debug!(region, count = resources.len(), "listed database instances");
        Ok(resources)
    }

    async fn list_buckets(&self, region: &str) -> Result<Vec<ResourceDescriptor>> {
        let response = self
            .s3
            .list_buckets()
            .send()
            .await
            .map_err(|e| WastectlError::Aws(format!("Failed to list buckets: {}", e)))?;

        // Bucket listing is account-wide; keep only buckets homed in the
        // target region so the run stays single-region.
        let mut resources = Vec::new();
        for bucket in response.buckets() {
            let Some(name) = bucket.name() else {
                continue;
            };
            let bucket_region = match self.s3.get_bucket_location().bucket(name).send().await {
                Ok(location) => location
                    .location_constraint()
                    .map(|c| c.as_str().to_string())
                    .filter(|s| !s.is_empty())
                    // An empty LocationConstraint means us-east-1.
                    .unwrap_or_else(|| "us-east-1".to_string()),
                Err(e) => {
                    warn!(bucket = name, "could not resolve bucket region: {}", e);
                    continue;
                }
            };
            if bucket_region == region {
                resources.push(ResourceDescriptor::new(name, ResourceKind::ObjectStore, region));
            }
        }
        debug!(region, count = resources.len(), "listed buckets in region");
        Ok(resources)
    }
}

#[async_trait]
impl InventorySource for AwsInventory {
    async fn list_resources(
        &self,
        kind: ResourceKind,
        region: &str,
    ) -> Result<Vec<ResourceDescriptor>> {
        match kind {
            ResourceKind::Compute => self.list_instances(region).await,
            ResourceKind::Volume => self.list_volumes(region).await,
            ResourceKind::Database => self.list_databases(region).await,
            ResourceKind::ObjectStore => self.list_buckets(region).await,
        }
    }

    async fn list_database_snapshots(&self, region: &str) -> Result<Vec<ResourceDescriptor>> {
        let response = self
            .rds
            .describe_db_snapshots()
            .snapshot_type("manual")
            .send()
            .await
            .map_err(|e| WastectlError::Aws(format!("Failed to list RDS snapshots: {}", e)))?;

        let mut resources = Vec::new();
        for snapshot in response.db_snapshots() {
            let Some(snapshot_id) = snapshot.db_snapshot_identifier() else {
                continue;
            };
            let mut desc = ResourceDescriptor::new(snapshot_id, ResourceKind::Database, region)
                .with_attr(
                    "allocated_storage_gb",
                    i64::from(snapshot.allocated_storage().unwrap_or(0)),
                );
            if let Some(created) = snapshot.snapshot_create_time().and_then(from_smithy) {
                desc = desc.with_attr("snapshot_create_time", created.to_rfc3339());
            }
            resources.push(desc);
        }
        debug!(region, count = resources.len(), "listed manual snapshots");
        Ok(resources)
    }
}

/// CloudWatch-backed utilization metrics.
pub struct AwsMetrics {
    cloudwatch: aws_sdk_cloudwatch::Client,
}

impl AwsMetrics {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            cloudwatch: aws_sdk_cloudwatch::Client::new(config),
        }
    }

    /// Namespace and identifying dimensions for one resource's metric. S3
    /// metrics are the odd ones out: the dimension set depends on the metric.
    fn metric_target(
        resource: &ResourceDescriptor,
        metric_name: &str,
    ) -> (&'static str, Vec<(&'static str, String)>) {
        let id = resource.resource_id.clone();
        match resource.resource_kind {
            ResourceKind::Compute => ("AWS/EC2", vec![("InstanceId", id)]),
            ResourceKind::Volume => ("AWS/EBS", vec![("VolumeId", id)]),
            ResourceKind::Database => ("AWS/RDS", vec![("DBInstanceIdentifier", id)]),
            ResourceKind::ObjectStore => {
                if metric_name == "BucketSizeBytes" {
                    (
                        "AWS/S3",
                        vec![("BucketName", id), ("StorageType", "StandardStorage".to_string())],
                    )
                } else {
                    // Request metrics require the EntireBucket filter the
                    // bucket owner configured.
                    (
                        "AWS/S3",
                        vec![("BucketName", id), ("FilterId", "EntireBucket".to_string())],
                    )
                }
            }
        }
    }

    async fn get_statistics(
        &self,
        resource: &ResourceDescriptor,
        metric_name: &str,
        lookback_days: u32,
        statistic: Statistic,
        period_secs: i32,
    ) -> Result<Vec<aws_sdk_cloudwatch::types::Datapoint>> {
        let (namespace, dimensions) = Self::metric_target(resource, metric_name);
        let (start, end) = lookback_window(lookback_days);

        let mut request = self
            .cloudwatch
            .get_metric_statistics()
            .namespace(namespace)
            .metric_name(metric_name)
            .start_time(to_smithy(start))
            .end_time(to_smithy(end))
            .period(period_secs)
            .statistics(statistic);
        for (name, value) in dimensions {
            let dimension = Dimension::builder()
                .name(name)
                .value(value)
                .build()
                .map_err(|e| WastectlError::Aws(format!("Invalid metric dimension: {}", e)))?;
            request = request.dimensions(dimension);
        }

        let response = request.send().await.map_err(|e| {
            WastectlError::provider(
                "cloudwatch",
                format!("Failed to fetch {} for {}", metric_name, resource.resource_id),
                e,
            )
        })?;
        Ok(response.datapoints().to_vec())
    }
}

#[async_trait]
impl MetricsSource for AwsMetrics {
    async fn get_average(
        &self,
        resource: &ResourceDescriptor,
        metric_name: &str,
        lookback_days: u32,
    ) -> Result<UtilizationSample> {
        let datapoints = self
            .get_statistics(resource, metric_name, lookback_days, Statistic::Average, 3600)
            .await?;
        let (start, end) = lookback_window(lookback_days);

        let values: Vec<f64> = datapoints.iter().filter_map(|dp| dp.average()).collect();
        if values.is_empty() {
            return Ok(UtilizationSample::empty(metric_name, start, end));
        }
        Ok(UtilizationSample {
            metric_name: metric_name.to_string(),
            window_start: start,
            window_end: end,
            average_value: values.iter().sum::<f64>() / values.len() as f64,
            sample_count: values.len() as u64,
        })
    }

    async fn get_sum(
        &self,
        resource: &ResourceDescriptor,
        metric_name: &str,
        lookback_days: u32,
    ) -> Result<UtilizationSample> {
        // Daily period: count metrics get one datapoint per day, which keeps
        // long windows (180 days) inside one response page.
        let datapoints = self
            .get_statistics(resource, metric_name, lookback_days, Statistic::Sum, 86400)
            .await?;
        let (start, end) = lookback_window(lookback_days);

        let values: Vec<f64> = datapoints.iter().filter_map(|dp| dp.sum()).collect();
        if values.is_empty() {
            return Ok(UtilizationSample::empty(metric_name, start, end));
        }
        Ok(UtilizationSample {
            metric_name: metric_name.to_string(),
            window_start: start,
            window_end: end,
            average_value: values.iter().sum(),
            sample_count: values.len() as u64,
        })
    }
}

/// Price List API client. The API is only served from us-east-1 regardless
/// of the region being priced.
pub struct AwsPriceList {
    pricing: aws_sdk_pricing::Client,
}

impl AwsPriceList {
    pub fn new(config: &SdkConfig) -> Self {
        let pricing_config = aws_sdk_pricing::config::Builder::from(config)
            .region(aws_sdk_pricing::config::Region::new("us-east-1"))
            .build();
        Self {
            pricing: aws_sdk_pricing::Client::from_conf(pricing_config),
        }
    }

    fn term_match(field: &str, value: &str) -> Result<PricingFilter> {
        PricingFilter::builder()
            .r#type(FilterType::TermMatch)
            .field(field)
            .value(value)
            .build()
            .map_err(|e| WastectlError::Aws(format!("Invalid pricing filter: {}", e)))
    }

    /// (service code, filters) for one signature, or `None` when the live
    /// API has no usable product for the key (snapshots, object storage)
    /// and the static table should answer instead.
    fn build_filters(
        kind: ResourceKind,
        region: &str,
        signature: &str,
    ) -> Result<Option<(&'static str, Vec<PricingFilter>)>> {
        match kind {
            ResourceKind::Compute => {
                let (instance_type, os) = signature.split_once('/').unwrap_or((signature, "Linux"));
                Ok(Some((
                    "AmazonEC2",
                    vec![
                        Self::term_match("instanceType", instance_type)?,
                        Self::term_match("operatingSystem", os)?,
                        Self::term_match("tenancy", "Shared")?,
                        Self::term_match("preInstalledSw", "NA")?,
                        Self::term_match("capacitystatus", "Used")?,
                        Self::term_match("regionCode", region)?,
                    ],
                )))
            }
            ResourceKind::Volume => Ok(Some((
                "AmazonEC2",
                vec![
                    Self::term_match("volumeApiName", signature)?,
                    Self::term_match("productFamily", "Storage")?,
                    Self::term_match("regionCode", region)?,
                ],
            ))),
            ResourceKind::Database => {
                if signature == "snapshot" {
                    return Ok(None);
                }
                let mut parts = signature.split('/');
                let class = parts.next().unwrap_or(signature);
                let engine = parts.next().unwrap_or("postgres");
                let deployment = if parts.next() == Some("multi-az") {
                    "Multi-AZ"
                } else {
                    "Single-AZ"
                };
                Ok(Some((
                    "AmazonRDS",
                    vec![
                        Self::term_match("instanceType", class)?,
                        Self::term_match("databaseEngine", engine_product_name(engine))?,
                        Self::term_match("deploymentOption", deployment)?,
                        Self::term_match("regionCode", region)?,
                    ],
                )))
            }
            // Tiered request/storage pricing does not reduce to a single
            // TERM_MATCH product; the static table answers these.
            ResourceKind::ObjectStore => Ok(None),
        }
    }
}

fn engine_product_name(engine: &str) -> &str {
    match engine {
        "postgres" => "PostgreSQL",
        "mysql" => "MySQL",
        "mariadb" => "MariaDB",
        other => other,
    }
}

#[async_trait]
impl PricingSource for AwsPriceList {
    async fn query_price(
        &self,
        kind: ResourceKind,
        region: &str,
        signature: &str,
    ) -> Result<Value> {
        let Some((service_code, filters)) = Self::build_filters(kind, region, signature)? else {
            return Ok(Value::Null);
        };

        let response = self
            .pricing
            .get_products()
            .service_code(service_code)
            .set_filters(Some(filters))
            .max_results(10)
            .send()
            .await
            .map_err(|e| WastectlError::Aws(format!("Price List query failed: {}", e)))?;

        let products: Vec<Value> = response
            .price_list()
            .iter()
            .filter_map(|doc| serde_json::from_str(doc).ok())
            .collect();
        debug!(%kind, signature, products = products.len(), "price list response");
        Ok(Value::Array(products))
    }
}

/// S3-backed report persistence.
pub struct S3ReportStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3ReportStore {
    pub fn new(config: &SdkConfig, bucket: impl Into<String>) -> Self {
        Self {
            client: aws_sdk_s3::Client::new(config),
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl ReportStore for S3ReportStore {
    async fn put(&self, key: &str, body: Vec<u8>) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type("application/json")
            .send()
            .await
            .map_err(|e| {
                WastectlError::ReportStore(format!(
                    "Failed to upload s3://{}/{}: {}",
                    self.bucket, key, e
                ))
            })?;
        Ok(())
    }
}

/// SNS-backed notifications.
pub struct SnsNotifier {
    client: aws_sdk_sns::Client,
    topic_arn: String,
}

impl SnsNotifier {
    pub fn new(config: &SdkConfig, topic_arn: impl Into<String>) -> Self {
        Self {
            client: aws_sdk_sns::Client::new(config),
            topic_arn: topic_arn.into(),
        }
    }
}

#[async_trait]
impl Notifier for SnsNotifier {
    async fn publish(&self, subject: &str, message: &str) -> Result<()> {
        self.client
            .publish()
            .topic_arn(&self.topic_arn)
            .subject(subject)
            .message(message)
            .send()
            .await
            .map_err(|e| {
                WastectlError::Notification(format!(
                    "Failed to publish to {}: {}",
                    self.topic_arn, e
                ))
            })?;
        Ok(())
    }
}
