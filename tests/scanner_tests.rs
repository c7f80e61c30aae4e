//! Scanner classification scenarios, driven through mocked inventory and
//! metrics sources with the static price table.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use mockall::mock;
use std::sync::Arc;
use wastectl::config::{
    ComputeSettings, DatabaseSettings, ObjectStoreSettings, VolumeSettings,
};
use wastectl::error::{Result, WastectlError};
use wastectl::model::{ReasonCode, ResourceDescriptor, ResourceKind, UtilizationSample};
use wastectl::pricing::PricingResolver;
use wastectl::provider::{InventorySource, MetricsSource};
use wastectl::scanners::{
    ComputeScanner, DatabaseScanner, ObjectStoreScanner, ResourceScanner, VolumeScanner,
};

mock! {
    Inventory {}

    #[async_trait]
    impl InventorySource for Inventory {
        async fn list_resources(
            &self,
            kind: ResourceKind,
            region: &str,
        ) -> Result<Vec<ResourceDescriptor>>;

        async fn list_database_snapshots(&self, region: &str) -> Result<Vec<ResourceDescriptor>>;
    }
}

mock! {
    Metrics {}

    #[async_trait]
    impl MetricsSource for Metrics {
        async fn get_average(
            &self,
            resource: &ResourceDescriptor,
            metric_name: &str,
            lookback_days: u32,
        ) -> Result<UtilizationSample>;

        async fn get_sum(
            &self,
            resource: &ResourceDescriptor,
            metric_name: &str,
            lookback_days: u32,
        ) -> Result<UtilizationSample>;
    }
}

fn sample(metric_name: &str, value: f64, count: u64) -> UtilizationSample {
    let end = Utc::now();
    UtilizationSample {
        metric_name: metric_name.to_string(),
        window_start: end - Duration::days(7),
        window_end: end,
        average_value: value,
        sample_count: count,
    }
}

fn empty_sample(metric_name: &str) -> UtilizationSample {
    sample(metric_name, 0.0, 0)
}

fn static_pricing() -> Arc<PricingResolver> {
    Arc::new(PricingResolver::static_only())
}

#[tokio::test]
async fn idle_instance_is_wasteful_with_monthly_cost() {
    let mut inventory = MockInventory::new();
    inventory.expect_list_resources().returning(|_, region| {
        Ok(vec![ResourceDescriptor::new(
            "i-idle",
            ResourceKind::Compute,
            region,
        )
        .with_attr("instance_type", "t3.micro")])
    });
    let mut metrics = MockMetrics::new();
    metrics
        .expect_get_average()
        .withf(|_, metric, days| metric == "CPUUtilization" && *days == 7)
        .returning(|_, _, _| Ok(sample("CPUUtilization", 2.0, 168)));

    let scanner = ComputeScanner::new(
        Arc::new(inventory),
        Arc::new(metrics),
        static_pricing(),
        ComputeSettings::default(),
    );
    let findings = scanner.scan("us-east-1").await.unwrap();

    assert_eq!(findings.len(), 1);
    assert!(findings[0].is_wasteful);
    assert_eq!(findings[0].reason.code, ReasonCode::IdleCpu);
    // t3.micro at 0.0104/h over a 730-hour month
    assert_eq!(findings[0].estimated_monthly_cost, Some(7.59));
}

#[tokio::test]
async fn instance_without_datapoints_is_insufficient_data_not_idle() {
    let mut inventory = MockInventory::new();
    inventory.expect_list_resources().returning(|_, region| {
        Ok(vec![ResourceDescriptor::new(
            "i-fresh",
            ResourceKind::Compute,
            region,
        )
        .with_attr("instance_type", "t3.micro")])
    });
    let mut metrics = MockMetrics::new();
    metrics
        .expect_get_average()
        .returning(|_, metric, _| Ok(empty_sample(metric)));

    let scanner = ComputeScanner::new(
        Arc::new(inventory),
        Arc::new(metrics),
        static_pricing(),
        ComputeSettings::default(),
    );
    let findings = scanner.scan("us-east-1").await.unwrap();

    assert_eq!(findings.len(), 1);
    assert!(!findings[0].is_wasteful);
    assert_eq!(findings[0].reason.code, ReasonCode::InsufficientData);
    assert!(findings[0].estimated_monthly_cost.is_none());
}

#[tokio::test]
async fn busy_instance_is_healthy() {
    let mut inventory = MockInventory::new();
    inventory.expect_list_resources().returning(|_, region| {
        Ok(vec![ResourceDescriptor::new(
            "i-busy",
            ResourceKind::Compute,
            region,
        )
        .with_attr("instance_type", "m5.large")])
    });
    let mut metrics = MockMetrics::new();
    metrics
        .expect_get_average()
        .returning(|_, _, _| Ok(sample("CPUUtilization", 47.3, 168)));

    let scanner = ComputeScanner::new(
        Arc::new(inventory),
        Arc::new(metrics),
        static_pricing(),
        ComputeSettings::default(),
    );
    let findings = scanner.scan("us-east-1").await.unwrap();

    assert!(!findings[0].is_wasteful);
    assert_eq!(findings[0].reason.code, ReasonCode::ActiveUse);
}

#[tokio::test]
async fn unattached_volume_is_wasteful_without_any_metric_fetch() {
    let mut inventory = MockInventory::new();
    inventory.expect_list_resources().returning(|_, region| {
        Ok(vec![ResourceDescriptor::new(
            "vol-orphan",
            ResourceKind::Volume,
            region,
        )
        .with_attr("volume_type", "gp3")
        .with_attr("state", "available")
        .with_attr("size_gb", 500)])
    });
    // No get_sum expectation: any metric call for an unattached volume
    // fails the test.
    let metrics = MockMetrics::new();

    let scanner = VolumeScanner::new(
        Arc::new(inventory),
        Arc::new(metrics),
        static_pricing(),
        VolumeSettings::default(),
    );
    let findings = scanner.scan("us-east-1").await.unwrap();

    assert_eq!(findings.len(), 1);
    assert!(findings[0].is_wasteful);
    assert_eq!(findings[0].reason.code, ReasonCode::UnattachedVolume);
    // 500 GB gp3 at 0.08/GB-month
    assert_eq!(findings[0].estimated_monthly_cost, Some(40.0));
}

#[tokio::test]
async fn low_io_volume_is_wasteful() {
    let mut inventory = MockInventory::new();
    inventory.expect_list_resources().returning(|_, region| {
        Ok(vec![ResourceDescriptor::new(
            "vol-quiet",
            ResourceKind::Volume,
            region,
        )
        .with_attr("volume_type", "gp2")
        .with_attr("state", "in-use")
        .with_attr("size_gb", 100)])
    });
    let mut metrics = MockMetrics::new();
    metrics
        .expect_get_sum()
        .returning(|_, metric, _| Ok(sample(metric, 30.0, 14)));

    let scanner = VolumeScanner::new(
        Arc::new(inventory),
        Arc::new(metrics),
        static_pricing(),
        VolumeSettings::default(),
    );
    let findings = scanner.scan("us-east-1").await.unwrap();

    assert!(findings[0].is_wasteful);
    assert_eq!(findings[0].reason.code, ReasonCode::LowIoVolume);
    // Combined read+write evidence
    let evidence = findings[0].evidence.as_ref().unwrap();
    assert_eq!(evidence.average_value, 60.0);
    assert_eq!(findings[0].estimated_monthly_cost, Some(10.0));
}

#[tokio::test]
async fn wasteful_volume_with_unknown_type_is_reported_unpriced() {
    let mut inventory = MockInventory::new();
    inventory.expect_list_resources().returning(|_, region| {
        Ok(vec![ResourceDescriptor::new(
            "vol-exotic",
            ResourceKind::Volume,
            region,
        )
        .with_attr("volume_type", "gp9")
        .with_attr("state", "available")
        .with_attr("size_gb", 50)])
    });
    let metrics = MockMetrics::new();

    let scanner = VolumeScanner::new(
        Arc::new(inventory),
        Arc::new(metrics),
        static_pricing(),
        VolumeSettings::default(),
    );
    let findings = scanner.scan("us-east-1").await.unwrap();

    // Detection is primary: the finding survives without a price.
    assert!(findings[0].is_wasteful);
    assert!(findings[0].estimated_monthly_cost.is_none());
}

#[tokio::test]
async fn idle_database_needs_both_low_connections_and_low_cpu() {
    let mut inventory = MockInventory::new();
    inventory.expect_list_resources().returning(|_, region| {
        Ok(vec![ResourceDescriptor::new(
            "db-idle",
            ResourceKind::Database,
            region,
        )
        .with_attr("db_instance_class", "db.t3.micro")
        .with_attr("engine", "postgres")
        .with_attr("multi_az", false)
        .with_attr("allocated_storage_gb", 100)
        .with_attr("storage_type", "gp2")])
    });
    inventory
        .expect_list_database_snapshots()
        .returning(|_| Ok(vec![]));
    let mut metrics = MockMetrics::new();
    metrics.expect_get_average().returning(|_, metric, _| {
        let value = if metric == "DatabaseConnections" { 0.4 } else { 1.2 };
        Ok(sample(metric, value, 336))
    });

    let scanner = DatabaseScanner::new(
        Arc::new(inventory),
        Arc::new(metrics),
        static_pricing(),
        DatabaseSettings::default(),
    );
    let findings = scanner.scan("us-east-1").await.unwrap();

    assert_eq!(findings.len(), 1);
    assert!(findings[0].is_wasteful);
    assert_eq!(findings[0].reason.code, ReasonCode::IdleDatabase);
    // 0.017/h * 730 + 100 GB * 0.115
    assert_eq!(findings[0].estimated_monthly_cost, Some(23.91));
}

#[tokio::test]
async fn connected_but_low_cpu_database_is_healthy() {
    let mut inventory = MockInventory::new();
    inventory.expect_list_resources().returning(|_, region| {
        Ok(vec![ResourceDescriptor::new(
            "db-batch",
            ResourceKind::Database,
            region,
        )
        .with_attr("db_instance_class", "db.t3.micro")
        .with_attr("engine", "postgres")])
    });
    inventory
        .expect_list_database_snapshots()
        .returning(|_| Ok(vec![]));
    let mut metrics = MockMetrics::new();
    metrics.expect_get_average().returning(|_, metric, _| {
        let value = if metric == "DatabaseConnections" { 8.0 } else { 1.2 };
        Ok(sample(metric, value, 336))
    });

    let scanner = DatabaseScanner::new(
        Arc::new(inventory),
        Arc::new(metrics),
        static_pricing(),
        DatabaseSettings::default(),
    );
    let findings = scanner.scan("us-east-1").await.unwrap();

    assert!(!findings[0].is_wasteful);
}

#[tokio::test]
async fn stale_manual_snapshot_is_flagged_with_storage_cost() {
    let created = (Utc::now() - Duration::days(200)).to_rfc3339();
    let mut inventory = MockInventory::new();
    inventory
        .expect_list_resources()
        .returning(|_, _| Ok(vec![]));
    inventory.expect_list_database_snapshots().returning(move |region| {
        Ok(vec![ResourceDescriptor::new(
            "snap-old",
            ResourceKind::Database,
            region,
        )
        .with_attr("snapshot_create_time", created.clone())
        .with_attr("allocated_storage_gb", 200)])
    });
    let metrics = MockMetrics::new();

    let scanner = DatabaseScanner::new(
        Arc::new(inventory),
        Arc::new(metrics),
        static_pricing(),
        DatabaseSettings::default(),
    );
    let findings = scanner.scan("us-east-1").await.unwrap();

    assert_eq!(findings.len(), 1);
    assert!(findings[0].is_wasteful);
    assert_eq!(findings[0].reason.code, ReasonCode::StaleSnapshot);
    // 200 GB at 0.095/GB-month
    assert_eq!(findings[0].estimated_monthly_cost, Some(19.0));
}

#[tokio::test]
async fn bucket_without_request_metrics_is_insufficient_data() {
    let mut inventory = MockInventory::new();
    inventory.expect_list_resources().returning(|_, region| {
        Ok(vec![ResourceDescriptor::new(
            "logs-bucket",
            ResourceKind::ObjectStore,
            region,
        )])
    });
    let mut metrics = MockMetrics::new();
    metrics
        .expect_get_sum()
        .withf(|_, metric, _| metric == "AllRequests")
        .returning(|_, metric, _| Ok(empty_sample(metric)));

    let scanner = ObjectStoreScanner::new(
        Arc::new(inventory),
        Arc::new(metrics),
        static_pricing(),
        ObjectStoreSettings::default(),
    );
    let findings = scanner.scan("us-east-1").await.unwrap();

    assert!(!findings[0].is_wasteful);
    assert_eq!(findings[0].reason.code, ReasonCode::InsufficientData);
    assert!(findings[0].reason.detail.contains("request metrics not enabled"));
}

#[tokio::test]
async fn inactive_bucket_is_priced_from_its_size() {
    let mut inventory = MockInventory::new();
    inventory.expect_list_resources().returning(|_, region| {
        Ok(vec![ResourceDescriptor::new(
            "stale-bucket",
            ResourceKind::ObjectStore,
            region,
        )])
    });
    let mut metrics = MockMetrics::new();
    metrics
        .expect_get_sum()
        .withf(|_, metric, _| metric == "AllRequests")
        .returning(|_, metric, _| Ok(sample(metric, 3.0, 180)));
    let ten_gb = 10.0 * 1024.0 * 1024.0 * 1024.0;
    metrics
        .expect_get_average()
        .withf(|_, metric, _| metric == "BucketSizeBytes")
        .returning(move |_, metric, _| Ok(sample(metric, ten_gb, 2)));

    let scanner = ObjectStoreScanner::new(
        Arc::new(inventory),
        Arc::new(metrics),
        static_pricing(),
        ObjectStoreSettings::default(),
    );
    let findings = scanner.scan("us-east-1").await.unwrap();

    assert!(findings[0].is_wasteful);
    assert_eq!(findings[0].reason.code, ReasonCode::InactiveBucket);
    // 10 GiB of STANDARD at 0.023/GB-month
    assert_eq!(findings[0].estimated_monthly_cost, Some(0.23));
}

#[tokio::test]
async fn inventory_failure_escalates_to_scanner_unavailable() {
    let mut inventory = MockInventory::new();
    inventory
        .expect_list_resources()
        .returning(|_, _| Err(WastectlError::Validation {
            field: "region".to_string(),
            reason: "access denied".to_string(),
        }));
    let metrics = MockMetrics::new();

    let scanner = ComputeScanner::new(
        Arc::new(inventory),
        Arc::new(metrics),
        static_pricing(),
        ComputeSettings::default(),
    );
    let err = scanner.scan("us-east-1").await.unwrap_err();
    assert!(matches!(
        err,
        WastectlError::ScannerUnavailable {
            kind: ResourceKind::Compute,
            ..
        }
    ));
}
