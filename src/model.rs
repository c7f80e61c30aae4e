//! Core data model
//!
//! Everything the scanners, pricing resolver, and report builder exchange:
//! resource descriptors, utilization samples, findings, price quotes, and
//! the report itself. All of it serializes with serde so the persisted
//! report is a lossless JSON rendering of these types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The four resource kinds a run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    Compute,
    Volume,
    Database,
    ObjectStore,
}

/// Fixed scan order: every run emits findings in this kind order, so two
/// runs over the same account diff cleanly.
pub const SCAN_ORDER: [ResourceKind; 4] = [
    ResourceKind::Compute,
    ResourceKind::Volume,
    ResourceKind::Database,
    ResourceKind::ObjectStore,
];

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Compute => "compute",
            ResourceKind::Volume => "volume",
            ResourceKind::Database => "database",
            ResourceKind::ObjectStore => "object-store",
        }
    }

    /// Position in the fixed scan order.
    pub fn scan_order_index(&self) -> usize {
        SCAN_ORDER
            .iter()
            .position(|k| k == self)
            .unwrap_or(SCAN_ORDER.len())
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One inventoried cloud resource. Kind-specific attributes (instance type,
/// volume size, engine) ride in a sorted map of JSON values so the
/// descriptor stays kind-agnostic and serializes deterministically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub resource_id: String,
    pub resource_kind: ResourceKind,
    pub region: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl ResourceDescriptor {
    pub fn new(
        resource_id: impl Into<String>,
        resource_kind: ResourceKind,
        region: impl Into<String>,
    ) -> Self {
        Self {
            resource_id: resource_id.into(),
            resource_kind,
            region: region.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(|v| v.as_str())
    }

    pub fn attr_i64(&self, key: &str) -> Option<i64> {
        self.attributes.get(key).and_then(|v| v.as_i64())
    }

    pub fn attr_bool(&self, key: &str) -> Option<bool> {
        self.attributes.get(key).and_then(|v| v.as_bool())
    }
}

/// One metric observation over a lookback window.
///
/// For average metrics `average_value` is the mean of the datapoints; for
/// sum metrics it carries the window total. `sample_count` is always the
/// number of datapoints, so zero datapoints (no signal at all) is never
/// confused with a measured zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UtilizationSample {
    pub metric_name: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub average_value: f64,
    pub sample_count: u64,
}

impl UtilizationSample {
    /// A window with zero datapoints.
    pub fn empty(
        metric_name: impl Into<String>,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Self {
        Self {
            metric_name: metric_name.into(),
            window_start,
            window_end,
            average_value: 0.0,
            sample_count: 0,
        }
    }

    pub fn has_data(&self) -> bool {
        self.sample_count > 0
    }
}

/// Why a finding was classified the way it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReasonCode {
    IdleCpu,
    IdleDatabase,
    UnattachedVolume,
    LowIoVolume,
    StaleSnapshot,
    InactiveBucket,
    InsufficientData,
    ActiveUse,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::IdleCpu => "idle-cpu",
            ReasonCode::IdleDatabase => "idle-database",
            ReasonCode::UnattachedVolume => "unattached-volume",
            ReasonCode::LowIoVolume => "low-io-volume",
            ReasonCode::StaleSnapshot => "stale-snapshot",
            ReasonCode::InactiveBucket => "inactive-bucket",
            ReasonCode::InsufficientData => "insufficient-data",
            ReasonCode::ActiveUse => "active-use",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindingReason {
    pub code: ReasonCode,
    pub detail: String,
}

impl FindingReason {
    pub fn new(code: ReasonCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: detail.into(),
        }
    }
}

/// One per-resource classification. Every inventoried resource produces
/// exactly one finding; nothing is silently skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub resource: ResourceDescriptor,
    pub is_wasteful: bool,
    pub reason: FindingReason,
    /// USD per month. `None` for healthy/insufficient-data findings and for
    /// wasteful resources no price could be resolved for.
    pub estimated_monthly_cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<UtilizationSample>,
}

impl Finding {
    pub fn wasteful(
        resource: ResourceDescriptor,
        reason: FindingReason,
        estimated_monthly_cost: Option<f64>,
        evidence: Option<UtilizationSample>,
    ) -> Self {
        Self {
            resource,
            is_wasteful: true,
            reason,
            estimated_monthly_cost,
            evidence,
        }
    }

    pub fn healthy(
        resource: ResourceDescriptor,
        detail: impl Into<String>,
        evidence: Option<UtilizationSample>,
    ) -> Self {
        Self {
            resource,
            is_wasteful: false,
            reason: FindingReason::new(ReasonCode::ActiveUse, detail),
            estimated_monthly_cost: None,
            evidence,
        }
    }

    /// Ambiguous signal: not wasteful, not healthy, flagged for attention.
    pub fn insufficient_data(
        resource: ResourceDescriptor,
        detail: impl Into<String>,
        evidence: Option<UtilizationSample>,
    ) -> Self {
        Self {
            resource,
            is_wasteful: false,
            reason: FindingReason::new(ReasonCode::InsufficientData, detail),
            estimated_monthly_cost: None,
            evidence,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PriceSource {
    LiveApi,
    StaticFallback,
}

/// Resolved unit prices for one (kind, region, signature) key. Dimension
/// names are stable strings (`instance_hour`, `gb_month`, `piops_month`,
/// ...) that the cost helpers in `pricing::cost` know how to combine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceQuote {
    pub resource_kind: ResourceKind,
    pub region: String,
    pub dimensions: BTreeMap<String, f64>,
    pub source: PriceSource,
    pub fetched_at: DateTime<Utc>,
}

impl PriceQuote {
    pub fn dimension(&self, name: &str) -> Option<f64> {
        self.dimensions.get(name).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    Completed,
    PartiallyCompleted,
    /// The run aborted before any scanner produced findings. Persisted
    /// reports never carry this status; it appears only in run-failure
    /// notifications.
    Failed,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStatus::Completed => "completed",
            RunStatus::PartiallyCompleted => "partially-completed",
            RunStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// One scanner that could not run at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerFailure {
    pub kind: ResourceKind,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KindSummary {
    pub scanned: usize,
    pub wasteful: usize,
    pub insufficient_data: usize,
    pub estimated_monthly_waste: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_findings: usize,
    pub wasteful_count: usize,
    /// Wasteful findings whose cost could not be priced. Counted separately
    /// so the waste total is never silently understated.
    pub unpriced_wasteful_count: usize,
    pub total_estimated_monthly_waste: f64,
    pub per_kind: BTreeMap<ResourceKind, KindSummary>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_scanners: Vec<ScannerFailure>,
}

/// The immutable output of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub run_id: String,
    pub region: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub findings: Vec<Finding>,
    pub summary: ReportSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_order_is_stable() {
        assert_eq!(ResourceKind::Compute.scan_order_index(), 0);
        assert_eq!(ResourceKind::Volume.scan_order_index(), 1);
        assert_eq!(ResourceKind::Database.scan_order_index(), 2);
        assert_eq!(ResourceKind::ObjectStore.scan_order_index(), 3);
    }

    #[test]
    fn test_resource_kind_serializes_kebab_case() {
        let json = serde_json::to_string(&ResourceKind::ObjectStore).unwrap();
        assert_eq!(json, "\"object-store\"");
    }

    #[test]
    fn test_descriptor_attribute_accessors() {
        let desc = ResourceDescriptor::new("i-abc123", ResourceKind::Compute, "us-east-1")
            .with_attr("instance_type", "t3.micro")
            .with_attr("size_gb", 100)
            .with_attr("multi_az", true);
        assert_eq!(desc.attr_str("instance_type"), Some("t3.micro"));
        assert_eq!(desc.attr_i64("size_gb"), Some(100));
        assert_eq!(desc.attr_bool("multi_az"), Some(true));
        assert_eq!(desc.attr_str("missing"), None);
    }

    #[test]
    fn test_empty_sample_has_no_data() {
        let now = Utc::now();
        let sample = UtilizationSample::empty("CPUUtilization", now, now);
        assert!(!sample.has_data());
        assert_eq!(sample.average_value, 0.0);
    }

    #[test]
    fn test_insufficient_data_finding_is_not_wasteful() {
        let desc = ResourceDescriptor::new("vol-1", ResourceKind::Volume, "us-east-1");
        let finding = Finding::insufficient_data(desc, "no datapoints", None);
        assert!(!finding.is_wasteful);
        assert_eq!(finding.reason.code, ReasonCode::InsufficientData);
        assert!(finding.estimated_monthly_cost.is_none());
    }

    #[test]
    fn test_healthy_finding_carries_no_cost() {
        let desc = ResourceDescriptor::new("i-1", ResourceKind::Compute, "us-east-1");
        let finding = Finding::healthy(desc, "average CPU 42%", None);
        assert!(!finding.is_wasteful);
        assert_eq!(finding.reason.code, ReasonCode::ActiveUse);
        assert!(finding.estimated_monthly_cost.is_none());
    }

    #[test]
    fn test_price_quote_dimension_lookup() {
        let mut dimensions = BTreeMap::new();
        dimensions.insert("gb_month".to_string(), 0.08);
        let quote = PriceQuote {
            resource_kind: ResourceKind::Volume,
            region: "us-east-1".to_string(),
            dimensions,
            source: PriceSource::StaticFallback,
            fetched_at: Utc::now(),
        };
        assert_eq!(quote.dimension("gb_month"), Some(0.08));
        assert_eq!(quote.dimension("piops_month"), None);
    }

    #[test]
    fn test_run_status_display() {
        assert_eq!(RunStatus::PartiallyCompleted.to_string(), "partially-completed");
    }
}
