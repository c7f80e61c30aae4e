//! Static fallback price table
//!
//! Approximate us-east-1 on-demand list prices, used when the live Price
//! List API is unavailable or has no entry for a key. Prices are per hour
//! for instances and per GB-month for storage. An unknown key returns
//! `None` — the resolver turns that into `PricingUnavailable` rather than
//! guessing a "similar" price.

use crate::model::ResourceKind;
use std::collections::BTreeMap;

/// Hours in an average month, the standard convention for monthly estimates.
pub const HOURS_PER_MONTH: f64 = 730.0;

/// gp3 volumes include 3000 IOPS free; only provisioned IOPS above this are
/// charged.
pub const GP3_FREE_IOPS: i64 = 3000;

/// gp3 volumes include 125 MB/s throughput free.
pub const GP3_FREE_THROUGHPUT_MBPS: i64 = 125;

// EC2 on-demand hourly, Linux, shared tenancy.
static EC2_ON_DEMAND_HOURLY: &[(&str, f64)] = &[
    ("t2.nano", 0.0058),
    ("t2.micro", 0.0116),
    ("t2.small", 0.023),
    ("t2.medium", 0.0464),
    ("t2.large", 0.0928),
    ("t3.nano", 0.0052),
    ("t3.micro", 0.0104),
    ("t3.small", 0.0208),
    ("t3.medium", 0.0416),
    ("t3.large", 0.0832),
    ("t3.xlarge", 0.1664),
    ("t3.2xlarge", 0.3328),
    ("t3a.micro", 0.0094),
    ("t3a.small", 0.0188),
    ("t3a.medium", 0.0376),
    ("t3a.large", 0.0752),
    ("t4g.nano", 0.0042),
    ("t4g.micro", 0.0084),
    ("t4g.small", 0.0168),
    ("t4g.medium", 0.0336),
    ("t4g.large", 0.0672),
    ("m5.large", 0.096),
    ("m5.xlarge", 0.192),
    ("m5.2xlarge", 0.384),
    ("m5.4xlarge", 0.768),
    ("m6i.large", 0.096),
    ("m6i.xlarge", 0.192),
    ("m6i.2xlarge", 0.384),
    ("m6g.large", 0.077),
    ("m6g.xlarge", 0.154),
    ("m7i.large", 0.1008),
    ("m7i.xlarge", 0.2016),
    ("m7g.large", 0.0816),
    ("m7g.xlarge", 0.1632),
    ("c5.large", 0.085),
    ("c5.xlarge", 0.17),
    ("c5.2xlarge", 0.34),
    ("c6i.large", 0.085),
    ("c6i.xlarge", 0.17),
    ("c6g.large", 0.068),
    ("c7g.large", 0.0725),
    ("r5.large", 0.126),
    ("r5.xlarge", 0.252),
    ("r5.2xlarge", 0.504),
    ("r6i.large", 0.126),
    ("r6i.xlarge", 0.252),
    ("r6g.large", 0.1008),
    ("r7g.large", 0.1071),
    ("i3.large", 0.156),
    ("i3.xlarge", 0.312),
];

// EBS per GB-month.
static EBS_GB_MONTH: &[(&str, f64)] = &[
    ("standard", 0.05),
    ("gp2", 0.10),
    ("gp3", 0.08),
    ("io1", 0.125),
    ("io2", 0.125),
    ("sc1", 0.015),
    ("st1", 0.045),
];

// Provisioned IOPS per IOPS-month. For gp3 this applies only above the
// free baseline.
static EBS_PIOPS_MONTH: &[(&str, f64)] = &[("io1", 0.065), ("io2", 0.065), ("gp3", 0.005)];

// gp3 throughput per MB/s-month above the free baseline.
const GP3_THROUGHPUT_MBPS_MONTH: f64 = 0.06;

// RDS PostgreSQL on-demand hourly, Single-AZ. Multi-AZ is doubled at lookup.
static RDS_POSTGRES_HOURLY: &[(&str, f64)] = &[
    ("db.t4g.micro", 0.016),
    ("db.t4g.small", 0.032),
    ("db.t4g.medium", 0.065),
    ("db.t4g.large", 0.129),
    ("db.t4g.xlarge", 0.258),
    ("db.t3.micro", 0.017),
    ("db.t3.small", 0.034),
    ("db.t3.medium", 0.068),
    ("db.t3.large", 0.136),
    ("db.t3.xlarge", 0.272),
    ("db.m6g.large", 0.154),
    ("db.m6g.xlarge", 0.308),
    ("db.m6g.2xlarge", 0.616),
    ("db.m6i.large", 0.171),
    ("db.m6i.xlarge", 0.342),
    ("db.m7g.large", 0.168),
    ("db.m7g.xlarge", 0.336),
    ("db.m5.large", 0.171),
    ("db.m5.xlarge", 0.342),
    ("db.m5.2xlarge", 0.684),
    ("db.r6g.large", 0.216),
    ("db.r6g.xlarge", 0.432),
    ("db.r6i.large", 0.24),
    ("db.r6i.xlarge", 0.48),
    ("db.r7g.large", 0.2352),
    ("db.r5.large", 0.24),
    ("db.r5.xlarge", 0.48),
];

// RDS storage per GB-month, keyed by storage type.
static RDS_STORAGE_GB_MONTH: &[(&str, f64)] = &[
    ("gp2", 0.115),
    ("gp3", 0.08),
    ("io1", 0.125),
    ("io2", 0.125),
    ("standard", 0.10),
];

/// RDS snapshot storage per GB-month.
pub const RDS_SNAPSHOT_GB_MONTH: f64 = 0.095;

// S3 storage per GB-month, keyed by storage class.
static S3_STORAGE_GB_MONTH: &[(&str, f64)] = &[
    ("STANDARD", 0.023),
    ("INTELLIGENT_TIERING", 0.023),
    ("STANDARD_IA", 0.0125),
    ("ONEZONE_IA", 0.01),
    ("GLACIER_IR", 0.004),
    ("GLACIER", 0.0036),
    ("DEEP_ARCHIVE", 0.00099),
    ("REDUCED_REDUNDANCY", 0.024),
];

fn lookup(table: &[(&str, f64)], key: &str) -> Option<f64> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

/// The static fallback table, addressed the same way as the live source:
/// by `(kind, attribute_signature)`.
#[derive(Debug, Default)]
pub struct StaticPriceTable;

impl StaticPriceTable {
    /// The dimension the live API quotes for each kind. Secondary dimensions
    /// (IOPS, throughput, database storage) always come from this table.
    pub fn primary_dimension(kind: ResourceKind) -> &'static str {
        match kind {
            ResourceKind::Compute | ResourceKind::Database => "instance_hour",
            ResourceKind::Volume | ResourceKind::ObjectStore => "gb_month",
        }
    }

    /// Full static unit-price dimensions for a signature, or `None` when the
    /// table has no entry for the key.
    pub fn dimensions(&self, kind: ResourceKind, signature: &str) -> Option<BTreeMap<String, f64>> {
        let mut dims = self.secondary_dimensions(kind, signature);

        // Snapshots are storage, not compute: their price rides under
        // gb_month even though the kind's primary dimension is hourly.
        if kind == ResourceKind::Database && signature == "snapshot" {
            dims.insert("gb_month".to_string(), RDS_SNAPSHOT_GB_MONTH);
            return Some(dims);
        }

        let primary = match kind {
            ResourceKind::Compute => {
                let instance_type = signature.split('/').next().unwrap_or(signature);
                lookup(EC2_ON_DEMAND_HOURLY, instance_type)?
            }
            ResourceKind::Volume => lookup(EBS_GB_MONTH, signature)?,
            ResourceKind::Database => {
                let mut parts = signature.split('/');
                let class = parts.next().unwrap_or(signature);
                let _engine = parts.next();
                let deployment = parts.next().unwrap_or("single-az");
                let hourly = lookup(RDS_POSTGRES_HOURLY, class)?;
                // Table is Single-AZ; Multi-AZ compute is roughly 2x.
                if deployment == "multi-az" {
                    hourly * 2.0
                } else {
                    hourly
                }
            }
            ResourceKind::ObjectStore => {
                let class = signature.to_uppercase().replace('-', "_");
                lookup(S3_STORAGE_GB_MONTH, &class)?
            }
        };
        dims.insert(Self::primary_dimension(kind).to_string(), primary);
        Some(dims)
    }

    /// Dimensions that are never quoted by the live API and are merged into
    /// live quotes from the static table: volume IOPS/throughput add-ons and
    /// database storage prices.
    pub fn secondary_dimensions(&self, kind: ResourceKind, signature: &str) -> BTreeMap<String, f64> {
        let mut dims = BTreeMap::new();
        match kind {
            ResourceKind::Volume => {
                if let Some(p) = lookup(EBS_PIOPS_MONTH, signature) {
                    dims.insert("piops_month".to_string(), p);
                }
                if signature == "gp3" {
                    dims.insert("throughput_mbps_month".to_string(), GP3_THROUGHPUT_MBPS_MONTH);
                }
            }
            ResourceKind::Database if signature != "snapshot" => {
                for (storage_type, price) in RDS_STORAGE_GB_MONTH {
                    dims.insert(format!("storage_{}_gb_month", storage_type), *price);
                }
            }
            _ => {}
        }
        dims
    }
}
