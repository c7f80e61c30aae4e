//! Derived-cost helpers
//!
//! Pure arithmetic over a `PriceQuote`'s dimensions. These encode the
//! kind-specific tiering rules (gp3 free IOPS/throughput baselines, the
//! 730-hour month, Multi-AZ storage doubling). Helpers return `None` when
//! the quote lacks the dimension they need; scanners turn that into an
//! unpriced finding.

use crate::model::PriceQuote;
use crate::pricing::fallback::{GP3_FREE_IOPS, GP3_FREE_THROUGHPUT_MBPS, HOURS_PER_MONTH};

/// Round to cents. Estimates are list-price approximations; more precision
/// would be noise.
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Monthly cost of an instance running 24/7 (730 hours).
pub fn instance_monthly_cost(quote: &PriceQuote) -> Option<f64> {
    let hourly = quote.dimension("instance_hour")?;
    Some(round_cents(hourly * HOURS_PER_MONTH))
}

/// Monthly cost of a volume: base GB storage plus provisioned IOPS and
/// throughput add-ons. io1/io2 charge every provisioned IOPS; gp3 charges
/// only above its free baselines.
pub fn volume_monthly_cost(
    quote: &PriceQuote,
    volume_type: &str,
    size_gb: i64,
    iops: Option<i64>,
    throughput_mbps: Option<i64>,
) -> Option<f64> {
    let gb_price = quote.dimension("gb_month")?;
    let mut total = size_gb as f64 * gb_price;

    match volume_type {
        "io1" | "io2" => {
            if let (Some(iops), Some(iops_price)) = (iops, quote.dimension("piops_month")) {
                total += iops as f64 * iops_price;
            }
        }
        "gp3" => {
            if let (Some(iops), Some(iops_price)) = (iops, quote.dimension("piops_month")) {
                if iops > GP3_FREE_IOPS {
                    total += (iops - GP3_FREE_IOPS) as f64 * iops_price;
                }
            }
            if let (Some(tp), Some(tp_price)) =
                (throughput_mbps, quote.dimension("throughput_mbps_month"))
            {
                if tp > GP3_FREE_THROUGHPUT_MBPS {
                    total += (tp - GP3_FREE_THROUGHPUT_MBPS) as f64 * tp_price;
                }
            }
        }
        _ => {}
    }

    Some(round_cents(total))
}

/// Monthly cost of a database instance: compute at 730 h/month plus
/// allocated storage. The hourly dimension is already deployment-priced
/// (the signature carries single-az/multi-az), but storage is doubled for
/// Multi-AZ because the standby keeps its own copy.
pub fn database_monthly_cost(
    quote: &PriceQuote,
    storage_type: &str,
    allocated_storage_gb: i64,
    multi_az: bool,
) -> Option<f64> {
    let hourly = quote.dimension("instance_hour")?;
    let compute = hourly * HOURS_PER_MONTH;

    let storage_key = format!("storage_{}_gb_month", storage_type.to_lowercase());
    let storage_price = quote
        .dimension(&storage_key)
        .or_else(|| quote.dimension("storage_gp2_gb_month"))
        .unwrap_or(0.0);
    let mut storage = storage_price * allocated_storage_gb as f64;
    if multi_az {
        storage *= 2.0;
    }

    Some(round_cents(compute + storage))
}

/// Monthly cost of storing a database snapshot.
pub fn snapshot_monthly_cost(quote: &PriceQuote, size_gb: i64) -> Option<f64> {
    let gb_price = quote.dimension("gb_month")?;
    Some(round_cents(size_gb as f64 * gb_price))
}

/// Monthly storage cost of a bucket from its total size in bytes.
pub fn bucket_monthly_cost(quote: &PriceQuote, size_bytes: u64) -> Option<f64> {
    let gb_price = quote.dimension("gb_month")?;
    let size_gb = size_bytes as f64 / (1024.0 * 1024.0 * 1024.0);
    Some(round_cents(size_gb * gb_price))
}
