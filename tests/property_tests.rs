//! Property tests for the cost arithmetic and report aggregation.

use chrono::Utc;
use proptest::prelude::*;
use std::collections::BTreeMap;
use wastectl::model::{
    Finding, FindingReason, PriceQuote, PriceSource, ReasonCode, ResourceDescriptor, ResourceKind,
};
use wastectl::pricing::cost;
use wastectl::report::{build_report, ScanOutcome};

fn volume_quote() -> PriceQuote {
    let mut dimensions = BTreeMap::new();
    dimensions.insert("gb_month".to_string(), 0.08);
    dimensions.insert("piops_month".to_string(), 0.005);
    dimensions.insert("throughput_mbps_month".to_string(), 0.06);
    PriceQuote {
        resource_kind: ResourceKind::Volume,
        region: "us-east-1".to_string(),
        dimensions,
        source: PriceSource::StaticFallback,
        fetched_at: Utc::now(),
    }
}

proptest! {
    #[test]
    fn volume_cost_is_never_negative(
        size_gb in 0i64..65536,
        iops in proptest::option::of(0i64..256_000),
        throughput in proptest::option::of(0i64..4_000),
    ) {
        let quote = volume_quote();
        for volume_type in ["gp2", "gp3", "io1", "io2", "st1"] {
            let c = cost::volume_monthly_cost(&quote, volume_type, size_gb, iops, throughput);
            prop_assert!(c.unwrap() >= 0.0);
        }
    }

    #[test]
    fn gp3_add_ons_never_undercut_base_storage(
        size_gb in 1i64..16384,
        iops in 3000i64..64_000,
    ) {
        let quote = volume_quote();
        let base = cost::volume_monthly_cost(&quote, "gp3", size_gb, Some(3000), Some(125)).unwrap();
        let with_iops = cost::volume_monthly_cost(&quote, "gp3", size_gb, Some(iops), Some(125)).unwrap();
        prop_assert!(with_iops >= base);
    }

    #[test]
    fn report_total_equals_sum_of_priced_wasteful(costs in proptest::collection::vec(
        proptest::option::of(0.0f64..10_000.0), 0..32,
    )) {
        let now = Utc::now();
        let findings: Vec<Finding> = costs
            .iter()
            .enumerate()
            .map(|(i, c)| {
                Finding::wasteful(
                    ResourceDescriptor::new(format!("i-{}", i), ResourceKind::Compute, "us-east-1"),
                    FindingReason::new(ReasonCode::IdleCpu, "idle"),
                    *c,
                    None,
                )
            })
            .collect();
        let outcomes = vec![ScanOutcome {
            kind: ResourceKind::Compute,
            result: Ok(findings),
        }];

        let report = build_report("run", "us-east-1", now, now, outcomes);

        let expected: f64 = costs.iter().flatten().sum();
        let expected = (expected * 100.0).round() / 100.0;
        prop_assert!((report.summary.total_estimated_monthly_waste - expected).abs() < 0.01);

        let unpriced = costs.iter().filter(|c| c.is_none()).count();
        prop_assert_eq!(report.summary.unpriced_wasteful_count, unpriced);
        prop_assert_eq!(report.summary.wasteful_count, costs.len());
    }

    #[test]
    fn round_cents_is_idempotent(value in 0.0f64..1_000_000.0) {
        let once = cost::round_cents(value);
        prop_assert_eq!(cost::round_cents(once), once);
    }
}
