//! Report building and rendering
//!
//! `build_report` is a pure function of the scanner outcomes — no I/O, so
//! the aggregation logic is trivially testable. Rendering covers three
//! shapes: lossless JSON, a findings table, and a short human summary (the
//! same text that goes out as the notification body).

use crate::model::{
    Finding, KindSummary, Report, ReportSummary, ResourceKind, RunStatus, ScannerFailure,
};
use chrono::{DateTime, Utc};
use comfy_table::{Cell, Table};

/// The result of one scanner's run, as seen by the aggregator. The error
/// side is already reduced to a message: the aggregator is pure data.
#[derive(Debug)]
pub struct ScanOutcome {
    pub kind: ResourceKind,
    pub result: std::result::Result<Vec<Finding>, String>,
}

/// Merge scanner outcomes into one immutable report.
///
/// Findings keep scan order (outcomes are sorted into the fixed kind order
/// first, so the report is deterministic regardless of how the scanners
/// were driven). The waste total sums only priced wasteful findings;
/// unpriced ones are counted separately so the total is never silently
/// understated.
pub fn build_report(
    run_id: impl Into<String>,
    region: impl Into<String>,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
    mut outcomes: Vec<ScanOutcome>,
) -> Report {
    outcomes.sort_by_key(|o| o.kind.scan_order_index());

    let mut findings = Vec::new();
    let mut summary = ReportSummary::default();

    for outcome in outcomes {
        match outcome.result {
            Ok(kind_findings) => {
                let entry = summary.per_kind.entry(outcome.kind).or_insert_with(KindSummary::default);
                for finding in &kind_findings {
                    entry.scanned += 1;
                    summary.total_findings += 1;
                    if finding.is_wasteful {
                        entry.wasteful += 1;
                        summary.wasteful_count += 1;
                        match finding.estimated_monthly_cost {
                            Some(cost) => {
                                entry.estimated_monthly_waste += cost;
                                summary.total_estimated_monthly_waste += cost;
                            }
                            None => summary.unpriced_wasteful_count += 1,
                        }
                    } else if finding.reason.code == crate::model::ReasonCode::InsufficientData {
                        entry.insufficient_data += 1;
                    }
                }
                findings.extend(kind_findings);
            }
            Err(message) => {
                summary.failed_scanners.push(ScannerFailure {
                    kind: outcome.kind,
                    message,
                });
            }
        }
    }

    // Cent-rounding after summation so per-finding rounding errors don't
    // accumulate into the displayed totals.
    summary.total_estimated_monthly_waste =
        crate::pricing::cost::round_cents(summary.total_estimated_monthly_waste);
    for entry in summary.per_kind.values_mut() {
        entry.estimated_monthly_waste = crate::pricing::cost::round_cents(entry.estimated_monthly_waste);
    }

    let status = if summary.failed_scanners.is_empty() {
        RunStatus::Completed
    } else {
        RunStatus::PartiallyCompleted
    };

    Report {
        run_id: run_id.into(),
        region: region.into(),
        status,
        started_at,
        completed_at,
        findings,
        summary,
    }
}

impl Report {
    /// Lossless structured serialization.
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> crate::error::Result<Report> {
        Ok(serde_json::from_str(json)?)
    }

    /// Tabular rendering of every finding. Includes all finding fields
    /// except the raw evidence payload unless `include_evidence` is set.
    pub fn render_table(&self, include_evidence: bool) -> String {
        let mut table = Table::new();
        let mut header = vec![
            "Kind",
            "Resource",
            "Region",
            "Wasteful",
            "Reason",
            "Detail",
            "Attributes",
            "Est. $/month",
        ];
        if include_evidence {
            header.push("Evidence");
        }
        table.set_header(header);

        for finding in &self.findings {
            let cost = finding
                .estimated_monthly_cost
                .map(|c| format!("{:.2}", c))
                .unwrap_or_else(|| "-".to_string());
            let attributes = if finding.resource.attributes.is_empty() {
                "-".to_string()
            } else {
                finding
                    .resource
                    .attributes
                    .iter()
                    .map(|(k, v)| match v.as_str() {
                        Some(s) => format!("{}={}", k, s),
                        None => format!("{}={}", k, v),
                    })
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            let mut row = vec![
                Cell::new(finding.resource.resource_kind.as_str()),
                Cell::new(&finding.resource.resource_id),
                Cell::new(&finding.resource.region),
                Cell::new(if finding.is_wasteful { "yes" } else { "no" }),
                Cell::new(finding.reason.code.as_str()),
                Cell::new(&finding.reason.detail),
                Cell::new(attributes),
                Cell::new(cost),
            ];
            if include_evidence {
                let evidence = finding
                    .evidence
                    .as_ref()
                    .map(|e| format!("{}: avg {:.2} ({} samples)", e.metric_name, e.average_value, e.sample_count))
                    .unwrap_or_else(|| "-".to_string());
                row.push(Cell::new(evidence));
            }
            table.add_row(row);
        }
        table.to_string()
    }

    /// Short human summary — also the notification body (counts and totals,
    /// never the full finding list).
    pub fn render_summary(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "Cost-waste scan {} ({}) — {}\n",
            self.run_id, self.region, self.status
        ));
        out.push_str(&format!(
            "Scanned {} resources, {} wasteful, estimated ${:.2}/month of waste",
            self.summary.total_findings,
            self.summary.wasteful_count,
            self.summary.total_estimated_monthly_waste
        ));
        if self.summary.unpriced_wasteful_count > 0 {
            out.push_str(&format!(
                " (plus {} wasteful resources with no price available)",
                self.summary.unpriced_wasteful_count
            ));
        }
        out.push('\n');
        for (kind, entry) in &self.summary.per_kind {
            out.push_str(&format!(
                "  {}: {}/{} wasteful, ${:.2}/month\n",
                kind, entry.wasteful, entry.scanned, entry.estimated_monthly_waste
            ));
        }
        for failure in &self.summary.failed_scanners {
            out.push_str(&format!("  {} scanner FAILED: {}\n", failure.kind, failure.message));
        }
        out
    }

    /// Date-stamped object key, so the external retention policy can expire
    /// old reports by prefix.
    pub fn storage_key(&self) -> String {
        format!(
            "reports/{}/waste-report-{}.json",
            self.started_at.format("%Y/%m/%d"),
            self.run_id
        )
    }
}
