//! Run orchestrator
//!
//! Sequences the scanners in the fixed kind order, isolates per-kind
//! failures (`ScannerUnavailable` records a failure and moves on), builds
//! the report, and hands it to the two external collaborators. Persistence
//! and notification are independent and best-effort: a notification failure
//! never blocks or erases an already-persisted report.

use crate::error::Result;
use crate::model::{Report, RunStatus};
use crate::provider::{Notifier, ReportStore};
use crate::report::{build_report, ScanOutcome};
use crate::scanners::ResourceScanner;
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

pub struct RunOrchestrator {
    region: String,
    scanners: Vec<Arc<dyn ResourceScanner>>,
    store: Option<Arc<dyn ReportStore>>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl RunOrchestrator {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            scanners: Vec::new(),
            store: None,
            notifier: None,
        }
    }

    pub fn with_scanner(mut self, scanner: Arc<dyn ResourceScanner>) -> Self {
        self.scanners.push(scanner);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn ReportStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Execute one run end to end. Always returns a report: scanner
    /// failures degrade the run to partially-completed, they never abort it.
    pub async fn run(&self) -> Result<Report> {
        let run_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        info!(run_id, region = %self.region, "starting cost-waste scan");

        let mut scanners: Vec<&Arc<dyn ResourceScanner>> = self.scanners.iter().collect();
        scanners.sort_by_key(|s| s.kind().scan_order_index());

        let mut outcomes = Vec::with_capacity(scanners.len());
        for scanner in scanners {
            let kind = scanner.kind();
            info!(run_id, %kind, "running scanner");
            let result = match scanner.scan(&self.region).await {
                Ok(findings) => {
                    info!(run_id, %kind, findings = findings.len(), "scanner finished");
                    Ok(findings)
                }
                Err(e) => {
                    // Failure isolation: one kind's outage never blocks the
                    // other scanners.
                    error!(run_id, %kind, "scanner failed: {}", e);
                    Err(e.to_string())
                }
            };
            outcomes.push(ScanOutcome { kind, result });
        }

        let report = build_report(run_id, &self.region, started_at, Utc::now(), outcomes);
        info!(
            run_id = %report.run_id,
            status = %report.status,
            wasteful = report.summary.wasteful_count,
            total_waste = report.summary.total_estimated_monthly_waste,
            "scan complete"
        );

        self.persist(&report).await;
        self.notify(&report).await;
        Ok(report)
    }

    async fn persist(&self, report: &Report) {
        let Some(store) = &self.store else {
            return;
        };
        let body = match report.to_json() {
            Ok(json) => json.into_bytes(),
            Err(e) => {
                error!(run_id = %report.run_id, "failed to serialize report: {}", e);
                return;
            }
        };
        let key = report.storage_key();
        match store.put(&key, body).await {
            Ok(()) => info!(run_id = %report.run_id, key, "report persisted"),
            Err(e) => warn!(run_id = %report.run_id, key, "report persistence failed: {}", e),
        }
    }

    async fn notify(&self, report: &Report) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        let subject = format!("Cost-waste scan {} ({})", report.status, self.region);
        match notifier.publish(&subject, &report.render_summary()).await {
            Ok(()) => info!(run_id = %report.run_id, "summary notification sent"),
            Err(e) => warn!(run_id = %report.run_id, "notification failed: {}", e),
        }
    }

    /// Run-fatal path: nothing was scanned, so there is no report — send a
    /// distinct "run failed" message instead of failing silently.
    pub async fn notify_run_failure(&self, reason: &str) {
        let Some(notifier) = &self.notifier else {
            warn!("run failed with no notifier configured: {}", reason);
            return;
        };
        let subject = format!("Cost-waste scan {} ({})", RunStatus::Failed, self.region);
        let message = format!("The scheduled cost-waste scan did not run: {}", reason);
        if let Err(e) = notifier.publish(&subject, &message).await {
            error!("failed to send run-failure notification: {}", e);
        }
    }
}
