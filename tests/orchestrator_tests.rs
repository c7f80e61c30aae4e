//! End-to-end orchestrator behavior with fake scanners, store, and notifier.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use wastectl::error::{Result, WastectlError};
use wastectl::model::{
    Finding, FindingReason, ReasonCode, Report, ResourceDescriptor, ResourceKind, RunStatus,
};
use wastectl::orchestrator::RunOrchestrator;
use wastectl::provider::{Notifier, ReportStore};
use wastectl::scanners::ResourceScanner;

struct StaticScanner {
    kind: ResourceKind,
    findings: Vec<Finding>,
}

#[async_trait]
impl ResourceScanner for StaticScanner {
    fn kind(&self) -> ResourceKind {
        self.kind
    }

    async fn scan(&self, _region: &str) -> Result<Vec<Finding>> {
        Ok(self.findings.clone())
    }
}

struct FailingScanner {
    kind: ResourceKind,
}

#[async_trait]
impl ResourceScanner for FailingScanner {
    fn kind(&self) -> ResourceKind {
        self.kind
    }

    async fn scan(&self, _region: &str) -> Result<Vec<Finding>> {
        Err(WastectlError::ScannerUnavailable {
            kind: self.kind,
            message: "inventory listing failed: access denied".to_string(),
            source: None,
        })
    }
}

#[derive(Default)]
struct CapturingStore {
    puts: Mutex<Vec<(String, Vec<u8>)>>,
}

#[async_trait]
impl ReportStore for CapturingStore {
    async fn put(&self, key: &str, body: Vec<u8>) -> Result<()> {
        self.puts.lock().unwrap().push((key.to_string(), body));
        Ok(())
    }
}

#[derive(Default)]
struct CapturingNotifier {
    messages: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Notifier for CapturingNotifier {
    async fn publish(&self, subject: &str, message: &str) -> Result<()> {
        self.messages
            .lock()
            .unwrap()
            .push((subject.to_string(), message.to_string()));
        Ok(())
    }
}

struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn publish(&self, _subject: &str, _message: &str) -> Result<()> {
        Err(WastectlError::Notification("topic gone".to_string()))
    }
}

fn wasteful_finding(kind: ResourceKind, id: &str, cost: Option<f64>) -> Finding {
    Finding::wasteful(
        ResourceDescriptor::new(id, kind, "us-east-1"),
        FindingReason::new(ReasonCode::IdleCpu, "idle"),
        cost,
        None,
    )
}

#[tokio::test]
async fn one_failed_scanner_degrades_to_partially_completed() {
    let orchestrator = RunOrchestrator::new("us-east-1")
        .with_scanner(Arc::new(StaticScanner {
            kind: ResourceKind::Compute,
            findings: vec![wasteful_finding(ResourceKind::Compute, "i-1", Some(7.59))],
        }))
        .with_scanner(Arc::new(FailingScanner {
            kind: ResourceKind::Database,
        }))
        .with_scanner(Arc::new(StaticScanner {
            kind: ResourceKind::ObjectStore,
            findings: vec![],
        }));

    let report = orchestrator.run().await.unwrap();

    assert_eq!(report.status, RunStatus::PartiallyCompleted);
    // The compute findings survive the database outage.
    assert_eq!(report.findings.len(), 1);
    assert_eq!(report.summary.failed_scanners.len(), 1);
    assert_eq!(report.summary.failed_scanners[0].kind, ResourceKind::Database);
    assert!(report.summary.failed_scanners[0]
        .message
        .contains("access denied"));
}

#[tokio::test]
async fn findings_come_out_in_fixed_kind_order() {
    // Registered backwards on purpose.
    let orchestrator = RunOrchestrator::new("us-east-1")
        .with_scanner(Arc::new(StaticScanner {
            kind: ResourceKind::ObjectStore,
            findings: vec![wasteful_finding(ResourceKind::ObjectStore, "bucket-1", None)],
        }))
        .with_scanner(Arc::new(StaticScanner {
            kind: ResourceKind::Volume,
            findings: vec![wasteful_finding(ResourceKind::Volume, "vol-1", Some(4.0))],
        }))
        .with_scanner(Arc::new(StaticScanner {
            kind: ResourceKind::Compute,
            findings: vec![wasteful_finding(ResourceKind::Compute, "i-1", Some(7.59))],
        }));

    let report = orchestrator.run().await.unwrap();

    let kinds: Vec<ResourceKind> = report
        .findings
        .iter()
        .map(|f| f.resource.resource_kind)
        .collect();
    assert_eq!(
        kinds,
        vec![ResourceKind::Compute, ResourceKind::Volume, ResourceKind::ObjectStore]
    );
    assert_eq!(report.status, RunStatus::Completed);
}

#[tokio::test]
async fn report_is_persisted_under_a_date_stamped_key() {
    let store = Arc::new(CapturingStore::default());
    let orchestrator = RunOrchestrator::new("eu-west-1")
        .with_scanner(Arc::new(StaticScanner {
            kind: ResourceKind::Compute,
            findings: vec![wasteful_finding(ResourceKind::Compute, "i-1", Some(7.59))],
        }))
        .with_store(Arc::clone(&store) as Arc<dyn ReportStore>);

    let report = orchestrator.run().await.unwrap();

    let puts = store.puts.lock().unwrap();
    assert_eq!(puts.len(), 1);
    let (key, body) = &puts[0];
    assert!(key.starts_with("reports/"));
    assert!(key.ends_with(&format!("waste-report-{}.json", report.run_id)));

    // The stored body round-trips to the same report.
    let stored = Report::from_json(std::str::from_utf8(body).unwrap()).unwrap();
    assert_eq!(stored.run_id, report.run_id);
    assert_eq!(stored.summary.wasteful_count, 1);
}

#[tokio::test]
async fn notification_carries_summary_not_findings() {
    let notifier = Arc::new(CapturingNotifier::default());
    let orchestrator = RunOrchestrator::new("us-east-1")
        .with_scanner(Arc::new(StaticScanner {
            kind: ResourceKind::Compute,
            findings: vec![wasteful_finding(ResourceKind::Compute, "i-secret", Some(7.59))],
        }))
        .with_notifier(Arc::clone(&notifier) as Arc<dyn Notifier>);

    orchestrator.run().await.unwrap();

    let messages = notifier.messages.lock().unwrap();
    assert_eq!(messages.len(), 1);
    let (subject, body) = &messages[0];
    assert!(subject.contains("completed"));
    assert!(body.contains("1 wasteful"));
    // Summary only: no per-resource identifiers leak into the notification.
    assert!(!body.contains("i-secret"));
}

#[tokio::test]
async fn notifier_failure_does_not_lose_the_persisted_report() {
    let store = Arc::new(CapturingStore::default());
    let orchestrator = RunOrchestrator::new("us-east-1")
        .with_scanner(Arc::new(StaticScanner {
            kind: ResourceKind::Compute,
            findings: vec![],
        }))
        .with_store(Arc::clone(&store) as Arc<dyn ReportStore>)
        .with_notifier(Arc::new(FailingNotifier));

    let report = orchestrator.run().await.unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(store.puts.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn run_failure_notification_uses_distinct_subject() {
    let notifier = Arc::new(CapturingNotifier::default());
    let orchestrator = RunOrchestrator::new("us-east-1")
        .with_notifier(Arc::clone(&notifier) as Arc<dyn Notifier>);

    orchestrator
        .notify_run_failure("credential check failed")
        .await;

    let messages = notifier.messages.lock().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].0, format!("Cost-waste scan {} (us-east-1)", RunStatus::Failed));
    assert!(!messages[0].0.contains("completed"));
    assert!(messages[0].1.contains("credential check failed"));
}
