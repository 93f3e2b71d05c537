// Shared, append-only record of findings for one scan

use crate::data::{Detection, Finding};
use chrono::Local;
use std::sync::{Arc, Mutex};
use tracing::info;

/// Invoked once per recorded finding, in record order.
pub type FindingCallback = Arc<dyn Fn(&Finding) + Send + Sync>;

/// Findings are kept in the order they were recorded. Safe to share between
/// crawl workers.
#[derive(Default)]
pub struct FindingCollector {
    findings: Mutex<Vec<Finding>>,
    callback: Option<FindingCallback>,
}

impl FindingCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(mut self, callback: FindingCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Timestamp `detection`, append it, and announce it.
    pub fn record(&self, detection: Detection) -> Finding {
        let finding = Finding::from_detection(detection, Local::now());
        info!("Potential {} found at {}", finding.category, finding.url);

        // Callback runs under the lock so callers see findings in record order
        let mut findings = self.findings.lock().unwrap_or_else(|e| e.into_inner());
        findings.push(finding.clone());
        if let Some(ref callback) = self.callback {
            callback(&finding);
        }

        finding
    }

    pub fn record_all(&self, detections: impl IntoIterator<Item = Detection>) -> usize {
        detections
            .into_iter()
            .map(|detection| self.record(detection))
            .count()
    }

    pub fn snapshot(&self) -> Vec<Finding> {
        self.findings.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn len(&self) -> usize {
        self.findings.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
