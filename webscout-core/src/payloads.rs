// Probe strings used by the active tests

use crate::data::PayloadCategory;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub category: PayloadCategory,
    pub probes: Vec<String>,
}

/// Ordered category → probes table. Entry order and probe order are the
/// order in which the fuzzer sends them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PayloadCatalog {
    entries: Vec<CatalogEntry>,
}

impl PayloadCatalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn probes(&self, category: PayloadCategory) -> &[String] {
        self.entries
            .iter()
            .find(|entry| entry.category == category)
            .map(|entry| entry.probes.as_slice())
            .unwrap_or(&[])
    }

    /// Total probes across every category.
    pub fn len(&self) -> usize {
        self.entries.iter().map(|entry| entry.probes.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// (category, probe) pairs in send order.
    pub fn iter(&self) -> impl Iterator<Item = (PayloadCategory, &str)> {
        self.entries.iter().flat_map(|entry| {
            entry
                .probes
                .iter()
                .map(move |probe| (entry.category, probe.as_str()))
        })
    }
}

impl Default for PayloadCatalog {
    fn default() -> Self {
        let entry = |category, probes: &[&str]| CatalogEntry {
            category,
            probes: probes.iter().map(|p| p.to_string()).collect(),
        };

        Self::new(vec![
            entry(
                PayloadCategory::Sqli,
                &["' OR '1'='1", "'; DROP TABLE users; --", "1 AND SLEEP(5)--"],
            ),
            entry(
                PayloadCategory::Xss,
                &["<script>alert(1)</script>", "\"><svg/onload=alert(1)>"],
            ),
            entry(PayloadCategory::Cmd, &["; cat /etc/passwd", "| whoami"]),
            entry(
                PayloadCategory::Traversal,
                &["../../../../etc/passwd", "..%2F..%2F..%2Fetc%2Fpasswd"],
            ),
        ])
    }
}
