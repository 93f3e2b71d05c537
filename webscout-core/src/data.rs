use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Info => "info",
        }
    }
}

/// Every kind of issue the scanner can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FindingCategory {
    #[serde(rename = "Missing Security Headers", alias = "MissingSecurityHeaders")]
    MissingSecurityHeaders,
    #[serde(rename = "Clickjacking")]
    Clickjacking,
    #[serde(rename = "Server Banner Leak", alias = "ServerBannerLeak")]
    ServerBannerLeak,
    #[serde(rename = "Technology Disclosure", alias = "TechnologyDisclosure")]
    TechnologyDisclosure,
    #[serde(rename = "Potential Password Leak", alias = "PotentialPasswordLeak")]
    PotentialPasswordLeak,
    #[serde(rename = "Error Message Disclosure", alias = "ErrorMessageDisclosure")]
    ErrorMessageDisclosure,
    #[serde(rename = "SQL Injection", alias = "SqlInjection")]
    SqlInjection,
    #[serde(rename = "XSS", alias = "Xss")]
    Xss,
    #[serde(rename = "Command Injection", alias = "CommandInjection")]
    CommandInjection,
    #[serde(rename = "Path Traversal", alias = "PathTraversal")]
    PathTraversal,
    #[serde(rename = "Missing CSRF Token", alias = "MissingCsrfToken")]
    MissingCsrfToken,
}

impl FindingCategory {
    pub const ALL: [FindingCategory; 11] = [
        FindingCategory::MissingSecurityHeaders,
        FindingCategory::Clickjacking,
        FindingCategory::ServerBannerLeak,
        FindingCategory::TechnologyDisclosure,
        FindingCategory::PotentialPasswordLeak,
        FindingCategory::ErrorMessageDisclosure,
        FindingCategory::SqlInjection,
        FindingCategory::Xss,
        FindingCategory::CommandInjection,
        FindingCategory::PathTraversal,
        FindingCategory::MissingCsrfToken,
    ];

    /// Human label, also the `type` field of the JSON report.
    pub fn label(&self) -> &'static str {
        match self {
            FindingCategory::MissingSecurityHeaders => "Missing Security Headers",
            FindingCategory::Clickjacking => "Clickjacking",
            FindingCategory::ServerBannerLeak => "Server Banner Leak",
            FindingCategory::TechnologyDisclosure => "Technology Disclosure",
            FindingCategory::PotentialPasswordLeak => "Potential Password Leak",
            FindingCategory::ErrorMessageDisclosure => "Error Message Disclosure",
            FindingCategory::SqlInjection => "SQL Injection",
            FindingCategory::Xss => "XSS",
            FindingCategory::CommandInjection => "Command Injection",
            FindingCategory::PathTraversal => "Path Traversal",
            FindingCategory::MissingCsrfToken => "Missing CSRF Token",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            FindingCategory::SqlInjection | FindingCategory::CommandInjection => Severity::Critical,
            FindingCategory::Xss | FindingCategory::PathTraversal => Severity::High,
            FindingCategory::PotentialPasswordLeak | FindingCategory::MissingCsrfToken => {
                Severity::Medium
            }
            FindingCategory::Clickjacking
            | FindingCategory::MissingSecurityHeaders
            | FindingCategory::ErrorMessageDisclosure => Severity::Low,
            FindingCategory::ServerBannerLeak | FindingCategory::TechnologyDisclosure => {
                Severity::Info
            }
        }
    }
}

impl fmt::Display for FindingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Probe families in the payload catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadCategory {
    Sqli,
    Xss,
    Cmd,
    Traversal,
}

impl PayloadCategory {
    pub fn finding_category(&self) -> FindingCategory {
        match self {
            PayloadCategory::Sqli => FindingCategory::SqlInjection,
            PayloadCategory::Xss => FindingCategory::Xss,
            PayloadCategory::Cmd => FindingCategory::CommandInjection,
            PayloadCategory::Traversal => FindingCategory::PathTraversal,
        }
    }
}

/// A detection before it has been recorded. The collector stamps it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub category: FindingCategory,
    pub url: String,
    pub parameter: Option<String>,
    pub payload: Option<String>,
    pub evidence: Option<String>,
}

impl Detection {
    pub fn new(category: FindingCategory, url: impl Into<String>) -> Self {
        Self {
            category,
            url: url.into(),
            parameter: None,
            payload: None,
            evidence: None,
        }
    }

    pub fn with_parameter(mut self, parameter: impl Into<String>) -> Self {
        self.parameter = Some(parameter.into());
        self
    }

    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence = Some(evidence.into());
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    #[serde(rename = "type")]
    pub category: FindingCategory,
    pub url: String,
    #[serde(rename = "param")]
    pub parameter: Option<String>,
    pub payload: Option<String>,
    pub evidence: Option<String>,
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: DateTime<Local>,
}

impl Finding {
    pub fn from_detection(detection: Detection, timestamp: DateTime<Local>) -> Self {
        Self {
            category: detection.category,
            url: detection.url,
            parameter: detection.parameter,
            payload: detection.payload,
            evidence: detection.evidence,
            timestamp,
        }
    }

    /// Everything but the timestamp, for comparing two runs.
    pub fn content(&self) -> Detection {
        Detection {
            category: self.category,
            url: self.url.clone(),
            parameter: self.parameter.clone(),
            payload: self.payload.clone(),
            evidence: self.evidence.clone(),
        }
    }
}

fn serialize_timestamp<S: Serializer>(
    timestamp: &DateTime<Local>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&timestamp.format(TIMESTAMP_FORMAT))
}
