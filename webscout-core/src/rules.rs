// Declarative rule tables driving the passive and active checks

use crate::data::{FindingCategory, PayloadCategory};
use crate::payloads::PayloadCatalog;
use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisclosureRule {
    /// Case-insensitive regular expression searched for in the body.
    pub pattern: String,
    pub category: FindingCategory,
}

/// How a fuzzed response is recognised as vulnerable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Matcher {
    /// Case-insensitive regex search of the body
    Pattern { pattern: String },
    /// Body contains the probe exactly as sent
    EchoesProbe,
    /// Body contains a fixed literal
    Contains { literal: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionRule {
    pub category: PayloadCategory,
    #[serde(flatten)]
    pub matcher: Matcher,
}

/// The rule file format. Any table left out falls back to the built-in one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanRules {
    pub required_headers: Vec<String>,
    pub disclosure: Vec<DisclosureRule>,
    pub payloads: PayloadCatalog,
    pub detections: Vec<DetectionRule>,
}

impl Default for ScanRules {
    fn default() -> Self {
        Self {
            required_headers: default_required_headers(),
            disclosure: default_disclosure_rules(),
            payloads: PayloadCatalog::default(),
            detections: default_detection_rules(),
        }
    }
}

pub fn default_required_headers() -> Vec<String> {
    ["X-Content-Type-Options", "X-Frame-Options", "X-XSS-Protection"]
        .iter()
        .map(|h| h.to_string())
        .collect()
}

pub fn default_disclosure_rules() -> Vec<DisclosureRule> {
    [
        ("server:", FindingCategory::ServerBannerLeak),
        ("x-powered-by", FindingCategory::TechnologyDisclosure),
        ("password", FindingCategory::PotentialPasswordLeak),
        ("exception", FindingCategory::ErrorMessageDisclosure),
    ]
    .into_iter()
    .map(|(pattern, category)| DisclosureRule {
        pattern: pattern.to_string(),
        category,
    })
    .collect()
}

pub fn default_detection_rules() -> Vec<DetectionRule> {
    vec![
        DetectionRule {
            category: PayloadCategory::Sqli,
            matcher: Matcher::Pattern {
                pattern: "(sql|error|syntax)".to_string(),
            },
        },
        DetectionRule {
            category: PayloadCategory::Xss,
            matcher: Matcher::EchoesProbe,
        },
        DetectionRule {
            category: PayloadCategory::Cmd,
            matcher: Matcher::Contains {
                literal: "root:x:".to_string(),
            },
        },
        DetectionRule {
            category: PayloadCategory::Traversal,
            matcher: Matcher::Contains {
                literal: "root:x:".to_string(),
            },
        },
    ]
}

impl ScanRules {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read rules file {}", path.display()))?;
        let rules: ScanRules = serde_json::from_str(&content)
            .with_context(|| format!("Invalid rules file {}", path.display()))?;
        Ok(rules)
    }
}

fn case_insensitive(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .with_context(|| format!("Invalid pattern '{}'", pattern))
}

#[derive(Debug, Clone)]
pub enum CompiledMatcher {
    Pattern(Regex),
    EchoesProbe,
    Contains(String),
}

impl CompiledMatcher {
    pub fn matches(&self, body: &str, probe: &str) -> bool {
        match self {
            CompiledMatcher::Pattern(regex) => regex.is_match(body),
            CompiledMatcher::EchoesProbe => !probe.is_empty() && body.contains(probe),
            CompiledMatcher::Contains(literal) => body.contains(literal.as_str()),
        }
    }
}

/// Rules with every pattern compiled, ready for the analyzers.
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub required_headers: Vec<String>,
    pub disclosure: Vec<(Regex, FindingCategory)>,
    pub payloads: PayloadCatalog,
    pub detections: Vec<(PayloadCategory, CompiledMatcher)>,
}

impl RuleSet {
    pub fn compile(rules: &ScanRules) -> Result<Self> {
        let disclosure = rules
            .disclosure
            .iter()
            .map(|rule| -> Result<(Regex, FindingCategory)> {
                Ok((case_insensitive(&rule.pattern)?, rule.category))
            })
            .collect::<Result<Vec<_>>>()?;

        let detections = rules
            .detections
            .iter()
            .map(|rule| -> Result<(PayloadCategory, CompiledMatcher)> {
                let matcher = match &rule.matcher {
                    Matcher::Pattern { pattern } => {
                        CompiledMatcher::Pattern(case_insensitive(pattern)?)
                    }
                    Matcher::EchoesProbe => CompiledMatcher::EchoesProbe,
                    Matcher::Contains { literal } => CompiledMatcher::Contains(literal.clone()),
                };
                Ok((rule.category, matcher))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            required_headers: rules.required_headers.clone(),
            disclosure,
            payloads: rules.payloads.clone(),
            detections,
        })
    }

    /// Whether `body`, returned for `probe` of `category`, trips any detection rule.
    pub fn detects(&self, category: PayloadCategory, body: &str, probe: &str) -> bool {
        self.detections
            .iter()
            .filter(|(rule_category, _)| *rule_category == category)
            .any(|(_, matcher)| matcher.matches(body, probe))
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        // The built-in patterns are known-good
        Self::compile(&ScanRules::default()).expect("built-in rules compile")
    }
}
