// Passive security checks for crawled pages

use crate::data::{Detection, FindingCategory};
use crate::rules::RuleSet;
use regex::Regex;
use webscout_scanner::parser::FormRecord;
use webscout_scanner::requester::HttpMethod;
use webscout_scanner::result::CrawlResult;

const FRAME_OPTIONS_HEADER: &str = "X-Frame-Options";
const CSRF_TOKEN_HINTS: [&str; 3] = ["csrf", "token", "nonce"];

/// One finding listing every required header the response lacks.
pub fn check_security_headers(result: &CrawlResult, required: &[String]) -> Vec<Detection> {
    let missing: Vec<&str> = required
        .iter()
        .filter(|header| !result.has_header(header))
        .map(String::as_str)
        .collect();

    if missing.is_empty() {
        return Vec::new();
    }

    vec![
        Detection::new(FindingCategory::MissingSecurityHeaders, &result.url)
            .with_evidence(format!("Missing: {}", missing.join(", "))),
    ]
}

/// Reported alongside the header check whenever framing is unrestricted.
pub fn check_clickjacking(result: &CrawlResult) -> Vec<Detection> {
    if result.has_header(FRAME_OPTIONS_HEADER) {
        return Vec::new();
    }

    vec![
        Detection::new(FindingCategory::Clickjacking, &result.url)
            .with_evidence("No X-Frame-Options header"),
    ]
}

/// Each disclosure pattern found in the body yields one finding.
pub fn check_disclosure(
    result: &CrawlResult,
    rules: &[(Regex, FindingCategory)],
) -> Vec<Detection> {
    rules
        .iter()
        .filter_map(|(pattern, category)| {
            pattern.find(&result.body).map(|m| {
                Detection::new(*category, &result.url).with_evidence(m.as_str())
            })
        })
        .collect()
}

/// POST forms with no input that looks like an anti-CSRF token.
pub fn check_csrf_tokens(forms: &[FormRecord]) -> Vec<Detection> {
    forms
        .iter()
        .filter(|form| form.method == HttpMethod::Post)
        .filter(|form| {
            !form.input_names.iter().any(|name| {
                let name = name.to_lowercase();
                CSRF_TOKEN_HINTS.iter().any(|hint| name.contains(hint))
            })
        })
        .map(|form| {
            let inputs = if form.input_names.is_empty() {
                "none".to_string()
            } else {
                form.input_names.join(", ")
            };
            Detection::new(FindingCategory::MissingCsrfToken, &form.action).with_evidence(format!(
                "POST form on {} has no anti-CSRF token (inputs: {})",
                form.page_url, inputs
            ))
        })
        .collect()
}

pub fn analyze_crawl_result(result: &CrawlResult, rules: &RuleSet) -> Vec<Detection> {
    let mut all_findings = Vec::new();

    all_findings.extend(check_security_headers(result, &rules.required_headers));
    all_findings.extend(check_clickjacking(result));
    all_findings.extend(check_disclosure(result, &rules.disclosure));

    all_findings
}
