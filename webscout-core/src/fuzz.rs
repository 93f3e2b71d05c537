// Active injection testing of query parameters and form inputs

use crate::collector::FindingCollector;
use crate::data::Detection;
use crate::rules::RuleSet;
use tracing::{debug, warn};
use url::Url;
use webscout_scanner::CancelFlag;
use webscout_scanner::parser::FormRecord;
use webscout_scanner::requester::{HttpMethod, Requester};

/// Value given to the form inputs that are not under test.
pub const FORM_FILLER_VALUE: &str = "test";

/// Distinct query parameter names, in order of first appearance.
pub fn query_parameters(url: &Url) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for (name, _) in url.query_pairs() {
        if !names.iter().any(|n| *n == name) {
            names.push(name.into_owned());
        }
    }
    names
}

/// `url` with every value of `param` replaced by `probe`. Other parameters
/// keep their values and order; the fragment is dropped.
pub fn build_test_url(url: &Url, param: &str, probe: &str) -> String {
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(name, value)| {
            if name == param {
                (name.into_owned(), probe.to_string())
            } else {
                (name.into_owned(), value.into_owned())
            }
        })
        .collect();

    let mut test_url = url.clone();
    test_url.set_fragment(None);
    test_url.query_pairs_mut().clear().extend_pairs(pairs);
    test_url.to_string()
}

/// Fuzz every query parameter of `url` with every catalog probe. Findings go
/// straight into `collector`; the number recorded is returned.
pub async fn fuzz_parameters(
    requester: &Requester,
    rules: &RuleSet,
    collector: &FindingCollector,
    cancel: &CancelFlag,
    url: &str,
) -> usize {
    let Ok(parsed) = Url::parse(url) else {
        warn!("Cannot fuzz unparsable URL {}", url);
        return 0;
    };

    let params = query_parameters(&parsed);
    if params.is_empty() {
        return 0;
    }

    debug!(
        "Fuzzing {} parameter(s) of {} with {} probes each",
        params.len(),
        url,
        rules.payloads.len()
    );

    let mut recorded = 0;
    for param in &params {
        for (category, probe) in rules.payloads.iter() {
            if cancel.is_cancelled() {
                return recorded;
            }

            let test_url = build_test_url(&parsed, param, probe);
            let Some(body) = probe_body(requester, &test_url, HttpMethod::Get, None).await else {
                continue;
            };

            if rules.detects(category, &body, probe) {
                collector.record(
                    Detection::new(category.finding_category(), &test_url)
                        .with_parameter(param)
                        .with_payload(probe),
                );
                recorded += 1;
            }
        }
    }

    recorded
}

/// Submit `form` once per input × probe, the tested input carrying the probe
/// and the others a filler value.
pub async fn fuzz_form(
    requester: &Requester,
    rules: &RuleSet,
    collector: &FindingCollector,
    cancel: &CancelFlag,
    form: &FormRecord,
) -> usize {
    if form.input_names.is_empty() {
        return 0;
    }

    let Ok(action) = Url::parse(&form.action) else {
        warn!("Cannot fuzz form with unparsable action {}", form.action);
        return 0;
    };

    let mut recorded = 0;
    for input in unique(&form.input_names) {
        for (category, probe) in rules.payloads.iter() {
            if cancel.is_cancelled() {
                return recorded;
            }

            let fields: Vec<(String, String)> = form
                .input_names
                .iter()
                .map(|name| {
                    let value = if name == input { probe } else { FORM_FILLER_VALUE };
                    (name.clone(), value.to_string())
                })
                .collect();

            let (target, body) = match form.method {
                HttpMethod::Get => {
                    let mut target = action.clone();
                    target.set_fragment(None);
                    target.query_pairs_mut().clear().extend_pairs(&fields);
                    let target = target.to_string();
                    let body = probe_body(requester, &target, HttpMethod::Get, None).await;
                    (target, body)
                }
                HttpMethod::Post => {
                    let body = probe_body(
                        requester,
                        &form.action,
                        HttpMethod::Post,
                        Some(fields.as_slice()),
                    )
                    .await;
                    (form.action.clone(), body)
                }
            };

            let Some(body) = body else {
                continue;
            };

            if rules.detects(category, &body, probe) {
                collector.record(
                    Detection::new(category.finding_category(), target)
                        .with_parameter(input)
                        .with_payload(probe),
                );
                recorded += 1;
            }
        }
    }

    recorded
}

fn unique(names: &[String]) -> Vec<&String> {
    let mut seen: Vec<&String> = Vec::new();
    for name in names {
        if !seen.contains(&name) {
            seen.push(name);
        }
    }
    seen
}

/// Fetch and return the body of a usable response; failures are logged and
/// swallowed so one bad probe never stops the run.
async fn probe_body(
    requester: &Requester,
    url: &str,
    method: HttpMethod,
    fields: Option<&[(String, String)]>,
) -> Option<String> {
    match requester.fetch(url, method, fields).await {
        Ok(response) if response.is_success() => Some(response.body),
        Ok(response) => {
            debug!("Probe {} returned {}, skipping", url, response.status_code);
            None
        }
        Err(e) => {
            warn!("Probe request failed for {}: {}", url, e);
            None
        }
    }
}
