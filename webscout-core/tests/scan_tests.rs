// Tests for full scan runs against mock targets

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use webscout_core::data::{Detection, Finding, FindingCategory};
use webscout_core::scan::{ScanOptions, execute_scan};
use webscout_scanner::CancelFlag;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Reflects the named query parameter (or form field) back unescaped.
struct Echo(&'static str);

impl Respond for Echo {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let from_query = request
            .url
            .query_pairs()
            .find(|(name, _)| name == self.0)
            .map(|(_, value)| value.into_owned());
        let from_body = url::form_urlencoded::parse(&request.body)
            .find(|(name, _)| name == self.0)
            .map(|(_, value)| value.into_owned());

        let value = from_query.or(from_body).unwrap_or_default();
        ResponseTemplate::new(200)
            .insert_header("content-type", "text/html")
            .set_body_string(format!("<html><body>Hello {}</body></html>", value))
    }
}

fn hardened_page(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html")
        .insert_header("x-content-type-options", "nosniff")
        .insert_header("x-frame-options", "DENY")
        .insert_header("x-xss-protection", "1; mode=block")
        .set_body_string(format!("<html><body>{}</body></html>", body))
}

fn options(server: &MockServer, depth: usize) -> ScanOptions {
    ScanOptions::new(format!("{}/", server.uri()))
        .with_max_depth(depth)
        .with_delay(Duration::ZERO)
}

/// Root is hardened and links to `/a?x=1`; `/a` has no security headers and
/// reflects `x`.
async fn reflective_site() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(hardened_page("<a href=\"/a?x=1\">search</a>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(Echo("x"))
        .mount(&server)
        .await;
    server
}

// ============================================================================
// Scenario Tests
// ============================================================================

#[tokio::test]
async fn test_reflective_page_scenario() {
    let server = reflective_site().await;

    let outcome = execute_scan(options(&server, 1)).await.unwrap();

    let page = format!("{}/a?x=1", server.uri());
    let findings = outcome.findings;
    assert_eq!(findings.len(), 4);

    assert_eq!(findings[0].category, FindingCategory::MissingSecurityHeaders);
    assert_eq!(findings[0].url, page);
    assert_eq!(findings[1].category, FindingCategory::Clickjacking);
    assert_eq!(findings[1].url, page);

    assert_eq!(findings[2].category, FindingCategory::Xss);
    assert_eq!(findings[2].parameter.as_deref(), Some("x"));
    assert_eq!(findings[2].payload.as_deref(), Some("<script>alert(1)</script>"));
    assert!(findings[2].url.starts_with(&format!("{}/a?x=", server.uri())));
    assert_eq!(findings[3].category, FindingCategory::Xss);

    assert_eq!(outcome.pages_fetched, 2);
    assert!(!outcome.cancelled);
}

#[tokio::test]
async fn test_depth_zero_scans_root_only() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(hardened_page("<a href=\"/a?x=1\">search</a>"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(Echo("x"))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = execute_scan(options(&server, 0)).await.unwrap();

    assert!(outcome.findings.is_empty());
    assert_eq!(outcome.visited, vec![format!("{}/", server.uri())]);
}

#[tokio::test]
async fn test_repeated_scans_agree() {
    let server = reflective_site().await;

    let first = execute_scan(options(&server, 1)).await.unwrap();
    let second = execute_scan(options(&server, 1)).await.unwrap();

    let first: Vec<Detection> = first.findings.iter().map(|f| f.content()).collect();
    let second: Vec<Detection> = second.findings.iter().map(|f| f.content()).collect();
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_unreachable_root_reports_nothing() {
    let mut options = ScanOptions::new("http://127.0.0.1:1/").with_delay(Duration::ZERO);
    options.timeout = Duration::from_secs(2);

    let outcome = execute_scan(options).await.unwrap();

    assert!(outcome.findings.is_empty());
    assert_eq!(outcome.pages_fetched, 0);
}

#[tokio::test]
async fn test_error_root_is_not_analyzed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Exception: not found"))
        .mount(&server)
        .await;

    let outcome = execute_scan(options(&server, 2)).await.unwrap();

    assert!(outcome.findings.is_empty());
}

#[tokio::test]
async fn test_finding_callback_sees_every_finding() {
    let server = reflective_site().await;
    let seen = Arc::new(AtomicUsize::new(0));
    let seen_clone = seen.clone();

    let options = options(&server, 1).with_finding_callback(Arc::new(move |_: &Finding| {
        seen_clone.fetch_add(1, Ordering::SeqCst);
    }));
    let outcome = execute_scan(options).await.unwrap();

    assert_eq!(seen.load(Ordering::SeqCst), outcome.findings.len());
}

#[tokio::test]
async fn test_multiple_workers_find_the_same_issues() {
    let server = reflective_site().await;

    let outcome = execute_scan(options(&server, 1).with_workers(4)).await.unwrap();

    let mut categories: Vec<FindingCategory> =
        outcome.findings.iter().map(|f| f.category).collect();
    categories.sort();
    assert_eq!(
        categories,
        vec![
            FindingCategory::MissingSecurityHeaders,
            FindingCategory::Clickjacking,
            FindingCategory::Xss,
            FindingCategory::Xss,
        ]
    );
}

// ============================================================================
// Form Testing
// ============================================================================

async fn site_with_login_form() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(hardened_page(
            "<form method=\"post\" action=\"/login\"><input name=\"user\"></form>",
        ))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(Echo("user"))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_forms_tested_when_enabled() {
    let server = site_with_login_form().await;

    let outcome = execute_scan(options(&server, 1).with_test_forms(true)).await.unwrap();

    let action = format!("{}/login", server.uri());
    assert_eq!(outcome.forms.len(), 1);
    assert_eq!(outcome.findings[0].category, FindingCategory::MissingCsrfToken);
    assert_eq!(outcome.findings[0].url, action);

    let xss: Vec<_> = outcome
        .findings
        .iter()
        .filter(|f| f.category == FindingCategory::Xss)
        .collect();
    assert_eq!(xss.len(), 2);
    assert!(xss.iter().all(|f| f.url == action && f.parameter.as_deref() == Some("user")));
}

#[tokio::test]
async fn test_forms_left_alone_by_default() {
    let server = site_with_login_form().await;

    let outcome = execute_scan(options(&server, 1)).await.unwrap();

    assert_eq!(outcome.forms.len(), 1);
    assert!(outcome.findings.is_empty());
    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.method.as_str() == "GET"));
}

// ============================================================================
// Stopping Tests
// ============================================================================

#[tokio::test]
async fn test_cancelled_scan_still_returns() {
    let server = reflective_site().await;
    let cancel = CancelFlag::new();
    cancel.cancel();

    let outcome = execute_scan(options(&server, 1).with_cancel_flag(cancel)).await.unwrap();

    assert!(outcome.cancelled);
    assert!(outcome.findings.is_empty());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_time_limit_stops_scan() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<a href=\"/a?x=1\">next</a>")
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(Echo("x"))
        .expect(0)
        .mount(&server)
        .await;

    let mut options = options(&server, 1);
    options.max_duration = Some(Duration::from_millis(100));
    let outcome = execute_scan(options).await.unwrap();

    assert!(outcome.cancelled);
    assert_eq!(outcome.visited, vec![format!("{}/", server.uri())]);
    // The page that was already in flight is still analyzed
    assert!(outcome
        .findings
        .iter()
        .any(|f| f.category == FindingCategory::MissingSecurityHeaders));
}

#[tokio::test]
async fn test_failing_finding_callback_still_returns_findings() {
    let server = reflective_site().await;

    let options = options(&server, 1)
        .with_workers(2)
        .with_finding_callback(Arc::new(|finding: &Finding| {
            panic!("console closed while printing {}", finding.url);
        }));
    let outcome = tokio::time::timeout(Duration::from_secs(10), execute_scan(options))
        .await
        .expect("scan finished")
        .unwrap();

    assert_eq!(outcome.visited.len(), 2);
    assert_eq!(outcome.findings[0].category, FindingCategory::MissingSecurityHeaders);
}
