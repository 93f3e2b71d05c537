use crate::collector::{FindingCallback, FindingCollector};
use crate::data::Finding;
use crate::fuzz::{fuzz_form, fuzz_parameters};
use crate::rules::{RuleSet, ScanRules};
use crate::security::{analyze_crawl_result, check_csrf_tokens};
use anyhow::{Context, Result};
use futures::FutureExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};
use webscout_scanner::crawler::DEFAULT_MAX_FRONTIER;
use webscout_scanner::requester::DEFAULT_TIMEOUT_SECS;
use webscout_scanner::{
    CancelFlag, Crawler, CrawlResult, FormRecord, PageCallback, ProgressCallback, Requester,
    RequesterConfig, TargetScope,
};

pub const DEFAULT_CRAWL_DEPTH: usize = 2;
pub const DEFAULT_DELAY_SECS: f64 = 1.0;
pub const DEFAULT_WORKERS: usize = 1;

/// Options for configuring a scan
#[derive(Clone)]
pub struct ScanOptions {
    pub url: String,
    pub max_depth: usize,
    pub delay: Duration,
    pub workers: usize,
    pub timeout: Duration,
    pub accept_invalid_certs: bool,
    pub headers: Vec<(String, String)>,
    pub cookies: Vec<(String, String)>,
    pub rules: ScanRules,
    /// Submit collected forms with probes once the crawl is done
    pub test_forms: bool,
    pub strict_scope: bool,
    pub max_frontier: usize,
    /// Wall-clock budget; when it runs out the scan stops and reports what it has
    pub max_duration: Option<Duration>,
    pub show_progress: bool,
    pub finding_callback: Option<FindingCallback>,
    pub cancel: CancelFlag,
}

impl ScanOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_depth: DEFAULT_CRAWL_DEPTH,
            delay: Duration::from_secs_f64(DEFAULT_DELAY_SECS),
            workers: DEFAULT_WORKERS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            accept_invalid_certs: true,
            headers: Vec::new(),
            cookies: Vec::new(),
            rules: ScanRules::default(),
            test_forms: false,
            strict_scope: false,
            max_frontier: DEFAULT_MAX_FRONTIER,
            max_duration: None,
            show_progress: false,
            finding_callback: None,
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_rules(mut self, rules: ScanRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_test_forms(mut self, test_forms: bool) -> Self {
        self.test_forms = test_forms;
        self
    }

    pub fn with_finding_callback(mut self, callback: FindingCallback) -> Self {
        self.finding_callback = Some(callback);
        self
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    fn requester_config(&self) -> RequesterConfig {
        let mut config = RequesterConfig::default()
            .with_delay(self.delay)
            .with_timeout(self.timeout)
            .with_accept_invalid_certs(self.accept_invalid_certs)
            .with_cookie_url(&self.url);
        for (name, value) in &self.headers {
            config = config.with_header(name, value);
        }
        for (name, value) in &self.cookies {
            config = config.with_cookie(name, value);
        }
        config
    }
}

/// Everything one scan run shares between its workers. Nothing here outlives
/// the run, so two scans in one process never see each other's state.
pub struct ScanContext {
    pub scope: TargetScope,
    pub requester: Arc<Requester>,
    pub rules: Arc<RuleSet>,
    pub collector: Arc<FindingCollector>,
    pub cancel: CancelFlag,
}

impl ScanContext {
    pub fn new(options: &ScanOptions, collector: FindingCollector) -> Result<Self> {
        let scope = TargetScope::new(&options.url, options.max_depth, options.delay)
            .context("Invalid target")?;
        let requester = Requester::new(&options.requester_config())
            .context("Failed to build HTTP client")?;
        let rules = RuleSet::compile(&options.rules)?;

        Ok(Self {
            scope,
            requester: Arc::new(requester),
            rules: Arc::new(rules),
            collector: Arc::new(collector),
            cancel: options.cancel.clone(),
        })
    }

    /// Passive checks first, then parameter fuzzing of the page's own URL.
    pub async fn analyze_page(&self, page: CrawlResult) {
        let detections = analyze_crawl_result(&page, &self.rules);
        let passive = self.collector.record_all(detections);
        debug!("{} passive finding(s) on {}", passive, page.url);

        if self.cancel.is_cancelled() {
            return;
        }
        fuzz_parameters(&self.requester, &self.rules, &self.collector, &self.cancel, &page.url)
            .await;
    }

    /// CSRF check and probe submission for every distinct collected form.
    pub async fn test_forms(&self, forms: &[FormRecord]) -> usize {
        let forms = distinct_forms(forms);
        info!("Testing {} distinct form(s)", forms.len());

        let mut recorded = self.collector.record_all(check_csrf_tokens(&forms));
        for form in &forms {
            if self.cancel.is_cancelled() {
                break;
            }
            recorded +=
                fuzz_form(&self.requester, &self.rules, &self.collector, &self.cancel, form).await;
        }
        recorded
    }
}

/// The same form is often repeated on every page of a site.
fn distinct_forms(forms: &[FormRecord]) -> Vec<FormRecord> {
    let mut seen = HashSet::new();
    forms
        .iter()
        .filter(|form| {
            seen.insert((
                form.action.clone(),
                form.method,
                form.input_names.clone(),
            ))
        })
        .cloned()
        .collect()
}

/// What a finished (or stopped) scan hands to the reporter.
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    pub findings: Vec<Finding>,
    pub forms: Vec<FormRecord>,
    pub visited: Vec<String>,
    pub pages_fetched: usize,
    pub cancelled: bool,
    pub elapsed: Duration,
}

/// Run a full scan. Only configuration problems are errors; an unreachable
/// target simply yields no findings.
pub async fn execute_scan(options: ScanOptions) -> Result<ScanOutcome> {
    let started = std::time::Instant::now();

    // Set up spinner for overall scan progress (only if enabled)
    let progress_bar = if options.show_progress {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message("Starting scan...");
        pb.enable_steady_tick(Duration::from_millis(120));
        Some(Arc::new(pb))
    } else {
        None
    };

    // Keep the caller's per-finding output from tearing through the spinner
    let mut collector = FindingCollector::new();
    if let Some(callback) = options.finding_callback.clone() {
        let callback: FindingCallback = match progress_bar.clone() {
            Some(pb) => Arc::new(move |finding: &Finding| pb.suspend(|| callback(finding))),
            None => callback,
        };
        collector = collector.with_callback(callback);
    }

    let context = Arc::new(ScanContext::new(&options, collector)?);

    let deadline = options.max_duration.map(|limit| {
        let cancel = context.cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(limit).await;
            warn!("Scan time limit of {:?} reached, stopping", limit);
            cancel.cancel();
        })
    });

    let processed_count = Arc::new(AtomicUsize::new(0));
    let progress_callback: ProgressCallback = match progress_bar.clone() {
        Some(pb) => {
            let count_clone = processed_count.clone();
            Arc::new(move |_worker_id: usize, url: String| {
                let count = count_clone.fetch_add(1, Ordering::Relaxed) + 1;
                pb.set_message(format!("Scanning... {} URLs processed ({})", count, url));
            })
        }
        None => Arc::new(|_worker_id: usize, _url: String| {}),
    };

    let page_context = context.clone();
    let page_callback: PageCallback = Arc::new(move |page: CrawlResult| {
        let context = page_context.clone();
        async move { context.analyze_page(page).await }.boxed()
    });

    let crawler = Crawler::new(context.requester.clone(), context.scope.clone())
        .with_max_frontier(options.max_frontier)
        .with_strict_scope(options.strict_scope)
        .with_cancel_flag(context.cancel.clone())
        .with_progress_callback(progress_callback)
        .with_page_callback(page_callback);

    let output = crawler.crawl(options.workers).await?;

    if options.test_forms && !context.cancel.is_cancelled() {
        if let Some(ref pb) = progress_bar {
            pb.set_message(format!("Testing {} form(s)...", output.forms.len()));
        }
        let form_context = context.clone();
        let forms = output.forms.clone();
        if let Err(e) = tokio::spawn(async move { form_context.test_forms(&forms).await }).await {
            warn!("Form testing stopped early: {}", e);
        }
    }

    if let Some(handle) = deadline {
        handle.abort();
    }

    let cancelled = context.cancel.is_cancelled();
    let findings = context.collector.snapshot();

    // Finish spinner (only if enabled)
    if let Some(ref pb) = progress_bar {
        pb.finish_with_message(format!(
            "Scan {}! {} URLs processed, {} finding(s)",
            if cancelled { "stopped" } else { "complete" },
            processed_count.load(Ordering::Relaxed),
            findings.len()
        ));
    }

    info!(
        "Scan of {} finished: {} pages, {} findings",
        context.scope.root_url,
        output.pages_fetched,
        findings.len()
    );

    Ok(ScanOutcome {
        findings,
        forms: output.forms,
        visited: output.visited,
        pages_fetched: output.pages_fetched,
        cancelled,
        elapsed: started.elapsed(),
    })
}
