use crate::error::Result;
use crate::parser::{self, FormRecord};
use crate::requester::Requester;
use crate::result::{CrawlOutput, CrawlResult};
use crate::scope::TargetScope;
use futures::future::BoxFuture;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_FRONTIER: usize = 10_000;

pub type ProgressCallback = Arc<dyn Fn(usize, String) + Send + Sync>;
/// Invoked once for every page that was fetched successfully.
pub type PageCallback = Arc<dyn Fn(CrawlResult) -> BoxFuture<'static, ()> + Send + Sync>;

/// Shared stop signal. Workers finish their current entry and exit.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FrontierEntry {
    url: String,
    depth: usize,
}

struct Frontier {
    // LIFO, so a single worker walks the site depth-first
    stack: Vec<FrontierEntry>,
}

/// Releases one in-flight slot when dropped, including during a panic.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct Visited {
    seen: HashSet<String>,
    order: Vec<String>,
}

/// Per-run state; a fresh one is built for every `crawl` call.
struct CrawlState {
    frontier: Mutex<Frontier>,
    // Raised under the frontier lock; lowered only after the entry's links are pushed
    in_flight: AtomicUsize,
    visited: Mutex<Visited>,
    forms: Mutex<Vec<FormRecord>>,
    pages_fetched: AtomicUsize,
}

#[derive(Clone)]
pub struct Crawler {
    requester: Arc<Requester>,
    scope: TargetScope,
    max_frontier: usize,
    strict_scope: bool,
    cancel: CancelFlag,
    progress_callback: Option<ProgressCallback>,
    page_callback: Option<PageCallback>,
}

impl Crawler {
    pub fn new(requester: Arc<Requester>, scope: TargetScope) -> Self {
        Self {
            requester,
            scope,
            max_frontier: DEFAULT_MAX_FRONTIER,
            strict_scope: false,
            cancel: CancelFlag::new(),
            progress_callback: None,
            page_callback: None,
        }
    }

    pub fn with_max_frontier(mut self, max_frontier: usize) -> Self {
        self.max_frontier = max_frontier.max(1);
        self
    }

    pub fn with_strict_scope(mut self, strict: bool) -> Self {
        self.strict_scope = strict;
        self
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn with_page_callback(mut self, callback: PageCallback) -> Self {
        self.page_callback = Some(callback);
        self
    }

    pub fn scope(&self) -> &TargetScope {
        &self.scope
    }

    /// Crawl from the scope's root URL with `workers` concurrent tasks.
    pub async fn crawl(&self, workers: usize) -> Result<CrawlOutput> {
        let workers = workers.max(1);
        info!(
            "Starting crawl of {} (depth {}, {} workers)",
            self.scope.root_url, self.scope.max_depth, workers
        );

        let state = Arc::new(CrawlState {
            frontier: Mutex::new(Frontier {
                stack: vec![FrontierEntry {
                    url: self.scope.root_url.clone(),
                    depth: 0,
                }],
            }),
            in_flight: AtomicUsize::new(0),
            visited: Mutex::new(Visited::default()),
            forms: Mutex::new(Vec::new()),
            pages_fetched: AtomicUsize::new(0),
        });

        let mut worker_handles = Vec::new();
        for worker_id in 0..workers {
            let crawler = self.clone();
            let state = state.clone();
            worker_handles.push(tokio::spawn(async move {
                crawler.run_worker(worker_id, &state).await;
            }));
        }

        for handle in worker_handles {
            if let Err(e) = handle.await {
                warn!("Crawl worker failed: {}", e);
            }
        }

        let visited = std::mem::take(&mut state.visited.lock().await.order);
        let forms = std::mem::take(&mut *state.forms.lock().await);
        let pages_fetched = state.pages_fetched.load(Ordering::SeqCst);
        let cancelled = self.cancel.is_cancelled();

        info!(
            "Crawl complete. Visited {} URLs, fetched {} pages, found {} forms",
            visited.len(),
            pages_fetched,
            forms.len()
        );

        Ok(CrawlOutput {
            visited,
            forms,
            pages_fetched,
            cancelled,
        })
    }

    async fn run_worker(&self, worker_id: usize, state: &CrawlState) {
        debug!("Worker {} started", worker_id);

        loop {
            if self.cancel.is_cancelled() {
                debug!("Worker {} stopping: scan cancelled", worker_id);
                break;
            }

            // Popping and counting the entry as in flight happen under one
            // lock, so an empty stack with nothing in flight really is the end.
            let work_item = {
                let mut frontier = state.frontier.lock().await;
                match frontier.stack.pop() {
                    Some(entry) => {
                        state.in_flight.fetch_add(1, Ordering::SeqCst);
                        Some(entry)
                    }
                    None if state.in_flight.load(Ordering::SeqCst) == 0 => break,
                    None => None,
                }
            };

            let Some(entry) = work_item else {
                tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
                continue;
            };

            let _in_flight = InFlight(&state.in_flight);
            self.process_entry(worker_id, entry, state).await;
        }

        debug!("Worker {} finished", worker_id);
    }

    async fn process_entry(&self, worker_id: usize, entry: FrontierEntry, state: &CrawlState) {
        let FrontierEntry { url, depth } = entry;

        if depth > self.scope.max_depth {
            debug!("Dropping {} at depth {} (max {})", url, depth, self.scope.max_depth);
            return;
        }

        if !self.scope.contains(&url) {
            debug!("Out of scope: {}", url);
            return;
        }

        let is_new = {
            let mut visited = state.visited.lock().await;
            if visited.seen.insert(url.clone()) {
                visited.order.push(url.clone());
                true
            } else {
                false
            }
        };
        if !is_new {
            return;
        }

        if let Some(ref callback) = self.progress_callback {
            callback(worker_id, url.clone());
        }
        info!("Crawling {}", url);

        let response = match self.requester.get(&url).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Crawl error for {}: {}", url, e);
                return;
            }
        };

        if !response.is_success() {
            warn!("{} returned {}, not expanding", url, response.status_code);
            return;
        }
        state.pages_fetched.fetch_add(1, Ordering::SeqCst);

        let parsed = parser::parse(&url, &response.body);

        let queued = self.enqueue_links(&parsed.links, depth + 1, state).await;
        debug!(
            "[Worker {}] Queued {} of {} links from {}",
            worker_id,
            queued,
            parsed.links.len(),
            url
        );

        if !parsed.forms.is_empty() {
            state.forms.lock().await.extend(parsed.forms.iter().cloned());
        }

        if let Some(ref callback) = self.page_callback {
            let mut result = CrawlResult::from_response(response, depth);
            result.links_found = parsed.links;
            result.forms_found = parsed.forms;
            // A failing handler loses this page only
            if let Err(e) = tokio::spawn(callback(result)).await {
                warn!("Page handler for {} failed: {}", url, e);
            }
        }
    }

    fn should_enqueue(&self, link: &str) -> bool {
        if self.strict_scope {
            self.scope.contains(link)
        } else {
            self.scope.mentions(link)
        }
    }

    async fn enqueue_links(&self, links: &[String], depth: usize, state: &CrawlState) -> usize {
        let mut frontier = state.frontier.lock().await;
        let room = self.max_frontier.saturating_sub(frontier.stack.len());

        let accepted: Vec<&String> = links
            .iter()
            .filter(|link| self.should_enqueue(link))
            .collect();

        if accepted.len() > room {
            warn!(
                "Frontier full ({} pending), dropping {} links",
                frontier.stack.len(),
                accepted.len() - room
            );
        }

        let accepted = &accepted[..accepted.len().min(room)];
        // Reverse so the first link on the page is popped first
        for link in accepted.iter().rev() {
            frontier.stack.push(FrontierEntry {
                url: (*link).clone(),
                depth,
            });
        }

        accepted.len()
    }
}
