use crate::parser::FormRecord;
use crate::requester::HttpResponse;
use reqwest::header::HeaderMap;
use serde::Serialize;
use std::time::Duration;

/// A page fetched by the crawler, as handed to the analyzers.
#[derive(Debug, Clone)]
pub struct CrawlResult {
    pub url: String,
    pub depth: usize,
    pub status_code: u16,
    pub content_type: Option<String>,
    pub headers: HeaderMap,
    pub body: String,
    pub response_time: Duration,
    pub links_found: Vec<String>,
    pub forms_found: Vec<FormRecord>,
}

impl CrawlResult {
    pub fn new(url: String, depth: usize) -> Self {
        Self {
            url,
            depth,
            status_code: 0,
            content_type: None,
            headers: HeaderMap::new(),
            body: String::new(),
            response_time: Duration::from_secs(0),
            links_found: Vec::new(),
            forms_found: Vec::new(),
        }
    }

    pub fn from_response(response: HttpResponse, depth: usize) -> Self {
        Self {
            url: response.url,
            depth,
            status_code: response.status_code,
            content_type: response.content_type,
            headers: response.headers,
            body: response.body,
            response_time: response.elapsed,
            links_found: Vec::new(),
            forms_found: Vec::new(),
        }
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.headers.contains_key(name)
    }
}

/// What a finished crawl leaves behind besides the findings.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlOutput {
    /// Every URL that was dequeued and fetched, in fetch order.
    pub visited: Vec<String>,
    pub forms: Vec<FormRecord>,
    pub pages_fetched: usize,
    pub cancelled: bool,
}
