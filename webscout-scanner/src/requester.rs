use crate::error::{Result, ScanError};
use crate::throttle::Throttle;
use reqwest::Client;
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub const DEFAULT_TIMEOUT_SECS: u64 = 8;

pub fn default_user_agent() -> String {
    format!(
        "Mozilla/5.0 (webscout/{}) Chrome/120.0",
        env!("CARGO_PKG_VERSION")
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    /// Anything that is not POST falls back to GET.
    pub fn parse_lenient(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("post") {
            HttpMethod::Post
        } else {
            HttpMethod::Get
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client settings for a scan run.
#[derive(Debug, Clone)]
pub struct RequesterConfig {
    pub timeout: Duration,
    pub delay: Duration,
    /// Scan targets often sit behind self-signed certificates, so validation
    /// is off unless the operator asks for it.
    pub accept_invalid_certs: bool,
    pub user_agent: String,
    pub extra_headers: Vec<(String, String)>,
    pub cookies: Vec<(String, String)>,
    /// Site the configured cookies belong to. Required when `cookies` is set.
    pub cookie_url: Option<String>,
}

impl Default for RequesterConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            delay: Duration::from_secs(1),
            accept_invalid_certs: true,
            user_agent: default_user_agent(),
            extra_headers: Vec::new(),
            cookies: Vec::new(),
            cookie_url: None,
        }
    }
}

impl RequesterConfig {
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.push((name.into(), value.into()));
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.push((name.into(), value.into()));
        self
    }

    pub fn with_cookie_url(mut self, url: impl Into<String>) -> Self {
        self.cookie_url = Some(url.into());
        self
    }

    /// Seed a jar with the configured cookies. Cookies the server sets later
    /// land in the same jar.
    fn cookie_jar(&self) -> Result<Jar> {
        let jar = Jar::default();
        if self.cookies.is_empty() {
            return Ok(jar);
        }

        let url = self
            .cookie_url
            .as_deref()
            .ok_or_else(|| ScanError::ParseError("Cookies need a target URL".to_string()))?;
        let url = url::Url::parse(url)?;
        for (name, value) in &self.cookies {
            jar.add_cookie_str(&format!("{}={}; Path=/", name, value), &url);
        }
        Ok(jar)
    }
}

/// A completed HTTP exchange. Any status code counts as a response here;
/// callers decide what to do with error statuses.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub url: String,
    pub status_code: u16,
    pub content_type: Option<String>,
    pub headers: HeaderMap,
    pub body: String,
    pub elapsed: Duration,
}

impl HttpResponse {
    /// Mirrors the usual "response is ok" notion: 4xx and 5xx are not usable pages.
    pub fn is_success(&self) -> bool {
        self.status_code < 400
    }
}

/// Throttled HTTP fetcher. Every call goes through the shared throttle first.
pub struct Requester {
    client: Client,
    throttle: Throttle,
}

impl Requester {
    pub fn new(config: &RequesterConfig) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        for (name, value) in &config.extra_headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                ScanError::ParseError(format!("Invalid header name '{}': {}", name, e))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                ScanError::ParseError(format!("Invalid header value for '{}': {}", name, e))
            })?;
            default_headers.insert(name, value);
        }

        let jar = config.cookie_jar()?;

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(default_headers)
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .cookie_provider(Arc::new(jar))
            .pool_idle_timeout(Duration::from_secs(90))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self {
            client,
            throttle: Throttle::new(config.delay),
        })
    }

    pub async fn get(&self, url: &str) -> Result<HttpResponse> {
        self.fetch(url, HttpMethod::Get, None).await
    }

    /// Fetch `url`, waiting for the throttle first. A POST body is sent
    /// form-urlencoded.
    pub async fn fetch(
        &self,
        url: &str,
        method: HttpMethod,
        body: Option<&[(String, String)]>,
    ) -> Result<HttpResponse> {
        let parsed = url::Url::parse(url)?;

        self.throttle.acquire().await;
        debug!("{} {}", method, url);

        let start = Instant::now();
        let request = match method {
            HttpMethod::Get => self.client.get(parsed),
            HttpMethod::Post => {
                let request = self.client.post(parsed);
                match body {
                    Some(fields) => request.form(fields),
                    None => request,
                }
            }
        };

        let response = request.send().await.inspect_err(|e| {
            warn!("Request error for {}: {}", url, e);
        })?;

        let status_code = response.status().as_u16();
        let headers = response.headers().clone();
        let content_type = headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let body = response.text().await.inspect_err(|e| {
            warn!("Failed to read body of {}: {}", url, e);
        })?;

        Ok(HttpResponse {
            url: url.to_string(),
            status_code,
            content_type,
            headers,
            body,
            elapsed: start.elapsed(),
        })
    }
}
