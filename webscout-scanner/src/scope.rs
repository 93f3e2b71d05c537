use crate::error::{Result, ScanError};
use crate::parser::{authority, authority_of};
use std::time::Duration;
use url::Url;

/// The fixed boundaries of one scan run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetScope {
    pub root_url: String,
    /// Authority of the root URL; every scope check compares against it.
    pub domain: String,
    pub max_depth: usize,
    pub delay: Duration,
}

impl TargetScope {
    pub fn new(root_url: &str, max_depth: usize, delay: Duration) -> Result<Self> {
        let parsed = Url::parse(root_url)
            .map_err(|e| ScanError::InvalidUrl(format!("Invalid URL '{}': {}", root_url, e)))?;

        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ScanError::InvalidUrl(format!(
                "Unsupported scheme '{}' in {}",
                parsed.scheme(),
                root_url
            )));
        }

        let domain = authority(&parsed)
            .ok_or_else(|| ScanError::InvalidUrl(format!("URL has no host: {}", root_url)))?;

        Ok(Self {
            root_url: parsed.to_string(),
            domain,
            max_depth,
            delay,
        })
    }

    /// Exact authority match, the check applied before anything is fetched.
    pub fn contains(&self, url: &str) -> bool {
        authority_of(url).is_some_and(|a| a == self.domain)
    }

    /// Loose check applied when links are enqueued: the link's text merely has
    /// to mention the domain.
    pub fn mentions(&self, url: &str) -> bool {
        url.contains(&self.domain)
    }
}
