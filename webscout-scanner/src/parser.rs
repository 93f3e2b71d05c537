// Link and form extraction from static HTML

use crate::requester::HttpMethod;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

static LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("static selector"));
static FORM_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("form").expect("static selector"));
static INPUT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("input[name]").expect("static selector"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormRecord {
    pub page_url: String,
    pub action: String,
    pub method: HttpMethod,
    pub input_names: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPage {
    pub links: Vec<String>,
    pub forms: Vec<FormRecord>,
}

/// Extract absolute links and form descriptors from `html`, resolving
/// everything against `base_url`. Unresolvable hrefs are skipped.
pub fn parse(base_url: &str, html: &str) -> ParsedPage {
    let Ok(base) = Url::parse(base_url) else {
        debug!("Cannot parse base URL {}, skipping page", base_url);
        return ParsedPage::default();
    };

    let document = Html::parse_document(html);

    let links = document
        .select(&LINK_SELECTOR)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_url(&base, href))
        .collect();

    let mut forms = Vec::new();
    for form in document.select(&FORM_SELECTOR) {
        let action_attr = form.value().attr("action").unwrap_or("");
        let action = match base.join(action_attr.trim()) {
            Ok(action) => action.to_string(),
            Err(e) => {
                debug!("Skipping form with bad action '{}': {}", action_attr, e);
                continue;
            }
        };

        let method = HttpMethod::parse_lenient(form.value().attr("method").unwrap_or("GET"));

        let input_names = form
            .select(&INPUT_SELECTOR)
            .filter_map(|input| input.value().attr("name"))
            .filter(|name| !name.is_empty())
            .map(String::from)
            .collect();

        forms.push(FormRecord {
            page_url: base_url.to_string(),
            action,
            method,
            input_names,
        });
    }

    ParsedPage { links, forms }
}

fn resolve_url(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    // Skip empty, javascript:, mailto:, tel:, etc.
    if href.is_empty()
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with('#')
    {
        return None;
    }

    let mut resolved = match base.join(href) {
        Ok(url) => url,
        Err(e) => {
            debug!("Skipping malformed href '{}': {}", href, e);
            return None;
        }
    };

    if resolved.scheme() != "http" && resolved.scheme() != "https" {
        return None;
    }

    resolved.set_fragment(None);
    Some(resolved.to_string())
}

/// Host plus explicit port, e.g. `example.com:8080`. This is the value every
/// scope check compares against.
pub fn authority(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

pub fn authority_of(url: &str) -> Option<String> {
    Url::parse(url).ok().as_ref().and_then(authority)
}
