//! Wikipedia tool: MediaWiki full-text search plus intro extracts.
//!
//! One request does both: `generator=search` finds the pages and
//! `prop=extracts&exintro&explaintext` returns the plain-text lead section
//! of each hit.

use async_trait::async_trait;
use reagent_core::error::ToolError;
use reagent_core::tool::Tool;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const NAME: &str = "wikipedia";

pub struct WikipediaTool {
    client: reqwest::Client,
    api_url: String,
    max_results: usize,
}

impl WikipediaTool {
    pub fn new(api_url: impl Into<String>, max_results: usize, timeout: Duration) -> Self {
        Self {
            client: crate::http_client(timeout),
            api_url: api_url.into(),
            max_results: max_results.max(1),
        }
    }
}

#[async_trait]
impl Tool for WikipediaTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Look up a topic on Wikipedia. Input is a search phrase; returns the \
         introduction of the best matching articles."
    }

    async fn invoke(&self, input: &str) -> Result<String, ToolError> {
        let query = input.trim();
        if query.is_empty() {
            return Err(ToolError::InvalidInput("empty search query".into()));
        }

        debug!(query, "Searching Wikipedia");

        let limit = self.max_results.to_string();
        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("action", "query"),
                ("format", "json"),
                ("formatversion", "2"),
                ("generator", "search"),
                ("gsrsearch", query),
                ("gsrlimit", limit.as_str()),
                ("prop", "extracts"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("exlimit", "max"),
                ("redirects", "1"),
            ])
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(failed(format!("HTTP {}", response.status().as_u16())));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| failed(format!("unreadable response: {e}")))?;

        Ok(format_pages(query, body))
    }
}

fn failed(reason: String) -> ToolError {
    ToolError::ExecutionFailed {
        tool_name: NAME.into(),
        reason,
    }
}

/// Render hits as `"<title>: <extract>"` paragraphs in search-rank order.
fn format_pages(query: &str, body: SearchResponse) -> String {
    let mut pages = body.query.map(|q| q.pages).unwrap_or_default();
    if pages.is_empty() {
        return format!("No Wikipedia results for '{query}'");
    }

    pages.sort_by_key(|p| p.index.unwrap_or(u32::MAX));
    pages
        .into_iter()
        .map(|page| {
            let extract = page.extract.as_deref().map(str::trim).unwrap_or_default();
            if extract.is_empty() {
                format!("{}: (no summary available)", page.title)
            } else {
                format!("{}: {extract}", page.title)
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

// --- MediaWiki API types (formatversion=2) ---

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    query: Option<QueryResult>,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    #[serde(default)]
    pages: Vec<Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    title: String,
    #[serde(default)]
    index: Option<u32>,
    #[serde(default)]
    extract: Option<String>,
}
