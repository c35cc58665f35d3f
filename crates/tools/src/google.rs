//! Google search tool backed by SerpAPI.
//!
//! Returns the answer box when Google shows one, followed by the top
//! organic results as numbered lines.

use async_trait::async_trait;
use reagent_core::error::ToolError;
use reagent_core::tool::Tool;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const NAME: &str = "google";

pub struct GoogleSearchTool {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    max_results: usize,
}

impl GoogleSearchTool {
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        max_results: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            client: crate::http_client(timeout),
            api_url: api_url.into(),
            api_key: api_key.into(),
            max_results: max_results.max(1),
        }
    }
}

impl std::fmt::Debug for GoogleSearchTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleSearchTool")
            .field("api_url", &self.api_url)
            .field("api_key", &"[REDACTED]")
            .field("max_results", &self.max_results)
            .finish()
    }
}

#[async_trait]
impl Tool for GoogleSearchTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Search the web with Google. Input is a search query; returns a direct \
         answer when available and the top results with titles, snippets and links."
    }

    async fn invoke(&self, input: &str) -> Result<String, ToolError> {
        let query = input.trim();
        if query.is_empty() {
            return Err(ToolError::InvalidInput("empty search query".into()));
        }

        debug!(query, "Searching Google");

        let num = self.max_results.to_string();
        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("engine", "google"),
                ("q", query),
                ("num", num.as_str()),
                ("api_key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| failed(e.without_url().to_string()))?;

        let status = response.status().as_u16();
        if status == 401 || status == 403 {
            return Err(failed("SerpAPI rejected the API key".into()));
        }
        if status == 429 {
            return Err(failed("SerpAPI rate limit reached".into()));
        }
        if !response.status().is_success() {
            return Err(failed(format!("HTTP {status}")));
        }

        let body: SerpResponse = response
            .json()
            .await
            .map_err(|e| failed(format!("unreadable response: {}", e.without_url())))?;

        format_results(query, body, self.max_results)
    }
}

fn failed(reason: String) -> ToolError {
    ToolError::ExecutionFailed {
        tool_name: NAME.into(),
        reason,
    }
}

fn format_results(query: &str, body: SerpResponse, max_results: usize) -> Result<String, ToolError> {
    if let Some(error) = body.error {
        // SerpAPI reports "no results" as an error string.
        if error.contains("hasn't returned any results") {
            return Ok(format!("No Google results for '{query}'"));
        }
        return Err(failed(error));
    }

    let mut lines = Vec::new();

    if let Some(answer) = body.answer_box.and_then(AnswerBox::text) {
        lines.push(format!("Answer: {answer}"));
    }

    for (i, result) in body.organic_results.iter().take(max_results).enumerate() {
        let mut line = format!("{}. {}", i + 1, result.title.trim());
        if let Some(snippet) = result.snippet.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            line.push_str(" — ");
            line.push_str(snippet);
        }
        if let Some(link) = &result.link {
            line.push_str(&format!(" ({link})"));
        }
        lines.push(line);
    }

    if lines.is_empty() {
        return Ok(format!("No Google results for '{query}'"));
    }
    Ok(lines.join("\n"))
}

// --- SerpAPI response types ---

#[derive(Debug, Deserialize)]
struct SerpResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    answer_box: Option<AnswerBox>,
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
}

#[derive(Debug, Deserialize)]
struct AnswerBox {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
}

impl AnswerBox {
    fn text(self) -> Option<String> {
        self.answer
            .or(self.result)
            .or(self.snippet)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    title: String,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
}
