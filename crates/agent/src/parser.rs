//! Response parser: turns one raw model reply into a [`ParsedStep`].
//!
//! Decoding is a fallback chain, tried in order:
//!
//! 1. A fenced JSON block (```` ```json ... ``` ````). When present and
//!    decodable it is authoritative.
//! 2. Line markers: `Thought:`, `Action:`, `Action Input:`, `Final Answer:`.
//!    Anything after the first `Observation:` marker is ignored, since the
//!    model is not allowed to write its own observations.
//! 3. `MalformedResponse`.
//!
//! Every fallback decision is logged at `debug`. Replies carrying both an
//! action and a final answer are resolved by the configured
//! [`ConflictPolicy`] and logged at `warn`.
//!
//! The parser never consults the tool registry; unknown tool names are the
//! loop's concern.

use reagent_core::{ConflictPolicy, ParseError, ParsedStep, ResponseDecoder};
use regex_lite::Regex;
use serde_json::Value;
use std::ops::Range;
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Line-start markers of the text convention. `action input` must be listed
/// before `action` so the longer marker wins at the same position.
/// Markdown emphasis around the marker (`**Action:**`, `**Action**:`) is
/// part of the match.
static MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?mi)^[ \t>*]*(thought|action[ \t]+input|action|final[ \t]+answer|observation)[ \t*]*:\**",
    )
    .expect("marker pattern is a valid regex")
});

/// Decodes model replies. Cheap to copy; holds no state besides the policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseParser {
    policy: ConflictPolicy,
}

impl ResponseParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: ConflictPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    /// Parse one raw reply into exactly one step.
    pub fn parse(&self, raw: &str) -> Result<ParsedStep, ParseError> {
        if raw.trim().is_empty() {
            debug!(strategy = "none", "Empty model reply");
            return Err(ParseError::malformed("empty reply"));
        }

        let fenced = extract_fenced_json(raw);
        let text = match fenced.span() {
            Some(span) => scan_markers(&without(raw, span)),
            None => scan_markers(raw),
        };

        let json_failure = match fenced {
            FencedJson::Missing => {
                debug!(strategy = "json", "No fenced JSON block, trying text markers");
                None
            }
            FencedJson::Unterminated { .. } => {
                debug!(strategy = "json", "JSON fence is never closed, trying text markers");
                Some("unterminated JSON block".to_string())
            }
            FencedJson::Body { body, .. } => match decode_json(body) {
                Ok(mut candidate) => {
                    if candidate.thought.is_none() {
                        candidate.thought = text.thought.clone();
                    }
                    match candidate.resolve(self.policy, "json") {
                        Ok(step) => {
                            if let Ok(from_text) = text.clone().resolve(self.policy, "text")
                                && !same_intent(&step, &from_text)
                            {
                                debug!(
                                    strategy = "json",
                                    "Text markers disagree with the JSON block, using JSON"
                                );
                            }
                            return Ok(step);
                        }
                        Err(e) => {
                            debug!(strategy = "json", reason = %e, "JSON block incomplete, trying text markers");
                            Some(e.to_string())
                        }
                    }
                }
                Err(reason) => {
                    debug!(strategy = "json", %reason, "JSON block undecodable, trying text markers");
                    Some(reason)
                }
            },
        };

        match text.resolve(self.policy, "text") {
            Ok(step) => Ok(step),
            Err(e) => {
                debug!(strategy = "text", reason = %e, "Text markers failed, reply is malformed");
                match json_failure {
                    Some(json_reason) => Err(ParseError::malformed(format!(
                        "{} (JSON block: {json_reason})",
                        reason_of(&e)
                    ))),
                    None => Err(e),
                }
            }
        }
    }
}

impl ResponseDecoder for ResponseParser {
    fn decode(&self, raw: &str) -> Result<ParsedStep, ParseError> {
        self.parse(raw)
    }
}

fn reason_of(err: &ParseError) -> &str {
    match err {
        ParseError::MalformedResponse { reason } => reason,
    }
}

fn same_intent(a: &ParsedStep, b: &ParsedStep) -> bool {
    match (a, b) {
        (
            ParsedStep::Action { tool, input, .. },
            ParsedStep::Action {
                tool: t2,
                input: i2,
                ..
            },
        ) => tool == t2 && input == i2,
        (ParsedStep::Final { answer, .. }, ParsedStep::Final { answer: a2, .. }) => answer == a2,
        _ => false,
    }
}

/// Fields located by one strategy, before validation.
#[derive(Debug, Clone, Default)]
struct Candidate {
    thought: Option<String>,
    tool: Option<String>,
    input: Option<String>,
    final_answer: Option<String>,
}

impl Candidate {
    fn resolve(self, policy: ConflictPolicy, strategy: &str) -> Result<ParsedStep, ParseError> {
        let rationale = self.thought.unwrap_or_default();
        let tool = self.tool.filter(|t| !t.is_empty());
        let answer = self.final_answer.filter(|a| !a.is_empty());

        match (tool, self.input, answer) {
            (Some(tool), Some(input), Some(answer)) => {
                warn!(
                    strategy,
                    tool = %tool,
                    ?policy,
                    "Reply contains both an Action and a Final Answer"
                );
                Ok(match policy {
                    ConflictPolicy::PreferAction => ParsedStep::Action {
                        tool,
                        input,
                        rationale,
                    },
                    ConflictPolicy::PreferFinal => ParsedStep::Final { answer, rationale },
                })
            }
            (Some(tool), Some(input), None) => Ok(ParsedStep::Action {
                tool,
                input,
                rationale,
            }),
            (Some(tool), None, Some(answer)) => {
                debug!(strategy, tool = %tool, "Action has no input, using the Final Answer");
                Ok(ParsedStep::Final { answer, rationale })
            }
            (Some(tool), None, None) => Err(ParseError::malformed(format!(
                "Action '{tool}' has no Action Input"
            ))),
            (None, _, Some(answer)) => Ok(ParsedStep::Final { answer, rationale }),
            (None, _, None) => Err(ParseError::malformed("no Action or Final Answer found")),
        }
    }
}

enum FencedJson<'a> {
    Missing,
    /// Opening fence at `start`, never closed.
    Unterminated { start: usize },
    /// Decodable candidate; `span` covers both fences.
    Body { body: &'a str, span: Range<usize> },
}

impl FencedJson<'_> {
    /// Byte range of the JSON block within the reply.
    fn span(&self) -> Option<Range<usize>> {
        match self {
            FencedJson::Missing => None,
            FencedJson::Unterminated { start } => Some(*start..usize::MAX),
            FencedJson::Body { span, .. } => Some(span.clone()),
        }
    }
}

/// `raw` with the bytes in `span` removed. Other fenced blocks stay as they
/// are, since they may be part of an answer.
fn without(raw: &str, span: Range<usize>) -> String {
    let end = span.end.min(raw.len());
    let mut out = String::with_capacity(raw.len());
    out.push_str(&raw[..span.start]);
    out.push('\n');
    out.push_str(&raw[end..]);
    out
}

/// Locate the first fenced block that is labelled `json`, or that is
/// unlabelled and starts with `{`.
fn extract_fenced_json(content: &str) -> FencedJson<'_> {
    let mut search_from = 0;
    while let Some(pos) = content[search_from..].find("```") {
        let fence = search_from + pos;
        let open = fence + 3;
        let rest = &content[open..];
        let label_end = rest.find('\n').unwrap_or(rest.len());
        let label = rest[..label_end].trim();

        let body_start = if label.eq_ignore_ascii_case("json") {
            Some(open + label_end)
        } else if label.is_empty() && rest[label_end..].trim_start().starts_with('{') {
            Some(open + label_end)
        } else if label.starts_with('{') {
            // ```{"action": ...}``` on one line
            Some(open)
        } else {
            None
        };

        match body_start {
            Some(start) => {
                return match content[start..].find("```") {
                    Some(end) => FencedJson::Body {
                        body: content[start..start + end].trim(),
                        span: fence..start + end + 3,
                    },
                    None => FencedJson::Unterminated { start: fence },
                };
            }
            None => {
                // Skip over this non-JSON block entirely.
                match content[open..].find("```") {
                    Some(end) => search_from = open + end + 3,
                    None => return FencedJson::Missing,
                }
            }
        }
    }
    FencedJson::Missing
}

fn decode_json(body: &str) -> Result<Candidate, String> {
    let value: Value = serde_json::from_str(body).map_err(|e| format!("invalid JSON: {e}"))?;
    let Value::Object(obj) = value else {
        return Err("JSON block is not an object".into());
    };

    let field = |keys: &[&str]| -> Option<String> {
        keys.iter()
            .find_map(|k| obj.get(*k))
            .and_then(value_to_text)
            .map(|s| clean(&s))
    };

    let thought = field(&["thought", "rationale", "reasoning"]);
    let mut tool = field(&["action", "tool", "tool_name"]);
    let mut input = field(&["action_input", "input", "tool_input"]);
    let mut final_answer = field(&["final_answer", "answer"]);

    // {"action": "Final Answer", "action_input": "..."}
    if let Some(t) = &tool
        && is_final_marker(t)
    {
        tool = None;
        if final_answer.is_none() {
            final_answer = input.take();
        }
    }

    Ok(Candidate {
        thought,
        tool,
        input,
        final_answer,
    })
}

fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn is_final_marker(name: &str) -> bool {
    let normalized = name.trim().to_ascii_lowercase().replace([' ', '-'], "_");
    normalized == "final_answer" || normalized == "finish"
}

/// Split the reply on line markers. The first occurrence of each marker
/// wins; everything from the first `Observation:` on is dropped.
fn scan_markers(raw: &str) -> Candidate {
    let marks: Vec<(usize, usize, String)> = MARKER
        .captures_iter(raw)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(1)?.as_str().to_ascii_lowercase();
            let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
            Some((whole.start(), whole.end(), name))
        })
        .collect();

    let mut candidate = Candidate::default();
    let mut first_marker = raw.len();

    for (i, (start, end, name)) in marks.iter().enumerate() {
        if i == 0 {
            first_marker = *start;
        }
        if name == "observation" {
            break;
        }
        let value_end = marks.get(i + 1).map_or(raw.len(), |next| next.0);
        let value = &raw[*end..value_end];

        let slot = match name.as_str() {
            "thought" => &mut candidate.thought,
            "action" => &mut candidate.tool,
            "action input" => &mut candidate.input,
            "final answer" => &mut candidate.final_answer,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(match name.as_str() {
                // Tool names are a single token on the marker line.
                "action" => clean(value.lines().next().unwrap_or_default().trim().trim_matches('*')),
                _ => clean(value),
            });
        }
    }

    if candidate.thought.is_none() {
        let preamble = clean(&raw[..first_marker]);
        if !preamble.is_empty() && !marks.is_empty() {
            candidate.thought = Some(preamble);
        }
    }

    candidate
}

/// Trim whitespace and one layer of surrounding quotes or backticks.
fn clean(s: &str) -> String {
    let s = s.trim();
    for quote in ['"', '\'', '`'] {
        if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
            return s[1..s.len() - 1].trim().to_string();
        }
    }
    s.to_string()
}
