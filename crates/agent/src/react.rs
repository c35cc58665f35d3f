//! ReAct loop: Thought → Action → Observation until a Final Answer.
//!
//! Each [`ReactAgent::execute`] call seeds a fresh [`Transcript`], owns it
//! for the whole run, and drops it afterwards. The agent itself is
//! immutable, so one instance can be shared behind an `Arc` and serve many
//! concurrent queries.
//!
//! # State machine
//!
//! ```text
//! AwaitingModel ──final──────────▶ HaveFinal   (terminal)
//!      │  ▲
//!  action│  │observation
//!      ▼  │
//!   HaveAction
//!
//! AwaitingModel ──budget spent──▶ Exhausted   (terminal, degraded answer)
//! ```
//!
//! Malformed replies, unknown tools, tool errors, tool timeouts and tool
//! panics all become observations. Only a failing or timed-out model call
//! ends the run with an error.
//!
//! Dropping the `execute` future cancels the run. Nothing outside the
//! transcript is mutated, so a cancelled run leaves no state behind.

use futures::FutureExt;
use reagent_config::AgentConfig;
use reagent_core::{
    ConflictPolicy, ConversationTurn, Message, ParsedStep, Provider, ProviderError, ToolError,
    ToolRegistry, TraceEntry, Transcript, TranscriptId,
};
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{Instrument, debug, info, info_span, warn};

use crate::parser::ResponseParser;
use crate::prompt;

const DEFAULT_MAX_STEPS: u32 = 8;
const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MAX_OBSERVATION_CHARS: usize = 4000;

/// The ReAct agent.
pub struct ReactAgent {
    /// Model collaborator.
    provider: Arc<dyn Provider>,
    /// Tool registry, read-only once the agent is built.
    tools: Arc<ToolRegistry>,
    parser: ResponseParser,
    /// System instruction seeded into every transcript.
    system_prompt: String,
    /// Maximum model calls per query.
    max_steps: u32,
    model_timeout: Duration,
    tool_timeout: Duration,
    max_observation_chars: usize,
}

/// The outcome of one `execute` call.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub final_answer: String,
    pub trace: Vec<TraceEntry>,
    /// `false` when the step budget ran out and `final_answer` is degraded.
    pub converged: bool,
    pub model_calls: u32,
    pub tool_calls: u32,
    pub transcript_id: TranscriptId,
    /// The full transcript, seed included.
    #[serde(skip)]
    pub transcript: Transcript,
}

/// Loop states. `HaveFinal` and `Exhausted` are terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LoopState {
    AwaitingModel,
    HaveAction { tool: String, input: String },
    HaveFinal(String),
    Exhausted,
}

impl ReactAgent {
    /// Create a new ReAct agent with default limits.
    pub fn new(provider: Arc<dyn Provider>, tools: Arc<ToolRegistry>) -> Self {
        let system_prompt = prompt::system_prompt(&tools);
        Self {
            provider,
            tools,
            parser: ResponseParser::new(),
            system_prompt,
            max_steps: DEFAULT_MAX_STEPS,
            model_timeout: DEFAULT_MODEL_TIMEOUT,
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
            max_observation_chars: DEFAULT_MAX_OBSERVATION_CHARS,
        }
    }

    /// Create an agent with the limits and policy from `[agent]`.
    pub fn from_config(
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        config: &AgentConfig,
    ) -> Self {
        Self::new(provider, tools)
            .with_max_steps(config.max_steps)
            .with_model_timeout(config.model_timeout())
            .with_tool_timeout(config.tool_timeout())
            .with_max_observation_chars(config.max_observation_chars)
            .with_conflict_policy(config.conflict_policy)
    }

    /// Set the step budget. Values below 1 are raised to 1.
    pub fn with_max_steps(mut self, max: u32) -> Self {
        self.max_steps = max.max(1);
        self
    }

    pub fn with_model_timeout(mut self, timeout: Duration) -> Self {
        self.model_timeout = timeout;
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    pub fn with_max_observation_chars(mut self, max: usize) -> Self {
        self.max_observation_chars = max;
        self
    }

    pub fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.parser = ResponseParser::with_policy(policy);
        self
    }

    /// Replace the generated system instruction.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn max_steps(&self) -> u32 {
        self.max_steps
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Answer `query`, optionally in the context of a prior conversation.
    ///
    /// Returns an answer (degraded if the step budget ran out) plus the
    /// trace, or `Error::Provider` when the model could not be reached.
    pub async fn execute(
        &self,
        query: &str,
        prior: &[ConversationTurn],
    ) -> reagent_core::Result<ExecutionResult> {
        let transcript = Transcript::seeded(&self.system_prompt, prior, query);
        let span = info_span!("react", transcript_id = %transcript.id);
        self.run(transcript).instrument(span).await
    }

    async fn run(&self, mut transcript: Transcript) -> reagent_core::Result<ExecutionResult> {
        let mut state = LoopState::AwaitingModel;
        let mut model_calls = 0u32;
        let mut tool_calls = 0u32;
        let mut parsed_replies = 0u32;
        let mut last_tool_output: Option<String> = None;

        info!(
            provider = self.provider.name(),
            max_steps = self.max_steps,
            tools = self.tools.len(),
            "ReAct loop starting"
        );

        loop {
            state = match state {
                LoopState::AwaitingModel if model_calls >= self.max_steps => LoopState::Exhausted,

                LoopState::AwaitingModel => {
                    model_calls += 1;
                    let raw = self.call_model(&transcript, model_calls).await?;
                    transcript.append(Message::model(&raw));

                    match self.parser.parse(&raw) {
                        Ok(ParsedStep::Final { answer, .. }) => LoopState::HaveFinal(answer),
                        Ok(ParsedStep::Action { tool, input, .. }) => {
                            parsed_replies += 1;
                            LoopState::HaveAction { tool, input }
                        }
                        Err(e) => {
                            warn!(step = model_calls, error = %e, "Model reply malformed");
                            let obs = self.clip(prompt::malformed_observation(&e));
                            transcript.append(Message::observation(obs));
                            LoopState::AwaitingModel
                        }
                    }
                }

                LoopState::HaveAction { tool, input } => {
                    tool_calls += 1;
                    let obs = match self.dispatch(&tool, &input).await {
                        Ok(output) => {
                            let output = self.clip(output);
                            last_tool_output = Some(output.clone());
                            output
                        }
                        Err(e) => self.clip(match &e {
                            ToolError::NotFound(name) => {
                                prompt::unknown_tool_observation(name, &self.tools.names())
                            }
                            other => prompt::tool_failure_observation(other),
                        }),
                    };
                    transcript.append(Message::observation(obs));
                    LoopState::AwaitingModel
                }

                LoopState::HaveFinal(answer) => {
                    info!(model_calls, tool_calls, "ReAct loop completed");
                    return Ok(self.finish(transcript, answer, true, model_calls, tool_calls));
                }

                LoopState::Exhausted => {
                    warn!(
                        max_steps = self.max_steps,
                        tool_calls,
                        parsed_replies,
                        "ReAct: step budget exhausted"
                    );
                    let answer = if parsed_replies == 0 {
                        prompt::unparseable_answer(self.max_steps)
                    } else {
                        prompt::exhausted_answer(self.max_steps, last_tool_output.as_deref())
                    };
                    return Ok(self.finish(transcript, answer, false, model_calls, tool_calls));
                }
            };
        }
    }

    /// Render the transcript and ask the model for one reply.
    async fn call_model(
        &self,
        transcript: &Transcript,
        step: u32,
    ) -> Result<String, ProviderError> {
        let prompt = transcript.render();
        let start = Instant::now();

        match tokio::time::timeout(self.model_timeout, self.provider.generate(&prompt)).await {
            Ok(Ok(text)) => {
                debug!(
                    step,
                    duration_ms = start.elapsed().as_millis() as u64,
                    chars = text.len(),
                    "Model replied"
                );
                Ok(text)
            }
            Ok(Err(e)) => {
                warn!(step, provider = self.provider.name(), error = %e, "Model call failed");
                Err(e)
            }
            Err(_) => {
                warn!(
                    step,
                    provider = self.provider.name(),
                    timeout_secs = self.model_timeout.as_secs(),
                    "Model call timed out"
                );
                Err(ProviderError::Timeout(format!(
                    "{} did not respond within {}s",
                    self.provider.name(),
                    self.model_timeout.as_secs()
                )))
            }
        }
    }

    /// Run one tool call. Errors, timeouts and panics come back as
    /// `ToolError` so the caller can turn them into observations.
    async fn dispatch(&self, name: &str, input: &str) -> Result<String, ToolError> {
        let Some(tool) = self.tools.get(name) else {
            warn!(tool = %name, "Model requested an unknown tool");
            return Err(ToolError::NotFound(name.to_string()));
        };

        debug!(tool = %name, input = %input, "Invoking tool");
        let start = Instant::now();
        let call = AssertUnwindSafe(tool.invoke(input)).catch_unwind();

        let result = match tokio::time::timeout(self.tool_timeout, call).await {
            Ok(Ok(result)) => result,
            Ok(Err(panic)) => Err(ToolError::ExecutionFailed {
                tool_name: name.to_string(),
                reason: format!("tool panicked: {}", panic_message(panic.as_ref())),
            }),
            Err(_) => Err(ToolError::Timeout {
                tool_name: name.to_string(),
                timeout_secs: self.tool_timeout.as_secs(),
            }),
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(output) => debug!(tool = %name, duration_ms, chars = output.len(), "Tool finished"),
            Err(e) => warn!(tool = %name, duration_ms, error = %e, "Tool failed"),
        }

        result.map(|output| {
            if output.trim().is_empty() {
                "(no output)".to_string()
            } else {
                output
            }
        })
    }

    /// Cap an observation at `max_observation_chars`, on a char boundary.
    fn clip(&self, text: String) -> String {
        match text.char_indices().nth(self.max_observation_chars) {
            Some((cut, _)) => {
                let dropped = text[cut..].chars().count();
                format!("{}... [truncated {dropped} chars]", &text[..cut])
            }
            None => text,
        }
    }

    fn finish(
        &self,
        transcript: Transcript,
        final_answer: String,
        converged: bool,
        model_calls: u32,
        tool_calls: u32,
    ) -> ExecutionResult {
        ExecutionResult {
            final_answer,
            trace: transcript.to_trace(&self.parser),
            converged,
            model_calls,
            tool_calls,
            transcript_id: transcript.id.clone(),
            transcript,
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
