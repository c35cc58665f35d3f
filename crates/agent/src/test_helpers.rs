//! Shared test helpers for agent loop tests.

use async_trait::async_trait;
use reagent_core::error::ProviderError;
use reagent_core::provider::Provider;
use std::sync::Mutex;
use std::time::Duration;

/// A mock provider that returns a sequence of scripted responses.
///
/// Each call to `generate` returns the next response in the queue and
/// records the prompt it was given.
/// Panics if more calls are made than responses provided.
pub struct ScriptedProvider {
    responses: Vec<String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new<S: Into<String>>(responses: impl IntoIterator<Item = S>) -> Self {
        Self {
            responses: responses.into_iter().map(Into::into).collect(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// A provider that gives the same reply `times` times.
    pub fn repeating(text: &str, times: usize) -> Self {
        Self::new(std::iter::repeat_n(text.to_string(), times))
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let mut prompts = self.prompts.lock().unwrap();
        let call = prompts.len();
        if call >= self.responses.len() {
            panic!(
                "ScriptedProvider: no more responses (call #{}, have {})",
                call,
                self.responses.len()
            );
        }
        prompts.push(prompt.to_string());
        Ok(self.responses[call].clone())
    }
}

/// A provider whose every call fails.
pub struct FailingProvider;

#[async_trait]
impl Provider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    async fn generate(&self, _prompt: &str) -> Result<String, ProviderError> {
        Err(ProviderError::Network("connection refused".into()))
    }
}

/// A provider that sleeps before answering.
pub struct SlowProvider {
    pub delay: Duration,
}

#[async_trait]
impl Provider for SlowProvider {
    fn name(&self) -> &str {
        "slow"
    }

    async fn generate(&self, _prompt: &str) -> Result<String, ProviderError> {
        tokio::time::sleep(self.delay).await;
        Ok("Final Answer: too late".into())
    }
}

/// A stateless provider that answers from the prompt alone: it first asks
/// the `echo` tool about the prompt's `Question:` line, then answers once an
/// observation is present. One instance can serve many transcripts at once.
pub struct QuestionEchoProvider;

#[async_trait]
impl Provider for QuestionEchoProvider {
    fn name(&self) -> &str {
        "question-echo"
    }

    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        // The system prompt describes the format, so only look past the question.
        let Some(start) = prompt.find("\nQuestion: ") else {
            return Err(ProviderError::EmptyResponse("prompt has no question".into()));
        };
        let scratchpad = &prompt[start + 1..];
        let question = scratchpad
            .lines()
            .next()
            .unwrap_or_default()
            .trim_start_matches("Question: ")
            .to_string();

        // Let other runs interleave with this one.
        tokio::task::yield_now().await;

        if scratchpad.contains("\nObservation: ") {
            Ok(format!("Thought: got it\nFinal Answer: answer to {question}"))
        } else {
            Ok(format!("Thought: ask echo\nAction: echo\nAction Input: {question}"))
        }
    }
}
