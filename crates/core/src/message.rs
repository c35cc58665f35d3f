//! Message and Transcript domain types.
//!
//! A [`Transcript`] is the model's whole context for one query: the system
//! instruction, any prior conversation, the query itself, and then the
//! alternating model / observation turns produced by the agent loop.
//! It is append-only; nothing ever removes or reorders a message.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::step::ResponseDecoder;
use crate::trace::{self, TraceEntry};

/// Unique identifier for a transcript (one `execute` call).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TranscriptId(pub String);

impl TranscriptId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for TranscriptId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TranscriptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a message in a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions (output grammar, tool names)
    System,
    /// The end user
    User,
    /// Raw text produced by the model
    Model,
    /// Tool output or a synthetic corrective note fed back to the model
    Observation,
}

/// A single message in a transcript. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Who produced this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create a new model message.
    pub fn model(content: impl Into<String>) -> Self {
        Self::new(Role::Model, content)
    }

    /// Create a new observation message.
    pub fn observation(content: impl Into<String>) -> Self {
        Self::new(Role::Observation, content)
    }
}

/// Speaker of a client-side conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// One entry of the caller's multi-query history.
///
/// The core never stores these; they are only replayed as a prefix of a
/// fresh transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
        }
    }
}

impl From<&ConversationTurn> for Message {
    fn from(turn: &ConversationTurn) -> Self {
        match turn.role {
            TurnRole::User => Message::user(&turn.content),
            TurnRole::Assistant => Message::model(&turn.content),
        }
    }
}

/// The ordered message history for exactly one query lifecycle.
#[derive(Debug, Clone, Serialize)]
pub struct Transcript {
    /// Unique transcript ID
    pub id: TranscriptId,

    /// Ordered messages
    messages: Vec<Message>,

    /// Index of the first message appended by the agent loop.
    /// Everything before it is the seed (system, prior turns, query).
    run_start: usize,

    /// When this transcript was created
    pub created_at: DateTime<Utc>,
}

impl Transcript {
    /// Seed a transcript with the system instruction, the caller's prior
    /// conversation, and the new query, in that order.
    pub fn seeded(
        system: impl Into<String>,
        prior: &[ConversationTurn],
        query: impl Into<String>,
    ) -> Self {
        let mut messages = Vec::with_capacity(prior.len() + 2);
        messages.push(Message::system(system));
        messages.extend(prior.iter().map(Message::from));
        messages.push(Message::user(query));

        Self {
            id: TranscriptId::new(),
            run_start: messages.len(),
            messages,
            created_at: Utc::now(),
        }
    }

    /// Append a message to the end of the transcript.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// All messages, seed included.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Only the messages produced by the agent loop.
    pub fn run_messages(&self) -> &[Message] {
        &self.messages[self.run_start..]
    }

    /// The query this transcript was seeded with.
    pub fn query(&self) -> &str {
        &self.messages[self.run_start - 1].content
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of model responses appended so far.
    pub fn model_turns(&self) -> usize {
        self.run_messages()
            .iter()
            .filter(|m| m.role == Role::Model)
            .count()
    }

    /// Render the transcript into the prompt text the model consumes.
    ///
    /// The model is stateless between calls, so the full history is
    /// re-sent every turn.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let query_index = self.run_start - 1;
        let has_prior = query_index > 1;

        for (i, msg) in self.messages.iter().enumerate() {
            if i == 1 && has_prior {
                out.push_str("Previous conversation:\n");
            }

            match (msg.role, i) {
                (Role::System, _) => {
                    out.push_str(msg.content.trim_end());
                    out.push_str("\n\n");
                }
                (Role::User, i) if i == query_index => {
                    if has_prior {
                        out.push('\n');
                    }
                    out.push_str(&format!("Question: {}\n\n", msg.content.trim()));
                }
                (Role::User, _) => out.push_str(&format!("User: {}\n", msg.content.trim())),
                (Role::Model, i) if i < self.run_start => {
                    out.push_str(&format!("Assistant: {}\n", msg.content.trim()))
                }
                (Role::Model, _) => {
                    out.push_str(msg.content.trim());
                    out.push('\n');
                }
                (Role::Observation, _) => {
                    out.push_str(&format!("Observation: {}\n\n", msg.content.trim()))
                }
            }
        }

        out
    }

    /// Project the loop-produced messages into trace entries.
    pub fn to_trace(&self, decoder: &dyn ResponseDecoder) -> Vec<TraceEntry> {
        trace::export(self, decoder)
    }
}
