//! Trace export: the externally visible record of a run.
//!
//! A pure projection of the loop-produced part of a [`Transcript`]: one
//! entry per message, in order, indexed from 1. Model messages are
//! classified by re-decoding them, so exporting the same transcript twice
//! yields identical traces.

use serde::{Deserialize, Serialize};

use crate::message::{Role, Transcript};
use crate::step::{ParsedStep, ResponseDecoder};

/// The kind of trace entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceKind {
    /// Model text that did not decode into a step.
    Thought,
    Action,
    Observation,
    FinalAnswer,
}

/// Entry payload: plain text, or the decoded step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TraceContent {
    Action {
        thought: String,
        tool: String,
        input: String,
    },
    Final {
        thought: String,
        answer: String,
    },
    Text(String),
}

/// A single step record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub index: usize,
    pub kind: TraceKind,
    pub content: TraceContent,
}

impl std::fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Step {}: ", self.index)?;
        match &self.content {
            TraceContent::Action {
                thought,
                tool,
                input,
            } => {
                if !thought.is_empty() {
                    write!(f, "Thought: {thought} | ")?;
                }
                write!(f, "Action: {tool}({input})")
            }
            TraceContent::Final { thought, answer } => {
                if !thought.is_empty() {
                    write!(f, "Thought: {thought} | ")?;
                }
                write!(f, "Final Answer: {answer}")
            }
            TraceContent::Text(text) => match self.kind {
                TraceKind::Observation => write!(f, "Observation: {text}"),
                _ => write!(f, "Thought: {text}"),
            },
        }
    }
}

/// Walk the transcript once and build the trace.
pub fn export(transcript: &Transcript, decoder: &dyn ResponseDecoder) -> Vec<TraceEntry> {
    transcript
        .run_messages()
        .iter()
        .filter(|m| matches!(m.role, Role::Model | Role::Observation))
        .enumerate()
        .map(|(i, msg)| {
            let (kind, content) = match msg.role {
                Role::Observation => (TraceKind::Observation, TraceContent::Text(msg.content.clone())),
                _ => match decoder.decode(&msg.content) {
                    Ok(ParsedStep::Action {
                        tool,
                        input,
                        rationale,
                    }) => (
                        TraceKind::Action,
                        TraceContent::Action {
                            thought: rationale,
                            tool,
                            input,
                        },
                    ),
                    Ok(ParsedStep::Final { answer, rationale }) => (
                        TraceKind::FinalAnswer,
                        TraceContent::Final {
                            thought: rationale,
                            answer,
                        },
                    ),
                    Err(_) => (TraceKind::Thought, TraceContent::Text(msg.content.clone())),
                },
            };

            TraceEntry {
                index: i + 1,
                kind,
                content,
            }
        })
        .collect()
}
