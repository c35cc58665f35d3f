//! Parsed model steps and the decoder seam.
//!
//! The model's free text is the control signal of the loop. A decoder turns
//! one raw response into exactly one [`ParsedStep`], or reports it malformed.

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// One decoded model turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParsedStep {
    /// The model asks for a tool to be run.
    Action {
        tool: String,
        input: String,
        rationale: String,
    },
    /// The model is done.
    Final { answer: String, rationale: String },
}

impl ParsedStep {
    pub fn rationale(&self) -> &str {
        match self {
            ParsedStep::Action { rationale, .. } | ParsedStep::Final { rationale, .. } => {
                rationale
            }
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, ParsedStep::Final { .. })
    }
}

/// What to do when one response carries both an `Action` and a
/// `Final Answer`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Run the action and ignore the premature answer.
    #[default]
    PreferAction,
    /// Stop with the answer and ignore the action.
    PreferFinal,
}

/// Decodes raw model text into a step.
///
/// Implementations must be pure: the trace exporter re-decodes model
/// messages and relies on getting the same answer every time.
pub trait ResponseDecoder: Send + Sync {
    fn decode(&self, raw: &str) -> Result<ParsedStep, ParseError>;
}
