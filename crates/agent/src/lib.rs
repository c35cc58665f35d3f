//! The ReAct agent: parse model replies, dispatch tools, stop on an answer.
//!
//! The loop follows a **Thought → Action → Observation** cycle:
//!
//! 1. **Seed** a fresh transcript with the system prompt, any prior
//!    conversation, and the query
//! 2. **Render** it and send it to the model
//! 3. **Parse** the reply into an Action or a Final Answer
//! 4. **If Action**: run the tool, append its output as an observation,
//!    loop back to step 2
//! 5. **If Final Answer**: return it with the trace
//!
//! The loop is bounded by a step budget; running out yields a degraded
//! answer instead of an error.

pub mod parser;
pub mod prompt;
pub mod react;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use parser::ResponseParser;
pub use react::{ExecutionResult, ReactAgent};
