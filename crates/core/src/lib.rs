//! # reagent core
//!
//! Domain types, traits, and error definitions for the reagent ReAct runtime.
//! This crate has **zero framework dependencies**; it defines the domain model
//! that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! The model and the tools are external collaborators, each defined as a
//! trait here ([`Provider`], [`Tool`]). The text protocol between the loop
//! and the model is decoded behind [`ResponseDecoder`]. Implementations live
//! in their respective crates, which keeps tests free of network access.

pub mod error;
pub mod message;
pub mod provider;
pub mod step;
pub mod tool;
pub mod trace;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ParseError, ProviderError, Result, ToolError};
pub use message::{ConversationTurn, Message, Role, Transcript, TranscriptId, TurnRole};
pub use provider::{Provider, REACT_STOP_SEQUENCE};
pub use step::{ConflictPolicy, ParsedStep, ResponseDecoder};
pub use tool::{FnTool, Tool, ToolRegistry};
pub use trace::{TraceContent, TraceEntry, TraceKind};
