//! Conversation orchestration engine for Palaver.
//!
//! Routes submitted text to one of the specialized pipelines (plain chat,
//! slash-commands, image generation, image editing, live voice, code review),
//! keeps per-workspace/per-channel session histories, and converts every
//! failure into an in-session message.

pub mod command;
pub mod dispatcher;
pub mod error;
pub mod gate;
mod handlers;
pub mod ratio;
pub mod render;
pub mod store;
pub mod types;

pub use command::{ParsedCommand, SlashCommand};
pub use dispatcher::ChatEngine;
pub use error::EngineError;
pub use gate::{DispatchGate, GateMode};
pub use ratio::extract_aspect_ratio;
pub use render::{NullListener, StateListener};
pub use store::SessionStore;
pub use types::{RejectReason, Submission, TurnRecord};
