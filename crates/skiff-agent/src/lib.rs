//! # skiff-agent
//!
//! The agent control loop and its collaborators.
//!
//! - [`InferenceBackend`]: the model boundary, with [`AnthropicBackend`] for
//!   real use and [`ScriptedBackend`] for tests
//! - [`ContextManager`]: trims the oldest turns when the token budget is
//!   exceeded
//! - [`state`]: the pure per-turn state machine
//! - [`AgentLoop`]: drives one user turn through model calls and tool
//!   execution, bounded by an iteration cap

mod agent_loop;
pub mod auth;
mod backend;
mod client;
mod context;
mod prompt;
pub mod state;
mod types;

pub use agent_loop::{AgentLoop, LoopConfig, LoopEvent, LoopObserver, TurnOutcome};
pub use backend::{Completion, InferenceBackend, ScriptedBackend};
pub use client::AnthropicBackend;
pub use context::ContextManager;
pub use prompt::{load_system_prompt, DEFAULT_SYSTEM_PROMPT};
