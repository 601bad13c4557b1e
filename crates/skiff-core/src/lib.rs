//! # skiff-core
//!
//! Core types for the skiff coding agent.
//!
//! - [`SkiffError`] / [`ToolError`]: the error taxonomy shared by every crate
//! - [`SkiffConfig`]: TOML-backed settings
//! - [`Transcript`] and friends: the conversation data model the agent loop
//!   owns and the inference backend reads

pub mod config;
mod error;
mod types;

pub use config::{
    AgentSettings, ApiSettings, ContextSettings, SandboxSettings, SkiffConfig, CONFIG_FILE_NAME,
};
pub use error::{Result, SkiffError, ToolError};
pub use types::*;
