//! # Majordome Core
//!
//! Domain types, traits, and error definitions for the Majordome assistant.
//! This crate has **zero framework dependencies** — it defines the domain model
//! that the provider, tool, and agent crates implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator of the agent loop is a trait here:
//! - [`Provider`] for LLM backends
//! - [`Tool`] for capabilities the model can request
//!
//! Implementations live in their respective crates, so tests can swap in
//! scripted providers and stub tools without touching the network.

pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result, ToolError};
pub use event::{DomainEvent, EventBus};
pub use message::{Message, MessageToolCall, Role, Transcript};
pub use provider::{
    CallingConvention, Provider, ProviderRequest, ProviderResponse, ToolDefinition, Usage,
};
pub use tool::{InvocationContext, Tool, ToolCall, ToolRegistry};
