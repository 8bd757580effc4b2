//! LLM backends and the provider fallback chain for Majordome.
//!
//! Every backend implements `majordome_core::Provider`. The [`ProviderChain`]
//! tries them in configuration order until one returns a usable reply.

pub mod builder;
pub mod chain;
pub mod ollama;
pub mod openai_compat;

pub use builder::{build_chain, build_provider};
pub use chain::{ProviderChain, ProviderResult};
pub use ollama::OllamaProvider;
pub use openai_compat::OpenAiCompatProvider;
