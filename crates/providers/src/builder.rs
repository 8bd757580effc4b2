//! Build the provider chain from configuration.

use std::sync::Arc;
use std::time::Duration;

use majordome_config::{AppConfig, BackendKind, ProviderConfig};
use majordome_core::event::EventBus;
use majordome_core::provider::Provider;
use tracing::debug;

use crate::chain::ProviderChain;
use crate::ollama::OllamaProvider;
use crate::openai_compat::OpenAiCompatProvider;

/// Instantiate the backend described by one `[[providers]]` entry.
pub fn build_provider(entry: &ProviderConfig) -> Arc<dyn Provider> {
    let base_url = entry.resolved_base_url();
    match entry.kind {
        BackendKind::OpenaiCompat => Arc::new(OpenAiCompatProvider::new(
            &entry.name,
            base_url,
            entry.api_key.clone().unwrap_or_default(),
        )),
        BackendKind::Ollama => Arc::new(OllamaProvider::new(&entry.name, base_url)),
    }
}

/// Build the chain in configuration order.
pub fn build_chain(config: &AppConfig, event_bus: Option<Arc<EventBus>>) -> ProviderChain {
    let mut chain = ProviderChain::new()
        .with_default_system_prompt(&config.agent.system_prompt)
        .with_temperature(config.agent.temperature)
        .with_max_tokens(config.agent.max_tokens);

    for entry in &config.providers {
        debug!(
            provider = %entry.name,
            model = %entry.model,
            calling = ?entry.calling,
            "Adding provider to chain"
        );
        chain = chain.add(
            build_provider(entry),
            &entry.model,
            entry.calling,
            Duration::from_secs(entry.timeout_secs),
        );
    }

    if let Some(bus) = event_bus {
        chain = chain.with_event_bus(bus);
    }

    chain
}
