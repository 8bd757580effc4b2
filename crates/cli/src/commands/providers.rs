//! `majordome providers` — Show the configured fallback chain.

use majordome_config::{AppConfig, BackendKind};
use majordome_core::provider::CallingConvention;

pub async fn run(config: &AppConfig, check: bool) -> Result<(), Box<dyn std::error::Error>> {
    println!("🤖 Provider chain (tried in order)");
    println!();

    for (i, entry) in config.providers.iter().enumerate() {
        let kind = match entry.kind {
            BackendKind::OpenaiCompat => "openai_compat",
            BackendKind::Ollama => "ollama",
        };
        let calling = match entry.calling {
            CallingConvention::Structured => "structured",
            CallingConvention::Text => "text",
        };
        let key = match (&entry.kind, &entry.api_key) {
            (BackendKind::Ollama, _) => "not needed",
            (_, Some(_)) => "set",
            (_, None) => "missing",
        };
        println!("  {}. {} [{kind}, {calling} calls]", i + 1, entry.name);
        println!("     model:   {}", entry.model);
        println!("     url:     {}", entry.resolved_base_url());
        println!("     timeout: {}s, api key: {key}", entry.timeout_secs);
    }

    if check {
        println!();
        println!("🩺 Health check");
        let chain = majordome_providers::build_chain(config, None);
        for (name, healthy) in chain.health_check().await {
            let mark = if healthy { "✅ reachable" } else { "❌ unreachable" };
            println!("  {name:<16} {mark}");
        }
    }

    Ok(())
}
