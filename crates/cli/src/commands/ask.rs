//! `majordome ask` — Single request mode.

use std::sync::Arc;

use majordome_agent::RunOptions;
use majordome_config::AppConfig;
use majordome_core::event::EventBus;

pub struct AskArgs {
    pub message: String,
    pub max_iterations: Option<u32>,
    pub provider: Option<String>,
    pub system: Option<String>,
    pub json: bool,
}

pub async fn run(config: &AppConfig, args: AskArgs) -> Result<(), Box<dyn std::error::Error>> {
    let event_bus = Arc::new(EventBus::default());
    let agent = super::build_agent(config, Arc::clone(&event_bus));
    let progress = super::spawn_progress(&event_bus);

    let options = RunOptions {
        max_iterations: args.max_iterations,
        provider_override: args.provider,
        system_prompt_override: args.system,
    };
    let outcome = agent.run(&args.message, options).await;

    // Closing the bus lets the progress task drain and exit
    drop(agent);
    drop(event_bus);
    let _ = progress.await;

    let outcome = outcome?;
    tracing::debug!(
        status = outcome.status.label(),
        iterations = outcome.iterations_used,
        "Run finished"
    );

    if args.json {
        let body = serde_json::json!({
            "outcome": outcome.status,
            "iterations_used": outcome.iterations_used,
            "transcript": outcome.transcript,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        if let Some(error) = outcome.error() {
            return Err(error.into());
        }
        return Ok(());
    }

    super::report(&outcome)?;
    Ok(())
}
