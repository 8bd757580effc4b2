//! Subcommand implementations.

pub mod ask;
pub mod chat;
pub mod config_cmd;
pub mod providers;
pub mod tools;

use std::sync::Arc;

use majordome_agent::{AgentLoop, RunOutcome, RunStatus};
use majordome_config::AppConfig;
use majordome_core::event::{DomainEvent, EventBus};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Wire the chain, the built-in tools and the loop from configuration.
pub fn build_agent(config: &AppConfig, event_bus: Arc<EventBus>) -> AgentLoop {
    let chain = majordome_providers::build_chain(config, Some(Arc::clone(&event_bus)));
    let tools = majordome_tools::registry_from_config(&config.tools);

    AgentLoop::from_config(&config.agent, Arc::new(chain), Arc::new(tools))
        .with_event_bus(event_bus)
}

/// Echo tool activity on stderr until every publisher is dropped.
pub fn spawn_progress(event_bus: &EventBus) -> JoinHandle<()> {
    let mut rx = event_bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let DomainEvent::ToolExecuted {
                        tool_name,
                        success,
                        duration_ms,
                        ..
                    } = event.as_ref()
                    {
                        let mark = if *success { "✓" } else { "✗" };
                        eprintln!("   {mark} {tool_name} ({duration_ms} ms)");
                    }
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    })
}

/// Render a finished run: the answer on stdout, or an error.
pub fn report(outcome: &RunOutcome) -> Result<(), String> {
    match &outcome.status {
        RunStatus::Answered { answer } => {
            println!("{answer}");
            Ok(())
        }
        RunStatus::Finished { summary } => {
            println!("✅ {summary}");
            Ok(())
        }
        RunStatus::Failed { .. } | RunStatus::MaxIterationsExceeded { .. } => Err(outcome
            .error()
            .unwrap_or_else(|| outcome.status.label().to_string())),
    }
}
