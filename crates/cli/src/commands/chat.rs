//! `majordome chat` — Interactive session.
//!
//! Every line starts a fresh run; nothing is carried between requests.

use std::io::Write;
use std::sync::Arc;

use majordome_agent::RunOptions;
use majordome_config::AppConfig;
use majordome_core::event::EventBus;
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run(
    config: &AppConfig,
    provider: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let event_bus = Arc::new(EventBus::default());
    let agent = super::build_agent(config, Arc::clone(&event_bus));
    let progress = super::spawn_progress(&event_bus);

    println!("🎩 Majordome — {} tools available", agent.tools().len());
    println!("   Type 'exit' or 'quit' to leave.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("you> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input, "exit" | "quit") {
            break;
        }

        let options = RunOptions {
            provider_override: provider.clone(),
            ..RunOptions::default()
        };
        match agent.run(input, options).await {
            Ok(outcome) => {
                if let Err(e) = super::report(&outcome) {
                    eprintln!("⚠️  {e}");
                }
            }
            Err(e) => eprintln!("⚠️  {e}"),
        }
        println!();
    }

    drop(agent);
    drop(event_bus);
    let _ = progress.await;

    println!("👋 Goodbye!");
    Ok(())
}
