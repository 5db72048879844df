//! Weather Agent Demo
//!
//! The stepped tool-calling loop end to end: the model walks through
//! START/PLAN/ACT/OBSERVE/OUTPUT states, calling the mock weather tool
//! along the way.
//!
//! ```text
//! weather-agent "What's the weather in Dhaka?"
//! ```

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stepwise_core::{AgentBuilder, RunOutcome};
use stepwise_demos::{WeatherTool, provider_from_env};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    let (provider, model) = provider_from_env();

    // Verify the backend is reachable before looping against it
    match provider.health_check().await {
        Ok(true) => {
            tracing::info!("✓ provider reachable");
            if let Ok(models) = provider.list_models().await {
                for model in models {
                    tracing::debug!("  model: {}", model.id);
                }
            }
        }
        Ok(false) | Err(_) => {
            tracing::warn!("⚠ provider not reachable - the agent will fail");
        }
    }

    let agent = AgentBuilder::new()
        .provider(provider)
        .tool(WeatherTool)
        .model(model)
        .temperature(0.0)
        .json_output(true)
        .max_iterations(10)
        .build()?;

    tracing::info!("registered {} tools:", agent.tools().len());
    for name in agent.tools().names() {
        tracing::info!("  • {name}");
    }

    let task = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "What's the weather in Dhaka?".into());

    tracing::info!(%task, "running agent");

    match agent.ask(&task).await? {
        RunOutcome::Answer(answer) => println!("{answer}"),
        RunOutcome::OutOfBudget { iterations } => {
            println!("Sorry, maximum iterations ({iterations}) reached. I could not complete the task.");
        }
    }

    Ok(())
}
