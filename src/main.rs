// SPDX-License-Identifier: MIT

use clap::{Parser, Subcommand, ValueEnum};
use dialoguer::Select;
use dotenv::dotenv;
use lattice_rs::adk::model::provider::{Provider, ProviderConfig};
use lattice_rs::adk::model::ChatModel;
use lattice_rs::lattice::patterns::Example;
use lattice_rs::lattice::tools::{arithmetic, TavilySearchTool};
use lattice_rs::lattice::workflow::mermaid::write_mermaid;
use lattice_rs::lattice::workflow::registry::ToolRegistry;
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one example workflow
    Run {
        /// Example to run; asked interactively when omitted
        #[arg(short, long, value_enum)]
        example: Option<Example>,

        /// LLM provider; falls back to LLM_PROVIDER, then asks
        #[arg(short, long, value_enum)]
        provider: Option<Provider>,

        /// Also write the Mermaid diagram of the workflow to this file
        #[arg(short, long)]
        draw: Option<PathBuf>,
    },
    /// List the available examples
    List,
    /// Print the Mermaid diagram of an example without running it
    Graph {
        #[arg(short, long, value_enum)]
        example: Example,

        #[arg(short, long, value_enum)]
        provider: Option<Provider>,
    },
}

fn select_example() -> Result<Example, Box<dyn Error + Send + Sync>> {
    let labels: Vec<&str> = Example::ALL.iter().map(|e| e.label()).collect();
    let selection = Select::new()
        .with_prompt("Choose the example to run")
        .items(&labels)
        .default(0)
        .interact()?;
    Ok(Example::ALL[selection])
}

fn select_provider(interactive: bool) -> Result<Provider, Box<dyn Error + Send + Sync>> {
    if let Some(provider) = Provider::from_env()? {
        return Ok(provider);
    }
    if !interactive {
        return Ok(Provider::Ollama);
    }
    let names: Vec<String> = Provider::ALL.iter().map(|p| p.to_string()).collect();
    let selection = Select::new()
        .with_prompt("Choose the LLM provider")
        .items(&names)
        .default(0)
        .interact()?;
    Ok(Provider::ALL[selection])
}

fn chat_model(provider: Provider) -> Result<ChatModel, Box<dyn Error + Send + Sync>> {
    let config = ProviderConfig::from_env(provider)?;
    log::info!(
        "Using provider: {} with model: {} (temperature {})",
        config.provider,
        config.model_name,
        config.temperature
    );
    Ok(config.chat_model()?)
}

async fn tool_registry() -> ToolRegistry {
    let registry = ToolRegistry::new();
    registry.register_all(arithmetic::create_tools()).await;

    match TavilySearchTool::new() {
        Ok(search_tool) => {
            log::info!("Registered tool: tavily_search_results_json");
            registry.register(Arc::new(search_tool)).await;
        }
        Err(e) => log::warn!("Failed to load search tool: {}", e),
    }
    registry
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    match args.command {
        Commands::Run {
            example,
            provider,
            draw,
        } => {
            let provider = match provider {
                Some(provider) => provider,
                None => select_provider(true)?,
            };
            let chat = chat_model(provider)?;
            let example = match example {
                Some(example) => example,
                None => select_example()?,
            };
            let registry = tool_registry().await;

            if let Some(path) = draw {
                match example.graph(&chat, &registry).await? {
                    Some(graph) => write_mermaid(&graph, &path)?,
                    None => log::warn!("'{}' has no workflow graph to draw", example),
                }
            }

            println!("\n==================== {} ====================\n", example);
            let report = example.run(&chat, &registry).await?;
            println!("{}", report);
        }
        Commands::List => {
            for example in Example::ALL {
                let name = example
                    .to_possible_value()
                    .map(|v| v.get_name().to_string())
                    .unwrap_or_default();
                println!("{:<22} {}", name, example);
            }
        }
        Commands::Graph { example, provider } => {
            let provider = match provider {
                Some(provider) => provider,
                None => select_provider(false)?,
            };
            let chat = chat_model(provider)?;
            let registry = tool_registry().await;
            match example.graph(&chat, &registry).await? {
                Some(graph) => println!("{}", graph.draw_mermaid()),
                None => println!("'{}' has no workflow graph", example),
            }
        }
    }

    Ok(())
}
