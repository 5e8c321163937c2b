//! # LM Studio Tool Agent
//!
//! Robust tool-calling orchestrator for locally-hosted models behind an
//! OpenAI-compatible Chat Completions endpoint. Small local models emit tool
//! calls in several incompatible dialects; this binary parses all of them,
//! validates against a declared tool catalog, and drives bounded multi-round
//! conversations with repair retries.

mod catalog;
mod cli;
mod config;
mod engine;
mod evaluation;
mod llm;
mod parser;
mod prompts;
mod tools;
mod utils;
mod validation;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Log level comes from RUST_LOG, e.g. RUST_LOG=lmstudio_tool_agent=debug.
    fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli_args = Cli::parse();

    let result = match cli_args.command {
        Commands::Run(args) => cli::handle_run(args).await,
        Commands::Evaluate(args) => cli::handle_evaluate(args).await,
        Commands::ComparePrompts(args) => cli::handle_compare_prompts(args).await,
        Commands::ShowConfig(args) => cli::handle_show_config(args).await,
        Commands::Tools(args) => cli::handle_tools(args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {:?}", e);
        std::process::exit(1);
    }

    Ok(())
}
