//! # CLI Module
//!
//! Command-line argument parsing and dispatch. Subcommands cover a one-shot
//! tool-calling round, the strict-success evaluation run, a prompt-variant
//! comparison, configuration display, and tool listing.

use crate::catalog::builtin_catalog;
use crate::config::{ConfigOverrides, RuntimeConfig};
use crate::engine::{EngineOutcome, ToolCallEngine};
use crate::evaluation::EvaluationRunner;
use crate::llm::LmStudioClient;
use crate::prompts;
use crate::tools::ToolRegistry;
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one tool-calling round for a single prompt
    Run(RunArgs),
    /// Replay the evaluation case file and report the strict success rate
    Evaluate(EvaluateArgs),
    /// Compare the default and strict JSON-only system prompts over the case file
    ComparePrompts(ComparePromptsArgs),
    /// Show the effective configuration
    ShowConfig(ShowConfigArgs),
    /// List the builtin tools and their descriptions
    Tools(ToolsArgs),
}

#[derive(Args, Debug, Clone)]
pub struct EndpointArgs {
    #[arg(long, default_value = "agent_config.json")]
    pub config_file: String,
    #[arg(long)]
    pub base_url: Option<String>,
    #[arg(short, long)]
    pub model: Option<String>,
    #[arg(short, long)]
    pub api_key: Option<String>,
    #[arg(long)]
    pub request_timeout_seconds: Option<f64>,
}

impl EndpointArgs {
    fn load_config(&self) -> Result<RuntimeConfig> {
        let overrides = ConfigOverrides {
            base_url: self.base_url.clone(),
            model_name: self.model.clone(),
            api_key: self.api_key.clone(),
            request_timeout_seconds: self.request_timeout_seconds,
        };
        RuntimeConfig::load(&self.config_file, &overrides)
    }
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// The user prompt for this round
    #[arg(index = 1)]
    pub prompt: String,
    #[command(flatten)]
    pub endpoint: EndpointArgs,
}

#[derive(Parser, Debug)]
pub struct EvaluateArgs {
    /// Limit the number of evaluation cases for faster iteration
    #[arg(long)]
    pub max_cases: Option<usize>,
    /// Case file to replay, overriding the configured default
    #[arg(long)]
    pub case_file: Option<PathBuf>,
    #[command(flatten)]
    pub endpoint: EndpointArgs,
}

#[derive(Parser, Debug)]
pub struct ComparePromptsArgs {
    /// Use a smaller subset during rapid improvement loops
    #[arg(long)]
    pub max_cases: Option<usize>,
    #[command(flatten)]
    pub endpoint: EndpointArgs,
}

#[derive(Parser, Debug)]
pub struct ShowConfigArgs {
    #[command(flatten)]
    pub endpoint: EndpointArgs,
}

#[derive(Parser, Debug)]
pub struct ToolsArgs {}

fn build_engine(config: &RuntimeConfig) -> Result<ToolCallEngine> {
    let chat_client = Arc::new(LmStudioClient::from_config(config)?);
    Ok(ToolCallEngine::new(
        config,
        chat_client,
        Arc::new(builtin_catalog()),
        Arc::new(ToolRegistry::with_builtin_tools()),
    ))
}

/// Flat report in the shape the evaluation artifacts use.
fn outcome_report(outcome: &EngineOutcome) -> serde_json::Value {
    json!({
        "is_success": outcome.is_success(),
        "failure_reason": outcome.failure_reason(),
        "source": outcome.source_label(),
        "tool_name": outcome.tool_name(),
        "arguments": outcome.arguments(),
        "assistant_content": outcome.assistant_content(),
        "executed_call_count": outcome.executed_calls().len(),
    })
}

pub async fn handle_run(args: RunArgs) -> Result<()> {
    let config = args.endpoint.load_config()?;
    info!(model = %config.model_name, "Running one tool-calling round");
    let engine = build_engine(&config)?;
    let outcome = engine.run_tool_call_round(&args.prompt).await?;
    println!("{}", serde_json::to_string_pretty(&outcome_report(&outcome))?);
    Ok(())
}

pub async fn handle_evaluate(args: EvaluateArgs) -> Result<()> {
    let config = args.endpoint.load_config()?;
    let engine = build_engine(&config)?;
    let runner = EvaluationRunner::new(config, engine);
    let (summary, _, artifact_path) = runner
        .run_evaluation(args.case_file.as_deref(), args.max_cases)
        .await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    println!("result_file_path={}", artifact_path.display());
    Ok(())
}

pub async fn handle_compare_prompts(args: ComparePromptsArgs) -> Result<()> {
    let config = args.endpoint.load_config()?;

    let mut comparison = serde_json::Map::new();
    let variants = [
        ("baseline_prompt", prompts::tool_call_system_prompt()),
        ("strict_json_prompt", prompts::strict_json_only_system_prompt()),
    ];
    for (variant_label, system_prompt) in variants {
        let engine = build_engine(&config)?.with_system_prompt(system_prompt);
        let runner = EvaluationRunner::new(config.clone(), engine);
        let (summary, _, artifact_path) = runner.run_evaluation(None, args.max_cases).await?;
        comparison.insert(
            variant_label.to_string(),
            json!({
                "summary": summary,
                "result_file_path": artifact_path.display().to_string(),
            }),
        );
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::Value::Object(comparison))?
    );
    Ok(())
}

pub async fn handle_show_config(args: ShowConfigArgs) -> Result<()> {
    let config = args.endpoint.load_config()?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

pub async fn handle_tools(_args: ToolsArgs) -> Result<()> {
    let catalog = builtin_catalog();
    let registry = ToolRegistry::with_builtin_tools();
    for tool_name in registry.tool_names() {
        match catalog.schema_for(&tool_name) {
            Some(schema) => {
                let required_keys = schema.required.join(", ");
                println!(
                    "{}\n  {}\n  required: [{}]",
                    schema.name, schema.description, required_keys
                );
            }
            None => println!("{}\n  (registered, no schema advertised)", tool_name),
        }
    }
    Ok(())
}
