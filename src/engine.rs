//! # Round Orchestrator
//!
//! Drives one bounded tool-calling conversation: chat request, multi-dialect
//! parse, schema validation, sequential tool execution, tool-result
//! injection, and a closing tool-free request for the assistant's summary.
//! Parse failures get bounded repair retries; everything else is terminal for
//! the request.

use crate::catalog::ToolCatalog;
use crate::config::RuntimeConfig;
use crate::llm::base_client::{
    LLMClient, LLMError, LLMMessage, ToolCall, ToolChoice, ToolDefinition,
};
use crate::parser::{self, ParsedToolCall, ToolCallSource};
use crate::prompts;
use crate::tools::ToolRegistry;
use crate::validation::{validate_tool_call_against_schema, ValidationFailure};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Result of one `run_tool_call_round` invocation.
///
/// Endpoint failures are not represented here; they propagate as `LLMError`
/// and the evaluation boundary records them as `request_error`.
#[derive(Debug)]
pub enum EngineOutcome {
    /// At least one tool call executed; the last one is authoritative.
    Success {
        source: ToolCallSource,
        tool_name: String,
        arguments: Map<String, Value>,
        /// Closing prose from the final tool-free request.
        assistant_content: Option<String>,
        executed_calls: Vec<ParsedToolCall>,
    },
    /// No dialect matched after all repair attempts.
    ParseFailure { assistant_content: Option<String> },
    /// A parsed call failed schema validation; nothing was appended for it.
    RejectedCall {
        reason: ValidationFailure,
        source: ToolCallSource,
        tool_name: String,
        arguments: Map<String, Value>,
    },
    /// The main loop ran out of rounds without a terminal path.
    MaxToolRoundsExceeded,
}

impl EngineOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, EngineOutcome::Success { .. })
    }

    /// Stable snake_case failure label, or `None` on success.
    pub fn failure_reason(&self) -> Option<&'static str> {
        match self {
            EngineOutcome::Success { .. } => None,
            EngineOutcome::ParseFailure { .. } => Some("parse_failure"),
            EngineOutcome::RejectedCall { reason, .. } => Some(reason.as_str()),
            EngineOutcome::MaxToolRoundsExceeded => Some("max_tool_round_exceeded"),
        }
    }

    /// Source dialect label; `"none"` when no call was parsed.
    pub fn source_label(&self) -> &'static str {
        match self {
            EngineOutcome::Success { source, .. }
            | EngineOutcome::RejectedCall { source, .. } => source.as_str(),
            EngineOutcome::ParseFailure { .. } | EngineOutcome::MaxToolRoundsExceeded => "none",
        }
    }

    pub fn tool_name(&self) -> Option<&str> {
        match self {
            EngineOutcome::Success { tool_name, .. }
            | EngineOutcome::RejectedCall { tool_name, .. } => Some(tool_name),
            _ => None,
        }
    }

    pub fn arguments(&self) -> Option<&Map<String, Value>> {
        match self {
            EngineOutcome::Success { arguments, .. }
            | EngineOutcome::RejectedCall { arguments, .. } => Some(arguments),
            _ => None,
        }
    }

    pub fn assistant_content(&self) -> Option<&str> {
        match self {
            EngineOutcome::Success {
                assistant_content, ..
            }
            | EngineOutcome::ParseFailure { assistant_content } => assistant_content.as_deref(),
            _ => None,
        }
    }

    /// Every call executed during the round, in execution order.
    pub fn executed_calls(&self) -> &[ParsedToolCall] {
        match self {
            EngineOutcome::Success { executed_calls, .. } => executed_calls,
            _ => &[],
        }
    }
}

/// Sequential tool-calling engine.
///
/// Holds no per-call mutable state; each `run_tool_call_round` owns its
/// transcript for the duration of the call, so concurrent invocations are
/// independent.
pub struct ToolCallEngine {
    chat_client: Arc<dyn LLMClient>,
    catalog: Arc<ToolCatalog>,
    registry: Arc<ToolRegistry>,
    /// Wire projection of the catalog, computed once.
    tool_definitions: Vec<ToolDefinition>,
    system_prompt: String,
    max_tool_call_rounds: u32,
    max_repair_attempts: u32,
}

impl ToolCallEngine {
    pub fn new(
        config: &RuntimeConfig,
        chat_client: Arc<dyn LLMClient>,
        catalog: Arc<ToolCatalog>,
        registry: Arc<ToolRegistry>,
    ) -> Self {
        let tool_definitions = catalog.wire_definitions();
        Self {
            chat_client,
            catalog,
            registry,
            tool_definitions,
            system_prompt: prompts::tool_call_system_prompt().to_string(),
            max_tool_call_rounds: config.max_tool_call_rounds_per_request,
            max_repair_attempts: config.max_repair_attempts,
        }
    }

    /// Replaces the system prompt, e.g. for prompt-variant experiments.
    pub fn with_system_prompt(mut self, system_prompt: &str) -> Self {
        self.system_prompt = system_prompt.to_string();
        self
    }

    /// Runs one bounded tool-calling conversation for a single user prompt.
    #[instrument(skip(self, user_prompt))]
    pub async fn run_tool_call_round(
        &self,
        user_prompt: &str,
    ) -> Result<EngineOutcome, LLMError> {
        let mut transcript = vec![
            LLMMessage::system(self.system_prompt.as_str()),
            LLMMessage::user(user_prompt),
        ];
        let mut repair_attempts: u32 = 0;
        let mut executed_calls: Vec<ParsedToolCall> = Vec::new();

        for round_index in 0..self.max_tool_call_rounds {
            let response = self
                .chat_client
                .chat(&transcript, &self.tool_definitions, ToolChoice::Auto)
                .await?;
            let message = response.first_choice_message()?;
            let parsed_calls = parser::parse_from_message(message);

            if parsed_calls.is_empty() {
                if repair_attempts >= self.max_repair_attempts {
                    info!(round_index, "Parse failed after all repair attempts");
                    return Ok(EngineOutcome::ParseFailure {
                        assistant_content: message.content.clone(),
                    });
                }
                debug!(round_index, repair_attempts, "No tool call parsed; asking for repair");
                transcript.push(LLMMessage::user(prompts::repair_prompt_for_parse_failure()));
                repair_attempts += 1;
                continue;
            }

            for (call_index, parsed_call) in parsed_calls.into_iter().enumerate() {
                let verdict = validate_tool_call_against_schema(
                    &parsed_call.tool_name,
                    &parsed_call.arguments,
                    &self.catalog,
                );
                if let Some(reason) = verdict.failure_reason {
                    warn!(
                        tool_name = %parsed_call.tool_name,
                        reason = reason.as_str(),
                        raw_payload = %parsed_call.raw_payload,
                        "Rejecting tool call"
                    );
                    return Ok(EngineOutcome::RejectedCall {
                        reason,
                        source: parsed_call.source,
                        tool_name: parsed_call.tool_name,
                        arguments: parsed_call.arguments,
                    });
                }

                let payload = self
                    .registry
                    .execute(&parsed_call.tool_name, &parsed_call.arguments);
                let tool_call_id =
                    format!("local-tool-call-{}-{}", round_index + 1, call_index + 1);
                let arguments_json = Value::Object(parsed_call.arguments.clone()).to_string();
                transcript.push(LLMMessage::assistant_tool_call(ToolCall::function_call(
                    tool_call_id.clone(),
                    parsed_call.tool_name.clone(),
                    arguments_json,
                )));
                transcript.push(LLMMessage::tool_result(tool_call_id, payload.to_string()));
                executed_calls.push(parsed_call);
            }

            // Close the round without tools so the model summarizes instead
            // of emitting another call.
            let final_response = self
                .chat_client
                .chat(&transcript, &[], ToolChoice::None)
                .await?;
            let assistant_content = final_response.first_choice_message()?.content.clone();

            if let Some(last_call) = executed_calls.last().cloned() {
                return Ok(EngineOutcome::Success {
                    source: last_call.source,
                    tool_name: last_call.tool_name,
                    arguments: last_call.arguments,
                    assistant_content,
                    executed_calls,
                });
            }
        }

        Ok(EngineOutcome::MaxToolRoundsExceeded)
    }
}
