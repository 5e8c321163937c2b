//! # Evaluation Module
//!
//! Replays a fixed case set against the engine, judges each case by the
//! strict-success rule (expected tool name AND all case-required argument
//! keys AND schema validation), and persists a comparable JSON artifact.

pub mod metrics;

pub use metrics::{summarize_evaluation_results, EvaluationSummary};

use crate::config::RuntimeConfig;
use crate::engine::{EngineOutcome, ToolCallEngine};
use crate::utils::io::{read_json_file, timestamp_suffix, write_json_file};
use crate::validation::validate_expected_tool;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// A single evaluation scenario and its expected tool-calling behavior.
#[derive(Deserialize, Debug, Clone)]
pub struct EvaluationCase {
    pub case_identifier: String,
    pub user_prompt: String,
    pub expected_tool_name: String,
    pub required_argument_keys: Vec<String>,
    #[allow(dead_code)] // Carried in case files for authoring context.
    #[serde(default)]
    pub optional_argument_keys: Vec<String>,
    #[allow(dead_code)] // Reserved for no-call cases; does not alter the run.
    #[serde(default = "default_should_call_tool")]
    pub should_call_tool: bool,
    #[allow(dead_code)]
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_should_call_tool() -> bool {
    true
}

/// Evaluation outcome for one case.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct EvaluationCaseResult {
    pub case_identifier: String,
    pub is_success: bool,
    pub failure_reason: Option<String>,
    pub source: String,
    pub expected_tool_name: String,
    pub actual_tool_name: Option<String>,
}

#[derive(Serialize)]
struct EvaluationArtifact<'a> {
    summary: &'a EvaluationSummary,
    results: &'a [EvaluationCaseResult],
}

/// Runs the fixed evaluation case set and computes the strict success rate.
pub struct EvaluationRunner {
    config: RuntimeConfig,
    engine: ToolCallEngine,
}

impl EvaluationRunner {
    pub fn new(config: RuntimeConfig, engine: ToolCallEngine) -> Self {
        Self { config, engine }
    }

    /// Replays the case file (optionally truncated to `max_cases`), applies
    /// the consecutive-request-error circuit breaker, writes the result
    /// artifact, and returns summary, per-case results, and the artifact
    /// path.
    pub async fn run_evaluation(
        &self,
        case_file_path: Option<&Path>,
        max_cases: Option<usize>,
    ) -> Result<(EvaluationSummary, Vec<EvaluationCaseResult>, PathBuf)> {
        let default_case_path = PathBuf::from(&self.config.evaluation_case_file_path);
        let case_path = case_file_path.unwrap_or(default_case_path.as_path());
        let mut evaluation_cases = self.load_cases(case_path)?;
        if let Some(limit) = max_cases {
            evaluation_cases.truncate(limit);
        }
        info!(case_count = evaluation_cases.len(), "Starting evaluation run");

        let mut case_results: Vec<EvaluationCaseResult> = Vec::new();
        let mut consecutive_request_errors: u32 = 0;
        for evaluation_case in &evaluation_cases {
            let case_result = self.run_single_case(evaluation_case).await;
            let is_request_error =
                case_result.failure_reason.as_deref() == Some("request_error");
            case_results.push(case_result);

            if is_request_error {
                consecutive_request_errors += 1;
            } else {
                consecutive_request_errors = 0;
            }
            if consecutive_request_errors >= self.config.max_consecutive_request_errors {
                warn!(
                    consecutive_request_errors,
                    "Stopping evaluation early: repeated request-level instability"
                );
                break;
            }

            if self.config.delay_between_evaluation_cases_seconds > 0.0 {
                tokio::time::sleep(Duration::from_secs_f64(
                    self.config.delay_between_evaluation_cases_seconds,
                ))
                .await;
            }
        }

        let summary = summarize_evaluation_results(&case_results);
        let artifact_path = self.write_result_file(&summary, &case_results)?;
        Ok((summary, case_results, artifact_path))
    }

    fn load_cases(&self, case_file_path: &Path) -> Result<Vec<EvaluationCase>> {
        read_json_file(case_file_path)
            .with_context(|| format!("Failed to load evaluation cases from {}", case_file_path.display()))
    }

    async fn run_single_case(&self, evaluation_case: &EvaluationCase) -> EvaluationCaseResult {
        let outcome = match self
            .engine
            .run_tool_call_round(&evaluation_case.user_prompt)
            .await
        {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(
                    case_identifier = %evaluation_case.case_identifier,
                    error = %error,
                    "Chat request failed during evaluation case"
                );
                return EvaluationCaseResult {
                    case_identifier: evaluation_case.case_identifier.clone(),
                    is_success: false,
                    failure_reason: Some("request_error".to_string()),
                    source: "exception".to_string(),
                    expected_tool_name: evaluation_case.expected_tool_name.clone(),
                    actual_tool_name: None,
                };
            }
        };

        let (tool_name, arguments) = match &outcome {
            EngineOutcome::Success {
                tool_name,
                arguments,
                ..
            } => (tool_name.clone(), arguments),
            _ => {
                return EvaluationCaseResult {
                    case_identifier: evaluation_case.case_identifier.clone(),
                    is_success: false,
                    failure_reason: outcome.failure_reason().map(|reason| reason.to_string()),
                    source: outcome.source_label().to_string(),
                    expected_tool_name: evaluation_case.expected_tool_name.clone(),
                    actual_tool_name: outcome.tool_name().map(|name| name.to_string()),
                };
            }
        };

        let expected_verdict =
            validate_expected_tool(&evaluation_case.expected_tool_name, &tool_name);
        if !expected_verdict.is_success {
            return EvaluationCaseResult {
                case_identifier: evaluation_case.case_identifier.clone(),
                is_success: false,
                failure_reason: expected_verdict
                    .failure_reason
                    .map(|reason| reason.as_str().to_string()),
                source: outcome.source_label().to_string(),
                expected_tool_name: evaluation_case.expected_tool_name.clone(),
                actual_tool_name: expected_verdict.matched_tool_name,
            };
        }

        // Case files may require keys beyond the schema minimum; strict
        // success demands every one of them.
        let has_missing_case_key = evaluation_case
            .required_argument_keys
            .iter()
            .any(|required_key| !arguments.contains_key(required_key));
        if has_missing_case_key {
            return EvaluationCaseResult {
                case_identifier: evaluation_case.case_identifier.clone(),
                is_success: false,
                failure_reason: Some("missing_required".to_string()),
                source: outcome.source_label().to_string(),
                expected_tool_name: evaluation_case.expected_tool_name.clone(),
                actual_tool_name: Some(tool_name),
            };
        }

        EvaluationCaseResult {
            case_identifier: evaluation_case.case_identifier.clone(),
            is_success: true,
            failure_reason: None,
            source: outcome.source_label().to_string(),
            expected_tool_name: evaluation_case.expected_tool_name.clone(),
            actual_tool_name: Some(tool_name),
        }
    }

    fn write_result_file(
        &self,
        summary: &EvaluationSummary,
        results: &[EvaluationCaseResult],
    ) -> Result<PathBuf> {
        let artifact_path = PathBuf::from(&self.config.evaluation_result_directory_path)
            .join(format!("evaluation_{}.json", timestamp_suffix()));
        write_json_file(&artifact_path, &EvaluationArtifact { summary, results })?;
        info!(artifact_path = %artifact_path.display(), "Wrote evaluation artifact");
        Ok(artifact_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::builtin_catalog;
    use crate::llm::base_client::{
        LLMClient, LLMError, LLMMessage, LLMResponse, LLMResponseChoice, MessageRole, ToolCall,
        ToolChoice, ToolDefinition,
    };
    use crate::tools::ToolRegistry;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    struct ScriptedChatClient {
        responses: Mutex<VecDeque<LLMResponse>>,
    }

    impl ScriptedChatClient {
        fn new(responses: Vec<LLMResponse>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
            }
        }
    }

    #[async_trait]
    impl LLMClient for ScriptedChatClient {
        async fn chat(
            &self,
            _messages: &[LLMMessage],
            _tools: &[ToolDefinition],
            _tool_choice: ToolChoice,
        ) -> Result<LLMResponse, LLMError> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| LLMError::ApiError("scripted responses exhausted".to_string()))
        }
    }

    fn tool_call_response(name: &str, arguments_json: &str) -> LLMResponse {
        LLMResponse {
            id: None,
            model: None,
            choices: vec![LLMResponseChoice {
                index: 0,
                message: LLMMessage {
                    role: MessageRole::Assistant,
                    content: None,
                    tool_calls: Some(vec![ToolCall::function_call(
                        "call_1",
                        name,
                        arguments_json.to_string(),
                    )]),
                    tool_call_id: None,
                },
                finish_reason: None,
            }],
            usage: None,
        }
    }

    fn prose_response(text: &str) -> LLMResponse {
        LLMResponse {
            id: None,
            model: None,
            choices: vec![LLMResponseChoice {
                index: 0,
                message: LLMMessage {
                    role: MessageRole::Assistant,
                    content: Some(text.to_string()),
                    tool_calls: None,
                    tool_call_id: None,
                },
                finish_reason: None,
            }],
            usage: None,
        }
    }

    fn test_runner(
        responses: Vec<LLMResponse>,
        result_directory: &Path,
    ) -> EvaluationRunner {
        let config = RuntimeConfig {
            delay_between_evaluation_cases_seconds: 0.0,
            evaluation_result_directory_path: result_directory.to_string_lossy().into_owned(),
            ..RuntimeConfig::default()
        };
        let engine = ToolCallEngine::new(
            &config,
            Arc::new(ScriptedChatClient::new(responses)),
            Arc::new(builtin_catalog()),
            Arc::new(ToolRegistry::with_builtin_tools()),
        );
        EvaluationRunner::new(config, engine)
    }

    fn write_case_file(directory: &Path, cases: serde_json::Value) -> PathBuf {
        let case_path = directory.join("cases.json");
        std::fs::write(&case_path, serde_json::to_string_pretty(&cases).unwrap()).unwrap();
        case_path
    }

    #[tokio::test]
    async fn strict_success_on_matching_tool_and_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let case_path = write_case_file(
            dir.path(),
            json!([{
                "case_identifier": "weather_tomorrow",
                "user_prompt": "What is the weather in Tokyo tomorrow?",
                "expected_tool_name": "get_weather",
                "required_argument_keys": ["location", "date"]
            }]),
        );
        let runner = test_runner(
            vec![
                tool_call_response("get_weather", r#"{"location":"Tokyo","date":"tomorrow"}"#),
                prose_response("Sunny tomorrow."),
            ],
            dir.path(),
        );

        let (summary, results, artifact_path) =
            runner.run_evaluation(Some(case_path.as_path()), None).await.unwrap();
        assert_eq!(summary.total_cases, 1);
        assert_eq!(summary.successful_cases, 1);
        assert_eq!(summary.strict_success_rate, 1.0);
        assert!(results[0].is_success);
        assert_eq!(results[0].source, "message_tool_calls");

        // The artifact round-trips.
        let artifact: serde_json::Value =
            crate::utils::io::read_json_file(&artifact_path).unwrap();
        assert_eq!(artifact["summary"]["total_cases"], 1);
        assert_eq!(artifact["results"][0]["case_identifier"], "weather_tomorrow");
    }

    #[tokio::test]
    async fn wrong_tool_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let case_path = write_case_file(
            dir.path(),
            json!([{
                "case_identifier": "wants_weather",
                "user_prompt": "Weather please",
                "expected_tool_name": "get_weather",
                "required_argument_keys": ["location", "date"]
            }]),
        );
        let runner = test_runner(
            vec![
                tool_call_response("get_news", r#"{"topic":"ai","timeframe":"today"}"#),
                prose_response("Here are the news."),
            ],
            dir.path(),
        );

        let (summary, results, _) =
            runner.run_evaluation(Some(case_path.as_path()), None).await.unwrap();
        assert_eq!(summary.successful_cases, 0);
        assert_eq!(results[0].failure_reason.as_deref(), Some("wrong_tool_selected"));
        assert_eq!(results[0].actual_tool_name.as_deref(), Some("get_news"));
    }

    #[tokio::test]
    async fn case_required_keys_beyond_schema_minimum_are_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let case_path = write_case_file(
            dir.path(),
            json!([{
                "case_identifier": "todo_filter",
                "user_prompt": "Show open tasks about milk",
                "expected_tool_name": "read_todo_tasks",
                "required_argument_keys": ["status", "filter_text"]
            }]),
        );
        // Schema-valid call, but the case also demands filter_text.
        let runner = test_runner(
            vec![
                tool_call_response("read_todo_tasks", r#"{"status":"open"}"#),
                prose_response("Open tasks listed."),
            ],
            dir.path(),
        );

        let (_, results, _) = runner.run_evaluation(Some(case_path.as_path()), None).await.unwrap();
        assert!(!results[0].is_success);
        assert_eq!(results[0].failure_reason.as_deref(), Some("missing_required"));
    }

    #[tokio::test]
    async fn consecutive_request_errors_trip_the_circuit_breaker() {
        let dir = tempfile::tempdir().unwrap();
        let case_path = write_case_file(
            dir.path(),
            json!([
                {
                    "case_identifier": "case_1",
                    "user_prompt": "p1",
                    "expected_tool_name": "get_weather",
                    "required_argument_keys": ["location"]
                },
                {
                    "case_identifier": "case_2",
                    "user_prompt": "p2",
                    "expected_tool_name": "get_weather",
                    "required_argument_keys": ["location"]
                },
                {
                    "case_identifier": "case_3",
                    "user_prompt": "p3",
                    "expected_tool_name": "get_weather",
                    "required_argument_keys": ["location"]
                }
            ]),
        );
        // An empty script makes every chat call fail.
        let runner = test_runner(vec![], dir.path());

        let (summary, results, _) =
            runner.run_evaluation(Some(case_path.as_path()), None).await.unwrap();
        // Default breaker threshold is 2: the third case never runs.
        assert_eq!(results.len(), 2);
        assert!(results
            .iter()
            .all(|result| result.failure_reason.as_deref() == Some("request_error")));
        assert_eq!(summary.failure_counts_by_reason["request_error"], 2);
    }

    #[tokio::test]
    async fn max_cases_truncates_the_case_list() {
        let dir = tempfile::tempdir().unwrap();
        let case_path = write_case_file(
            dir.path(),
            json!([
                {
                    "case_identifier": "case_1",
                    "user_prompt": "p1",
                    "expected_tool_name": "get_weather",
                    "required_argument_keys": ["location", "date"]
                },
                {
                    "case_identifier": "case_2",
                    "user_prompt": "p2",
                    "expected_tool_name": "get_weather",
                    "required_argument_keys": ["location", "date"]
                }
            ]),
        );
        let runner = test_runner(
            vec![
                tool_call_response("get_weather", r#"{"location":"Tokyo","date":"today"}"#),
                prose_response("Sunny."),
            ],
            dir.path(),
        );

        let (summary, results, _) =
            runner.run_evaluation(Some(case_path.as_path()), Some(1)).await.unwrap();
        assert_eq!(summary.total_cases, 1);
        assert_eq!(results.len(), 1);
        assert!(results[0].is_success);
    }
}
