use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur while talking to the chat endpoint.
#[derive(Error, Debug)]
pub enum LLMError {
    /// Error related to network requests (e.g., connection refused, timeout).
    #[error("HTTP request failed: {0}")]
    Network(reqwest::Error),
    /// Error reported by the endpoint (non-success status, error body).
    #[error("API error: {0}")]
    ApiError(String),
    /// The endpoint answered with a body the client could not decode.
    #[error("Failed to decode response: {0}")]
    Decode(String),
    /// The endpoint answered with a decodable body of an unusable shape
    /// (e.g., an empty `choices` list).
    #[error("Unexpected response shape: {0}")]
    UnexpectedResponse(String),
}

/// Role of a message in the conversation transcript.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System message setting instructions for the model.
    System,
    /// Message from the end-user.
    User,
    /// Message from the model.
    Assistant,
    /// Message carrying the result of one tool execution.
    Tool,
}

/// One message in a conversation with the model.
///
/// Assistant messages may carry structured tool calls instead of (or in
/// addition to) text content; tool messages link back to the assistant call
/// they answer via `tool_call_id`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LLMMessage {
    pub role: MessageRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl LLMMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Assistant message declaring exactly one structured tool call.
    pub fn assistant_tool_call(call: ToolCall) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: None,
            tool_calls: Some(vec![call]),
            tool_call_id: None,
        }
    }

    /// Tool message answering the assistant call with the given id.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Tool,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }
}

/// The function name/arguments pair inside a structured tool call.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ToolCallFunction {
    pub name: String,
    /// Arguments as a JSON string, exactly as the wire format carries them.
    pub arguments: String,
}

/// A structured tool call as emitted by the endpoint or echoed back into the
/// transcript.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: ToolCallFunction,
}

impl ToolCall {
    pub fn function_call(id: impl Into<String>, name: impl Into<String>, arguments: String) -> Self {
        Self {
            id: id.into(),
            tool_type: "function".to_string(),
            function: ToolCallFunction {
                name: name.into(),
                arguments,
            },
        }
    }
}

/// Tool-choice mode sent with a chat request.
///
/// The engine only ever lets the model pick (`auto`) or forbids calls
/// entirely on the closing request (`none`).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    Auto,
    None,
}

/// A tool advertised to the model, in the Chat Completions wire shape.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDefinition,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: FunctionParameters,
}

/// JSON-Schema-like parameter object for one function.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FunctionParameters {
    #[serde(rename = "type")]
    pub param_type: String,
    pub properties: HashMap<String, FunctionParameterProperty>,
    pub required: Vec<String>,
    #[serde(rename = "additionalProperties")]
    pub additional_properties: bool,
}

/// One property inside a function's parameter object.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FunctionParameterProperty {
    /// JSON type tag; absent when the schema leaves the type unspecified.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub param_type: Option<String>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
}

/// One choice from a chat completion response.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LLMResponseChoice {
    #[serde(default)]
    pub index: u32,
    pub message: LLMMessage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Token usage as reported by the endpoint.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LLMUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: Option<u32>,
    #[serde(default)]
    pub total_tokens: u32,
}

/// Chat completion response envelope.
///
/// Only `choices` is load-bearing; local servers are inconsistent about the
/// rest of the envelope, so everything else is optional.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LLMResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    pub choices: Vec<LLMResponseChoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<LLMUsage>,
}

impl LLMResponse {
    /// The first choice's message, or an error when the endpoint returned
    /// none. The orchestrator only ever consumes the first choice.
    pub fn first_choice_message(&self) -> Result<&LLMMessage, LLMError> {
        self.choices
            .first()
            .map(|choice| &choice.message)
            .ok_or_else(|| {
                LLMError::UnexpectedResponse("chat response contained no choices".to_string())
            })
    }
}

/// Interface to an OpenAI-compatible chat endpoint.
///
/// The engine depends only on this trait; tests substitute scripted
/// implementations.
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Sends one chat request.
    ///
    /// `tools` is always serialized, including when empty: the closing
    /// request of a round advertises an empty tool list together with
    /// `tool_choice = none`.
    async fn chat(
        &self,
        messages: &[LLMMessage],
        tools: &[ToolDefinition],
        tool_choice: ToolChoice,
    ) -> Result<LLMResponse, LLMError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn message_constructors_set_roles_and_links() {
        let system = LLMMessage::system("be helpful");
        assert_eq!(system.role, MessageRole::System);
        assert_eq!(system.content.as_deref(), Some("be helpful"));

        let call = ToolCall::function_call("call-1", "get_weather", "{}".to_string());
        let assistant = LLMMessage::assistant_tool_call(call);
        assert_eq!(assistant.role, MessageRole::Assistant);
        assert!(assistant.content.is_none());
        assert_eq!(assistant.tool_calls.as_ref().map(|calls| calls.len()), Some(1));

        let tool = LLMMessage::tool_result("call-1", "{\"status\":\"ok\"}");
        assert_eq!(tool.role, MessageRole::Tool);
        assert_eq!(tool.tool_call_id.as_deref(), Some("call-1"));
    }

    #[test]
    fn assistant_tool_call_message_serializes_without_content() {
        let call = ToolCall::function_call("id-1", "get_news", "{\"topic\":\"ai\"}".to_string());
        let message = LLMMessage::assistant_tool_call(call);
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(
            value,
            json!({
                "role": "assistant",
                "tool_calls": [{
                    "id": "id-1",
                    "type": "function",
                    "function": {"name": "get_news", "arguments": "{\"topic\":\"ai\"}"}
                }]
            })
        );
    }

    #[test]
    fn tool_choice_serializes_to_plain_strings() {
        assert_eq!(serde_json::to_value(ToolChoice::Auto).unwrap(), json!("auto"));
        assert_eq!(serde_json::to_value(ToolChoice::None).unwrap(), json!("none"));
    }

    #[test]
    fn lenient_response_envelope_deserializes() {
        let response: LLMResponse = serde_json::from_value(json!({
            "choices": [{
                "message": {"role": "assistant", "content": "hello"}
            }]
        }))
        .unwrap();
        assert_eq!(
            response.first_choice_message().unwrap().content.as_deref(),
            Some("hello")
        );
    }

    #[test]
    fn empty_choices_is_an_unexpected_response() {
        let response: LLMResponse =
            serde_json::from_value(json!({"choices": []})).unwrap();
        assert!(matches!(
            response.first_choice_message(),
            Err(LLMError::UnexpectedResponse(_))
        ));
    }
}
