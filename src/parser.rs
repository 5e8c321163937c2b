//! # Tool-Call Parser
//!
//! Normalizes assistant output into canonical tool-call records. Local models
//! emit tool calls in several incompatible dialects; each dialect gets a
//! handler, handlers run in a fixed priority order, and the first one that
//! yields anything wins. Malformed fragments are dropped, never raised.

use crate::llm::base_client::{LLMMessage, ToolCall};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

static TOOL_CALL_XML_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<tool_call>\s*(\{.*?\})\s*</tool_call>").unwrap());
static LFM_TOOL_CALL_BLOCK_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<\|tool_call_start\|>\s*(.*?)\s*<\|tool_call_end\|>").unwrap());
static GENERIC_JSON_OBJECT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{.*\}").unwrap());
static PYTHON_STYLE_CALL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)([A-Za-z_][A-Za-z0-9_]*)\((.*)\)").unwrap());

/// The surface syntax a tool call was recovered from.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallSource {
    /// Endpoint-native structured `tool_calls` list.
    MessageToolCalls,
    /// `<tool_call>{...}</tool_call>` blocks inside content.
    ContentToolCallXml,
    /// `<|tool_call_start|>` / `<|tool_call_end|>` delimited blocks.
    ContentLfmSpecialTokens,
    /// First bare `{ ... }` span inside content.
    ContentGenericJson,
    /// `identifier(key=literal, ...)` keyword-argument syntax.
    ContentPythonStyle,
}

impl ToolCallSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolCallSource::MessageToolCalls => "message_tool_calls",
            ToolCallSource::ContentToolCallXml => "content_tool_call_xml",
            ToolCallSource::ContentLfmSpecialTokens => "content_lfm_special_tokens",
            ToolCallSource::ContentGenericJson => "content_generic_json",
            ToolCallSource::ContentPythonStyle => "content_python_style",
        }
    }
}

/// One canonical tool-call candidate recovered from a model response.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedToolCall {
    pub tool_name: String,
    /// Always a JSON object; dialects that double-encode arguments as a
    /// string are re-parsed before a candidate is accepted.
    pub arguments: Map<String, Value>,
    pub source: ToolCallSource,
    /// Original payload text, kept for diagnostics.
    pub raw_payload: String,
}

impl ParsedToolCall {
    /// Canonical `{"name": ..., "arguments": {...}}` serialization.
    #[allow(dead_code)] // Diagnostic helper; round-trip checks rely on it.
    pub fn to_canonical_json(&self) -> Value {
        let mut payload = Map::new();
        payload.insert("name".to_string(), Value::String(self.tool_name.clone()));
        payload.insert(
            "arguments".to_string(),
            Value::Object(self.arguments.clone()),
        );
        Value::Object(payload)
    }
}

/// Content dialects in priority order; structured `tool_calls` always go
/// first and are handled separately.
const CONTENT_DIALECTS: [ToolCallSource; 4] = [
    ToolCallSource::ContentToolCallXml,
    ToolCallSource::ContentLfmSpecialTokens,
    ToolCallSource::ContentGenericJson,
    ToolCallSource::ContentPythonStyle,
];

/// Parses an assistant message into an ordered list of tool-call candidates.
///
/// The structured `tool_calls` surface wins when it yields anything; content
/// dialects are tried next, in decreasing order of structural guarantees.
/// Returns an empty list when nothing parses; never fails.
pub fn parse_from_message(message: &LLMMessage) -> Vec<ParsedToolCall> {
    if let Some(tool_calls) = &message.tool_calls {
        if !tool_calls.is_empty() {
            let parsed = parse_native_tool_calls(tool_calls);
            if !parsed.is_empty() {
                return parsed;
            }
        }
    }

    let content = match message.content.as_deref() {
        Some(text) if !text.is_empty() => text,
        _ => return Vec::new(),
    };

    for dialect in CONTENT_DIALECTS {
        let parsed = parse_content_dialect(dialect, content);
        if !parsed.is_empty() {
            return parsed;
        }
    }

    Vec::new()
}

/// Single dispatch point for the content dialects.
fn parse_content_dialect(dialect: ToolCallSource, content: &str) -> Vec<ParsedToolCall> {
    match dialect {
        ToolCallSource::ContentToolCallXml => {
            let candidates: Vec<String> = TOOL_CALL_XML_PATTERN
                .captures_iter(content)
                .map(|captures| captures[1].to_string())
                .collect();
            parse_json_payload_candidates(&candidates, dialect)
        }
        ToolCallSource::ContentLfmSpecialTokens => {
            let candidates: Vec<String> = LFM_TOOL_CALL_BLOCK_PATTERN
                .captures_iter(content)
                .map(|captures| captures[1].trim().to_string())
                .collect();
            parse_json_payload_candidates(&candidates, dialect)
        }
        ToolCallSource::ContentGenericJson => match GENERIC_JSON_OBJECT_PATTERN.find(content) {
            Some(span) => {
                parse_json_payload_candidates(&[span.as_str().to_string()], dialect)
            }
            None => Vec::new(),
        },
        ToolCallSource::ContentPythonStyle => parse_python_style_call(content),
        // Native tool_calls never route through here.
        ToolCallSource::MessageToolCalls => Vec::new(),
    }
}

/// Consumes the endpoint-native structured list. Each entry's `arguments`
/// string must parse to a JSON object; entries that do not are skipped while
/// the rest continue.
fn parse_native_tool_calls(tool_calls: &[ToolCall]) -> Vec<ParsedToolCall> {
    let mut parsed_calls = Vec::new();
    for tool_call in tool_calls {
        let raw_arguments = &tool_call.function.arguments;
        let Some(arguments) = try_parse_json_object(raw_arguments) else {
            continue;
        };
        parsed_calls.push(ParsedToolCall {
            tool_name: tool_call.function.name.clone(),
            arguments,
            source: ToolCallSource::MessageToolCalls,
            raw_payload: raw_arguments.clone(),
        });
    }
    parsed_calls
}

fn parse_json_payload_candidates(
    candidates: &[String],
    source: ToolCallSource,
) -> Vec<ParsedToolCall> {
    let mut parsed_calls = Vec::new();
    for payload_text in candidates {
        let Some(payload) = try_parse_json_object(payload_text) else {
            continue;
        };
        if let Some(parsed_call) = parsed_call_from_json_payload(&payload, payload_text, source) {
            parsed_calls.push(parsed_call);
        }
    }
    parsed_calls
}

/// Builds a canonical record from a `{"name": ..., "arguments": ...}` payload.
///
/// The name must be a non-empty string. Arguments must be a JSON object, or a
/// string that itself parses to one (some dialects double-encode).
fn parsed_call_from_json_payload(
    payload: &Map<String, Value>,
    payload_text: &str,
    source: ToolCallSource,
) -> Option<ParsedToolCall> {
    let tool_name = match payload.get("name") {
        Some(Value::String(name)) if !name.trim().is_empty() => name.trim().to_string(),
        _ => return None,
    };

    let arguments = match payload.get("arguments") {
        Some(Value::Object(arguments)) => arguments.clone(),
        Some(Value::String(encoded)) => try_parse_json_object(encoded)?,
        _ => return None,
    };

    Some(ParsedToolCall {
        tool_name,
        arguments,
        source,
        raw_payload: payload_text.to_string(),
    })
}

/// Last-resort dialect: one `identifier(argument_list)` match over the
/// trimmed content. Keyword arguments only; any positional argument or
/// unparseable literal rejects the whole candidate.
fn parse_python_style_call(content: &str) -> Vec<ParsedToolCall> {
    let Some(captures) = PYTHON_STYLE_CALL_PATTERN.captures(content.trim()) else {
        return Vec::new();
    };

    let tool_name = captures[1].to_string();
    let raw_argument_list = captures[2].trim().to_string();

    if raw_argument_list.is_empty() {
        return vec![ParsedToolCall {
            tool_name,
            arguments: Map::new(),
            source: ToolCallSource::ContentPythonStyle,
            raw_payload: content.to_string(),
        }];
    }

    let Some(arguments) = parse_python_keyword_arguments(&raw_argument_list) else {
        return Vec::new();
    };

    vec![ParsedToolCall {
        tool_name,
        arguments,
        source: ToolCallSource::ContentPythonStyle,
        raw_payload: content.to_string(),
    }]
}

/// Splits `key=literal, key=literal, ...` naively on commas. A literal that
/// itself contains a comma (list, dict) therefore fails to parse and rejects
/// the candidate; that is acceptable for a last-resort dialect.
fn parse_python_keyword_arguments(raw_argument_list: &str) -> Option<Map<String, Value>> {
    if !raw_argument_list.contains('=') {
        return None;
    }

    let mut arguments = Map::new();
    for segment in raw_argument_list.split(',') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        let (key_text, value_text) = segment.split_once('=')?;
        let value = parse_safe_literal(value_text.trim())?;
        arguments.insert(key_text.trim().to_string(), value);
    }
    Some(arguments)
}

fn try_parse_json_object(payload_text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(payload_text) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}

/// Parses one safe literal: a string, number, boolean, null, or a list/dict
/// composed of the same. Both Python (`True`/`False`/`None`) and JSON
/// (`true`/`false`/`null`) spellings are accepted. Trailing input fails the
/// parse.
fn parse_safe_literal(text: &str) -> Option<Value> {
    let mut cursor = LiteralCursor::new(text);
    cursor.skip_whitespace();
    let value = cursor.parse_value()?;
    cursor.skip_whitespace();
    if cursor.at_end() {
        Some(value)
    } else {
        None
    }
}

struct LiteralCursor<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> LiteralCursor<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            bytes: text.as_bytes(),
            position: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.position >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.position).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.position += 1;
        Some(byte)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.position += 1;
        }
    }

    fn parse_value(&mut self) -> Option<Value> {
        match self.peek()? {
            b'\'' | b'"' => self.parse_string(),
            b'[' => self.parse_list(),
            b'{' => self.parse_dict(),
            b'0'..=b'9' | b'-' | b'+' | b'.' => self.parse_number(),
            b'A'..=b'Z' | b'a'..=b'z' => self.parse_keyword(),
            _ => None,
        }
    }

    fn parse_string(&mut self) -> Option<Value> {
        let quote = self.advance()?;
        let mut text = String::new();
        loop {
            match self.advance()? {
                b'\\' => {
                    let escaped = self.advance()?;
                    match escaped {
                        b'n' => text.push('\n'),
                        b't' => text.push('\t'),
                        b'r' => text.push('\r'),
                        b'0' => text.push('\0'),
                        other => text.push(other as char),
                    }
                }
                byte if byte == quote => return Some(Value::String(text)),
                byte => {
                    // Re-assemble multi-byte UTF-8 sequences byte by byte.
                    let start = self.position - 1;
                    let width = utf8_width(byte);
                    let end = start + width;
                    if end > self.bytes.len() {
                        return None;
                    }
                    text.push_str(std::str::from_utf8(&self.bytes[start..end]).ok()?);
                    self.position = end;
                }
            }
        }
    }

    fn parse_number(&mut self) -> Option<Value> {
        let start = self.position;
        if matches!(self.peek(), Some(b'+' | b'-')) {
            self.position += 1;
        }
        while matches!(
            self.peek(),
            Some(b'0'..=b'9' | b'.' | b'e' | b'E' | b'+' | b'-')
        ) {
            self.position += 1;
        }
        let literal = std::str::from_utf8(&self.bytes[start..self.position]).ok()?;
        if let Ok(integer) = literal.parse::<i64>() {
            return Some(Value::from(integer));
        }
        let float = literal.parse::<f64>().ok()?;
        serde_json::Number::from_f64(float).map(Value::Number)
    }

    fn parse_keyword(&mut self) -> Option<Value> {
        let start = self.position;
        while matches!(self.peek(), Some(b'A'..=b'Z' | b'a'..=b'z')) {
            self.position += 1;
        }
        match &self.bytes[start..self.position] {
            b"True" | b"true" => Some(Value::Bool(true)),
            b"False" | b"false" => Some(Value::Bool(false)),
            b"None" | b"null" => Some(Value::Null),
            _ => None,
        }
    }

    fn parse_list(&mut self) -> Option<Value> {
        self.advance();
        let mut items = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some(b']') {
            self.advance();
            return Some(Value::Array(items));
        }
        loop {
            self.skip_whitespace();
            items.push(self.parse_value()?);
            self.skip_whitespace();
            match self.advance()? {
                b',' => continue,
                b']' => return Some(Value::Array(items)),
                _ => return None,
            }
        }
    }

    fn parse_dict(&mut self) -> Option<Value> {
        self.advance();
        let mut entries = Map::new();
        self.skip_whitespace();
        if self.peek() == Some(b'}') {
            self.advance();
            return Some(Value::Object(entries));
        }
        loop {
            self.skip_whitespace();
            let key = match self.parse_value()? {
                Value::String(key) => key,
                _ => return None,
            };
            self.skip_whitespace();
            if self.advance()? != b':' {
                return None;
            }
            self.skip_whitespace();
            let value = self.parse_value()?;
            entries.insert(key, value);
            self.skip_whitespace();
            match self.advance()? {
                b',' => continue,
                b'}' => return Some(Value::Object(entries)),
                _ => return None,
            }
        }
    }
}

fn utf8_width(first_byte: u8) -> usize {
    match first_byte {
        0x00..=0x7F => 1,
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        _ => 4,
    }
}
