//! Fixed prompt templates that stabilize tool-call formatting on small local
//! models. No interpolation; the texts are part of the engine's contract.

/// Default system prompt for tool-calling rounds.
pub fn tool_call_system_prompt() -> &'static str {
    "You are a reliable tool-calling assistant.\n\
     Output function calls as JSON.\n\
     Rules:\n\
     1) Call only tools from the provided tools list.\n\
     2) Include all required arguments and use correct argument names.\n\
     3) Do not invent unknown tools.\n\
     4) If a tool call is needed, return only the tool call, without extra prose.\n\
     5) If no tool is needed, answer normally.\n"
}

/// Stricter variant used for prompt-comparison experiments: pins the exact
/// output shape and forbids every other surface syntax.
pub fn strict_json_only_system_prompt() -> &'static str {
    "You are a deterministic function router.\n\
     Output function calls as JSON.\n\
     If a tool call is needed, return exactly this shape and nothing else:\n\
     {\"name\":\"tool_name\",\"arguments\":{\"required_key\":\"value\"}}\n\
     Do not include markdown, XML tags, or explanatory text.\n\
     Use only available tools and include all required arguments.\n"
}

/// User-role message appended after a parse failure before retrying.
pub fn repair_prompt_for_parse_failure() -> &'static str {
    "Your previous tool call format was invalid.\n\
     Retry and output a single valid JSON function call with required arguments only."
}
