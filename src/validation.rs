//! # Tool-Call Validation
//!
//! Checks parsed tool calls against the declared catalog contract and, for
//! the evaluation harness, against a case's expected tool name. Checks are
//! ordered; the first failure wins.

use crate::catalog::ToolCatalog;
use serde::Serialize;
use serde_json::{Map, Value};

/// Why a tool call was rejected.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ValidationFailure {
    /// The tool name does not exist in the catalog.
    HallucinatedTool,
    /// A required argument key is absent.
    MissingRequired,
    /// Unknown key with additionalProperties forbidden, non-object arguments,
    /// or a declared-type mismatch.
    SchemaMismatch,
    /// The parsed tool differs from the case's expected tool.
    WrongToolSelected,
}

impl ValidationFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationFailure::HallucinatedTool => "hallucinated_tool",
            ValidationFailure::MissingRequired => "missing_required",
            ValidationFailure::SchemaMismatch => "schema_mismatch",
            ValidationFailure::WrongToolSelected => "wrong_tool_selected",
        }
    }
}

/// Outcome of validating one tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub is_success: bool,
    pub failure_reason: Option<ValidationFailure>,
    /// The catalog tool the call matched, when the name resolved at all.
    pub matched_tool_name: Option<String>,
}

impl ValidationResult {
    fn success(matched_tool_name: &str) -> Self {
        Self {
            is_success: true,
            failure_reason: None,
            matched_tool_name: Some(matched_tool_name.to_string()),
        }
    }

    fn failure(reason: ValidationFailure, matched_tool_name: Option<&str>) -> Self {
        Self {
            is_success: false,
            failure_reason: Some(reason),
            matched_tool_name: matched_tool_name.map(|name| name.to_string()),
        }
    }
}

/// Validates a tool call against the catalog.
///
/// Ordered checks: unknown tool, required keys, unknown keys (when additional
/// properties are forbidden), declared argument types. Enum restrictions are
/// declared in the catalog but intentionally not enforced here; they only
/// steer the model through the advertised schema.
pub fn validate_tool_call_against_schema(
    tool_name: &str,
    arguments: &Map<String, Value>,
    catalog: &ToolCatalog,
) -> ValidationResult {
    let Some(schema) = catalog.schema_for(tool_name) else {
        return ValidationResult::failure(ValidationFailure::HallucinatedTool, None);
    };

    for required_key in &schema.required {
        if !arguments.contains_key(required_key) {
            return ValidationResult::failure(
                ValidationFailure::MissingRequired,
                Some(tool_name),
            );
        }
    }

    if !schema.additional_properties_allowed {
        let unknown_key = arguments
            .keys()
            .find(|key| schema.property(key).is_none());
        if unknown_key.is_some() {
            return ValidationResult::failure(
                ValidationFailure::SchemaMismatch,
                Some(tool_name),
            );
        }
    }

    for (argument_name, argument_value) in arguments {
        let Some(property) = schema.property(argument_name) else {
            continue;
        };
        if !property.declared_type.matches(argument_value) {
            return ValidationResult::failure(
                ValidationFailure::SchemaMismatch,
                Some(tool_name),
            );
        }
    }

    ValidationResult::success(tool_name)
}

/// Compares the parsed tool against the evaluation case's expectation.
pub fn validate_expected_tool(expected_tool_name: &str, parsed_tool_name: &str) -> ValidationResult {
    if expected_tool_name != parsed_tool_name {
        return ValidationResult::failure(
            ValidationFailure::WrongToolSelected,
            Some(parsed_tool_name),
        );
    }
    ValidationResult::success(parsed_tool_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::builtin_catalog;
    use serde_json::json;

    fn arguments(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("test arguments must be an object, got {}", other),
        }
    }

    #[test]
    fn exact_required_arguments_validate() {
        let catalog = builtin_catalog();
        let result = validate_tool_call_against_schema(
            "read_database_record",
            &arguments(json!({"table_name": "users", "key": "user_001"})),
            &catalog,
        );
        assert!(result.is_success);
        assert_eq!(
            result.matched_tool_name.as_deref(),
            Some("read_database_record")
        );
    }

    #[test]
    fn every_builtin_validates_with_exactly_its_required_keys() {
        let catalog = builtin_catalog();
        for schema in catalog.schemas() {
            let mut args = Map::new();
            for required_key in &schema.required {
                let property = schema.property(required_key).unwrap();
                let value = match property.declared_type {
                    crate::catalog::DeclaredType::Object => json!({}),
                    _ => json!("value"),
                };
                args.insert(required_key.clone(), value);
            }
            let result = validate_tool_call_against_schema(&schema.name, &args, &catalog);
            assert!(result.is_success, "schema {} rejected", schema.name);
        }
    }

    #[test]
    fn hallucinated_tool() {
        let catalog = builtin_catalog();
        let result =
            validate_tool_call_against_schema("nonexistent_tool", &Map::new(), &catalog);
        assert!(!result.is_success);
        assert_eq!(
            result.failure_reason,
            Some(ValidationFailure::HallucinatedTool)
        );
        assert!(result.matched_tool_name.is_none());
    }

    #[test]
    fn missing_required_key() {
        let catalog = builtin_catalog();
        let result = validate_tool_call_against_schema(
            "read_database_record",
            &arguments(json!({"table_name": "users"})),
            &catalog,
        );
        assert!(!result.is_success);
        assert_eq!(
            result.failure_reason,
            Some(ValidationFailure::MissingRequired)
        );
    }

    #[test]
    fn unknown_key_is_a_schema_mismatch() {
        let catalog = builtin_catalog();
        let result = validate_tool_call_against_schema(
            "get_weather",
            &arguments(json!({"location": "Tokyo", "date": "today", "units": "celsius"})),
            &catalog,
        );
        assert!(!result.is_success);
        assert_eq!(
            result.failure_reason,
            Some(ValidationFailure::SchemaMismatch)
        );
    }

    #[test]
    fn wrong_argument_type_is_a_schema_mismatch() {
        let catalog = builtin_catalog();
        let result = validate_tool_call_against_schema(
            "get_weather",
            &arguments(json!({"location": 42, "date": "today"})),
            &catalog,
        );
        assert_eq!(
            result.failure_reason,
            Some(ValidationFailure::SchemaMismatch)
        );

        // The payload argument of the database writer must be an object.
        let result = validate_tool_call_against_schema(
            "write_database_record",
            &arguments(json!({"table_name": "t", "key": "k", "payload": "flat"})),
            &catalog,
        );
        assert_eq!(
            result.failure_reason,
            Some(ValidationFailure::SchemaMismatch)
        );
    }

    #[test]
    fn enum_values_are_not_enforced() {
        let catalog = builtin_catalog();
        // "extreme" is outside the declared enum but passes type validation.
        let result = validate_tool_call_against_schema(
            "play_sound_effect",
            &arguments(json!({"event_name": "success", "intensity": "extreme"})),
            &catalog,
        );
        assert!(result.is_success);
    }

    #[test]
    fn optional_declared_keys_may_be_present() {
        let catalog = builtin_catalog();
        let result = validate_tool_call_against_schema(
            "create_calendar_event",
            &arguments(json!({
                "title": "standup",
                "start_datetime": "2025-01-06T09:00",
                "end_datetime": "2025-01-06T09:15",
                "location": "room 3"
            })),
            &catalog,
        );
        assert!(result.is_success);
    }

    #[test]
    fn expected_tool_comparison() {
        let matched = validate_expected_tool("get_weather", "get_weather");
        assert!(matched.is_success);

        let mismatched = validate_expected_tool("get_weather", "get_news");
        assert!(!mismatched.is_success);
        assert_eq!(
            mismatched.failure_reason,
            Some(ValidationFailure::WrongToolSelected)
        );
        assert_eq!(mismatched.matched_tool_name.as_deref(), Some("get_news"));
    }

    #[test]
    fn failure_labels_are_stable() {
        assert_eq!(ValidationFailure::HallucinatedTool.as_str(), "hallucinated_tool");
        assert_eq!(ValidationFailure::MissingRequired.as_str(), "missing_required");
        assert_eq!(ValidationFailure::SchemaMismatch.as_str(), "schema_mismatch");
        assert_eq!(ValidationFailure::WrongToolSelected.as_str(), "wrong_tool_selected");
    }
}
