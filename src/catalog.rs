//! # Tool Schema Catalog
//!
//! The static registry of tool argument contracts. Built once at startup,
//! shared read-only by the validator and projected to the Chat Completions
//! wire shape for every request the engine sends.

use crate::llm::base_client::{
    FunctionDefinition, FunctionParameterProperty, FunctionParameters, ToolDefinition,
};
use serde_json::Value;
use std::collections::HashMap;

/// Declared JSON type tag for one tool argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclaredType {
    String,
    Object,
    Number,
    Integer,
    Boolean,
    /// The schema carries no type tag; any value is accepted.
    Unspecified,
}

impl DeclaredType {
    /// The wire name for the tag, or `None` for `Unspecified`.
    pub fn wire_name(&self) -> Option<&'static str> {
        match self {
            DeclaredType::String => Some("string"),
            DeclaredType::Object => Some("object"),
            DeclaredType::Number => Some("number"),
            DeclaredType::Integer => Some("integer"),
            DeclaredType::Boolean => Some("boolean"),
            DeclaredType::Unspecified => None,
        }
    }

    /// Whether a runtime value satisfies the tag.
    ///
    /// Booleans never satisfy `Integer` or `Number`: `Value::Bool` is a
    /// distinct variant, so the check holds structurally.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            DeclaredType::String => value.is_string(),
            DeclaredType::Object => value.is_object(),
            DeclaredType::Number => value.is_number(),
            DeclaredType::Integer => value.is_i64() || value.is_u64(),
            DeclaredType::Boolean => value.is_boolean(),
            DeclaredType::Unspecified => true,
        }
    }
}

/// Schema for one named argument of a tool.
#[derive(Debug, Clone)]
pub struct PropertySchema {
    pub declared_type: DeclaredType,
    /// Enum restriction as declared on the wire. Not enforced by the
    /// validator; advertised to the model only.
    pub enum_values: Option<Vec<String>>,
}

impl PropertySchema {
    pub fn typed(declared_type: DeclaredType) -> Self {
        Self {
            declared_type,
            enum_values: None,
        }
    }

    pub fn string_enum(values: &[&str]) -> Self {
        Self {
            declared_type: DeclaredType::String,
            enum_values: Some(values.iter().map(|v| v.to_string()).collect()),
        }
    }
}

/// The declared argument contract of one tool.
#[derive(Debug, Clone)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    /// Property order follows declaration order; the wire projection keeps it
    /// deterministic.
    pub properties: Vec<(String, PropertySchema)>,
    pub required: Vec<String>,
    pub additional_properties_allowed: bool,
}

impl ToolSchema {
    pub fn new(
        name: &str,
        description: &str,
        properties: Vec<(&str, PropertySchema)>,
        required: &[&str],
    ) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            properties: properties
                .into_iter()
                .map(|(property_name, schema)| (property_name.to_string(), schema))
                .collect(),
            required: required.iter().map(|key| key.to_string()).collect(),
            additional_properties_allowed: false,
        }
    }

    pub fn property(&self, name: &str) -> Option<&PropertySchema> {
        self.properties
            .iter()
            .find(|(property_name, _)| property_name == name)
            .map(|(_, schema)| schema)
    }
}

/// Immutable catalog of tool schemas with O(1) lookup by name.
#[derive(Debug, Clone)]
pub struct ToolCatalog {
    schemas: Vec<ToolSchema>,
    index_by_name: HashMap<String, usize>,
}

impl ToolCatalog {
    /// Builds a catalog. Later schemas with a duplicate name replace earlier
    /// ones in the index; tool names are expected to be unique.
    pub fn new(schemas: Vec<ToolSchema>) -> Self {
        let index_by_name = schemas
            .iter()
            .enumerate()
            .map(|(index, schema)| (schema.name.clone(), index))
            .collect();
        Self {
            schemas,
            index_by_name,
        }
    }

    #[allow(dead_code)] // Membership check without borrowing the schema.
    pub fn has(&self, tool_name: &str) -> bool {
        self.index_by_name.contains_key(tool_name)
    }

    pub fn schema_for(&self, tool_name: &str) -> Option<&ToolSchema> {
        self.index_by_name
            .get(tool_name)
            .map(|&index| &self.schemas[index])
    }

    pub fn schemas(&self) -> &[ToolSchema] {
        &self.schemas
    }

    /// Projects every schema to the wire shape expected by the chat endpoint.
    pub fn wire_definitions(&self) -> Vec<ToolDefinition> {
        self.schemas
            .iter()
            .map(|schema| ToolDefinition {
                tool_type: "function".to_string(),
                function: FunctionDefinition {
                    name: schema.name.clone(),
                    description: schema.description.clone(),
                    parameters: FunctionParameters {
                        param_type: "object".to_string(),
                        properties: schema
                            .properties
                            .iter()
                            .map(|(property_name, property)| {
                                (
                                    property_name.clone(),
                                    FunctionParameterProperty {
                                        param_type: property
                                            .declared_type
                                            .wire_name()
                                            .map(|name| name.to_string()),
                                        enum_values: property.enum_values.clone(),
                                    },
                                )
                            })
                            .collect(),
                        required: schema.required.clone(),
                        additional_properties: schema.additional_properties_allowed,
                    },
                },
            })
            .collect()
    }
}

/// The builtin tool set used for runtime and evaluation.
pub fn builtin_catalog() -> ToolCatalog {
    ToolCatalog::new(vec![
        ToolSchema::new(
            "play_sound_effect",
            "Return a sound event to express emotion at appropriate timing.",
            vec![
                ("event_name", PropertySchema::typed(DeclaredType::String)),
                ("intensity", PropertySchema::string_enum(&["low", "medium", "high"])),
            ],
            &["event_name", "intensity"],
        ),
        ToolSchema::new(
            "create_calendar_event",
            "Create a calendar event in the dummy calendar store.",
            vec![
                ("title", PropertySchema::typed(DeclaredType::String)),
                ("start_datetime", PropertySchema::typed(DeclaredType::String)),
                ("end_datetime", PropertySchema::typed(DeclaredType::String)),
                ("location", PropertySchema::typed(DeclaredType::String)),
            ],
            &["title", "start_datetime", "end_datetime"],
        ),
        ToolSchema::new(
            "read_calendar_events",
            "Read calendar events by date range.",
            vec![
                ("start_date", PropertySchema::typed(DeclaredType::String)),
                ("end_date", PropertySchema::typed(DeclaredType::String)),
            ],
            &["start_date", "end_date"],
        ),
        ToolSchema::new(
            "create_todo_task",
            "Create a task in the dummy todo store.",
            vec![
                ("task_title", PropertySchema::typed(DeclaredType::String)),
                ("priority", PropertySchema::string_enum(&["low", "normal", "high"])),
                ("due_date", PropertySchema::typed(DeclaredType::String)),
            ],
            &["task_title", "priority"],
        ),
        ToolSchema::new(
            "read_todo_tasks",
            "Read tasks from the dummy todo store by filter.",
            vec![
                ("filter_text", PropertySchema::typed(DeclaredType::String)),
                ("status", PropertySchema::string_enum(&["open", "done", "all"])),
            ],
            &["status"],
        ),
        ToolSchema::new(
            "get_weather",
            "Read weather from a dummy provider.",
            vec![
                ("location", PropertySchema::typed(DeclaredType::String)),
                ("date", PropertySchema::typed(DeclaredType::String)),
            ],
            &["location", "date"],
        ),
        ToolSchema::new(
            "get_news",
            "Read news from a dummy provider.",
            vec![
                ("topic", PropertySchema::typed(DeclaredType::String)),
                ("timeframe", PropertySchema::typed(DeclaredType::String)),
            ],
            &["topic", "timeframe"],
        ),
        ToolSchema::new(
            "read_database_record",
            "Read one record from a dummy key-value database.",
            vec![
                ("table_name", PropertySchema::typed(DeclaredType::String)),
                ("key", PropertySchema::typed(DeclaredType::String)),
            ],
            &["table_name", "key"],
        ),
        ToolSchema::new(
            "write_database_record",
            "Write one record into a dummy key-value database.",
            vec![
                ("table_name", PropertySchema::typed(DeclaredType::String)),
                ("key", PropertySchema::typed(DeclaredType::String)),
                ("payload", PropertySchema::typed(DeclaredType::Object)),
            ],
            &["table_name", "key", "payload"],
        ),
    ])
}
