//! # Tools Module
//!
//! Defines the `ToolExecutor` interface the engine invokes, the
//! `ToolRegistry` that maps tool names to executors, and the builtin dummy
//! tools used for deterministic local evaluation.

pub mod calendar;
pub mod database;
pub mod info;
pub mod sound;
pub mod todo;

pub use calendar::{CalendarStore, CreateCalendarEventTool, ReadCalendarEventsTool};
pub use database::{KeyValueStore, ReadDatabaseRecordTool, WriteDatabaseRecordTool};
pub use info::{GetNewsTool, GetWeatherTool};
pub use sound::PlaySoundEffectTool;
pub use todo::{CreateTodoTaskTool, ReadTodoTasksTool, TodoStore};

use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// A tool the engine can execute.
///
/// Executors consume a validated argument map and return a JSON payload that
/// becomes the content of a tool message. Errors are expressed inside the
/// payload (`{"status": "error", ...}`), never raised; the model is expected
/// to react to them.
pub trait ToolExecutor: Send + Sync {
    fn name(&self) -> &'static str;
    fn execute(&self, arguments: &Map<String, Value>) -> Value;
}

/// Registry mapping tool names to executors.
///
/// Treated as immutable for the duration of an engine invocation. The
/// registry is expected to cover every catalog tool; an unregistered name
/// still yields a well-formed error payload rather than a failure.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn ToolExecutor>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        ToolRegistry {
            tools: HashMap::new(),
        }
    }

    pub fn register<T: ToolExecutor + 'static>(&mut self, tool: T) {
        self.tools.insert(tool.name().to_string(), Arc::new(tool));
    }

    #[allow(dead_code)] // Useful for direct tool inspection.
    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolExecutor>> {
        self.tools.get(name).cloned()
    }

    /// Executes one call. An unregistered tool name produces an error payload
    /// instead of failing the round.
    pub fn execute(&self, tool_name: &str, arguments: &Map<String, Value>) -> Value {
        match self.tools.get(tool_name) {
            Some(tool) => {
                debug!(tool_name, "Executing tool");
                tool.execute(arguments)
            }
            None => json!({
                "status": "error",
                "message": format!("Unknown tool: {}", tool_name),
            }),
        }
    }

    /// Registered tool names, sorted for stable display.
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Registry wired with the builtin dummy tools and fresh in-memory
    /// stores. Tools that share a store (calendar, todo, database pairs)
    /// share it through an `Arc`.
    pub fn with_builtin_tools() -> Self {
        let calendar_store = Arc::new(CalendarStore::default());
        let todo_store = Arc::new(TodoStore::default());
        let database_store = Arc::new(KeyValueStore::default());

        let mut registry = Self::new();
        registry.register(PlaySoundEffectTool);
        registry.register(CreateCalendarEventTool::new(calendar_store.clone()));
        registry.register(ReadCalendarEventsTool::new(calendar_store));
        registry.register(CreateTodoTaskTool::new(todo_store.clone()));
        registry.register(ReadTodoTasksTool::new(todo_store));
        registry.register(GetWeatherTool);
        registry.register(GetNewsTool);
        registry.register(ReadDatabaseRecordTool::new(database_store.clone()));
        registry.register(WriteDatabaseRecordTool::new(database_store));
        registry
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::with_builtin_tools()
    }
}

/// Reads a string argument, defaulting to empty. Required keys are
/// guaranteed present by schema validation before execution.
pub(crate) fn string_arg(arguments: &Map<String, Value>, key: &str) -> String {
    arguments
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
