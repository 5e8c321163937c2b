use super::{string_arg, ToolExecutor};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// In-memory table/key/payload store shared by the read/write tool pair.
#[derive(Default, Debug)]
pub struct KeyValueStore {
    tables: Mutex<HashMap<String, HashMap<String, Value>>>,
}

impl KeyValueStore {
    pub fn read(&self, table_name: &str, key: &str) -> Option<Value> {
        self.tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(table_name)
            .and_then(|table| table.get(key).cloned())
    }

    pub fn write(&self, table_name: &str, key: &str, payload: Value) {
        self.tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(table_name.to_string())
            .or_default()
            .insert(key.to_string(), payload);
    }
}

pub struct ReadDatabaseRecordTool {
    store: Arc<KeyValueStore>,
}

impl ReadDatabaseRecordTool {
    pub fn new(store: Arc<KeyValueStore>) -> Self {
        Self { store }
    }
}

impl ToolExecutor for ReadDatabaseRecordTool {
    fn name(&self) -> &'static str {
        "read_database_record"
    }

    fn execute(&self, arguments: &Map<String, Value>) -> Value {
        let table_name = string_arg(arguments, "table_name");
        let key = string_arg(arguments, "key");
        match self.store.read(&table_name, &key) {
            Some(payload) => json!({
                "status": "ok",
                "table_name": table_name,
                "key": key,
                "payload": payload,
            }),
            None => json!({
                "status": "not_found",
                "table_name": table_name,
                "key": key,
                "payload": null,
            }),
        }
    }
}

pub struct WriteDatabaseRecordTool {
    store: Arc<KeyValueStore>,
}

impl WriteDatabaseRecordTool {
    pub fn new(store: Arc<KeyValueStore>) -> Self {
        Self { store }
    }
}

impl ToolExecutor for WriteDatabaseRecordTool {
    fn name(&self) -> &'static str {
        "write_database_record"
    }

    fn execute(&self, arguments: &Map<String, Value>) -> Value {
        let table_name = string_arg(arguments, "table_name");
        let key = string_arg(arguments, "key");
        let payload = arguments.get("payload").cloned().unwrap_or(Value::Null);
        self.store.write(&table_name, &key, payload);
        json!({"status": "ok", "table_name": table_name, "key": key})
    }
}
