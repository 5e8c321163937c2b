use super::{string_arg, ToolExecutor};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Serialize, Debug, Clone)]
pub struct CalendarEvent {
    pub title: String,
    pub start_datetime: String,
    pub end_datetime: String,
    pub location: String,
}

/// In-memory calendar shared by the create/read tool pair.
#[derive(Default, Debug)]
pub struct CalendarStore {
    events: Mutex<Vec<CalendarEvent>>,
}

impl CalendarStore {
    fn push(&self, event: CalendarEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    pub fn snapshot(&self) -> Vec<CalendarEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

pub struct CreateCalendarEventTool {
    store: Arc<CalendarStore>,
}

impl CreateCalendarEventTool {
    pub fn new(store: Arc<CalendarStore>) -> Self {
        Self { store }
    }
}

impl ToolExecutor for CreateCalendarEventTool {
    fn name(&self) -> &'static str {
        "create_calendar_event"
    }

    fn execute(&self, arguments: &Map<String, Value>) -> Value {
        let event = CalendarEvent {
            title: string_arg(arguments, "title"),
            start_datetime: string_arg(arguments, "start_datetime"),
            end_datetime: string_arg(arguments, "end_datetime"),
            location: string_arg(arguments, "location"),
        };
        let payload = json!({"status": "ok", "created_event": &event});
        self.store.push(event);
        payload
    }
}

pub struct ReadCalendarEventsTool {
    store: Arc<CalendarStore>,
}

impl ReadCalendarEventsTool {
    pub fn new(store: Arc<CalendarStore>) -> Self {
        Self { store }
    }
}

impl ToolExecutor for ReadCalendarEventsTool {
    fn name(&self) -> &'static str {
        "read_calendar_events"
    }

    fn execute(&self, arguments: &Map<String, Value>) -> Value {
        json!({
            "status": "ok",
            "start_date": string_arg(arguments, "start_date"),
            "end_date": string_arg(arguments, "end_date"),
            "events": self.store.snapshot(),
        })
    }
}
