use super::{string_arg, ToolExecutor};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Serialize, Debug, Clone)]
pub struct TodoTask {
    pub task_title: String,
    pub priority: String,
    pub due_date: String,
    /// Task lifecycle status; new tasks start "open".
    pub status: String,
}

/// In-memory todo list shared by the create/read tool pair.
#[derive(Default, Debug)]
pub struct TodoStore {
    tasks: Mutex<Vec<TodoTask>>,
}

impl TodoStore {
    fn push(&self, task: TodoTask) {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(task);
    }

    pub fn snapshot(&self) -> Vec<TodoTask> {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

pub struct CreateTodoTaskTool {
    store: Arc<TodoStore>,
}

impl CreateTodoTaskTool {
    pub fn new(store: Arc<TodoStore>) -> Self {
        Self { store }
    }
}

impl ToolExecutor for CreateTodoTaskTool {
    fn name(&self) -> &'static str {
        "create_todo_task"
    }

    fn execute(&self, arguments: &Map<String, Value>) -> Value {
        let task = TodoTask {
            task_title: string_arg(arguments, "task_title"),
            priority: string_arg(arguments, "priority"),
            due_date: string_arg(arguments, "due_date"),
            status: "open".to_string(),
        };
        let payload = json!({"status": "ok", "created_task": &task});
        self.store.push(task);
        payload
    }
}

pub struct ReadTodoTasksTool {
    store: Arc<TodoStore>,
}

impl ReadTodoTasksTool {
    pub fn new(store: Arc<TodoStore>) -> Self {
        Self { store }
    }
}

impl ToolExecutor for ReadTodoTasksTool {
    fn name(&self) -> &'static str {
        "read_todo_tasks"
    }

    fn execute(&self, arguments: &Map<String, Value>) -> Value {
        let requested_status = string_arg(arguments, "status");
        let filter_text = string_arg(arguments, "filter_text")
            .trim()
            .to_lowercase();

        let candidate_tasks: Vec<TodoTask> = self
            .store
            .snapshot()
            .into_iter()
            .filter(|task| requested_status == "all" || task.status == requested_status)
            .collect();

        if filter_text.is_empty() {
            return json!({"status": "ok", "tasks": candidate_tasks});
        }

        let filtered_tasks: Vec<TodoTask> = candidate_tasks
            .into_iter()
            .filter(|task| task.task_title.to_lowercase().contains(&filter_text))
            .collect();
        json!({"status": "ok", "tasks": filtered_tasks})
    }
}
