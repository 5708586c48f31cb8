//! Per-client todo session: form fields, filters, messages and the in-memory
//! mirror of the `todos` table.

use serde::{Deserialize, Serialize};

use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{NewTodo, Priority, PriorityFilter, StatusFilter, Todo, TodoCounts};

#[derive(Debug, Clone, Default, Serialize)]
pub struct TodoSession {
    pub todos: Vec<Todo>,
    pub new_todo_title: String,
    pub new_todo_description: String,
    pub new_todo_priority: Priority,
    pub filter_status: StatusFilter,
    pub filter_priority: PriorityFilter,
    pub is_loading: bool,
    pub error_message: Option<String>,
    pub success_message: Option<String>,
}

/// A user action against a todo session.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum TodoCommand {
    Load,
    Add,
    Toggle { id: i64 },
    Delete { id: i64 },
    SetTitle { value: String },
    SetDescription { value: String },
    SetPriority { value: Priority },
    SetFilterStatus { value: StatusFilter },
    SetFilterPriority { value: PriorityFilter },
    ClearMessages,
}

impl TodoCommand {
    fn action(&self) -> &'static str {
        match self {
            Self::Load => "load todos",
            Self::Add => "add todo",
            Self::Toggle { .. } => "update todo",
            Self::Delete { .. } => "delete todo",
            _ => "update form",
        }
    }
}

impl TodoSession {
    /// A fresh session with the list loaded from `db`.
    pub fn new(db: &Database) -> Result<Self> {
        let mut session = Self::default();
        session.load(db)?;
        Ok(session)
    }

    /// Run one command, recording the outcome in the session messages.
    pub fn apply(&mut self, db: &Database, command: TodoCommand) -> Result<()> {
        let action = command.action();
        let result = match command {
            TodoCommand::Load => self.load(db),
            TodoCommand::Add => self.add(db).map(|_| ()),
            TodoCommand::Toggle { id } => self.toggle(db, id).map(|_| ()),
            TodoCommand::Delete { id } => self.delete(db, id).map(|_| ()),
            TodoCommand::SetTitle { value } => {
                self.set_title(value);
                Ok(())
            }
            TodoCommand::SetDescription { value } => {
                self.new_todo_description = value;
                Ok(())
            }
            TodoCommand::SetPriority { value } => {
                self.new_todo_priority = value;
                Ok(())
            }
            TodoCommand::SetFilterStatus { value } => {
                self.filter_status = value;
                Ok(())
            }
            TodoCommand::SetFilterPriority { value } => {
                self.filter_priority = value;
                Ok(())
            }
            TodoCommand::ClearMessages => {
                self.clear_messages();
                Ok(())
            }
        };

        self.is_loading = false;
        if let Err(err) = &result {
            self.error_message = Some(err.user_message(action));
            self.success_message = None;
        }
        result
    }

    pub fn load(&mut self, db: &Database) -> Result<()> {
        self.is_loading = true;
        let loaded = db.list_todos();
        self.is_loading = false;
        self.todos = loaded?;
        Ok(())
    }

    /// Insert the todo described by the form fields and reset the form.
    pub fn add(&mut self, db: &Database) -> Result<Todo> {
        let title = self.new_todo_title.trim();
        if title.is_empty() {
            return Err(AppError::validation("Title is required"));
        }
        let description = self.new_todo_description.trim();

        self.is_loading = true;
        self.error_message = None;
        let inserted = db.insert_todo(&NewTodo {
            title: title.to_string(),
            description: (!description.is_empty()).then(|| description.to_string()),
            priority: self.new_todo_priority,
        });
        self.is_loading = false;
        let todo = inserted?;
        tracing::info!(id = todo.id, "todo added");

        self.todos.insert(0, todo.clone());
        self.new_todo_title.clear();
        self.new_todo_description.clear();
        self.new_todo_priority = Priority::Medium;
        self.success_message = Some("Todo added successfully!".to_string());
        Ok(todo)
    }

    /// Flip the completion flag. Returns `None` for an unknown id.
    pub fn toggle(&mut self, db: &Database, id: i64) -> Result<Option<Todo>> {
        let Some(updated) = db.toggle_todo(id)? else {
            return Ok(None);
        };
        if let Some(entry) = self.todos.iter_mut().find(|t| t.id == id) {
            *entry = updated.clone();
        }
        self.error_message = None;
        self.success_message = Some("Todo updated successfully!".to_string());
        Ok(Some(updated))
    }

    /// Delete one todo. Returns `false` for an unknown id.
    pub fn delete(&mut self, db: &Database, id: i64) -> Result<bool> {
        if !db.delete_todo(id)? {
            return Ok(false);
        }
        self.todos.retain(|t| t.id != id);
        self.error_message = None;
        self.success_message = Some("Todo deleted successfully!".to_string());
        Ok(true)
    }

    pub fn set_title(&mut self, value: String) {
        self.new_todo_title = value;
        self.error_message = None;
    }

    pub fn clear_messages(&mut self) {
        self.error_message = None;
        self.success_message = None;
    }

    /// Todos passing the status filter and then the priority filter, in list order.
    pub fn filtered_todos(&self) -> impl Iterator<Item = &Todo> {
        self.todos
            .iter()
            .filter(|t| self.filter_status.matches(t))
            .filter(|t| self.filter_priority.matches(t))
    }

    #[must_use]
    pub fn todos_count(&self) -> TodoCounts {
        let completed = self.todos.iter().filter(|t| t.completed).count();
        TodoCounts {
            total: self.todos.len(),
            completed,
            pending: self.todos.len() - completed,
        }
    }
}
