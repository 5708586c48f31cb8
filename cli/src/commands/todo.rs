use std::path::Path;

use anyhow::{Result, bail};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use dashkit_core::db::Database;
use dashkit_core::models::{Priority, PriorityFilter, StatusFilter, Todo};
use dashkit_core::todo::TodoSession;
use dashkit_core::todo_page::{self, todo_page};

use super::helpers::{export_page, json_error, local_time, print_json, truncate};

fn print_todo_table(todos: &[&Todo]) {
    #[derive(Tabled)]
    struct TodoRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Done")]
        done: &'static str,
        #[tabled(rename = "Priority")]
        priority: &'static str,
        #[tabled(rename = "Title")]
        title: String,
        #[tabled(rename = "Description")]
        description: String,
        #[tabled(rename = "Created")]
        created: String,
    }

    let rows: Vec<TodoRow> = todos
        .iter()
        .map(|t| TodoRow {
            id: t.id,
            done: if t.completed { "x" } else { "" },
            priority: t.priority.as_str(),
            title: truncate(&t.title, 40),
            description: truncate(t.description.as_deref().unwrap_or(""), 40),
            created: local_time(&t.created_at),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(0..1)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn cmd_todo_list(
    db: &Database,
    status: Option<&str>,
    priority: Option<&str>,
    json: bool,
) -> Result<()> {
    let mut session = TodoSession::new(db)?;
    if let Some(status) = status {
        session.filter_status = status.parse::<StatusFilter>()?;
    }
    if let Some(priority) = priority {
        session.filter_priority = priority.parse::<PriorityFilter>()?;
    }
    let todos: Vec<&Todo> = session.filtered_todos().collect();

    if json {
        return print_json(&todos);
    }
    if todos.is_empty() {
        eprintln!("No todos found. Use `dashkit todo add` to create one.");
        return Ok(());
    }
    print_todo_table(&todos);
    let counts = session.todos_count();
    println!(
        "Total: {}  Pending: {}  Completed: {}",
        counts.total, counts.pending, counts.completed
    );
    Ok(())
}

pub(crate) fn cmd_todo_add(
    db: &Database,
    title: String,
    description: Option<String>,
    priority: &str,
    json: bool,
) -> Result<()> {
    let mut session = TodoSession::new(db)?;
    session.set_title(title);
    session.new_todo_description = description.unwrap_or_default();
    session.new_todo_priority = priority.parse::<Priority>()?;
    let todo = session.add(db)?;

    if json {
        print_json(&todo)?;
    } else {
        println!("Added todo {}: {} [{}]", todo.id, todo.title, todo.priority);
    }
    Ok(())
}

pub(crate) fn cmd_todo_toggle(db: &Database, id: i64, json: bool) -> Result<()> {
    let mut session = TodoSession::new(db)?;
    let Some(todo) = session.toggle(db, id)? else {
        if json {
            println!("{}", json_error(&format!("Todo {id} not found")));
            return Ok(());
        }
        bail!("Todo {id} not found");
    };

    if json {
        print_json(&todo)?;
    } else {
        let state = if todo.completed { "completed" } else { "pending" };
        println!("Todo {}: {} is now {state}", todo.id, todo.title);
    }
    Ok(())
}

pub(crate) fn cmd_todo_delete(db: &Database, id: i64, json: bool) -> Result<()> {
    let mut session = TodoSession::new(db)?;
    if !session.delete(db, id)? {
        if json {
            println!("{}", json_error(&format!("Todo {id} not found")));
            return Ok(());
        }
        bail!("Todo {id} not found");
    }

    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Deleted todo {id}");
    }
    Ok(())
}

/// Render the task manager page with the stored todos to a static file.
pub(crate) fn cmd_todo_export(db: &Database, path: &Path) -> Result<()> {
    let session = TodoSession::new(db)?;
    export_page(path, todo_page::TITLE, &todo_page(&session))?;
    println!(
        "Exported {} todos to {}",
        session.todos.len(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashkit_core::db::Schema;

    fn test_db() -> Database {
        Database::open_in_memory(Schema::Todo).unwrap()
    }

    #[test]
    fn test_add_and_toggle() {
        let db = test_db();
        cmd_todo_add(&db, "  Buy milk ".to_string(), None, "high", true).unwrap();
        let todos = db.list_todos().unwrap();
        assert_eq!(todos.len(), 1);
        assert_eq!(todos[0].title, "Buy milk");
        assert_eq!(todos[0].priority, Priority::High);

        cmd_todo_toggle(&db, todos[0].id, true).unwrap();
        assert!(db.get_todo(todos[0].id).unwrap().unwrap().completed);
    }

    #[test]
    fn test_add_rejects_blank_title_and_bad_priority() {
        let db = test_db();
        let err = cmd_todo_add(&db, "   ".to_string(), None, "low", false).unwrap_err();
        assert_eq!(err.to_string(), "Title is required");
        assert!(cmd_todo_add(&db, "x".to_string(), None, "urgent", false).is_err());
        assert!(db.list_todos().unwrap().is_empty());
    }

    #[test]
    fn test_unknown_ids() {
        let db = test_db();
        assert!(cmd_todo_toggle(&db, 42, false).is_err());
        assert!(cmd_todo_delete(&db, 42, false).is_err());
        assert!(cmd_todo_delete(&db, 42, true).is_ok());
    }

    #[test]
    fn test_list_rejects_bad_filter() {
        let db = test_db();
        assert!(cmd_todo_list(&db, Some("done"), None, true).is_err());
        assert!(cmd_todo_list(&db, Some("completed"), Some("high"), true).is_ok());
    }

    #[test]
    fn test_export_renders_todos() {
        let db = test_db();
        cmd_todo_add(&db, "Write report".to_string(), Some("Q3".to_string()), "medium", true)
            .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("todo.html");
        cmd_todo_export(&db, &path).unwrap();

        let html = std::fs::read_to_string(&path).unwrap();
        assert!(html.contains("<title>Task Manager</title>"));
        assert!(html.contains("Write report"));
    }
}
