use std::sync::{Arc, Mutex};

use axum::{
    Form, Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Response,
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};

use dashkit_core::components::CLEAR_MESSAGES_ROUTE;
use dashkit_core::db::{Database, lock};
use dashkit_core::error::AppError;
use dashkit_core::models::{Priority, PriorityFilter, StatusFilter, Todo, TodoCounts};
use dashkit_core::todo::{TodoCommand, TodoSession};
use dashkit_core::todo_page::{self, todo_page};
use dashkit_core::view::Node;

use super::{
    ApiError, MAX_SESSIONS, SessionHandle, SessionStore, back_home, page, with_common_layers,
};

#[derive(Clone)]
pub struct TodoState {
    db: Arc<Mutex<Database>>,
    sessions: Arc<SessionStore<TodoSession>>,
}

impl TodoState {
    pub fn new(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            sessions: Arc::new(SessionStore::new(MAX_SESSIONS)),
        }
    }

    fn session(&self, headers: &HeaderMap) -> Result<SessionHandle<TodoSession>, ApiError> {
        SessionHandle::resolve(&self.sessions, headers, || TodoSession::new(&lock(&self.db)))
    }

    /// Run form commands in order, stopping at the first failure. Failures
    /// are already recorded in the session, so the redirect always happens.
    async fn run_form(
        &self,
        headers: &HeaderMap,
        commands: Vec<TodoCommand>,
    ) -> Result<Response, ApiError> {
        let handle = self.session(headers)?;
        {
            let mut session = handle.state.lock().await;
            let db = lock(&self.db);
            for command in commands {
                if session.apply(&db, command).is_err() {
                    break;
                }
            }
        }
        Ok(handle.respond(back_home()))
    }

    async fn record_error(
        &self,
        headers: &HeaderMap,
        err: &AppError,
        action: &str,
    ) -> Result<Response, ApiError> {
        let handle = self.session(headers)?;
        {
            let mut session = handle.state.lock().await;
            session.error_message = Some(err.user_message(action));
            session.success_message = None;
        }
        Ok(handle.respond(back_home()))
    }
}

// --- Request / Response types ---

#[derive(Deserialize)]
struct AddForm {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    priority: Option<String>,
}

#[derive(Deserialize)]
struct FilterForm {
    status: String,
    priority: String,
}

#[derive(Deserialize)]
struct CreateTodoRequest {
    title: String,
    description: Option<String>,
    #[serde(default)]
    priority: Priority,
}

#[derive(Serialize)]
struct StateResponse {
    session: TodoSession,
    filtered_todos: Vec<Todo>,
    todos_count: TodoCounts,
}

impl StateResponse {
    fn from_session(session: &TodoSession) -> Self {
        Self {
            session: session.clone(),
            filtered_todos: session.filtered_todos().cloned().collect(),
            todos_count: session.todos_count(),
        }
    }
}

/// Parse a form value into the command that sets it.
fn parsed<T: std::str::FromStr<Err = AppError>>(
    raw: &str,
    to_command: impl FnOnce(T) -> TodoCommand,
) -> Result<TodoCommand, AppError> {
    raw.parse().map(to_command)
}

// --- HTML handlers ---

async fn index(State(state): State<TodoState>, headers: HeaderMap) -> Result<Response, ApiError> {
    let handle = state.session(&headers)?;
    let html = {
        let session = handle.state.lock().await;
        page(todo_page::TITLE, &todo_page(&session))
    };
    Ok(handle.respond(html))
}

async fn add_form(
    State(state): State<TodoState>,
    headers: HeaderMap,
    Form(form): Form<AddForm>,
) -> Result<Response, ApiError> {
    let mut commands = vec![
        TodoCommand::SetTitle { value: form.title },
        TodoCommand::SetDescription {
            value: form.description,
        },
    ];
    if let Some(priority) = form.priority {
        commands.push(match parsed(&priority, |value| TodoCommand::SetPriority { value }) {
            Ok(command) => command,
            Err(err) => return state.record_error(&headers, &err, "add todo").await,
        });
    }
    commands.push(TodoCommand::Add);
    state.run_form(&headers, commands).await
}

async fn filter_form(
    State(state): State<TodoState>,
    headers: HeaderMap,
    Form(form): Form<FilterForm>,
) -> Result<Response, ApiError> {
    let status =
        parsed::<StatusFilter>(&form.status, |value| TodoCommand::SetFilterStatus { value });
    let priority =
        parsed::<PriorityFilter>(&form.priority, |value| TodoCommand::SetFilterPriority { value });
    match (status, priority) {
        (Ok(status), Ok(priority)) => state.run_form(&headers, vec![status, priority]).await,
        (Err(err), _) | (_, Err(err)) => {
            state.record_error(&headers, &err, "update filters").await
        }
    }
}

async fn toggle_form(
    State(state): State<TodoState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    state.run_form(&headers, vec![TodoCommand::Toggle { id }]).await
}

async fn delete_form(
    State(state): State<TodoState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    state.run_form(&headers, vec![TodoCommand::Delete { id }]).await
}

async fn clear_messages(
    State(state): State<TodoState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    state.run_form(&headers, vec![TodoCommand::ClearMessages]).await
}

// --- JSON handlers ---

async fn api_state(
    State(state): State<TodoState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let handle = state.session(&headers)?;
    let body = {
        let session = handle.state.lock().await;
        Json(StateResponse::from_session(&session))
    };
    Ok(handle.respond(body))
}

async fn api_view(
    State(state): State<TodoState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let handle = state.session(&headers)?;
    let tree: Node = {
        let session = handle.state.lock().await;
        todo_page(&session)
    };
    Ok(handle.respond(Json(tree)))
}

async fn api_command(
    State(state): State<TodoState>,
    headers: HeaderMap,
    Json(command): Json<TodoCommand>,
) -> Result<Response, ApiError> {
    let handle = state.session(&headers)?;
    let body = {
        let mut session = handle.state.lock().await;
        session.apply(&lock(&state.db), command)?;
        Json(StateResponse::from_session(&session))
    };
    Ok(handle.respond(body))
}

async fn list_todos(State(state): State<TodoState>) -> Result<Json<Vec<Todo>>, ApiError> {
    let todos = lock(&state.db).list_todos()?;
    Ok(Json(todos))
}

async fn create_todo(
    State(state): State<TodoState>,
    headers: HeaderMap,
    Json(req): Json<CreateTodoRequest>,
) -> Result<Response, ApiError> {
    let handle = state.session(&headers)?;
    let todo = {
        let mut session = handle.state.lock().await;
        session.new_todo_title = req.title;
        session.new_todo_description = req.description.unwrap_or_default();
        session.new_todo_priority = req.priority;
        let db = lock(&state.db);
        match session.add(&db) {
            Ok(todo) => todo,
            Err(err) => {
                session.error_message = Some(err.user_message("add todo"));
                return Err(err.into());
            }
        }
    };
    Ok(handle.respond((StatusCode::CREATED, Json(todo))))
}

async fn toggle_todo(
    State(state): State<TodoState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let handle = state.session(&headers)?;
    let updated = {
        let mut session = handle.state.lock().await;
        session.toggle(&lock(&state.db), id)?
    };
    let todo = updated.ok_or_else(|| ApiError::NotFound(format!("Todo {id} not found")))?;
    Ok(handle.respond(Json(todo)))
}

async fn delete_todo(
    State(state): State<TodoState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let handle = state.session(&headers)?;
    let deleted = {
        let mut session = handle.state.lock().await;
        session.delete(&lock(&state.db), id)?
    };
    if !deleted {
        return Err(ApiError::NotFound(format!("Todo {id} not found")));
    }
    Ok(handle.respond(StatusCode::NO_CONTENT))
}

pub fn build_router(state: TodoState) -> Router {
    let router = Router::new()
        .route("/", get(index))
        .route(todo_page::ADD_ROUTE, post(add_form))
        .route(todo_page::FILTER_ROUTE, post(filter_form))
        .route("/todos/{id}/toggle", post(toggle_form))
        .route("/todos/{id}/delete", post(delete_form))
        .route(CLEAR_MESSAGES_ROUTE, post(clear_messages))
        .route("/api/state", get(api_state))
        .route("/api/view", get(api_view))
        .route("/api/commands", post(api_command))
        .route("/api/todos", get(list_todos).post(create_todo))
        .route("/api/todos/{id}/toggle", post(toggle_todo))
        .route("/api/todos/{id}", delete(delete_todo))
        .with_state(state);
    with_common_layers(router)
}

pub async fn start_server(db: Database, bind: &str, port: u16) -> anyhow::Result<()> {
    let app = build_router(TodoState::new(db));
    super::serve(app, "todo app", bind, port).await
}
