pub mod todo;
pub mod weather;

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex, PoisonError};

use axum::{
    Json, Router,
    extract::Request,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
};
use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;
use tower_http::limit::RequestBodyLimitLayer;

use dashkit_core::error::AppError;
use dashkit_core::view::{Node, render_document};

const BODY_LIMIT: usize = 64 * 1024; // 64 KB

pub const SESSION_COOKIE: &str = "dashkit_session";

/// Sessions kept before the least recently used one is dropped.
pub const MAX_SESSIONS: usize = 1024;

// --- Sessions ---

struct SessionEntry<S> {
    state: Arc<AsyncMutex<S>>,
    last_used: u64,
}

struct Sessions<S> {
    entries: HashMap<String, SessionEntry<S>>,
    tick: u64,
}

/// Per-client session states keyed by cookie id. Each state sits behind its
/// own async mutex so commands for one client run one at a time.
pub struct SessionStore<S> {
    inner: Mutex<Sessions<S>>,
    capacity: usize,
}

impl<S> SessionStore<S> {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Sessions {
                entries: HashMap::new(),
                tick: 0,
            }),
            capacity: capacity.max(1),
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<AsyncMutex<S>>> {
        let mut sessions = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        sessions.tick += 1;
        let tick = sessions.tick;
        sessions.entries.get_mut(id).map(|entry| {
            entry.last_used = tick;
            Arc::clone(&entry.state)
        })
    }

    /// Store a new session under a fresh id, evicting the stalest when full.
    pub fn insert(&self, state: S) -> (String, Arc<AsyncMutex<S>>) {
        let id = random_hex();
        let state = Arc::new(AsyncMutex::new(state));
        let mut sessions = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        if sessions.entries.len() >= self.capacity {
            let stalest = sessions
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(id, _)| id.clone());
            if let Some(stalest) = stalest {
                sessions.entries.remove(&stalest);
                tracing::debug!("session store full, evicted least recently used session");
            }
        }

        sessions.tick += 1;
        let last_used = sessions.tick;
        sessions.entries.insert(
            id.clone(),
            SessionEntry {
                state: Arc::clone(&state),
                last_used,
            },
        );
        (id, state)
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }
}

/// 32 random bytes as lowercase hex.
fn random_hex() -> String {
    use rand::Rng;

    let bytes: [u8; 32] = rand::rng().random();
    bytes
        .iter()
        .fold(String::with_capacity(64), |mut acc: String, b| {
            let _ = write!(acc, "{b:02x}");
            acc
        })
}

fn session_id(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value)
}

/// The caller's session, plus the cookie to set when it was just created.
pub struct SessionHandle<S> {
    pub state: Arc<AsyncMutex<S>>,
    new_cookie: Option<HeaderValue>,
}

impl<S> SessionHandle<S> {
    /// Resolve the cookie to a live session, or create one with `init`.
    pub fn resolve(
        store: &SessionStore<S>,
        headers: &HeaderMap,
        init: impl FnOnce() -> Result<S, AppError>,
    ) -> Result<Self, ApiError> {
        if let Some(state) = session_id(headers).and_then(|id| store.get(id)) {
            return Ok(Self {
                state,
                new_cookie: None,
            });
        }
        let (id, state) = store.insert(init()?);
        let cookie = format!("{SESSION_COOKIE}={id}; HttpOnly; SameSite=Lax; Path=/");
        Ok(Self {
            state,
            new_cookie: HeaderValue::from_str(&cookie).ok(),
        })
    }

    pub fn respond(self, response: impl IntoResponse) -> Response {
        let mut response = response.into_response();
        if let Some(cookie) = self.new_cookie {
            response.headers_mut().insert(header::SET_COOKIE, cookie);
        }
        response
    }
}

// --- Responses ---

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    App(AppError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::App(AppError::Validation(msg)) => (StatusCode::BAD_REQUEST, msg),
            Self::App(AppError::Config(msg)) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            Self::App(AppError::Upstream(msg)) => (StatusCode::BAD_GATEWAY, msg),
            Self::App(AppError::Persistence(err)) => {
                tracing::error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self::App(err)
    }
}

/// Full HTML document for a page tree.
fn page(title: &str, tree: &Node) -> Html<String> {
    Html(render_document(title, tree))
}

/// Post/redirect/get back to the page.
fn back_home() -> Response {
    (StatusCode::SEE_OTHER, [(header::LOCATION, "/")]).into_response()
}

// --- Middleware ---

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static(
            "default-src 'none'; style-src 'unsafe-inline'; img-src https://openweathermap.org; form-action 'self'",
        ),
    );
    response
}

fn with_common_layers(router: Router) -> Router {
    router
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
}

// --- Server startup ---

pub async fn serve(app: Router, name: &str, bind: &str, port: u16) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}")).await?;
    tracing::info!(app = name, %bind, port, "server started");
    eprintln!("{name} listening on http://{bind}:{port}");
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashkit_core::db::DbError;
    use http_body_util::BodyExt;

    #[test]
    fn session_store_evicts_least_recently_used() {
        let store = SessionStore::new(2);
        let (a, _) = store.insert(1);
        let (b, _) = store.insert(2);
        assert!(store.get(&a).is_some());

        let (c, _) = store.insert(3);
        assert_eq!(store.len(), 2);
        assert!(store.get(&b).is_none());
        assert!(store.get(&a).is_some());
        assert!(store.get(&c).is_some());
    }

    #[test]
    fn session_ids_are_unique_hex() {
        let a = random_hex();
        let b = random_hex();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn session_id_parsed_from_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; dashkit_session=abc123; other=1"),
        );
        assert_eq!(session_id(&headers), Some("abc123"));
        assert_eq!(session_id(&HeaderMap::new()), None);
    }

    #[test]
    fn resolve_creates_then_reuses_session() {
        let store = SessionStore::new(4);
        let handle = SessionHandle::resolve(&store, &HeaderMap::new(), || Ok(7)).unwrap();
        let cookie = handle.new_cookie.clone().unwrap();
        let cookie = cookie.to_str().unwrap();
        assert!(cookie.contains("HttpOnly"));

        let pair = cookie.split(';').next().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(pair).unwrap());
        let again = SessionHandle::resolve(&store, &headers, || Ok(8)).unwrap();
        assert!(again.new_cookie.is_none());
        assert!(Arc::ptr_eq(&handle.state, &again.state));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn error_statuses() {
        let cases = [
            (AppError::validation("bad"), StatusCode::BAD_REQUEST),
            (AppError::Config("no key".to_string()), StatusCode::SERVICE_UNAVAILABLE),
            (AppError::upstream("HTTP 500"), StatusCode::BAD_GATEWAY),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
        assert_eq!(
            ApiError::NotFound("gone".to_string()).into_response().status(),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn internal_error_does_not_leak_details() {
        let err = AppError::Persistence(DbError::QueryReturnedNoRows);
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Internal server error");
    }
}
