//! HTTP routes for the todo API.
//!
//! # Design
//! Handlers validate input, call the store on the blocking pool, and map the
//! outcome into a status code. Every error body is `{"error": "<message>"}`.
//! Extractor rejections are taken as `Result` so malformed input yields the
//! same JSON shape as our own validation failures.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;
use thiserror::Error;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, warn};

use crate::error::StoreError;
use crate::record::{Todo, TodoStats, MAX_TEXT_LEN};
use crate::store::{NewTodo, TodoChanges, TodoStore};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: TodoStore,
}

/// Request body for `POST /api/todos`.
#[derive(Debug, Deserialize)]
pub struct CreateTodoRequest {
    pub text: Option<String>,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub completed: Option<bool>,
}

/// Request body for `PUT /api/todos/{id}`. Only the fields present in the
/// JSON are applied; `"deadline": null` clears the deadline.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTodoRequest {
    pub text: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub deadline: Option<Option<NaiveDate>>,
    pub completed: Option<bool>,
}

/// Distinguishes an explicit `null` from an absent field.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    message: &'static str,
}

/// Errors a handler can return. Translated to a status code in
/// `into_response` and nowhere else.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("Todo not found")]
    NotFound,

    #[error("Endpoint not found")]
    EndpointNotFound,

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error(transparent)]
    Storage(StoreError),

    #[error("{0}")]
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => ApiError::NotFound,
            other => ApiError::Storage(other),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(match rejection {
            JsonRejection::MissingJsonContentType(_) => {
                "Request body must be JSON (Content-Type: application/json)".to_string()
            }
            other => format!("Invalid request body: {}", other.body_text()),
        })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound | ApiError::EndpointNotFound => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            ApiError::MethodNotAllowed => (StatusCode::METHOD_NOT_ALLOWED, self.to_string()),
            ApiError::Storage(err) => {
                error!(error = %err, "storage failure");
                internal_error()
            }
            ApiError::Internal(msg) => {
                error!(error = %msg, "internal failure");
                internal_error()
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

fn internal_error() -> (StatusCode, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

/// Build the router. CORS applies only under `/api`, and only requests whose
/// `Origin` is `cors_origin` get CORS headers back.
pub fn router(state: AppState, cors_origin: HeaderValue) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list([cors_origin]))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    let api = Router::new()
        .route("/todos", get(list_todos).post(create_todo))
        .route("/todos/stats", get(todo_stats))
        .route(
            "/todos/{id}",
            get(get_todo).put(update_todo).delete(delete_todo),
        )
        .route("/health", get(health))
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(endpoint_not_found)
        .layer(cors);

    Router::new()
        .nest("/api", api)
        .fallback(endpoint_not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state)
}

fn handle_panic(_: Box<dyn std::any::Any + Send + 'static>) -> Response {
    error!("handler panicked");
    let (status, message) = internal_error();
    (status, Json(json!({ "error": message }))).into_response()
}

async fn endpoint_not_found() -> ApiError {
    ApiError::EndpointNotFound
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

/// Run a store call on the blocking pool.
async fn with_store<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&TodoStore) -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    let store = state.store.clone();
    tokio::task::spawn_blocking(move || f(&store))
        .await
        .map_err(|e| ApiError::Internal(format!("store task failed: {e}")))?
        .map_err(ApiError::from)
}

/// Ids that are not integers behave like an unknown route.
fn todo_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, ApiError> {
    path.map(|Path(id)| id).map_err(|rejection| {
        warn!(%rejection, "unroutable todo id");
        ApiError::EndpointNotFound
    })
}

/// Trim `text` and enforce the non-empty and length rules.
fn validate_text(text: &str) -> Result<String, ApiError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ApiError::Validation("Text cannot be empty".to_string()));
    }
    if trimmed.chars().count() > MAX_TEXT_LEN {
        return Err(ApiError::Validation(format!(
            "Text cannot exceed {MAX_TEXT_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

async fn list_todos(State(state): State<AppState>) -> Result<Json<Vec<Todo>>, ApiError> {
    with_store(&state, TodoStore::list_all).await.map(Json)
}

async fn get_todo(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Todo>, ApiError> {
    let id = todo_id(path)?;
    with_store(&state, move |store| store.get_by_id(id))
        .await
        .map(Json)
}

async fn create_todo(
    State(state): State<AppState>,
    body: Result<Json<CreateTodoRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Todo>), ApiError> {
    let Json(input) = body?;
    let text = input
        .text
        .ok_or_else(|| ApiError::Validation("Text field is required".to_string()))?;
    let new = NewTodo {
        text: validate_text(&text)?,
        deadline: input.deadline,
        completed: input.completed.unwrap_or(false),
    };
    let todo = with_store(&state, move |store| store.create(&new)).await?;
    Ok((StatusCode::CREATED, Json(todo)))
}

async fn update_todo(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<UpdateTodoRequest>, JsonRejection>,
) -> Result<Json<Todo>, ApiError> {
    let id = todo_id(path)?;
    let Json(input) = body?;
    let changes = TodoChanges {
        text: input.text.as_deref().map(validate_text).transpose()?,
        deadline: input.deadline,
        completed: input.completed,
    };
    with_store(&state, move |store| store.update(id, &changes))
        .await
        .map(Json)
}

async fn delete_todo(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let id = todo_id(path)?;
    with_store(&state, move |store| store.delete(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn todo_stats(State(state): State<AppState>) -> Result<Json<TodoStats>, ApiError> {
    let today = Utc::now().date_naive();
    with_store(&state, move |store| store.stats(today))
        .await
        .map(Json)
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        message: "Server is running",
    })
}
