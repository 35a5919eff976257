//! Stateless HTTP request builder and response parser for the todo API.
//!
//! # Design
//! `TodoClient` holds only a `base_url` and carries no mutable state between
//! calls. Each operation is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`.
//! The caller executes the actual HTTP round-trip.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{CreateTodo, Health, Todo, TodoStats, UpdateTodo};

/// Synchronous, stateless client for the todo API.
#[derive(Debug, Clone)]
pub struct TodoClient {
    base_url: String,
}

impl TodoClient {
    /// `base_url` includes the API prefix, e.g. `http://localhost:5000/api`.
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn build_list_todos(&self) -> HttpRequest {
        HttpRequest::bodiless(HttpMethod::Get, format!("{}/todos", self.base_url))
    }

    pub fn build_get_todo(&self, id: i64) -> HttpRequest {
        HttpRequest::bodiless(HttpMethod::Get, format!("{}/todos/{id}", self.base_url))
    }

    pub fn build_create_todo(&self, input: &CreateTodo) -> Result<HttpRequest, ApiError> {
        Ok(HttpRequest::json(
            HttpMethod::Post,
            format!("{}/todos", self.base_url),
            to_json(input)?,
        ))
    }

    pub fn build_update_todo(&self, id: i64, input: &UpdateTodo) -> Result<HttpRequest, ApiError> {
        Ok(HttpRequest::json(
            HttpMethod::Put,
            format!("{}/todos/{id}", self.base_url),
            to_json(input)?,
        ))
    }

    pub fn build_delete_todo(&self, id: i64) -> HttpRequest {
        HttpRequest::bodiless(HttpMethod::Delete, format!("{}/todos/{id}", self.base_url))
    }

    pub fn build_stats(&self) -> HttpRequest {
        HttpRequest::bodiless(HttpMethod::Get, format!("{}/todos/stats", self.base_url))
    }

    pub fn build_health(&self) -> HttpRequest {
        HttpRequest::bodiless(HttpMethod::Get, format!("{}/health", self.base_url))
    }

    pub fn parse_list_todos(&self, response: HttpResponse) -> Result<Vec<Todo>, ApiError> {
        check_status(&response, 200)?;
        from_json(&response.body)
    }

    pub fn parse_get_todo(&self, response: HttpResponse) -> Result<Todo, ApiError> {
        check_status(&response, 200)?;
        from_json(&response.body)
    }

    pub fn parse_create_todo(&self, response: HttpResponse) -> Result<Todo, ApiError> {
        check_status(&response, 201)?;
        from_json(&response.body)
    }

    pub fn parse_update_todo(&self, response: HttpResponse) -> Result<Todo, ApiError> {
        check_status(&response, 200)?;
        from_json(&response.body)
    }

    pub fn parse_delete_todo(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response, 204)
    }

    pub fn parse_stats(&self, response: HttpResponse) -> Result<TodoStats, ApiError> {
        check_status(&response, 200)?;
        from_json(&response.body)
    }

    pub fn parse_health(&self, response: HttpResponse) -> Result<Health, ApiError> {
        check_status(&response, 200)?;
        from_json(&response.body)
    }
}

fn to_json<T: Serialize>(input: &T) -> Result<String, ApiError> {
    serde_json::to_string(input).map_err(|e| ApiError::SerializationError(e.to_string()))
}

fn from_json<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::DeserializationError(e.to_string()))
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse, expected: u16) -> Result<(), ApiError> {
    if response.status == expected {
        return Ok(());
    }
    if response.status == 404 {
        return Err(ApiError::NotFound);
    }
    Err(ApiError::HttpError {
        status: response.status,
        message: error_message(&response.body),
    })
}

/// The `error` field of a `{"error": "..."}` body, or the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("error")?.as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const TODO_JSON: &str = r#"{"id":1,"text":"Test","deadline":null,"completed":false,
        "created_at":"2026-10-16T09:30:00.000000Z","updated_at":"2026-10-16T09:30:00.000000Z"}"#;

    fn client() -> TodoClient {
        TodoClient::new("http://localhost:5000/api")
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    #[test]
    fn build_list_todos_produces_correct_request() {
        let req = client().build_list_todos();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.path, "http://localhost:5000/api/todos");
        assert!(req.body.is_none());
        assert!(req.headers.is_empty());
    }

    #[test]
    fn build_get_todo_produces_correct_request() {
        let req = client().build_get_todo(42);
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.path, "http://localhost:5000/api/todos/42");
    }

    #[test]
    fn build_create_todo_produces_correct_request() {
        let input = CreateTodo {
            text: "Buy milk".to_string(),
            deadline: None,
            completed: false,
        };
        let req = client().build_create_todo(&input).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, "http://localhost:5000/api/todos");
        assert_eq!(
            req.headers,
            vec![("content-type".to_string(), "application/json".to_string())]
        );
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, serde_json::json!({"text": "Buy milk", "completed": false}));
    }

    #[test]
    fn build_create_todo_sends_deadline_as_date() {
        let input = CreateTodo {
            text: "Taxes".to_string(),
            deadline: NaiveDate::from_ymd_opt(2027, 4, 15),
            completed: false,
        };
        let req = client().build_create_todo(&input).unwrap();
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["deadline"], "2027-04-15");
    }

    #[test]
    fn build_update_todo_sends_only_present_fields() {
        let input = UpdateTodo {
            text: Some("Updated".to_string()),
            ..UpdateTodo::default()
        };
        let req = client().build_update_todo(3, &input).unwrap();
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.path, "http://localhost:5000/api/todos/3");
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, serde_json::json!({"text": "Updated"}));
    }

    #[test]
    fn build_update_todo_can_clear_deadline() {
        let input = UpdateTodo {
            deadline: Some(None),
            ..UpdateTodo::default()
        };
        let req = client().build_update_todo(3, &input).unwrap();
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, serde_json::json!({"deadline": null}));
    }

    #[test]
    fn build_delete_stats_and_health() {
        let c = client();
        let req = c.build_delete_todo(9);
        assert_eq!(req.method, HttpMethod::Delete);
        assert!(req.body.is_none());
        assert_eq!(c.build_stats().path, "http://localhost:5000/api/todos/stats");
        assert_eq!(c.build_health().path, "http://localhost:5000/api/health");
    }

    #[test]
    fn parse_list_todos_success() {
        let todos = client()
            .parse_list_todos(response(200, &format!("[{TODO_JSON}]")))
            .unwrap();
        assert_eq!(todos.len(), 1);
        assert_eq!(todos[0].text, "Test");
        assert!(todos[0].deadline.is_none());
    }

    #[test]
    fn parse_get_todo_not_found() {
        let err = client()
            .parse_get_todo(response(404, r#"{"error":"Todo not found"}"#))
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound));
    }

    #[test]
    fn parse_create_todo_success() {
        let todo = client().parse_create_todo(response(201, TODO_JSON)).unwrap();
        assert_eq!(todo.id, 1);
        assert_eq!(todo.created_at, todo.updated_at);
    }

    #[test]
    fn parse_create_todo_validation_error_carries_message() {
        let err = client()
            .parse_create_todo(response(400, r#"{"error":"Text cannot be empty"}"#))
            .unwrap_err();
        match err {
            ApiError::HttpError { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Text cannot be empty");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn parse_error_without_json_body_keeps_raw_text() {
        let err = client()
            .parse_create_todo(response(502, "bad gateway"))
            .unwrap_err();
        assert!(matches!(err, ApiError::HttpError { status: 502, message } if message == "bad gateway"));
    }

    #[test]
    fn parse_delete_todo_success_and_not_found() {
        assert!(client().parse_delete_todo(response(204, "")).is_ok());
        let err = client().parse_delete_todo(response(404, "")).unwrap_err();
        assert!(matches!(err, ApiError::NotFound));
    }

    #[test]
    fn parse_stats_success() {
        let stats = client()
            .parse_stats(response(
                200,
                r#"{"total":3,"completed":1,"pending":2,"overdue":1}"#,
            ))
            .unwrap();
        assert_eq!(
            stats,
            TodoStats {
                total: 3,
                completed: 1,
                pending: 2,
                overdue: 1
            }
        );
    }

    #[test]
    fn parse_health_success() {
        let health = client()
            .parse_health(response(200, r#"{"status":"ok","message":"Server is running"}"#))
            .unwrap();
        assert_eq!(health.status, "ok");
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let client = TodoClient::new("http://localhost:5000/api/");
        let req = client.build_list_todos();
        assert_eq!(req.path, "http://localhost:5000/api/todos");
    }

    #[test]
    fn parse_list_todos_bad_json() {
        let err = client().parse_list_todos(response(200, "not json")).unwrap_err();
        assert!(matches!(err, ApiError::DeserializationError(_)));
    }
}
