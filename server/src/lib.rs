//! Todo list REST API backed by `SQLite`.
//!
//! # Overview
//! - `record` — the `Todo` entity and its JSON shape.
//! - `db` — the storage handle (connection pool) and schema migrations.
//! - `store` — CRUD and stats over the `todos` table.
//! - `api` — axum routes, input validation, and error translation.
//! - `config` / `seed` — the admin CLI behind the `todo-server` binary.
//!
//! # Design
//! The storage handle is built once by the caller and passed in through
//! [`app`], so tests can hand the router an in-memory database.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod record;
pub mod seed;
pub mod store;

use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

pub use api::{ApiError, AppState};
pub use axum::http::HeaderValue;
pub use db::{ConnectionConfig, Database};
pub use error::StoreError;
pub use record::{Todo, TodoStats};
pub use store::{NewTodo, TodoChanges, TodoStore};

/// Origin allowed to call `/api/*` when none is configured.
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";

/// Build the application router over `db`.
pub fn app(db: Database, cors_origin: HeaderValue) -> Router {
    let state = AppState {
        store: TodoStore::new(db),
    };
    api::router(state, cors_origin)
}

/// Serve `app` on `listener` until Ctrl-C.
pub async fn run(listener: TcpListener, app: Router) -> Result<(), std::io::Error> {
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => {
            warn!(error = %e, "cannot listen for Ctrl-C, serving until killed");
            std::future::pending::<()>().await;
        }
    }
}
