//! The todo record and its wire representation.
//!
//! # Design
//! `Todo` is plain data. It carries no validation: the API layer checks
//! input at the boundary before anything reaches the store. Dates serialize
//! through chrono's serde support, so `deadline` is `YYYY-MM-DD` (or null)
//! and the timestamps are RFC 3339 UTC strings.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Longest `text` the store accepts, counted in characters after trimming.
pub const MAX_TEXT_LEN: usize = 500;

/// A single todo item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: i64,
    pub text: String,
    pub deadline: Option<NaiveDate>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Aggregate counts returned by `GET /api/todos/stats`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoStats {
    pub total: u64,
    pub completed: u64,
    pub pending: u64,
    pub overdue: u64,
}
