//! Todo persistence.
//!
//! # Design
//! `TodoStore` owns every SQL statement that touches the `todos` table. Its
//! methods are synchronous; the API layer runs them on the blocking pool.
//! Each call is one statement or one transaction, so a failure never leaves a
//! partial change behind.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings with microsecond
//! precision, which keeps `ORDER BY created_at` chronological. Deadlines are
//! stored as `YYYY-MM-DD` and always parsed back into `NaiveDate` before they
//! are compared.

use chrono::{DateTime, NaiveDate, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::ToSql;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, instrument};

use crate::db::Database;
use crate::error::{Result, StoreError};
use crate::record::{Todo, TodoStats};

const DATE_FORMAT: &str = "%Y-%m-%d";

const SELECT_TODO: &str =
    "SELECT id, text, deadline, completed, created_at, updated_at FROM todos";

/// Fields for a new todo. `text` is expected to be trimmed and non-empty.
#[derive(Clone, Debug, Default)]
pub struct NewTodo {
    pub text: String,
    pub deadline: Option<NaiveDate>,
    pub completed: bool,
}

/// A partial update. `None` leaves the column untouched; for `deadline`,
/// `Some(None)` clears it.
#[derive(Clone, Debug, Default)]
pub struct TodoChanges {
    pub text: Option<String>,
    pub deadline: Option<Option<NaiveDate>>,
    pub completed: Option<bool>,
}

/// CRUD access to the `todos` table.
#[derive(Clone)]
pub struct TodoStore {
    db: Database,
}

impl TodoStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// All todos, newest first.
    #[instrument(skip(self))]
    pub fn list_all(&self) -> Result<Vec<Todo>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{SELECT_TODO} ORDER BY created_at DESC, id DESC"
            ))?;
            let rows = stmt
                .query_map([], TodoRow::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter().map(TodoRow::into_todo).collect()
        })
    }

    #[instrument(skip(self))]
    pub fn get_by_id(&self, id: i64) -> Result<Todo> {
        self.db
            .with_conn(|conn| fetch(conn, id))?
            .ok_or(StoreError::NotFound(id))
    }

    #[instrument(skip(self, new), fields(text_len = new.text.chars().count()))]
    pub fn create(&self, new: &NewTodo) -> Result<Todo> {
        self.db.with_conn(|conn| {
            let now = now();
            let stamp = format_timestamp(now);
            conn.execute(
                "INSERT INTO todos (text, deadline, completed, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                params![new.text, new.deadline.map(format_date), new.completed, stamp],
            )?;
            let id = conn.last_insert_rowid();
            debug!(id, "todo created");
            Ok(Todo {
                id,
                text: new.text.clone(),
                deadline: new.deadline,
                completed: new.completed,
                created_at: now,
                updated_at: now,
            })
        })
    }

    /// Apply `changes` and refresh `updated_at`. An empty change set still
    /// counts as a mutation.
    #[instrument(skip(self, changes))]
    pub fn update(&self, id: i64, changes: &TodoChanges) -> Result<Todo> {
        self.db.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;

            let mut sets: Vec<&str> = Vec::new();
            let mut values: Vec<Box<dyn ToSql>> = Vec::new();
            if let Some(text) = &changes.text {
                sets.push("text = ?");
                values.push(Box::new(text.clone()));
            }
            if let Some(deadline) = changes.deadline {
                sets.push("deadline = ?");
                values.push(Box::new(deadline.map(format_date)));
            }
            if let Some(completed) = changes.completed {
                sets.push("completed = ?");
                values.push(Box::new(completed));
            }
            // updated_at never drops below created_at, even if the clock does.
            sets.push("updated_at = MAX(created_at, ?)");
            values.push(Box::new(format_timestamp(now())));
            values.push(Box::new(id));

            let sql = format!("UPDATE todos SET {} WHERE id = ?", sets.join(", "));
            let changed = tx.execute(&sql, rusqlite::params_from_iter(values.iter()))?;
            if changed == 0 {
                return Err(StoreError::NotFound(id));
            }

            let todo = fetch(&tx, id)?.ok_or(StoreError::NotFound(id))?;
            tx.commit()?;
            debug!(id, "todo updated");
            Ok(todo)
        })
    }

    #[instrument(skip(self))]
    pub fn delete(&self, id: i64) -> Result<()> {
        self.db.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM todos WHERE id = ?1", [id])?;
            if removed == 0 {
                return Err(StoreError::NotFound(id));
            }
            debug!(id, "todo deleted");
            Ok(())
        })
    }

    /// Counts as of `today`. A todo is overdue when it is incomplete and its
    /// deadline is strictly before `today`.
    #[instrument(skip(self))]
    pub fn stats(&self, today: NaiveDate) -> Result<TodoStats> {
        self.db.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;

            let (total, completed): (i64, i64) = tx.query_row(
                "SELECT COUNT(*), COALESCE(SUM(completed), 0) FROM todos",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;

            let mut stmt = tx.prepare(
                "SELECT deadline FROM todos WHERE completed = 0 AND deadline IS NOT NULL",
            )?;
            let deadlines = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            let mut overdue = 0;
            for raw in &deadlines {
                if parse_date(raw)? < today {
                    overdue += 1;
                }
            }

            let total = total as u64;
            let completed = completed as u64;
            Ok(TodoStats {
                total,
                completed,
                pending: total - completed,
                overdue,
            })
        })
    }
}

fn fetch(conn: &Connection, id: i64) -> Result<Option<Todo>> {
    conn.query_row(
        &format!("{SELECT_TODO} WHERE id = ?1"),
        [id],
        TodoRow::from_row,
    )
    .optional()?
    .map(TodoRow::into_todo)
    .transpose()
}

/// A `todos` row before its text columns are decoded.
struct TodoRow {
    id: i64,
    text: String,
    deadline: Option<String>,
    completed: bool,
    created_at: String,
    updated_at: String,
}

impl TodoRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            text: row.get(1)?,
            deadline: row.get(2)?,
            completed: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }

    fn into_todo(self) -> Result<Todo> {
        Ok(Todo {
            id: self.id,
            text: self.text,
            deadline: self.deadline.as_deref().map(parse_date).transpose()?,
            completed: self.completed,
            created_at: parse_timestamp(&self.created_at, "created_at")?,
            updated_at: parse_timestamp(&self.updated_at, "updated_at")?,
        })
    }
}

/// Current time at the precision the table stores.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str, column: &'static str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| StoreError::CorruptRow {
            table: "todos",
            column,
            detail: format!("invalid timestamp {raw:?}: {e}"),
        })
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|e| StoreError::CorruptRow {
        table: "todos",
        column: "deadline",
        detail: format!("invalid date {raw:?}: {e}"),
    })
}
