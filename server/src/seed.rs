//! Sample data for local development.

use chrono::{Days, NaiveDate};
use tracing::info;

use crate::error::Result;
use crate::record::Todo;
use crate::store::{NewTodo, TodoStore};

/// The sample todos, with deadlines relative to `today`. One is overdue and
/// one is already completed.
pub fn sample_todos(today: NaiveDate) -> Vec<NewTodo> {
    let plus = |days| today.checked_add_days(Days::new(days));
    vec![
        NewTodo {
            text: "Learn Axum and REST APIs".to_string(),
            deadline: plus(3),
            completed: false,
        },
        NewTodo {
            text: "Build a web frontend".to_string(),
            deadline: plus(5),
            completed: false,
        },
        NewTodo {
            text: "Study SQLite schema design".to_string(),
            deadline: today.checked_sub_days(Days::new(1)),
            completed: false,
        },
        NewTodo {
            text: "Set up the development environment".to_string(),
            deadline: None,
            completed: true,
        },
        NewTodo {
            text: "Deploy to production".to_string(),
            deadline: plus(10),
            completed: false,
        },
    ]
}

/// Insert [`sample_todos`] into `store`.
pub fn seed(store: &TodoStore, today: NaiveDate) -> Result<Vec<Todo>> {
    let created = sample_todos(today)
        .iter()
        .map(|new| store.create(new))
        .collect::<Result<Vec<_>>>()?;
    info!(count = created.len(), "sample todos added");
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::record::TodoStats;

    #[test]
    fn seeded_store_has_one_overdue_and_one_completed() {
        let store = TodoStore::new(Database::in_memory().unwrap());
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();

        let created = seed(&store, today).unwrap();
        assert_eq!(created.len(), 5);
        assert_eq!(
            store.stats(today).unwrap(),
            TodoStats {
                total: 5,
                completed: 1,
                pending: 4,
                overdue: 1,
            }
        );
    }
}
