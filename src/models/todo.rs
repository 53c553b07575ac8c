use chrono::{NaiveDate, NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::TodoPriority;

/// A todo, either created locally or pulled from the workspace todo database
#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::todos)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct Todo {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub done: bool,
    pub due: Option<NaiveDate>,
    pub priority: Option<TodoPriority>,
    /// Set when the todo mirrors a workspace page
    pub notion_page_id: Option<String>,
    pub completed_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Todo {
    /// Creates a new, open todo
    pub fn new(user_id: &str, title: String) -> Self {
        let now = Utc::now().naive_utc();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title,
            done: false,
            due: None,
            priority: None,
            notion_page_id: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the todo is open and its due date has passed
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.done && self.due.is_some_and(|due| due < today)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_overdue() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let mut todo = Todo::new("user-1", "Pay rent".to_string());
        assert!(!todo.is_overdue(today));

        todo.due = NaiveDate::from_ymd_opt(2024, 5, 9);
        assert!(todo.is_overdue(today));

        todo.done = true;
        assert!(!todo.is_overdue(today));

        todo.done = false;
        todo.due = Some(today);
        assert!(!todo.is_overdue(today));
    }
}
