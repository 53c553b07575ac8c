use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::properties;
use super::Page;
use crate::models::{Media, Todo, TodoPriority};

/// Names of the workspace properties each stored field lives under
///
/// Every field has exactly one property name. A page that lacks the named
/// property simply has no value for that field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PropertyMapping {
    pub media_title: String,
    pub media_synopsis: String,
    pub media_status: String,
    pub media_type: String,
    pub media_rating: String,
    pub media_imdb: String,
    pub media_poster: String,
    pub media_year: String,
    pub media_genres: String,
    pub todo_title: String,
    pub todo_done: String,
    pub todo_due: String,
    pub todo_priority: String,
    pub finance_title: String,
    pub finance_amount: String,
    pub finance_category: String,
    pub finance_date: String,
}

impl Default for PropertyMapping {
    fn default() -> Self {
        Self {
            media_title: "Name".to_string(),
            media_synopsis: "Synopsis".to_string(),
            media_status: "Status".to_string(),
            media_type: "Type".to_string(),
            media_rating: "Rating".to_string(),
            media_imdb: "IMDb".to_string(),
            media_poster: "Poster".to_string(),
            media_year: "Year".to_string(),
            media_genres: "Genres".to_string(),
            todo_title: "Name".to_string(),
            todo_done: "Done".to_string(),
            todo_due: "Due".to_string(),
            todo_priority: "Priority".to_string(),
            finance_title: "Name".to_string(),
            finance_amount: "Amount".to_string(),
            finance_category: "Category".to_string(),
            finance_date: "Date".to_string(),
        }
    }
}

/// A todo as read from a workspace page
#[derive(Debug, Clone, PartialEq)]
pub struct WorkspaceTodo {
    pub page_id: String,
    pub title: String,
    pub done: bool,
    pub due: Option<NaiveDate>,
    pub priority: Option<TodoPriority>,
    pub archived: bool,
}

/// A finance transaction as read from a workspace page
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub page_id: String,
    pub title: Option<String>,
    pub amount: f64,
    pub category: Option<String>,
    pub date: Option<NaiveDate>,
}

/// Select option name a priority is written as
fn priority_label(priority: TodoPriority) -> &'static str {
    match priority {
        TodoPriority::Low => "Low",
        TodoPriority::Medium => "Medium",
        TodoPriority::High => "High",
    }
}

impl PropertyMapping {
    /// Properties for a media page; unset fields are left out
    pub fn media_properties(&self, media: &Media) -> Map<String, Value> {
        let mut props = Map::new();
        props.insert(self.media_title.clone(), properties::title_value(&media.title));
        props.insert(self.media_status.clone(), properties::select_value(media.status.as_str()));
        props.insert(self.media_type.clone(), properties::select_value(media.media_type.as_str()));
        if let Some(description) = &media.description {
            props.insert(self.media_synopsis.clone(), properties::rich_text_value(description));
        }
        if let Some(rating) = media.rating {
            props.insert(self.media_rating.clone(), properties::number_value(f64::from(rating)));
        }
        if let Some(imdb_id) = &media.imdb_id {
            props.insert(self.media_imdb.clone(), properties::rich_text_value(imdb_id));
        }
        if let Some(poster) = &media.poster_url {
            props.insert(self.media_poster.clone(), properties::url_value(poster));
        }
        if let Some(year) = media.year {
            props.insert(self.media_year.clone(), properties::number_value(f64::from(year)));
        }
        if !media.genres.0.is_empty() {
            props.insert(self.media_genres.clone(), properties::multi_select_value(&media.genres.0));
        }
        props
    }

    /// Only the synopsis property, for description write-back
    pub fn synopsis_properties(&self, description: &str) -> Map<String, Value> {
        let mut props = Map::new();
        props.insert(self.media_synopsis.clone(), properties::rich_text_value(description));
        props
    }

    /// Properties pushed back when a synced todo changes locally
    pub fn todo_properties(&self, todo: &Todo) -> Map<String, Value> {
        let mut props = Map::new();
        props.insert(self.todo_title.clone(), properties::title_value(&todo.title));
        props.insert(self.todo_done.clone(), properties::checkbox_value(todo.done));
        props.insert(
            self.todo_due.clone(),
            todo.due.map_or_else(properties::empty_date_value, properties::date_value),
        );
        props.insert(
            self.todo_priority.clone(),
            todo.priority
                .map_or_else(properties::empty_select_value, |p| properties::select_value(priority_label(p))),
        );
        props
    }

    /// Reads a todo from a page; `None` when the page has no title
    pub fn todo_from_page(&self, page: &Page) -> Option<WorkspaceTodo> {
        let title = page.text(&self.todo_title)?;
        Some(WorkspaceTodo {
            page_id: page.id.clone(),
            title,
            done: page.property(&self.todo_done).and_then(properties::checkbox).unwrap_or(false),
            due: page.property(&self.todo_due).and_then(properties::date_start),
            priority: page.text(&self.todo_priority).and_then(|p| p.parse().ok()),
            archived: page.archived,
        })
    }

    /// Reads a transaction; `None` when the page has no amount
    pub fn transaction_from_page(&self, page: &Page) -> Option<Transaction> {
        let amount = page.property(&self.finance_amount).and_then(properties::number)?;
        Some(Transaction {
            page_id: page.id.clone(),
            title: page.text(&self.finance_title),
            amount,
            category: page.text(&self.finance_category),
            date: page.property(&self.finance_date).and_then(properties::date_start),
        })
    }
}
