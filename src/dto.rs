use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::format::{self, ZodiacSign};
use crate::models::{Media, MediaStatus, MediaType, Person, StringList, Todo, TodoPriority};
use crate::views::DateRange;

/// Largest batch a single enrichment request may process
pub const MAX_BATCH: usize = 50;

/// Whether a string is an absolute http(s) URL
pub fn is_http_url(value: &str) -> bool {
    reqwest::Url::parse(value).is_ok_and(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
}

fn validate_rating(rating: Option<i32>) -> Result<(), String> {
    match rating {
        Some(r) if !(1..=10).contains(&r) => Err(format!("rating must be between 1 and 10, got {}", r)),
        _ => Ok(()),
    }
}

fn validate_url(url: Option<&str>) -> Result<(), String> {
    match url {
        Some(u) if !is_http_url(u) => Err(format!("url must be an http(s) URL, got {:?}", u)),
        _ => Ok(()),
    }
}

fn required(field: &str, value: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(format!("{} must not be empty", field));
    }
    Ok(trimmed.to_string())
}

fn default_status() -> MediaStatus {
    MediaStatus::Planned
}

/// Data transfer object for creating a media row
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CreateMediaDto {
    pub title: String,
    pub media_type: MediaType,
    #[serde(default = "default_status")]
    pub status: MediaStatus,
    #[serde(default)]
    pub rating: Option<i32>,
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub goodreads_id: Option<String>,
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(default)]
    pub creator: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub poster_url: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub started_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub finished_at: Option<NaiveDateTime>,
}

impl CreateMediaDto {
    /// Validates the payload and builds the row to insert
    ///
    /// ### Errors
    ///
    /// Returns a message suitable for a 400 response when the title is blank,
    /// the rating is outside 1..=10 or a URL is not http(s).
    pub fn into_media(self, user_id: &str) -> Result<Media, String> {
        let title = required("title", &self.title)?;
        validate_rating(self.rating)?;
        validate_url(self.url.as_deref())?;
        validate_url(self.poster_url.as_deref())?;

        let mut media = Media::new(user_id, title, self.media_type, self.status);
        media.rating = self.rating;
        media.imdb_id = self.imdb_id.map(|id| id.trim().to_string()).filter(|id| !id.is_empty());
        media.goodreads_id = self.goodreads_id;
        media.isbn = self.isbn;
        media.creator = self.creator;
        media.year = self.year;
        media.genres = StringList(self.genres);
        media.description = self.description;
        media.poster_url = self.poster_url;
        media.url = self.url;
        media.started_at = self.started_at;
        media.finished_at = self.finished_at;
        Ok(media)
    }
}

/// Data transfer object for a partial media update; absent fields are kept
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct UpdateMediaDto {
    pub title: Option<String>,
    pub media_type: Option<MediaType>,
    pub status: Option<MediaStatus>,
    pub rating: Option<i32>,
    pub imdb_id: Option<String>,
    pub goodreads_id: Option<String>,
    pub isbn: Option<String>,
    pub creator: Option<String>,
    pub year: Option<i32>,
    pub genres: Option<Vec<String>>,
    pub description: Option<String>,
    pub poster_url: Option<String>,
    pub url: Option<String>,
    pub started_at: Option<NaiveDateTime>,
    pub finished_at: Option<NaiveDateTime>,
}

impl UpdateMediaDto {
    /// Applies the present fields to `media`
    ///
    /// Moving to `completed` stamps `finished_at` when it is unset.
    pub fn apply(self, mut media: Media, now: NaiveDateTime) -> Result<Media, String> {
        if let Some(title) = self.title {
            media.title = required("title", &title)?;
        }
        validate_rating(self.rating)?;
        validate_url(self.url.as_deref())?;
        validate_url(self.poster_url.as_deref())?;

        if let Some(status) = self.status {
            if status == MediaStatus::Completed && media.status != MediaStatus::Completed && media.finished_at.is_none() {
                media.finished_at = Some(now);
            }
            if status == MediaStatus::InProgress && media.started_at.is_none() {
                media.started_at = Some(now);
            }
            media.status = status;
        }
        if let Some(media_type) = self.media_type {
            media.media_type = media_type;
        }
        media.rating = self.rating.or(media.rating);
        media.imdb_id = self.imdb_id.or(media.imdb_id);
        media.goodreads_id = self.goodreads_id.or(media.goodreads_id);
        media.isbn = self.isbn.or(media.isbn);
        media.creator = self.creator.or(media.creator);
        media.year = self.year.or(media.year);
        if let Some(genres) = self.genres {
            media.genres = StringList(genres);
        }
        media.description = self.description.or(media.description);
        media.poster_url = self.poster_url.or(media.poster_url);
        media.url = self.url.or(media.url);
        media.started_at = self.started_at.or(media.started_at);
        media.finished_at = self.finished_at.or(media.finished_at);
        Ok(media)
    }
}

/// Query string of `POST /media/{id}/fill-description`
#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(default)]
pub struct FillDescriptionQuery {
    /// Replace a description that already exists
    pub force: bool,
}

fn default_batch() -> usize {
    10
}

/// Body of the batch enrichment routes
#[derive(Serialize, Deserialize, Debug)]
pub struct BatchDto {
    #[serde(default = "default_batch")]
    pub limit: usize,
}

impl Default for BatchDto {
    fn default() -> Self {
        Self { limit: default_batch() }
    }
}

impl BatchDto {
    pub fn validated_limit(&self) -> Result<usize, String> {
        if self.limit == 0 || self.limit > MAX_BATCH {
            return Err(format!("limit must be between 1 and {}", MAX_BATCH));
        }
        Ok(self.limit)
    }
}

/// Query string of `GET /lookup/books`
#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(default)]
pub struct BookLookupQuery {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CreatePersonDto {
    pub name: String,
    #[serde(default)]
    pub relationship: Option<String>,
    #[serde(default)]
    pub birthday: Option<NaiveDate>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CreatePersonDto {
    pub fn into_person(self, user_id: &str) -> Result<Person, String> {
        let mut person = Person::new(user_id, required("name", &self.name)?);
        person.relationship = self.relationship;
        person.birthday = self.birthday;
        person.email = self.email;
        person.phone = self.phone;
        person.notes = self.notes;
        Ok(person)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct UpdatePersonDto {
    pub name: Option<String>,
    pub relationship: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub last_contacted: Option<NaiveDateTime>,
}

impl UpdatePersonDto {
    pub fn apply(self, mut person: Person) -> Result<Person, String> {
        if let Some(name) = self.name {
            person.name = required("name", &name)?;
        }
        person.relationship = self.relationship.or(person.relationship);
        person.birthday = self.birthday.or(person.birthday);
        person.email = self.email.or(person.email);
        person.phone = self.phone.or(person.phone);
        person.notes = self.notes.or(person.notes);
        person.last_contacted = self.last_contacted.or(person.last_contacted);
        Ok(person)
    }
}

/// A person with the values derived from their birthday
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PersonView {
    #[serde(flatten)]
    pub person: Person,
    pub zodiac: Option<ZodiacSign>,
    pub zodiac_symbol: Option<char>,
    pub age: Option<u32>,
    pub next_birthday: Option<NaiveDate>,
    pub days_until_birthday: Option<i64>,
}

impl PersonView {
    pub fn new(person: Person, today: NaiveDate) -> Self {
        let birthday = person.birthday;
        let zodiac = birthday.map(format::zodiac_sign);
        let next_birthday = birthday.and_then(|b| format::next_birthday(b, today));
        Self {
            zodiac,
            zodiac_symbol: zodiac.map(|z| z.symbol()),
            age: birthday.and_then(|b| format::age_on(b, today)),
            next_birthday,
            days_until_birthday: next_birthday.map(|d| format::days_until(d, today)),
            person,
        }
    }
}

fn default_birthday_window() -> i64 {
    30
}

/// Query string of `GET /people/birthdays`
#[derive(Serialize, Deserialize, Debug)]
pub struct BirthdaysQuery {
    #[serde(default = "default_birthday_window")]
    pub days: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CreateTodoDto {
    pub title: String,
    #[serde(default)]
    pub due: Option<NaiveDate>,
    #[serde(default)]
    pub priority: Option<TodoPriority>,
}

impl CreateTodoDto {
    pub fn into_todo(self, user_id: &str) -> Result<Todo, String> {
        let mut todo = Todo::new(user_id, required("title", &self.title)?);
        todo.due = self.due;
        todo.priority = self.priority;
        Ok(todo)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct UpdateTodoDto {
    pub title: Option<String>,
    pub done: Option<bool>,
    pub due: Option<NaiveDate>,
    pub priority: Option<TodoPriority>,
}

impl UpdateTodoDto {
    /// Applies the present fields; `completed_at` follows `done`
    pub fn apply(self, mut todo: Todo, now: NaiveDateTime) -> Result<Todo, String> {
        if let Some(title) = self.title {
            todo.title = required("title", &title)?;
        }
        if let Some(done) = self.done {
            set_done(&mut todo, done, now);
        }
        todo.due = self.due.or(todo.due);
        todo.priority = self.priority.or(todo.priority);
        Ok(todo)
    }
}

/// Sets `done`, stamping `completed_at` on the transition to done
pub fn set_done(todo: &mut Todo, done: bool, now: NaiveDateTime) {
    if done && !todo.done {
        todo.completed_at = Some(now);
    }
    if !done {
        todo.completed_at = None;
    }
    todo.done = done;
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CreateTrackingDto {
    pub metric: String,
    pub value: f64,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    /// Defaults to now
    #[serde(default)]
    pub recorded_at: Option<NaiveDateTime>,
}

impl CreateTrackingDto {
    pub fn into_entry(self, user_id: &str, now: NaiveDateTime) -> Result<crate::models::TrackingEntry, String> {
        let metric = required("metric", &self.metric)?.to_lowercase();
        if !self.value.is_finite() {
            return Err("value must be a finite number".to_string());
        }
        let mut entry = crate::models::TrackingEntry::new(user_id, metric, self.value, self.recorded_at.unwrap_or(now));
        entry.unit = self.unit;
        entry.note = self.note;
        Ok(entry)
    }
}

/// Query string of the tracking list and summary routes
#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(default)]
pub struct TrackingQuery {
    pub metric: Option<String>,
    pub range: DateRange,
}

/// Query string of `GET /youtube/history`
#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(default)]
pub struct HistoryQuery {
    pub q: Option<String>,
    pub range: DateRange,
}

fn default_top() -> usize {
    10
}

/// Query string of `GET /youtube/stats`
#[derive(Serialize, Deserialize, Debug)]
pub struct StatsQuery {
    #[serde(default)]
    pub range: DateRange,
    #[serde(default = "default_top")]
    pub top: usize,
}

/// Query string Spotify redirects back with
#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(default)]
pub struct SpotifyCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

fn default_recent() -> u32 {
    20
}

#[derive(Serialize, Deserialize, Debug)]
pub struct RecentQuery {
    #[serde(default = "default_recent")]
    pub limit: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LoginResponse {
    pub url: String,
}

/// Query string of `GET /finances/summary`
#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(default)]
pub struct FinanceQuery {
    /// `YYYY-MM`
    pub month: Option<String>,
}

fn default_palette_size() -> usize {
    5
}

/// Body of `POST /palette`
#[derive(Serialize, Deserialize, Debug)]
pub struct PaletteDto {
    pub url: String,
    #[serde(default = "default_palette_size")]
    pub count: usize,
}

impl PaletteDto {
    pub fn validate(&self) -> Result<(), String> {
        validate_url(Some(&self.url))?;
        if !(1..=16).contains(&self.count) {
            return Err("count must be between 1 and 16".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
