//! Filtering, sorting, grouping and summaries over list results.
//!
//! Everything here works on rows already loaded for one user and takes the
//! current time as an argument.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::format::{self, ZodiacSign};
use crate::models::{Media, MediaStatus, MediaType, Person, Todo, TrackingEntry, YoutubeWatch};
use crate::workspace::Transaction;

/// A window of time ending now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateRange {
    /// The current calendar day
    Today,
    /// The last 7 days
    Week,
    /// The last 30 days
    Month,
    /// The last 365 days
    Year,
    #[default]
    All,
}

impl DateRange {
    /// Earliest timestamp inside the range; `None` for `All`
    pub fn start(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        match self {
            DateRange::Today => now.date().and_hms_opt(0, 0, 0),
            DateRange::Week => Some(now - Duration::days(7)),
            DateRange::Month => Some(now - Duration::days(30)),
            DateRange::Year => Some(now - Duration::days(365)),
            DateRange::All => None,
        }
    }

    pub fn contains(&self, timestamp: NaiveDateTime, now: NaiveDateTime) -> bool {
        match self {
            DateRange::Today => timestamp.date() == now.date(),
            _ => self.start(now).is_none_or(|start| timestamp >= start),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Title,
    Created,
    #[default]
    Updated,
    Rating,
    Year,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Filters and ordering for the media list
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaQuery {
    /// Case-insensitive search over title, creator and description
    pub q: Option<String>,
    /// Any of these statuses; empty means all
    pub status: Vec<MediaStatus>,
    /// Any of these types; empty means all
    pub media_type: Vec<MediaType>,
    /// Window applied to `updated_at`
    pub range: DateRange,
    pub sort: SortKey,
    pub order: SortOrder,
}

/// Whether any field contains the search text, ignoring case
///
/// A missing or blank query matches everything.
pub fn matches_search(q: Option<&str>, fields: &[Option<&str>]) -> bool {
    let Some(needle) = q.map(str::trim).filter(|q| !q.is_empty()) else {
        return true;
    };
    let needle = needle.to_lowercase();
    fields
        .iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&needle))
}

/// Orders two optional values, missing values last in either direction
pub fn compare_missing_last<T: Ord>(a: Option<T>, b: Option<T>, order: SortOrder) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => match order {
            SortOrder::Asc => a.cmp(&b),
            SortOrder::Desc => b.cmp(&a),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl MediaQuery {
    pub fn matches(&self, media: &Media, now: NaiveDateTime) -> bool {
        (self.status.is_empty() || self.status.contains(&media.status))
            && (self.media_type.is_empty() || self.media_type.contains(&media.media_type))
            && self.range.contains(media.updated_at, now)
            && matches_search(
                self.q.as_deref(),
                &[Some(&media.title), media.creator.as_deref(), media.description.as_deref()],
            )
    }

    fn compare(&self, a: &Media, b: &Media) -> Ordering {
        match self.sort {
            SortKey::Title => compare_missing_last(
                Some(a.title.to_lowercase()),
                Some(b.title.to_lowercase()),
                self.order,
            ),
            SortKey::Created => compare_missing_last(Some(a.created_at), Some(b.created_at), self.order),
            SortKey::Updated => compare_missing_last(Some(a.updated_at), Some(b.updated_at), self.order),
            SortKey::Rating => compare_missing_last(a.rating, b.rating, self.order),
            SortKey::Year => compare_missing_last(a.year, b.year, self.order),
        }
    }

    /// Filters then sorts; the sort is stable
    pub fn apply(&self, mut items: Vec<Media>, now: NaiveDateTime) -> Vec<Media> {
        items.retain(|media| self.matches(media, now));
        items.sort_by(|a, b| self.compare(a, b));
        items
    }
}

/// Open todos first, then by due date (undated last), then oldest first
pub fn sort_todos(todos: &mut [Todo]) {
    todos.sort_by(|a, b| {
        a.done
            .cmp(&b.done)
            .then_with(|| compare_missing_last(a.due, b.due, SortOrder::Asc))
            .then_with(|| a.created_at.cmp(&b.created_at))
    });
}

/// Rows sharing a day or month, with a display label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group<T> {
    pub key: String,
    pub label: String,
    pub items: Vec<T>,
}

fn group_by<T, K, F, L>(mut items: Vec<T>, timestamp: F, key_of: K, label_of: L) -> Vec<Group<T>>
where
    F: Fn(&T) -> NaiveDateTime,
    K: Fn(NaiveDate) -> String,
    L: Fn(NaiveDate) -> String,
{
    items.sort_by_key(|item| std::cmp::Reverse(timestamp(item)));

    let mut groups: Vec<Group<T>> = Vec::new();
    for item in items {
        let date = timestamp(&item).date();
        let key = key_of(date);
        match groups.last_mut() {
            Some(group) if group.key == key => group.items.push(item),
            _ => groups.push(Group { label: label_of(date), key, items: vec![item] }),
        }
    }
    groups
}

/// Groups by calendar day, newest day and newest item first
pub fn group_by_day<T, F>(items: Vec<T>, timestamp: F, today: NaiveDate) -> Vec<Group<T>>
where
    F: Fn(&T) -> NaiveDateTime,
{
    group_by(
        items,
        timestamp,
        |date| date.format("%Y-%m-%d").to_string(),
        |date| format::format_date(date, today),
    )
}

/// Groups by calendar month, newest month and newest item first
pub fn group_by_month<T, F>(items: Vec<T>, timestamp: F) -> Vec<Group<T>>
where
    F: Fn(&T) -> NaiveDateTime,
{
    group_by(
        items,
        timestamp,
        |date| date.format("%Y-%m").to_string(),
        |date| date.format("%B %Y").to_string(),
    )
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingSummary {
    pub metric: String,
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub latest: f64,
    pub latest_at: NaiveDateTime,
}

/// One summary per metric, ordered by metric name
pub fn summarize_tracking(entries: &[TrackingEntry]) -> Vec<TrackingSummary> {
    let mut by_metric: BTreeMap<&str, Vec<&TrackingEntry>> = BTreeMap::new();
    for entry in entries {
        by_metric.entry(entry.metric.as_str()).or_default().push(entry);
    }

    by_metric
        .into_iter()
        .filter_map(|(metric, entries)| {
            let latest = entries.iter().max_by_key(|e| e.recorded_at)?;
            let count = entries.len();
            let sum: f64 = entries.iter().map(|e| e.value).sum();
            Some(TrackingSummary {
                metric: metric.to_string(),
                count,
                min: entries.iter().map(|e| e.value).fold(f64::INFINITY, f64::min),
                max: entries.iter().map(|e| e.value).fold(f64::NEG_INFINITY, f64::max),
                mean: sum / count as f64,
                latest: latest.value,
                latest_at: latest.recorded_at,
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelCount {
    pub channel: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayCount {
    pub date: NaiveDate,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchStats {
    pub total: usize,
    pub unique_videos: usize,
    pub total_duration_seconds: i64,
    pub total_duration: String,
    pub top_channels: Vec<ChannelCount>,
    pub per_day: Vec<DayCount>,
}

/// Watch totals, the `top` busiest channels and watches per day (oldest day first)
pub fn watch_stats(watches: &[YoutubeWatch], top: usize) -> WatchStats {
    let mut channels: HashMap<&str, usize> = HashMap::new();
    let mut days: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    let mut videos: HashSet<&str> = HashSet::new();

    for watch in watches {
        if let Some(channel) = watch.channel_name.as_deref() {
            *channels.entry(channel).or_default() += 1;
        }
        *days.entry(watch.watched_at.date()).or_default() += 1;
        videos.insert(watch.video_id.as_str());
    }

    let mut top_channels: Vec<ChannelCount> = channels
        .into_iter()
        .map(|(channel, count)| ChannelCount { channel: channel.to_string(), count })
        .collect();
    top_channels.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.channel.cmp(&b.channel)));
    top_channels.truncate(top);

    let total_duration_seconds: i64 = watches.iter().filter_map(|w| w.duration_seconds).sum();

    WatchStats {
        total: watches.len(),
        unique_videos: videos.len(),
        total_duration_seconds,
        total_duration: format::format_duration(total_duration_seconds),
        top_channels,
        per_day: days.into_iter().map(|(date, count)| DayCount { date, count }).collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpcomingBirthday {
    pub person_id: String,
    pub name: String,
    pub date: NaiveDate,
    pub days_until: i64,
    /// Age reached on that date, when the birth year is known
    pub turning: Option<u32>,
    pub zodiac: ZodiacSign,
    pub label: String,
}

/// Birthdays falling within `days` days from `today`, soonest first
pub fn upcoming_birthdays(people: &[Person], today: NaiveDate, days: i64) -> Vec<UpcomingBirthday> {
    let mut upcoming: Vec<UpcomingBirthday> = people
        .iter()
        .filter_map(|person| {
            let birthday = person.birthday?;
            let date = format::next_birthday(birthday, today)?;
            let days_until = format::days_until(date, today);
            (days_until <= days).then(|| UpcomingBirthday {
                person_id: person.id.clone(),
                name: person.name.clone(),
                date,
                days_until,
                turning: format::age_on(birthday, date).filter(|&age| age > 0),
                zodiac: format::zodiac_sign(birthday),
                label: format::format_date(date, today),
            })
        })
        .collect();
    upcoming.sort_by(|a, b| a.days_until.cmp(&b.days_until).then_with(|| a.name.cmp(&b.name)));
    upcoming
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinanceSummary {
    /// `YYYY-MM`, or `None` for all time
    pub month: Option<String>,
    pub income: f64,
    pub expenses: f64,
    pub net: f64,
    pub by_category: Vec<CategoryTotal>,
}

/// Parses a `YYYY-MM` month
pub fn parse_month(value: &str) -> Option<(i32, u32)> {
    let (year, month) = value.trim().split_once('-')?;
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, 1).map(|_| (year, month))
}

/// Totals transactions, optionally only those dated in `month`
///
/// Positive amounts are income, negative ones expenses. Categories are
/// ordered by absolute total, largest first; uncategorised rows are grouped
/// under "Uncategorized".
pub fn summarize_transactions(transactions: &[Transaction], month: Option<(i32, u32)>) -> FinanceSummary {
    let in_month = |tx: &&Transaction| match month {
        Some((year, m)) => tx.date.is_some_and(|d| d.year() == year && d.month() == m),
        None => true,
    };

    let mut income = 0.0;
    let mut expenses = 0.0;
    let mut categories: HashMap<String, CategoryTotal> = HashMap::new();

    for tx in transactions.iter().filter(in_month) {
        if tx.amount >= 0.0 {
            income += tx.amount;
        } else {
            expenses += -tx.amount;
        }
        let name = tx.category.clone().unwrap_or_else(|| "Uncategorized".to_string());
        let entry = categories
            .entry(name.clone())
            .or_insert(CategoryTotal { category: name, total: 0.0, count: 0 });
        entry.total += tx.amount;
        entry.count += 1;
    }

    let mut by_category: Vec<CategoryTotal> = categories.into_values().collect();
    by_category.sort_by(|a, b| {
        b.total
            .abs()
            .total_cmp(&a.total.abs())
            .then_with(|| a.category.cmp(&b.category))
    });

    FinanceSummary {
        month: month.map(|(y, m)| format!("{:04}-{:02}", y, m)),
        income,
        expenses,
        net: income - expenses,
        by_category,
    }
}
