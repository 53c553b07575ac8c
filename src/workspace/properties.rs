//! Reading and writing workspace property values.
//!
//! A property value is the JSON object the workspace API returns under a
//! page's `properties`, tagged by its `type` field.

use chrono::NaiveDate;
use serde_json::{json, Value};

/// Longest text a single rich-text segment may carry
pub const MAX_SEGMENT_CHARS: usize = 2000;

fn join_segments(segments: &Value) -> Option<String> {
    let text: String = segments
        .as_array()?
        .iter()
        .filter_map(|segment| {
            segment["plain_text"]
                .as_str()
                .or_else(|| segment["text"]["content"].as_str())
        })
        .collect();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn number_text(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn formula_text(formula: &Value) -> Option<String> {
    match formula["type"].as_str()? {
        "string" => formula["string"].as_str().filter(|s| !s.is_empty()).map(str::to_string),
        "number" => formula["number"].as_f64().map(number_text),
        "boolean" => formula["boolean"].as_bool().map(|b| b.to_string()),
        "date" => formula["date"]["start"].as_str().map(str::to_string),
        _ => None,
    }
}

/// The value of a property as plain text, if it has one
pub fn plain_text(prop: &Value) -> Option<String> {
    let kind = prop["type"].as_str()?;
    match kind {
        "title" | "rich_text" => join_segments(&prop[kind]),
        "select" | "status" => prop[kind]["name"].as_str().map(str::to_string),
        "multi_select" => {
            let names = multi_select(prop);
            (!names.is_empty()).then(|| names.join(", "))
        }
        "url" | "email" | "phone_number" => prop[kind].as_str().filter(|s| !s.is_empty()).map(str::to_string),
        "number" => prop["number"].as_f64().map(number_text),
        "checkbox" => prop["checkbox"].as_bool().map(|b| b.to_string()),
        "date" => prop["date"]["start"].as_str().map(str::to_string),
        "formula" => formula_text(&prop["formula"]),
        _ => None,
    }
}

/// The start date of a date property (or a date formula)
pub fn date_start(prop: &Value) -> Option<NaiveDate> {
    let start = match prop["type"].as_str()? {
        "date" => prop["date"]["start"].as_str()?,
        "formula" => prop["formula"]["date"]["start"].as_str()?,
        _ => return None,
    };
    // Date-times carry a time part after the first ten characters
    let day = start.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

pub fn checkbox(prop: &Value) -> Option<bool> {
    match prop["type"].as_str()? {
        "checkbox" => prop["checkbox"].as_bool(),
        "formula" => prop["formula"]["boolean"].as_bool(),
        _ => None,
    }
}

pub fn number(prop: &Value) -> Option<f64> {
    match prop["type"].as_str()? {
        "number" => prop["number"].as_f64(),
        "formula" => prop["formula"]["number"].as_f64(),
        _ => None,
    }
}

/// Option names of a multi-select property; empty for anything else
pub fn multi_select(prop: &Value) -> Vec<String> {
    prop["multi_select"]
        .as_array()
        .map(|options| {
            options
                .iter()
                .filter_map(|o| o["name"].as_str())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Splits text into rich-text segments of at most [`MAX_SEGMENT_CHARS`] characters
pub fn text_segments(text: &str) -> Vec<Value> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(MAX_SEGMENT_CHARS)
        .map(|chunk| {
            let content: String = chunk.iter().collect();
            json!({"type": "text", "text": {"content": content}})
        })
        .collect()
}

pub fn title_value(text: &str) -> Value {
    json!({"title": text_segments(text)})
}

pub fn rich_text_value(text: &str) -> Value {
    json!({"rich_text": text_segments(text)})
}

pub fn checkbox_value(checked: bool) -> Value {
    json!({"checkbox": checked})
}

pub fn date_value(date: NaiveDate) -> Value {
    json!({"date": {"start": date.format("%Y-%m-%d").to_string()}})
}

/// Clears a date property
pub fn empty_date_value() -> Value {
    json!({"date": null})
}

pub fn select_value(name: &str) -> Value {
    json!({"select": {"name": name}})
}

/// Clears a select property
pub fn empty_select_value() -> Value {
    json!({"select": null})
}

pub fn number_value(n: f64) -> Value {
    json!({"number": n})
}

pub fn url_value(url: &str) -> Value {
    json!({"url": url})
}

pub fn multi_select_value(names: &[String]) -> Value {
    let options: Vec<Value> = names.iter().map(|name| json!({"name": name})).collect();
    json!({"multi_select": options})
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_of_title_joins_segments() {
        let prop = json!({
            "type": "title",
            "title": [{"plain_text": "Blade "}, {"plain_text": "Runner"}]
        });
        assert_eq!(plain_text(&prop).as_deref(), Some("Blade Runner"));
    }

    #[test]
    fn test_plain_text_of_empty_rich_text_is_missing() {
        let prop = json!({"type": "rich_text", "rich_text": []});
        assert_eq!(plain_text(&prop), None);
    }

    #[test]
    fn test_plain_text_of_other_kinds() {
        assert_eq!(plain_text(&json!({"type": "select", "select": {"name": "Movie"}})).as_deref(), Some("Movie"));
        assert_eq!(plain_text(&json!({"type": "select", "select": null})), None);
        assert_eq!(plain_text(&json!({"type": "status", "status": {"name": "Done"}})).as_deref(), Some("Done"));
        assert_eq!(plain_text(&json!({"type": "url", "url": "https://x.test"})).as_deref(), Some("https://x.test"));
        assert_eq!(plain_text(&json!({"type": "number", "number": 7.0})).as_deref(), Some("7"));
        assert_eq!(plain_text(&json!({"type": "number", "number": 7.5})).as_deref(), Some("7.5"));
        assert_eq!(
            plain_text(&json!({"type": "multi_select", "multi_select": [{"name": "Drama"}, {"name": "Crime"}]})).as_deref(),
            Some("Drama, Crime")
        );
        assert_eq!(
            plain_text(&json!({"type": "formula", "formula": {"type": "string", "string": "computed"}})).as_deref(),
            Some("computed")
        );
        assert_eq!(plain_text(&json!({"type": "people", "people": []})), None);
    }

    #[test]
    fn test_date_start_accepts_date_times() {
        let prop = json!({"type": "date", "date": {"start": "2024-03-05T10:00:00.000+01:00", "end": null}});
        assert_eq!(date_start(&prop), NaiveDate::from_ymd_opt(2024, 3, 5));

        let prop = json!({"type": "date", "date": null});
        assert_eq!(date_start(&prop), None);
    }

    #[test]
    fn test_checkbox_and_number() {
        assert_eq!(checkbox(&json!({"type": "checkbox", "checkbox": true})), Some(true));
        assert_eq!(checkbox(&json!({"type": "number", "number": 1})), None);
        assert_eq!(number(&json!({"type": "number", "number": -12.5})), Some(-12.5));
        assert_eq!(number(&json!({"type": "formula", "formula": {"type": "number", "number": 3}})), Some(3.0));
    }

    #[test]
    fn test_text_segments_chunk_long_text() {
        let text = "é".repeat(MAX_SEGMENT_CHARS * 2 + 5);
        let segments = text_segments(&text);

        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0]["text"]["content"].as_str().unwrap().chars().count(), MAX_SEGMENT_CHARS);
        assert_eq!(segments[2]["text"]["content"].as_str().unwrap().chars().count(), 5);
    }

    #[test]
    fn test_written_values_read_back() {
        assert_eq!(plain_text(&json!({"type": "title", "title": title_value("Dune")["title"]})).as_deref(), Some("Dune"));
        let date = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
        assert_eq!(date_value(date), json!({"date": {"start": "2025-01-31"}}));
        assert_eq!(
            multi_select_value(&["A".to_string(), "B".to_string()]),
            json!({"multi_select": [{"name": "A"}, {"name": "B"}]})
        );
    }
}
