use clap::ValueEnum;
use lifedash::enrich::DescriptionOutcome;
use chrono::Local;
use lifedash::format::format_date;
use lifedash::models::{Media, Todo, TrackingEntry};
use lifedash::sync::SyncReport;
use lifedash::takeout::ImportReport;
use lifedash::views::TrackingSummary;
use serde::Serialize;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
    /// Waybar-compatible JSON output
    Waybar,
}

/// Bundled output configuration passed to all print functions
#[derive(Debug, Clone, Copy)]
pub struct OutputConfig {
    /// The output format
    pub format: OutputFormat,
    /// When true, print minimal output (just IDs or counts)
    pub quiet: bool,
}

/// Cuts text to `max` characters, marking the cut with an ellipsis
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", kept)
}

/// Prints a value as JSON, pretty for `--format json` and compact for waybar
fn print_json<T: Serialize + ?Sized>(value: &T, config: &OutputConfig) {
    let rendered = match config.format {
        OutputFormat::Waybar => serde_json::to_string(value),
        _ => serde_json::to_string_pretty(value),
    };
    match rendered {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("Error: could not serialize output: {}", e),
    }
}

/// Prints a list of media rows in the specified format
pub fn print_media_list(media: &[Media], config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if media.is_empty() {
                if !config.quiet {
                    println!("No media found.");
                }
                return;
            }
            if config.quiet {
                for m in media {
                    println!("{}", m.id);
                }
                return;
            }
            let max_id = media.iter().map(|m| m.id.len()).max().unwrap_or(2);
            let titles: Vec<String> = media.iter().map(|m| truncate(&m.title, 40)).collect();
            let max_title = titles.iter().map(|t| t.chars().count()).max().unwrap_or(5).max(5);
            println!(
                "{:<id_w$}  {:<title_w$}  {:<8}  {:<11}  RATING",
                "ID",
                "TITLE",
                "TYPE",
                "STATUS",
                id_w = max_id,
                title_w = max_title,
            );
            for (m, title) in media.iter().zip(titles.iter()) {
                println!(
                    "{:<id_w$}  {:<title_w$}  {:<8}  {:<11}  {}",
                    m.id,
                    title,
                    m.media_type,
                    m.status,
                    m.rating.map(|r| format!("{}/10", r)).unwrap_or_else(|| "-".to_string()),
                    id_w = max_id,
                    title_w = max_title,
                );
            }
        }
        _ => print_json(media, config),
    }
}

/// Prints a single media row in the specified format
pub fn print_media(media: &Media, config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if config.quiet {
                println!("{}", media.id);
                return;
            }
            println!("ID:          {}", media.id);
            println!("Title:       {}", media.title);
            println!("Type:        {}", media.media_type);
            println!("Status:      {}", media.status);
            if let Some(ref creator) = media.creator {
                println!("Creator:     {}", creator);
            }
            if let Some(year) = media.year {
                println!("Year:        {}", year);
            }
            if !media.genres.0.is_empty() {
                println!("Genres:      {}", media.genres.0.join(", "));
            }
            if let Some(ref description) = media.description {
                println!("Description: {}", truncate(description, 200));
            }
            println!("Updated:     {}", format_date(media.updated_at.date(), Local::now().date_naive()));
        }
        _ => print_json(media, config),
    }
}

/// Prints the result of filling a description
pub fn print_description_outcome(outcome: &DescriptionOutcome, config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if config.quiet {
                println!("{}", outcome.media.id);
                return;
            }
            let source = serde_json::to_value(outcome.source)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default();
            println!("Source:      {}", source);
            println!("Synced:      {}", if outcome.workspace_synced { "yes" } else { "no" });
            print_media(&outcome.media, config);
        }
        _ => print_json(outcome, config),
    }
}

/// Prints a list of todos in the specified format
pub fn print_todos(todos: &[Todo], config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if todos.is_empty() {
                if !config.quiet {
                    println!("No todos found.");
                }
                return;
            }
            if config.quiet {
                for todo in todos {
                    println!("{}", todo.id);
                }
                return;
            }
            let max_id = todos.iter().map(|t| t.id.len()).max().unwrap_or(2);
            println!("{:<id_w$}  DONE  {:<10}  {:<8}  TITLE", "ID", "DUE", "PRIORITY", id_w = max_id);
            for todo in todos {
                println!(
                    "{:<id_w$}  {:<4}  {:<10}  {:<8}  {}",
                    todo.id,
                    if todo.done { "[x]" } else { "[ ]" },
                    todo.due.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_else(|| "-".to_string()),
                    todo.priority.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string()),
                    todo.title,
                    id_w = max_id,
                );
            }
        }
        OutputFormat::Json => print_json(todos, config),
        OutputFormat::Waybar => print_waybar_todo_summary(todos),
    }
}

/// Prints a single todo in the specified format
pub fn print_todo(todo: &Todo, config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if config.quiet {
                println!("{}", todo.id);
                return;
            }
            println!("ID:       {}", todo.id);
            println!("Title:    {}", todo.title);
            println!("Done:     {}", if todo.done { "yes" } else { "no" });
            if let Some(due) = todo.due {
                println!("Due:      {}", format_date(due, Local::now().date_naive()));
            }
            if let Some(priority) = todo.priority {
                println!("Priority: {}", priority);
            }
        }
        _ => print_json(todo, config),
    }
}

/// Prints waybar-compatible JSON for the open todos
///
/// Output: `{"text": "3", "tooltip": "3 open todos\n- Title 1\n- Title 2", "class": "has-items"}`
/// Empty: `{"text": "", "tooltip": "No open todos", "class": "empty"}`
fn print_waybar_todo_summary(todos: &[Todo]) {
    let open: Vec<&Todo> = todos.iter().filter(|t| !t.done).collect();
    let (text, tooltip, class) = if open.is_empty() {
        (String::new(), "No open todos".to_string(), "empty")
    } else {
        let lines: Vec<String> = open.iter().map(|t| format!("- {}", t.title)).collect();
        (
            open.len().to_string(),
            format!("{} open todos\n{}", open.len(), lines.join("\n")),
            "has-items",
        )
    };
    let summary = serde_json::json!({ "text": text, "tooltip": tooltip, "class": class });
    println!("{}", summary);
}

/// Prints the counts from a todo sync
pub fn print_sync_report(report: &SyncReport, config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if config.quiet {
                println!("{}", report.created + report.updated + report.removed);
                return;
            }
            println!(
                "Synced todos: {} created, {} updated, {} unchanged, {} removed",
                report.created, report.updated, report.unchanged, report.removed
            );
        }
        _ => print_json(report, config),
    }
}

/// Prints tracking entries, newest first as the server returns them
pub fn print_tracking_entries(entries: &[TrackingEntry], config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if entries.is_empty() {
                if !config.quiet {
                    println!("No entries found.");
                }
                return;
            }
            if config.quiet {
                for entry in entries {
                    println!("{}", entry.id);
                }
                return;
            }
            println!("{:<16}  {:<12}  {:>10}  NOTE", "RECORDED", "METRIC", "VALUE");
            for entry in entries {
                let value = match entry.unit {
                    Some(ref unit) => format!("{} {}", entry.value, unit),
                    None => entry.value.to_string(),
                };
                println!(
                    "{:<16}  {:<12}  {:>10}  {}",
                    entry.recorded_at.format("%Y-%m-%d %H:%M"),
                    entry.metric,
                    value,
                    entry.note.as_deref().unwrap_or(""),
                );
            }
        }
        _ => print_json(entries, config),
    }
}

pub fn print_tracking_entry(entry: &TrackingEntry, config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if config.quiet {
                println!("{}", entry.id);
                return;
            }
            println!("Recorded {} = {} at {}", entry.metric, entry.value, entry.recorded_at.format("%Y-%m-%d %H:%M"));
        }
        _ => print_json(entry, config),
    }
}

/// Prints per-metric summaries
pub fn print_tracking_summaries(summaries: &[TrackingSummary], config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if summaries.is_empty() {
                if !config.quiet {
                    println!("No entries found.");
                }
                return;
            }
            println!("{:<12}  {:>5}  {:>9}  {:>9}  {:>9}  {:>9}", "METRIC", "COUNT", "MIN", "MAX", "MEAN", "LATEST");
            for s in summaries {
                println!(
                    "{:<12}  {:>5}  {:>9.2}  {:>9.2}  {:>9.2}  {:>9.2}",
                    s.metric, s.count, s.min, s.max, s.mean, s.latest
                );
            }
        }
        _ => print_json(summaries, config),
    }
}

/// Prints the counts from a watch-history import
pub fn print_import_report(report: &ImportReport, config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if config.quiet {
                println!("{}", report.inserted);
                return;
            }
            println!(
                "Imported {} of {} watches ({} already present, {} skipped)",
                report.inserted, report.parsed, report.duplicates, report.skipped
            );
        }
        _ => print_json(report, config),
    }
}
