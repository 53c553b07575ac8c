mod client;
mod commands;
mod output;

use std::error::Error;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use client::{ClientError, LifedashClient};
use lifedash::config;
use output::{OutputConfig, OutputFormat};

const DEFAULT_SERVER_URL: &str = "http://localhost:3000";

#[derive(Parser, Debug)]
#[clap(name = "lifedash-cli", about = "Talk to a running lifedash server")]
struct Cli {
    /// Base URL of the server (falls back to `server_url` in config.toml)
    #[clap(long, env = "LIFEDASH_URL", global = true)]
    server_url: Option<String>,

    /// Bearer token matching the server's `api_token`
    #[clap(long, env = "LIFEDASH_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    #[clap(long, value_enum, default_value_t = OutputFormat::Human, global = true)]
    format: OutputFormat,

    /// Print only ids or counts
    #[clap(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Movies, series, books, albums, podcasts and games
    #[command(subcommand)]
    Media(commands::media::MediaCommands),
    /// Todos, synced with the workspace when it is configured
    #[command(subcommand)]
    Todo(commands::todo::TodoCommands),
    /// Daily metrics such as sleep or weight
    #[command(subcommand)]
    Track(commands::tracking::TrackingCommands),
    /// Watch history from a Google Takeout export
    #[command(subcommand)]
    Youtube(commands::youtube::YoutubeCommands),
}

/// `server_url` from the user's config.toml, if it sets one
fn configured_server_url() -> Option<String> {
    let path = config::get_config_dir_path()?.join("config.toml");
    config::config_from_file(Some(path)).ok()?.server_url
}

/// Stderr text for a failed command, with a hint when nothing answered
fn describe(err: &(dyn Error + 'static)) -> String {
    match err.downcast_ref::<ClientError>() {
        Some(client_err) if client_err.is_unreachable() => {
            format!("Could not connect to server. Is lifedash running?\n  {}", client_err)
        }
        _ => err.to_string(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let server_url = cli
        .server_url
        .or_else(configured_server_url)
        .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
    let client = LifedashClient::new(server_url, cli.token);
    let out = OutputConfig { format: cli.format, quiet: cli.quiet };

    let result = match cli.command {
        Commands::Media(cmd) => commands::media::execute(&client, cmd, &out).await,
        Commands::Todo(cmd) => commands::todo::execute(&client, cmd, &out).await,
        Commands::Track(cmd) => commands::tracking::execute(&client, cmd, &out).await,
        Commands::Youtube(cmd) => commands::youtube::execute(&client, cmd, &out).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", describe(e.as_ref()));
            ExitCode::FAILURE
        }
    }
}
