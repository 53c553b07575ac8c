use std::path::PathBuf;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use directories::ProjectDirs;
use clap::Parser;
use std::fs;
use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::workspace::PropertyMapping;

/// Configuration for the lifedash server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// URL for the database connection
    pub database_url: String,
    /// Address the HTTP server binds to
    pub bind_address: String,
    /// Port the HTTP server listens on
    pub port: u16,
    /// Directory for rolling JSON log files; stdout only when unset
    pub log_dir: Option<PathBuf>,
    /// Bearer token every API request must present
    pub api_token: Option<String>,
    /// User id that authenticated requests act as
    pub owner_id: String,
    /// Timeout for a single outbound HTTP attempt, in seconds
    pub request_timeout_secs: u64,
    /// How many times a transient outbound failure is retried
    pub max_retries: u32,
    /// Server URL used by the CLI
    pub server_url: Option<String>,
    pub notion_token: Option<String>,
    pub notion_media_db: Option<String>,
    pub notion_todos_db: Option<String>,
    pub notion_finances_db: Option<String>,
    pub omdb_api_key: Option<String>,
    pub google_books_api_key: Option<String>,
    pub youtube_api_key: Option<String>,
    pub spotify_client_id: Option<String>,
    pub spotify_client_secret: Option<String>,
    pub spotify_redirect_uri: Option<String>,
    pub ai_gateway_url: Option<String>,
    pub ai_gateway_key: Option<String>,
    pub ai_model: String,
    /// Names of the workspace properties each field is stored under
    pub properties: PropertyMapping,
}

/// Update structure for Config with all fields optional
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ConfigUpdate {
    pub database_url: Option<String>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub log_dir: Option<PathBuf>,
    pub api_token: Option<String>,
    pub owner_id: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
    pub server_url: Option<String>,
    pub notion_token: Option<String>,
    pub notion_media_db: Option<String>,
    pub notion_todos_db: Option<String>,
    pub notion_finances_db: Option<String>,
    pub omdb_api_key: Option<String>,
    pub google_books_api_key: Option<String>,
    pub youtube_api_key: Option<String>,
    pub spotify_client_id: Option<String>,
    pub spotify_client_secret: Option<String>,
    pub spotify_redirect_uri: Option<String>,
    pub ai_gateway_url: Option<String>,
    pub ai_gateway_key: Option<String>,
    pub ai_model: Option<String>,
    /// A `[properties]` table; fields it leaves out keep their defaults
    pub properties: Option<PropertyMapping>,
}

/// Command line arguments for the server
#[derive(Parser, Debug, Default)]
#[clap(name = "lifedash", about = "Personal life dashboard backend")]
pub struct CliArgs {
    /// Database URL
    #[clap(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Address to bind to
    #[clap(long, env = "LIFEDASH_BIND")]
    pub bind_address: Option<String>,

    /// Port to listen on
    #[clap(long, env = "LIFEDASH_PORT")]
    pub port: Option<u16>,

    /// Directory for JSON log files
    #[clap(long, env = "LIFEDASH_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Bearer token required on API requests
    #[clap(long, env = "LIFEDASH_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// User id requests act as
    #[clap(long, env = "LIFEDASH_OWNER_ID")]
    pub owner_id: Option<String>,

    /// Outbound request timeout in seconds
    #[clap(long, env = "LIFEDASH_REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: Option<u64>,

    /// Retries for transient outbound failures
    #[clap(long, env = "LIFEDASH_MAX_RETRIES")]
    pub max_retries: Option<u32>,

    #[clap(long, env = "NOTION_TOKEN", hide_env_values = true)]
    pub notion_token: Option<String>,

    #[clap(long, env = "NOTION_MEDIA_DB")]
    pub notion_media_db: Option<String>,

    #[clap(long, env = "NOTION_TODOS_DB")]
    pub notion_todos_db: Option<String>,

    #[clap(long, env = "NOTION_FINANCES_DB")]
    pub notion_finances_db: Option<String>,

    #[clap(long, env = "OMDB_API_KEY", hide_env_values = true)]
    pub omdb_api_key: Option<String>,

    #[clap(long, env = "GOOGLE_BOOKS_API_KEY", hide_env_values = true)]
    pub google_books_api_key: Option<String>,

    #[clap(long, env = "YOUTUBE_API_KEY", hide_env_values = true)]
    pub youtube_api_key: Option<String>,

    #[clap(long, env = "SPOTIFY_CLIENT_ID")]
    pub spotify_client_id: Option<String>,

    #[clap(long, env = "SPOTIFY_CLIENT_SECRET", hide_env_values = true)]
    pub spotify_client_secret: Option<String>,

    #[clap(long, env = "SPOTIFY_REDIRECT_URI")]
    pub spotify_redirect_uri: Option<String>,

    #[clap(long, env = "AI_GATEWAY_URL")]
    pub ai_gateway_url: Option<String>,

    #[clap(long, env = "AI_GATEWAY_KEY", hide_env_values = true)]
    pub ai_gateway_key: Option<String>,

    #[clap(long, env = "AI_MODEL")]
    pub ai_model: Option<String>,

    /// Debug mode
    #[clap(long, env = "LIFEDASH_DEBUG", default_value_t = false)]
    pub debug: bool,
}

impl Config {
    /// Applies a config update to the current configuration
    pub fn apply_update(self, update: ConfigUpdate) -> Self {
        Self {
            database_url: update.database_url.unwrap_or(self.database_url),
            bind_address: update.bind_address.unwrap_or(self.bind_address),
            port: update.port.unwrap_or(self.port),
            log_dir: update.log_dir.or(self.log_dir),
            api_token: update.api_token.or(self.api_token),
            owner_id: update.owner_id.unwrap_or(self.owner_id),
            request_timeout_secs: update.request_timeout_secs.unwrap_or(self.request_timeout_secs),
            max_retries: update.max_retries.unwrap_or(self.max_retries),
            server_url: update.server_url.or(self.server_url),
            notion_token: update.notion_token.or(self.notion_token),
            notion_media_db: update.notion_media_db.or(self.notion_media_db),
            notion_todos_db: update.notion_todos_db.or(self.notion_todos_db),
            notion_finances_db: update.notion_finances_db.or(self.notion_finances_db),
            omdb_api_key: update.omdb_api_key.or(self.omdb_api_key),
            google_books_api_key: update.google_books_api_key.or(self.google_books_api_key),
            youtube_api_key: update.youtube_api_key.or(self.youtube_api_key),
            spotify_client_id: update.spotify_client_id.or(self.spotify_client_id),
            spotify_client_secret: update.spotify_client_secret.or(self.spotify_client_secret),
            spotify_redirect_uri: update.spotify_redirect_uri.or(self.spotify_redirect_uri),
            ai_gateway_url: update.ai_gateway_url.or(self.ai_gateway_url),
            ai_gateway_key: update.ai_gateway_key.or(self.ai_gateway_key),
            ai_model: update.ai_model.unwrap_or(self.ai_model),
            properties: update.properties.unwrap_or(self.properties),
        }
    }

    /// Returns the outbound request timeout as a Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Names of the integrations that have credentials configured
    pub fn enabled_integrations(&self) -> Vec<&'static str> {
        let mut enabled = Vec::new();
        if self.notion_token.is_some() {
            enabled.push("workspace");
        }
        if self.omdb_api_key.is_some() {
            enabled.push("omdb");
        }
        // Google Books works without a key, at a lower quota
        enabled.push("books");
        if self.youtube_api_key.is_some() {
            enabled.push("youtube");
        }
        if self.spotify_client_id.is_some() && self.spotify_client_secret.is_some() && self.spotify_redirect_uri.is_some() {
            enabled.push("spotify");
        }
        if self.ai_gateway_url.is_some() {
            enabled.push("ai");
        }
        enabled
    }
}

/// Returns the base (default) configuration
pub fn base_config(config_path: Option<PathBuf>) -> Config {

    let database_url = config_path.map_or("lifedash.db".to_string(), |path| path.join("lifedash.db").to_string_lossy().to_string());

    Config {
        database_url,
        bind_address: "127.0.0.1".to_string(),
        port: 3000,
        log_dir: None,
        api_token: None,
        owner_id: "owner".to_string(),
        request_timeout_secs: 10,
        max_retries: 3,
        server_url: None,
        notion_token: None,
        notion_media_db: None,
        notion_todos_db: None,
        notion_finances_db: None,
        omdb_api_key: None,
        google_books_api_key: None,
        youtube_api_key: None,
        spotify_client_id: None,
        spotify_client_secret: None,
        spotify_redirect_uri: None,
        ai_gateway_url: None,
        ai_gateway_key: None,
        ai_model: "gpt-4o-mini".to_string(),
        properties: PropertyMapping::default(),
    }
}

/// Loads configuration from a TOML file
///
/// A missing file is not an error; it yields an empty update.
pub fn config_from_file(config_path: Option<PathBuf>) -> Result<ConfigUpdate> {
    let Some(config_path) = config_path else {
        return Ok(ConfigUpdate::default());
    };

    if !config_path.exists() {
        info!("Config file not found at {:?}, using defaults", config_path);
        return Ok(ConfigUpdate::default());
    }

    let content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config file {:?}", config_path))?;
    let update = toml::from_str::<ConfigUpdate>(&content)
        .with_context(|| format!("Failed to parse config file {:?}", config_path))?;

    info!("Loaded configuration from {:?}", config_path);
    Ok(update)
}

/// Loads configuration from command line arguments
pub fn config_from_args(args: CliArgs) -> ConfigUpdate {
    ConfigUpdate {
        database_url: args.database_url,
        bind_address: args.bind_address,
        port: args.port,
        log_dir: args.log_dir,
        api_token: args.api_token,
        owner_id: args.owner_id,
        request_timeout_secs: args.request_timeout_secs,
        max_retries: args.max_retries,
        server_url: None,
        notion_token: args.notion_token,
        notion_media_db: args.notion_media_db,
        notion_todos_db: args.notion_todos_db,
        notion_finances_db: args.notion_finances_db,
        omdb_api_key: args.omdb_api_key,
        google_books_api_key: args.google_books_api_key,
        youtube_api_key: args.youtube_api_key,
        spotify_client_id: args.spotify_client_id,
        spotify_client_secret: args.spotify_client_secret,
        spotify_redirect_uri: args.spotify_redirect_uri,
        ai_gateway_url: args.ai_gateway_url,
        ai_gateway_key: args.ai_gateway_key,
        ai_model: args.ai_model,
        properties: None,
    }
}

/// Returns the XDG config directory, if it exists
pub fn get_config_dir_path() -> Option<PathBuf> {
    let Some(proj_dirs) = ProjectDirs::from("com", "lifedash", "lifedash") else {
        warn!("Could not determine XDG config directory, skipping config file");
        return None;
    };

    let path = proj_dirs.config_dir().to_path_buf();
    if !path.exists() {
        info!("Config path not found at {:?}, using defaults", path);
        return None;
    }
    Some(path)
}

/// Gets the complete configuration by combining defaults with
/// values from config file, environment variables, and command line arguments
/// in order of increasing precedence
pub fn get_config(args: CliArgs) -> Config {
    let config_dir = get_config_dir_path();
    let base = base_config(config_dir.clone());

    let file_update = match config_from_file(config_dir.map(|dir| dir.join("config.toml"))) {
        Ok(update) => update,
        Err(e) => {
            warn!("Ignoring config file: {:#}", e);
            ConfigUpdate::default()
        }
    };

    // Apply updates in order of increasing precedence
    let config = base
        .apply_update(file_update)
        .apply_update(config_from_args(args));

    info!(
        "Final configuration: database_url={}, listen={}:{}, integrations={:?}",
        config.database_url, config.bind_address, config.port, config.enabled_integrations()
    );

    config
}
