use std::path::PathBuf;

use clap::Subcommand;

use crate::client::LifedashClient;
use crate::output::{self, OutputConfig};

/// YouTube commands
#[derive(Subcommand, Debug)]
pub enum YoutubeCommands {
    /// Import a Google Takeout watch-history.json export
    Import {
        /// Path to watch-history.json
        file: PathBuf,
    },
}

/// Executes a YouTube command
pub async fn execute(
    client: &LifedashClient,
    cmd: YoutubeCommands,
    config: &OutputConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        YoutubeCommands::Import { file } => {
            let body = tokio::fs::read(&file)
                .await
                .map_err(|e| format!("Could not read {}: {}", file.display(), e))?;
            let report = client.import_youtube(body).await?;
            output::print_import_report(&report, config);
        }
    }
    Ok(())
}
