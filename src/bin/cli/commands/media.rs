use clap::Subcommand;
use lifedash::dto::CreateMediaDto;
use lifedash::models::{MediaStatus, MediaType};

use crate::client::{LifedashClient, MediaFilter};
use crate::output::{self, OutputConfig};

/// Media commands
#[derive(Subcommand, Debug)]
pub enum MediaCommands {
    /// List tracked media
    List {
        /// Search title, creator and description
        #[clap(long)]
        q: Option<String>,
        /// Filter by status, can be specified multiple times
        #[clap(long)]
        status: Vec<MediaStatus>,
        /// Filter by type, can be specified multiple times
        #[clap(long = "type")]
        media_type: Vec<MediaType>,
        /// Sort key (title, created, updated, rating, year)
        #[clap(long)]
        sort: Option<String>,
        /// Sort order (asc or desc)
        #[clap(long)]
        order: Option<String>,
    },
    /// Add a piece of media
    Add {
        title: String,
        /// movie, series, book, album, podcast or game
        #[clap(long = "type")]
        media_type: MediaType,
        #[clap(long, default_value = "planned")]
        status: MediaStatus,
        /// Rating from 1 to 10
        #[clap(long)]
        rating: Option<i32>,
        #[clap(long)]
        imdb_id: Option<String>,
        #[clap(long)]
        isbn: Option<String>,
        #[clap(long)]
        creator: Option<String>,
        #[clap(long)]
        year: Option<i32>,
    },
    /// Fill a missing description from the configured sources
    Fill {
        id: String,
        /// Replace an existing description
        #[clap(long)]
        force: bool,
    },
}

/// Executes a media command
pub async fn execute(
    client: &LifedashClient,
    cmd: MediaCommands,
    config: &OutputConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        MediaCommands::List { q, status, media_type, sort, order } => {
            let filter = MediaFilter {
                q,
                status: status.iter().map(|s| s.to_string()).collect(),
                media_type: media_type.iter().map(|t| t.to_string()).collect(),
                sort,
                order,
            };
            let media = client.list_media(&filter).await?;
            output::print_media_list(&media, config);
        }

        MediaCommands::Add { title, media_type, status, rating, imdb_id, isbn, creator, year } => {
            let dto = CreateMediaDto {
                title,
                media_type,
                status,
                rating,
                imdb_id,
                goodreads_id: None,
                isbn,
                creator,
                year,
                genres: Vec::new(),
                description: None,
                poster_url: None,
                url: None,
                started_at: None,
                finished_at: None,
            };
            let media = client.create_media(&dto).await?;
            output::print_media(&media, config);
        }

        MediaCommands::Fill { id, force } => {
            let outcome = client.fill_description(&id, force).await?;
            output::print_description_outcome(&outcome, config);
        }
    }
    Ok(())
}
