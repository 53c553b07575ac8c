//! Metadata enrichment for media rows and watch history.
//!
//! Every enrichment writes the relational row first and fails the request if
//! that write fails. The workspace page, when there is one, is updated
//! afterwards on a best-effort basis: failures are logged and reported as
//! `workspace_synced: false`.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use crate::errors::ApiError;
use crate::integrations::{BookDetails, MovieDetails, OmdbError};
use crate::models::{Media, MediaType, StringList};
use crate::repo;
use crate::state::AppState;

/// Rows enriched at the same time by a batch
const MAX_CONCURRENT: usize = 4;

/// Video ids looked up per YouTube request
const YOUTUBE_CHUNK: usize = 50;

const SYNOPSIS_SYSTEM_PROMPT: &str = "You write short, spoiler-free synopses for a personal media log. \
Answer with two or three plain sentences and nothing else. If you do not know the work, answer with UNKNOWN.";

#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("media not found")]
    NotFound,

    #[error("no description found for \"{0}\"")]
    NoDescription(String),

    #[error("{0}")]
    NoSource(String),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("{0}")]
    Upstream(String),

    #[error(transparent)]
    Database(#[from] anyhow::Error),
}

impl From<EnrichError> for ApiError {
    fn from(err: EnrichError) -> Self {
        match err {
            EnrichError::NotFound => ApiError::NotFound,
            EnrichError::NoDescription(_) => ApiError::NotFoundWithMessage(err.to_string()),
            EnrichError::NoSource(msg) => ApiError::BadRequest(msg),
            EnrichError::NotConfigured(what) => ApiError::NotConfigured(what.to_string()),
            EnrichError::Upstream(msg) => ApiError::Upstream(msg),
            EnrichError::Database(err) => ApiError::Database(err),
        }
    }
}

/// Where a description came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptionSource {
    /// The row already had one and nothing was fetched
    Existing,
    Omdb,
    GoogleBooks,
    Ai,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptionOutcome {
    pub media: Media,
    pub source: DescriptionSource,
    pub workspace_synced: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshOutcome {
    pub media: Media,
    /// Columns that were empty and got a value
    pub updated_fields: Vec<String>,
    pub workspace_synced: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchFailure {
    pub media_id: String,
    pub title: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub processed: usize,
    pub filled: usize,
    pub failed: Vec<BatchFailure>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct YoutubeEnrichReport {
    pub requested: usize,
    pub found: usize,
    pub updated_rows: usize,
}

fn non_empty(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

fn load_media(state: &AppState, user_id: &str, media_id: &str) -> Result<Media, EnrichError> {
    repo::get_media(&state.pool, user_id, media_id)?.ok_or(EnrichError::NotFound)
}

/// Saves the row; a row deleted in the meantime is reported as not found
async fn save(state: &AppState, media: Media) -> Result<Media, EnrichError> {
    repo::save_media(&state.pool, media).await?.ok_or(EnrichError::NotFound)
}

/// Tries OMDb, Google Books and the AI gateway in that order
///
/// A source that fails is logged and the next one is tried. If no source
/// produced text and at least one failed, the last failure is returned.
async fn find_description(state: &AppState, media: &Media) -> Result<Option<(String, DescriptionSource)>, EnrichError> {
    let services = &state.services;
    let mut last_error: Option<String> = None;

    if media.media_type.is_screen() {
        if let (Some(imdb_id), Some(omdb)) = (media.imdb_id.as_deref(), services.omdb.as_ref()) {
            match omdb.lookup(imdb_id).await {
                Ok(details) => {
                    if let Some(plot) = non_empty(details.plot) {
                        return Ok(Some((plot, DescriptionSource::Omdb)));
                    }
                }
                Err(OmdbError::NotFound(_)) => debug!("OMDb has no entry"),
                Err(e) => {
                    warn!("OMDb lookup failed: {}", e);
                    last_error = Some(e.to_string());
                }
            }
        }
    }

    if media.media_type == MediaType::Book {
        match services.books.find(media.isbn.as_deref(), &media.title, media.creator.as_deref()).await {
            Ok(Some(book)) => {
                if let Some(description) = non_empty(book.description) {
                    return Ok(Some((description, DescriptionSource::GoogleBooks)));
                }
            }
            Ok(None) => debug!("Google Books has no match"),
            Err(e) => {
                warn!("Google Books lookup failed: {}", e);
                last_error = Some(e.to_string());
            }
        }
    }

    if let Some(ai) = services.ai.as_ref() {
        let mut prompt = format!("Write a synopsis of the {} \"{}\"", media.media_type, media.title);
        if let Some(creator) = &media.creator {
            prompt.push_str(&format!(" by {}", creator));
        }
        if let Some(year) = media.year {
            prompt.push_str(&format!(" ({})", year));
        }
        prompt.push('.');

        match ai.complete(SYNOPSIS_SYSTEM_PROMPT, &prompt).await {
            Ok(text) if !text.eq_ignore_ascii_case("unknown") => return Ok(Some((text, DescriptionSource::Ai))),
            Ok(_) => debug!("AI gateway does not know the title"),
            Err(e) => {
                warn!("AI gateway failed: {}", e);
                last_error = Some(e.to_string());
            }
        }
    }

    match last_error {
        Some(message) => Err(EnrichError::Upstream(message)),
        None => Ok(None),
    }
}

/// Fills the description of one media row
///
/// ### Arguments
///
/// * `state` - Application state with the pool and external clients
/// * `user_id` - Owner of the row
/// * `media_id` - The row to fill
/// * `force` - Replace an existing description
///
/// ### Errors
///
/// * `NotFound` if the row does not exist for the user
/// * `NoDescription` if no source knows the title
/// * `Upstream` if every source that was tried failed
/// * `Database` if the row could not be written
#[instrument(skip(state))]
pub async fn fill_description(
    state: &AppState,
    user_id: &str,
    media_id: &str,
    force: bool,
) -> Result<DescriptionOutcome, EnrichError> {
    let mut media = load_media(state, user_id, media_id)?;

    if !force && !media.needs_description() {
        debug!("Description already present");
        return Ok(DescriptionOutcome { media, source: DescriptionSource::Existing, workspace_synced: false });
    }

    let Some((description, source)) = find_description(state, &media).await? else {
        return Err(EnrichError::NoDescription(media.title));
    };

    media.description = Some(description);
    let media = save(state, media).await?;
    info!(?source, "Filled description");

    let workspace_synced = match (&state.services.workspace, media.notion_page_id.as_deref(), media.description.as_deref()) {
        (Some(workspace), Some(page_id), Some(description)) => {
            match workspace.update_page(page_id, state.mapping().synopsis_properties(description)).await {
                Ok(_) => true,
                Err(e) => {
                    warn!(page_id, "Could not write synopsis to workspace page: {}", e);
                    false
                }
            }
        }
        _ => false,
    };

    Ok(DescriptionOutcome { media, source, workspace_synced })
}

/// Copies movie metadata into empty columns, returning the names it filled
pub fn merge_movie(media: &mut Media, details: MovieDetails) -> Vec<String> {
    let mut filled = Vec::new();
    if media.year.is_none() && details.year.is_some() {
        media.year = details.year;
        filled.push("year".to_string());
    }
    if media.creator.is_none() && details.creator.is_some() {
        media.creator = details.creator;
        filled.push("creator".to_string());
    }
    if media.poster_url.is_none() && details.poster_url.is_some() {
        media.poster_url = details.poster_url;
        filled.push("poster_url".to_string());
    }
    if media.genres.0.is_empty() && !details.genres.is_empty() {
        media.genres = StringList(details.genres);
        filled.push("genres".to_string());
    }
    if media.needs_description() {
        if let Some(plot) = non_empty(details.plot) {
            media.description = Some(plot);
            filled.push("description".to_string());
        }
    }
    filled
}

/// Copies book metadata into empty columns, returning the names it filled
pub fn merge_book(media: &mut Media, book: BookDetails) -> Vec<String> {
    let mut filled = Vec::new();
    if media.year.is_none() && book.year.is_some() {
        media.year = book.year;
        filled.push("year".to_string());
    }
    if media.creator.is_none() {
        if let Some(creator) = book.creator() {
            media.creator = Some(creator);
            filled.push("creator".to_string());
        }
    }
    if media.poster_url.is_none() && book.thumbnail_url.is_some() {
        media.poster_url = book.thumbnail_url;
        filled.push("poster_url".to_string());
    }
    if media.genres.0.is_empty() && !book.categories.is_empty() {
        media.genres = StringList(book.categories);
        filled.push("genres".to_string());
    }
    if media.isbn.is_none() && book.isbn13.is_some() {
        media.isbn = book.isbn13;
        filled.push("isbn".to_string());
    }
    if media.needs_description() {
        if let Some(description) = non_empty(book.description) {
            media.description = Some(description);
            filled.push("description".to_string());
        }
    }
    filled
}

/// Looks the row up by IMDb id or as a book and fills its empty columns
///
/// ### Errors
///
/// * `NoSource` if the row is neither a screen title with an IMDb id nor a book
/// * `NotConfigured` if OMDb is needed but has no key
/// * `NoDescription` if the lookup found nothing
/// * `Upstream` if the lookup failed
#[instrument(skip(state))]
pub async fn refresh_metadata(state: &AppState, user_id: &str, media_id: &str) -> Result<RefreshOutcome, EnrichError> {
    let mut media = load_media(state, user_id, media_id)?;

    let updated_fields = if let (true, Some(imdb_id)) = (media.media_type.is_screen(), media.imdb_id.clone()) {
        let omdb = state.services.omdb.as_ref().ok_or(EnrichError::NotConfigured("OMDb"))?;
        let details = omdb.lookup(&imdb_id).await.map_err(|e| match e {
            OmdbError::NotFound(_) => EnrichError::NoDescription(media.title.clone()),
            other => EnrichError::Upstream(other.to_string()),
        })?;
        merge_movie(&mut media, details)
    } else if media.media_type == MediaType::Book {
        let book = state
            .services
            .books
            .find(media.isbn.as_deref(), &media.title, media.creator.as_deref())
            .await
            .map_err(|e| EnrichError::Upstream(e.to_string()))?
            .ok_or_else(|| EnrichError::NoDescription(media.title.clone()))?;
        merge_book(&mut media, book)
    } else {
        return Err(EnrichError::NoSource(format!(
            "nothing to look up for {} \"{}\"; movies and series need an IMDb id",
            media.media_type, media.title
        )));
    };

    if updated_fields.is_empty() {
        debug!("Nothing new from the lookup");
        return Ok(RefreshOutcome { media, updated_fields, workspace_synced: false });
    }

    let media = save(state, media).await?;
    info!(fields = ?updated_fields, "Refreshed metadata");

    let workspace_synced = mirror_updated(state, &media).await;
    Ok(RefreshOutcome { media, updated_fields, workspace_synced })
}

/// Fills descriptions of up to `limit` rows that lack one, a few at a time
///
/// Failures are collected per row; only database errors fail the batch.
/// Every attempted row is stamped so the next batch starts with rows not yet tried.
#[instrument(skip(state))]
pub async fn fill_missing_descriptions(state: &AppState, user_id: &str, limit: usize) -> Result<BatchReport, EnrichError> {
    let pending = repo::list_media_missing_description(&state.pool, user_id, limit as i64)?;
    info!("Filling descriptions for {} rows", pending.len());

    let mut report = BatchReport { processed: pending.len(), ..BatchReport::default() };
    let mut queue = pending.into_iter();
    let mut join_set = JoinSet::new();

    loop {
        while join_set.len() < MAX_CONCURRENT {
            let Some(media) = queue.next() else { break };
            let state = state.clone();
            let user_id = user_id.to_string();
            join_set.spawn(async move {
                let result = fill_description(&state, &user_id, &media.id, false).await;
                (media, result)
            });
        }

        let Some(joined) = join_set.join_next().await else { break };
        let (media, result) = match joined {
            Ok(done) => done,
            Err(e) => {
                warn!("Enrichment task failed: {}", e);
                continue;
            }
        };
        repo::mark_description_checked(&state.pool, user_id, &media.id, Utc::now().naive_utc()).await?;
        match result {
            Ok(_) => report.filled += 1,
            Err(e) => report.failed.push(BatchFailure {
                media_id: media.id,
                title: media.title,
                error: e.to_string(),
            }),
        }
    }

    info!(filled = report.filled, failed = report.failed.len(), "Batch enrichment done");
    Ok(report)
}

/// Fetches statistics for watched videos that have none yet
///
/// Requested ids are stamped whether or not the API knows them, so a later
/// call moves on to videos not yet tried.
///
/// ### Errors
///
/// * `NotConfigured` without a YouTube key
/// * `Upstream` if a lookup fails; batches already stored stay stored
#[instrument(skip(state))]
pub async fn enrich_youtube(state: &AppState, user_id: &str, limit: usize) -> Result<YoutubeEnrichReport, EnrichError> {
    let youtube = state.services.youtube.as_ref().ok_or(EnrichError::NotConfigured("YouTube"))?;

    let ids = repo::list_video_ids_missing_details(&state.pool, user_id, limit as i64)?;
    let mut report = YoutubeEnrichReport { requested: ids.len(), ..YoutubeEnrichReport::default() };

    for chunk in ids.chunks(YOUTUBE_CHUNK) {
        let details = youtube
            .video_details(chunk)
            .await
            .map_err(|e| EnrichError::Upstream(e.to_string()))?;
        repo::mark_videos_checked(&state.pool, user_id, chunk, Utc::now().naive_utc()).await?;
        report.found += details.len();
        for video in &details {
            report.updated_rows += repo::update_video_details(&state.pool, user_id, video).await?;
        }
    }

    info!(found = report.found, rows = report.updated_rows, "Enriched watch history");
    Ok(report)
}

/// Creates a workspace page for a new media row, returning its id
///
/// Returns `None` without a workspace or media database, or when the call fails.
pub async fn mirror_created(state: &AppState, media: &Media) -> Option<String> {
    let workspace = state.services.workspace.as_ref()?;
    let database_id = state.config.notion_media_db.as_deref()?;

    match workspace.create_page(database_id, state.mapping().media_properties(media)).await {
        Ok(page) => {
            debug!(page_id = %page.id, "Created workspace page");
            Some(page.id)
        }
        Err(e) => {
            warn!(media_id = %media.id, "Could not create workspace page: {}", e);
            None
        }
    }
}

/// Pushes the mapped properties of a row to its page; true on success
pub async fn mirror_updated(state: &AppState, media: &Media) -> bool {
    let (Some(workspace), Some(page_id)) = (state.services.workspace.as_ref(), media.notion_page_id.as_deref()) else {
        return false;
    };

    match workspace.update_page(page_id, state.mapping().media_properties(media)).await {
        Ok(_) => true,
        Err(e) => {
            warn!(page_id, "Could not update workspace page: {}", e);
            false
        }
    }
}

/// Archives the page of a deleted row; true on success
pub async fn mirror_deleted(state: &AppState, media: &Media) -> bool {
    let (Some(workspace), Some(page_id)) = (state.services.workspace.as_ref(), media.notion_page_id.as_deref()) else {
        return false;
    };

    match workspace.archive_page(page_id).await {
        Ok(()) => true,
        Err(e) => {
            warn!(page_id, "Could not archive workspace page: {}", e);
            false
        }
    }
}
