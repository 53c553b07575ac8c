use axum::extract::State;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::auth::AuthUser;
use crate::dto::BookLookupQuery;
use crate::errors::ApiError;
use crate::extract::{Json, Path, Query};
use crate::integrations::{BookDetails, BooksError, MovieDetails, OmdbError};
use crate::state::Services;

impl From<OmdbError> for ApiError {
    fn from(err: OmdbError) -> Self {
        match err {
            OmdbError::InvalidId(_) => ApiError::BadRequest(err.to_string()),
            OmdbError::NotFound(_) => ApiError::NotFoundWithMessage(err.to_string()),
            OmdbError::Fetch(_) => ApiError::Upstream(err.to_string()),
        }
    }
}

impl From<BooksError> for ApiError {
    fn from(err: BooksError) -> Self {
        match err {
            BooksError::MissingQuery => ApiError::BadRequest(err.to_string()),
            BooksError::Fetch(_) => ApiError::Upstream(err.to_string()),
        }
    }
}

/// Handler previewing an OMDb entry without storing anything
///
/// This function handles GET requests to `/lookup/imdb/{imdb_id}`.
#[instrument(skip(services, _user))]
pub async fn lookup_imdb_handler(
    State(services): State<Arc<Services>>,
    _user: AuthUser,
    Path(imdb_id): Path<String>,
) -> Result<Json<MovieDetails>, ApiError> {
    let details = services.omdb()?.lookup(&imdb_id).await?;
    Ok(Json(details))
}

/// Handler previewing Google Books matches
///
/// This function handles GET requests to `/lookup/books`. An ISBN yields at
/// most one result; otherwise the title (and author, if given) is searched.
#[instrument(skip(services, _user))]
pub async fn lookup_books_handler(
    State(services): State<Arc<Services>>,
    _user: AuthUser,
    Query(query): Query<BookLookupQuery>,
) -> Result<Json<Vec<BookDetails>>, ApiError> {
    let books = match query.isbn.as_deref().filter(|isbn| !isbn.trim().is_empty()) {
        Some(isbn) => services.books.by_isbn(isbn).await?.into_iter().collect(),
        None => {
            let title = query.title.as_deref().unwrap_or_default();
            services.books.search(title, query.author.as_deref()).await?
        }
    };

    debug!("Found {} books", books.len());
    Ok(Json(books))
}
