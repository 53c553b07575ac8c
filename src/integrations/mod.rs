//! Clients for the third-party services the dashboard reads from.
//!
//! Every client takes a shared [`HttpClient`](crate::http::HttpClient), so
//! all calls share one timeout and retry policy, and has a base URL that can
//! be pointed elsewhere.

pub mod ai;
pub mod books;
pub mod omdb;
pub mod spotify;
pub mod youtube;

pub use ai::{AiClient, AiError};
pub use books::{BookDetails, BooksClient, BooksError};
pub use omdb::{MovieDetails, OmdbClient, OmdbError};
pub use spotify::{NowPlaying, RecentPlay, SpotifyClient, SpotifyError, TokenGrant, Track};
pub use youtube::{VideoDetails, YoutubeClient, YoutubeError};
