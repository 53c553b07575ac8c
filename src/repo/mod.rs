/// Repository module
///
/// This module provides the data access layer for the application.
/// Every function takes the id of the user the rows belong to and never
/// reads or writes another user's rows.

mod media_repo;
mod people_repo;
mod todo_repo;
mod tracking_repo;
mod youtube_repo;
mod spotify_repo;

// Re-export all repository functions
pub use media_repo::*;
pub use people_repo::*;
pub use todo_repo::*;
pub use tracking_repo::*;
pub use youtube_repo::*;
pub use spotify_repo::*;
