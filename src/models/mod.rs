/// Data models module
///
/// This module defines the rows stored in the relational store. Every row
/// carries the id of the user that owns it.

mod string_list;
pub use string_list::StringList;

mod kinds;
pub use kinds::{MediaStatus, MediaType, ParseKindError, TodoPriority};

mod media;
pub use media::Media;

mod person;
pub use person::Person;

mod todo;
pub use todo::Todo;

mod tracking_entry;
pub use tracking_entry::TrackingEntry;

mod youtube_watch;
pub use youtube_watch::YoutubeWatch;

mod spotify_token;
pub use spotify_token::SpotifyToken;

mod oauth_state;
pub use oauth_state::OauthState;
