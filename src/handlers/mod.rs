/// Web API Handlers
///
/// One module per resource. Every handler except the health check and the
/// Spotify callback takes an `AuthUser`, so requests without a valid bearer
/// token are rejected before any work is done.

mod health_handlers;
mod media_handlers;
mod lookup_handlers;
mod people_handlers;
mod todo_handlers;
mod tracking_handlers;
mod youtube_handlers;
mod spotify_handlers;
mod finance_handlers;
mod palette_handlers;

// Re-export all handlers
pub use health_handlers::*;
pub use media_handlers::*;
pub use lookup_handlers::*;
pub use people_handlers::*;
pub use todo_handlers::*;
pub use tracking_handlers::*;
pub use youtube_handlers::*;
pub use spotify_handlers::*;
pub use finance_handlers::*;
pub use palette_handlers::*;
