pub mod media;
pub mod todo;
pub mod tracking;
pub mod youtube;
