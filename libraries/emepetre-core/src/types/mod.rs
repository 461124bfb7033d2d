//! Domain types shared by the player crates

mod ids;
mod resume;
mod track;

pub use ids::TrackId;
pub use resume::{HistoryEntry, ResumeState};
pub use track::Track;
