//! Emepetre Core
//!
//! Platform-agnostic domain types and the persistence contract consumed by
//! the playback core.
//!
//! The core crate defines:
//! - **Domain Types**: `Track`, `TrackId`, `ResumeState`, `HistoryEntry`
//! - **Persistence**: the async `PersistentStore` trait and an in-memory
//!   `MemoryStore` implementation
//! - **Error Handling**: `CoreError` and its `Result` alias
//!
//! # Example
//!
//! ```rust
//! use emepetre_core::{MemoryStore, PersistentStore, Track, TrackId};
//!
//! # async fn example() -> emepetre_core::Result<()> {
//! let store = MemoryStore::new();
//! let track = Track::new(TrackId::new("intro"), "Intro", 42.0);
//! store.insert_audio(track.id.clone(), vec![0u8; 16]).await;
//!
//! let bytes = store.get_track_audio(&track.id).await?;
//! assert_eq!(bytes.len(), 16);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod error;
mod memory;
pub mod store;
pub mod types;

pub use error::{CoreError, Result};
pub use memory::MemoryStore;
pub use store::PersistentStore;
pub use types::{HistoryEntry, ResumeState, Track, TrackId};
