//! Core types and progress tracking for the hosut lesson viewer.
//!
//! This crate is free of database and HTTP dependencies. Storage backends
//! implement [`store::EntryStore`]; everything above that trait (encoding,
//! the repository, the tracker and the playback session) lives here.

pub mod catalog;
pub mod clock;
pub mod encode;
pub mod error;
pub mod progress;
pub mod repository;
pub mod session;
pub mod store;
pub mod tracker;

pub use clock::Clock;
pub use error::{Error, Result};
pub use progress::{ClipProgress, LessonProgress, LessonStatus, Progress};
pub use repository::{ProgressRepository, RepositoryConfig};
pub use tracker::ProgressTracker;
