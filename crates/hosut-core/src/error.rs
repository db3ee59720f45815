//! Error types for `hosut-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("lesson not found: {0}")]
  LessonNotFound(String),

  #[error("clip index {index} out of range for a lesson with {len} clips")]
  ClipOutOfRange { index: usize, len: usize },

  #[error("clip {clip_id} has an invalid or missing MP4 URL: {url:?}")]
  InvalidMediaUrl { clip_id: String, url: String },

  #[error("ttl_days must be between 1 and {max}, got {days}")]
  TtlOutOfRange { days: i64, max: i64 },

  #[error("invalid escape sequence in stored value")]
  Unescape(#[from] std::str::Utf8Error),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
