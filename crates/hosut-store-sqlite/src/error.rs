//! Error type for `hosut-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("entry {name:?} is {len} bytes, over the {max} byte limit")]
  EntryTooLarge { name: String, len: usize, max: usize },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
