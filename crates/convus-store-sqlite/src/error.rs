//! Error type for `convus-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] convus_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown {column} value: {value:?}")]
  UnknownValue {
    column: &'static str,
    value:  String,
  },
}

impl Error {
  /// The domain error, if this is one.
  pub fn as_core(&self) -> Option<&convus_core::Error> {
    match self {
      Self::Core(e) => Some(e),
      _ => None,
    }
  }

  pub fn is_validation(&self) -> bool {
    matches!(self.as_core(), Some(convus_core::Error::Validation { .. }))
  }

  pub fn is_uniqueness(&self) -> bool {
    matches!(self.as_core(), Some(convus_core::Error::Uniqueness { .. }))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
