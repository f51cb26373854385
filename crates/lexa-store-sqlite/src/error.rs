//! Error type for `lexa-store-sqlite`.

use lexa_core::ErrorKind;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  /// A validation failure raised by the domain layer.
  #[error("validation error: {0}")]
  Core(#[from] lexa_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(rusqlite::Error),

  #[error("configuration error: {0}")]
  Config(#[from] ::config::ConfigError),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown entity kind: {0:?}")]
  UnknownKind(String),

  #[error("entity not found: {0}")]
  NotFound(Uuid),

  /// A uniqueness rule was hit, typically a duplicate name or a second
  /// learning record for the same user and vocabulary.
  #[error("conflict: {0}")]
  Conflict(String),
}

impl Error {
  /// The domain error kind, if this is a validation failure.
  pub fn core_kind(&self) -> Option<ErrorKind> {
    match self {
      Self::Core(e) => Some(e.kind()),
      _ => None,
    }
  }
}

impl From<rusqlite::Error> for Error {
  fn from(err: rusqlite::Error) -> Self {
    match err {
      rusqlite::Error::SqliteFailure(e, msg)
        if e.code == rusqlite::ErrorCode::ConstraintViolation =>
      {
        Self::Conflict(msg.unwrap_or_else(|| e.to_string()))
      }
      other => Self::Sqlite(other),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
