//! Error types for `lexa-core`.
//!
//! Every failure raised by the domain layer is a validation failure. The
//! variant is the stable, distinguishable kind that callers map onto their
//! own transport; the payload is a human-readable detail.

use thiserror::Error;

use crate::identity::EntityKind;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
  /// A required field or argument was absent or empty.
  #[error("missing value: {0}")]
  MissingValue(String),

  /// A value resolved to an entity of the wrong kind.
  #[error("type mismatch: expected {expected}, found {found}")]
  TypeMismatch {
    expected: EntityKind,
    found:    EntityKind,
  },

  /// A structural rule was broken (set size, distinctness, membership).
  #[error("structural violation: {0}")]
  StructuralViolation(String),

  /// The acting user lacks the required privilege level.
  #[error("permission denied: {0}")]
  PermissionDenied(String),

  /// A ratio or rate was requested with a zero denominator.
  #[error("arithmetic undefined: {0}")]
  ArithmeticUndefined(String),
}

/// Payload-free discriminant of [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
  MissingValue,
  TypeMismatch,
  StructuralViolation,
  PermissionDenied,
  ArithmeticUndefined,
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::MissingValue(_) => ErrorKind::MissingValue,
      Self::TypeMismatch { .. } => ErrorKind::TypeMismatch,
      Self::StructuralViolation(_) => ErrorKind::StructuralViolation,
      Self::PermissionDenied(_) => ErrorKind::PermissionDenied,
      Self::ArithmeticUndefined(_) => ErrorKind::ArithmeticUndefined,
    }
  }

  pub(crate) fn missing(what: impl Into<String>) -> Self {
    Self::MissingValue(what.into())
  }

  pub(crate) fn structural(detail: impl Into<String>) -> Self {
    Self::StructuralViolation(detail.into())
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
