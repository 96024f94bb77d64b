//! Error types for `convus-core`.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single field-level validation message, e.g. `name can't be only numbers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
  pub field:   String,
  pub message: String,
}

impl FieldError {
  pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
    Self { field: field.into(), message: message.into() }
  }
}

impl fmt::Display for FieldError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {}", self.field, self.message)
  }
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("{entity} is invalid: {}", join_field_errors(.errors))]
  Validation {
    entity: &'static str,
    errors: Vec<FieldError>,
  },

  #[error("{entity} already exists: {detail}")]
  Uniqueness {
    entity: &'static str,
    detail: String,
  },

  #[error("user not found: {0}")]
  UserNotFound(i64),

  #[error("review not found: {0}")]
  ReviewNotFound(i64),

  #[error("topic not found: {0}")]
  TopicNotFound(i64),

  #[error("topic investigation not found: {0}")]
  InvestigationNotFound(i64),

  #[error("topic investigation vote not found: {0}")]
  VoteNotFound(i64),
}

impl Error {
  /// Shorthand for a validation failure carrying one message.
  pub fn invalid(
    entity: &'static str,
    field: impl Into<String>,
    message: impl Into<String>,
  ) -> Self {
    Self::Validation { entity, errors: vec![FieldError::new(field, message)] }
  }

  /// The field-level messages, if this is a validation failure.
  pub fn field_errors(&self) -> &[FieldError] {
    match self {
      Self::Validation { errors, .. } => errors,
      _ => &[],
    }
  }
}

fn join_field_errors(errors: &[FieldError]) -> String {
  errors
    .iter()
    .map(ToString::to_string)
    .collect::<Vec<_>>()
    .join(", ")
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
