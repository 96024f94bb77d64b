//! Topics and their association with reviews.
//!
//! A topic is found by name or slug, created lazily, and never deleted here.
//! Its `orphaned` flag is derived from the association table and is never set
//! directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, FieldError, Result,
  slug::{is_numeric, slugify},
};

// ─── Entities ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
  pub topic_id:      i64,
  pub name:          String,
  pub slug:          String,
  /// The slug before the most recent rename, kept so old links resolve.
  pub previous_slug: Option<String>,
  /// True when no review is associated with the topic.
  pub orphaned:      bool,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

impl Topic {
  pub fn is_active(&self) -> bool { !self.orphaned }
}

/// Join row linking a review to a topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewTopic {
  pub review_id:  i64,
  pub topic_id:   i64,
  pub created_at: DateTime<Utc>,
}

/// Restricts [`crate::store::RatingStore::list_topics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopicFilter {
  #[default]
  All,
  Active,
  Orphaned,
}

// ─── Lookup ──────────────────────────────────────────────────────────────────

/// How a user-supplied topic reference should be looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicLookup {
  Id(i64),
  Slug(String),
}

/// Digits look up by id, anything else by slug. Blank input finds nothing.
pub fn classify_lookup(reference: &str) -> Option<TopicLookup> {
  let reference = reference.trim();
  if reference.is_empty() {
    return None;
  }
  if is_numeric(reference) {
    return reference.parse().ok().map(TopicLookup::Id);
  }
  Some(TopicLookup::Slug(slugify(reference)))
}

// ─── Validation ──────────────────────────────────────────────────────────────

/// A proposed name for a new or renamed topic, normalised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicCandidate {
  pub name: String,
  pub slug: String,
}

impl TopicCandidate {
  pub fn new(raw_name: &str) -> Self {
    let name = raw_name.trim().to_owned();
    let slug = slugify(&name);
    Self { name, slug }
  }
}

/// What the store found among *other* topics for a candidate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TopicConflicts {
  /// Another topic has the same name, ignoring case.
  pub name_taken: bool,
  /// Another topic has the same slug.
  pub slug_taken: bool,
}

pub fn validate(candidate: &TopicCandidate, conflicts: TopicConflicts) -> Result<()> {
  let mut errors = Vec::new();
  if candidate.name.is_empty() {
    errors.push(FieldError::new("name", "can't be blank"));
  } else if candidate.slug.is_empty() {
    errors.push(FieldError::new("name", "must include a letter or number"));
  } else if is_numeric(&candidate.slug) {
    errors.push(FieldError::new("name", "can't be only numbers"));
  }
  // One "taken" message, whichever column collided.
  if conflicts.name_taken || conflicts.slug_taken {
    errors.push(FieldError::new("name", "has already been taken"));
  }

  if errors.is_empty() {
    Ok(())
  } else {
    Err(Error::Validation { entity: "topic", errors })
  }
}

/// The `previous_slug` to store after a rename from `old_slug` to `new_slug`.
pub fn next_previous_slug(
  old_slug: &str,
  new_slug: &str,
  current_previous: Option<String>,
) -> Option<String> {
  if !old_slug.is_empty() && old_slug != new_slug {
    Some(old_slug.to_owned())
  } else {
    current_previous
  }
}
