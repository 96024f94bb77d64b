//! Reviews: one user's judgment of one citation.
//!
//! The free-text `topics_text` field is the source of truth for which topics a
//! review belongs to; the association rows are reconciled from it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, score};

// ─── Enums ───────────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
  #[default]
  Medium,
  Low,
  High,
}

impl Quality {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Medium => "medium",
      Self::Low => "low",
      Self::High => "high",
    }
  }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Agreement {
  #[default]
  Neutral,
  Disagree,
  Agree,
}

impl Agreement {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Neutral => "neutral",
      Self::Disagree => "disagree",
      Self::Agree => "agree",
    }
  }
}

// ─── Review ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
  /// Monotonic identity; doubles as submission order for ranking.
  pub review_id:      i64,
  pub user_id:        i64,
  pub citation_id:    i64,
  pub submitted_url:  String,
  pub citation_title: Option<String>,
  pub quality:        Quality,
  pub agreement:      Agreement,
  pub topics_text:    Option<String>,
  pub created_at:     DateTime<Utc>,
  pub updated_at:     DateTime<Utc>,
}

impl Review {
  /// Topic names parsed from `topics_text`, in order of appearance.
  pub fn topics(&self) -> Vec<String> {
    parse_topics(self.topics_text.as_deref().unwrap_or_default())
  }

  pub fn default_score(&self) -> i64 { score::default_score(self) }
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Input to [`crate::store::RatingStore::create_review`].
#[derive(Debug, Clone)]
pub struct NewReview {
  pub user_id:                   i64,
  pub submitted_url:             String,
  pub citation_title:            Option<String>,
  pub quality:                   Quality,
  pub agreement:                 Agreement,
  pub topics_text:               Option<String>,
  /// Leave topic associations alone; the caller reconciles later.
  pub skip_topics_reconcile:     bool,
  pub skip_review_created_event: bool,
}

impl NewReview {
  pub fn new(user_id: i64, submitted_url: impl Into<String>) -> Self {
    Self {
      user_id,
      submitted_url: submitted_url.into(),
      citation_title: None,
      quality: Quality::default(),
      agreement: Agreement::default(),
      topics_text: None,
      skip_topics_reconcile: false,
      skip_review_created_event: false,
    }
  }

  pub fn with_quality(mut self, quality: Quality) -> Self {
    self.quality = quality;
    self
  }

  pub fn with_topics(mut self, topics_text: impl Into<String>) -> Self {
    self.topics_text = Some(topics_text.into());
    self
  }
}

/// Patch applied by [`crate::store::RatingStore::update_review`]. `None`
/// leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ReviewUpdate {
  pub submitted_url:         Option<String>,
  pub citation_title:        Option<Option<String>>,
  pub quality:               Option<Quality>,
  pub agreement:             Option<Agreement>,
  pub topics_text:           Option<String>,
  pub skip_topics_reconcile: bool,
}

impl ReviewUpdate {
  /// Apply the patch in place. Returns `true` if the quality changed, which
  /// makes any listing orders computed from it stale.
  pub fn apply(self, review: &mut Review) -> bool {
    if let Some(url) = self.submitted_url {
      review.submitted_url = url;
    }
    if let Some(title) = self.citation_title {
      review.citation_title = normalize_citation_title(title);
    }
    if let Some(agreement) = self.agreement {
      review.agreement = agreement;
    }
    if let Some(text) = self.topics_text {
      review.topics_text = Some(text);
    }
    match self.quality {
      Some(quality) if quality != review.quality => {
        review.quality = quality;
        true
      }
      _ => false,
    }
  }
}

// ─── Topic text ──────────────────────────────────────────────────────────────

/// Split topic text into trimmed, non-blank names, one per line.
///
/// Names repeated with different capitalisation collapse to their first
/// occurrence.
pub fn parse_topics(text: &str) -> Vec<String> {
  let mut names: Vec<String> = Vec::new();
  for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
    if !names.iter().any(|n| n.to_lowercase() == line.to_lowercase()) {
      names.push(line.to_owned());
    }
  }
  names
}

/// Topic text with `name` appended as a new line, unless a line already
/// satisfies `present`.
pub fn with_topic_added(
  text: Option<&str>,
  name: &str,
  present: impl Fn(&str) -> bool,
) -> String {
  let mut names = parse_topics(text.unwrap_or_default());
  if !names.iter().any(|n| present(n)) {
    names.push(name.to_owned());
  }
  names.join("\n")
}

/// Topic text with every line matching `remove` dropped.
pub fn with_topics_removed(
  text: Option<&str>,
  remove: impl Fn(&str) -> bool,
) -> String {
  parse_topics(text.unwrap_or_default())
    .into_iter()
    .filter(|n| !remove(n))
    .collect::<Vec<_>>()
    .join("\n")
}

// ─── Validation ──────────────────────────────────────────────────────────────

/// Reject blank URLs and the literal `error` some clients send when they fail
/// to read the current page.
pub fn validate_submitted_url(url: &str) -> Result<()> {
  let url = url.trim();
  if url.is_empty() {
    return Err(Error::invalid("review", "submitted_url", "can't be blank"));
  }
  if url.eq_ignore_ascii_case("error") {
    return Err(Error::invalid(
      "review",
      "submitted_url",
      format!("'{url}' not valid"),
    ));
  }
  Ok(())
}

pub fn normalize_citation_title(title: Option<String>) -> Option<String> {
  title
    .map(|t| t.trim().to_owned())
    .filter(|t| !t.is_empty())
}
