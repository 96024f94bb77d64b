//! Activity events. The target is a tagged union rather than a polymorphic
//! foreign key.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
  ReviewCreated,
  UserEnabledPublicView,
  UserAddedAbout,
}

impl EventKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::ReviewCreated => "review_created",
      Self::UserEnabledPublicView => "user_enabled_public_view",
      Self::UserAddedAbout => "user_added_about",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum EventTarget {
  Review(i64),
  User(i64),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
  pub event_id:     i64,
  pub user_id:      i64,
  pub kind:         EventKind,
  pub target:       EventTarget,
  /// The date the target came into being, if it has one; otherwise the
  /// event's own date.
  pub created_date: NaiveDate,
  pub created_at:   DateTime<Utc>,
}

pub fn created_date(target_created_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> NaiveDate {
  target_created_at.unwrap_or(now).date_naive()
}
