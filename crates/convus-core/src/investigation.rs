//! Topic investigations: time-boxed events over a topic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvestigationStatus {
  Pending,
  Active,
  Ended,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicInvestigation {
  pub investigation_id: i64,
  pub topic_id:         i64,
  /// Denormalised from the topic; refreshed when the topic is renamed.
  pub topic_name:       String,
  pub start_at:         Option<DateTime<Utc>>,
  pub end_at:           Option<DateTime<Utc>>,
  pub created_at:       DateTime<Utc>,
  pub updated_at:       DateTime<Utc>,
}

impl TopicInvestigation {
  pub fn status_at(&self, now: DateTime<Utc>) -> InvestigationStatus {
    calculated_status(self.start_at, self.end_at, now)
  }

  pub fn status(&self) -> InvestigationStatus { self.status_at(Utc::now()) }
}

/// Input to [`crate::store::RatingStore::create_investigation`].
#[derive(Debug, Clone)]
pub struct NewInvestigation {
  /// Resolved with find-or-create; a numeric string refers to a topic id.
  pub topic_name: String,
  pub start_at:   Option<DateTime<Utc>>,
  pub end_at:     Option<DateTime<Utc>>,
}

impl NewInvestigation {
  pub fn validate(&self) -> Result<()> {
    if self.topic_name.trim().is_empty() {
      return Err(Error::invalid("topic investigation", "topic_name", "can't be blank"));
    }
    Ok(())
  }
}

/// Swap the bounds when the window ends before it starts.
pub fn normalize_window(
  start_at: Option<DateTime<Utc>>,
  end_at: Option<DateTime<Utc>>,
) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
  match (start_at, end_at) {
    (Some(start), Some(end)) if end < start => (Some(end), Some(start)),
    window => window,
  }
}

pub fn calculated_status(
  start_at: Option<DateTime<Utc>>,
  end_at: Option<DateTime<Utc>>,
  now: DateTime<Utc>,
) -> InvestigationStatus {
  let (start_at, end_at) = normalize_window(start_at, end_at);
  match (start_at, end_at) {
    (Some(start), Some(end)) if start <= now => {
      if end > now {
        InvestigationStatus::Active
      } else {
        InvestigationStatus::Ended
      }
    }
    _ => InvestigationStatus::Pending,
  }
}
