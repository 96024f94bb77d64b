//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings and dates as `YYYY-MM-DD`.
//! Enums are stored as their lowercase names, event targets as compact JSON.

use chrono::{DateTime, NaiveDate, Utc};
use convus_core::{
  citation::Citation,
  event::{Event, EventKind, EventTarget},
  investigation::TopicInvestigation,
  review::{Agreement, Quality, Review},
  topic::Topic,
  user::User,
  vote::TopicInvestigationVote,
};
use rusqlite::Row;

use crate::{Error, Result};

// ─── DateTime<Utc> / NaiveDate ───────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn decode_quality(s: &str) -> Result<Quality> {
  match s {
    "high" => Ok(Quality::High),
    "medium" => Ok(Quality::Medium),
    "low" => Ok(Quality::Low),
    other => Err(Error::UnknownValue { column: "quality", value: other.to_owned() }),
  }
}

pub fn decode_agreement(s: &str) -> Result<Agreement> {
  match s {
    "agree" => Ok(Agreement::Agree),
    "disagree" => Ok(Agreement::Disagree),
    "neutral" => Ok(Agreement::Neutral),
    other => Err(Error::UnknownValue { column: "agreement", value: other.to_owned() }),
  }
}

pub fn decode_event_kind(s: &str) -> Result<EventKind> {
  match s {
    "review_created" => Ok(EventKind::ReviewCreated),
    "user_enabled_public_view" => Ok(EventKind::UserEnabledPublicView),
    "user_added_about" => Ok(EventKind::UserAddedAbout),
    other => Err(Error::UnknownValue { column: "kind", value: other.to_owned() }),
  }
}

pub fn encode_event_target(t: &EventTarget) -> Result<String> {
  Ok(serde_json::to_string(t)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const USER_COLUMNS: &str = "user_id, username, username_slug, created_at";

pub struct RawUser {
  pub user_id:       i64,
  pub username:      String,
  pub username_slug: String,
  pub created_at:    String,
}

impl RawUser {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:       row.get(0)?,
      username:      row.get(1)?,
      username_slug: row.get(2)?,
      created_at:    row.get(3)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:       self.user_id,
      username:      self.username,
      username_slug: self.username_slug,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

pub const CITATION_COLUMNS: &str = "citation_id, url, title, created_at";

pub struct RawCitation {
  pub citation_id: i64,
  pub url:         String,
  pub title:       Option<String>,
  pub created_at:  String,
}

impl RawCitation {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      citation_id: row.get(0)?,
      url:         row.get(1)?,
      title:       row.get(2)?,
      created_at:  row.get(3)?,
    })
  }

  pub fn into_citation(self) -> Result<Citation> {
    Ok(Citation {
      citation_id: self.citation_id,
      url:         self.url,
      title:       self.title,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

pub const REVIEW_COLUMNS: &str = "review_id, user_id, citation_id, submitted_url, \
   citation_title, quality, agreement, topics_text, created_at, updated_at";

pub struct RawReview {
  pub review_id:      i64,
  pub user_id:        i64,
  pub citation_id:    i64,
  pub submitted_url:  String,
  pub citation_title: Option<String>,
  pub quality:        String,
  pub agreement:      String,
  pub topics_text:    Option<String>,
  pub created_at:     String,
  pub updated_at:     String,
}

impl RawReview {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      review_id:      row.get(0)?,
      user_id:        row.get(1)?,
      citation_id:    row.get(2)?,
      submitted_url:  row.get(3)?,
      citation_title: row.get(4)?,
      quality:        row.get(5)?,
      agreement:      row.get(6)?,
      topics_text:    row.get(7)?,
      created_at:     row.get(8)?,
      updated_at:     row.get(9)?,
    })
  }

  pub fn into_review(self) -> Result<Review> {
    Ok(Review {
      review_id:      self.review_id,
      user_id:        self.user_id,
      citation_id:    self.citation_id,
      submitted_url:  self.submitted_url,
      citation_title: self.citation_title,
      quality:        decode_quality(&self.quality)?,
      agreement:      decode_agreement(&self.agreement)?,
      topics_text:    self.topics_text,
      created_at:     decode_dt(&self.created_at)?,
      updated_at:     decode_dt(&self.updated_at)?,
    })
  }
}

pub const TOPIC_COLUMNS: &str =
  "topic_id, name, slug, previous_slug, orphaned, created_at, updated_at";

pub struct RawTopic {
  pub topic_id:      i64,
  pub name:          String,
  pub slug:          String,
  pub previous_slug: Option<String>,
  pub orphaned:      bool,
  pub created_at:    String,
  pub updated_at:    String,
}

impl RawTopic {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      topic_id:      row.get(0)?,
      name:          row.get(1)?,
      slug:          row.get(2)?,
      previous_slug: row.get(3)?,
      orphaned:      row.get(4)?,
      created_at:    row.get(5)?,
      updated_at:    row.get(6)?,
    })
  }

  pub fn into_topic(self) -> Result<Topic> {
    Ok(Topic {
      topic_id:      self.topic_id,
      name:          self.name,
      slug:          self.slug,
      previous_slug: self.previous_slug,
      orphaned:      self.orphaned,
      created_at:    decode_dt(&self.created_at)?,
      updated_at:    decode_dt(&self.updated_at)?,
    })
  }
}

pub const INVESTIGATION_COLUMNS: &str =
  "investigation_id, topic_id, topic_name, start_at, end_at, created_at, updated_at";

pub struct RawInvestigation {
  pub investigation_id: i64,
  pub topic_id:         i64,
  pub topic_name:       String,
  pub start_at:         Option<String>,
  pub end_at:           Option<String>,
  pub created_at:       String,
  pub updated_at:       String,
}

impl RawInvestigation {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      investigation_id: row.get(0)?,
      topic_id:         row.get(1)?,
      topic_name:       row.get(2)?,
      start_at:         row.get(3)?,
      end_at:           row.get(4)?,
      created_at:       row.get(5)?,
      updated_at:       row.get(6)?,
    })
  }

  pub fn into_investigation(self) -> Result<TopicInvestigation> {
    Ok(TopicInvestigation {
      investigation_id: self.investigation_id,
      topic_id:         self.topic_id,
      topic_name:       self.topic_name,
      start_at:         decode_opt_dt(self.start_at)?,
      end_at:           decode_opt_dt(self.end_at)?,
      created_at:       decode_dt(&self.created_at)?,
      updated_at:       decode_dt(&self.updated_at)?,
    })
  }
}

pub const VOTE_COLUMNS: &str = "vote_id, investigation_id, user_id, review_id, \
   listing_order, recommended, manual_rank, created_at, updated_at";

pub struct RawVote {
  pub vote_id:          i64,
  pub investigation_id: i64,
  pub user_id:          i64,
  pub review_id:        i64,
  pub listing_order:    i64,
  pub recommended:      bool,
  pub manual_rank:      bool,
  pub created_at:       String,
  pub updated_at:       String,
}

impl RawVote {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      vote_id:          row.get(0)?,
      investigation_id: row.get(1)?,
      user_id:          row.get(2)?,
      review_id:        row.get(3)?,
      listing_order:    row.get(4)?,
      recommended:      row.get(5)?,
      manual_rank:      row.get(6)?,
      created_at:       row.get(7)?,
      updated_at:       row.get(8)?,
    })
  }

  pub fn into_vote(self) -> Result<TopicInvestigationVote> {
    Ok(TopicInvestigationVote {
      vote_id:          self.vote_id,
      investigation_id: self.investigation_id,
      user_id:          self.user_id,
      review_id:        self.review_id,
      listing_order:    self.listing_order,
      recommended:      self.recommended,
      manual_rank:      self.manual_rank,
      created_at:       decode_dt(&self.created_at)?,
      updated_at:       decode_dt(&self.updated_at)?,
    })
  }
}

pub const EVENT_COLUMNS: &str = "event_id, user_id, kind, target, created_date, created_at";

pub struct RawEvent {
  pub event_id:     i64,
  pub user_id:      i64,
  pub kind:         String,
  pub target:       String,
  pub created_date: String,
  pub created_at:   String,
}

impl RawEvent {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      event_id:     row.get(0)?,
      user_id:      row.get(1)?,
      kind:         row.get(2)?,
      target:       row.get(3)?,
      created_date: row.get(4)?,
      created_at:   row.get(5)?,
    })
  }

  pub fn into_event(self) -> Result<Event> {
    Ok(Event {
      event_id:     self.event_id,
      user_id:      self.user_id,
      kind:         decode_event_kind(&self.kind)?,
      target:       serde_json::from_str(&self.target)?,
      created_date: decode_date(&self.created_date)?,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}
