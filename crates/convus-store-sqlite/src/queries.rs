//! Synchronous statements run on the connection thread.
//!
//! Every function takes a plain `&Connection`; [`crate::SqliteStore`] hands in
//! an open transaction for writes, so a failure anywhere in a multi-step
//! operation rolls the whole operation back.

use std::collections::{HashMap, hash_map::Entry};

use chrono::{DateTime, NaiveDate, Utc};
use convus_core::{
  citation::{Citation, normalize_url},
  event::{Event, EventKind, EventTarget},
  investigation::TopicInvestigation,
  ranking::{PriorVote, RankedVote},
  reconcile::{ReconcileOutcome, plan_reconciliation},
  review::{NewReview, Review, normalize_citation_title},
  slug::slugify,
  topic::{self, ReviewTopic, Topic, TopicCandidate, TopicConflicts, TopicFilter, TopicLookup},
  user::User,
  vote::{TopicInvestigationVote, settle_rank},
};
use rusqlite::{Connection, OptionalExtension as _, Params, params};

use crate::{
  Error, Result,
  encode::{
    CITATION_COLUMNS, EVENT_COLUMNS, INVESTIGATION_COLUMNS, RawCitation, RawEvent,
    RawInvestigation, RawReview, RawTopic, RawUser, RawVote, REVIEW_COLUMNS, TOPIC_COLUMNS,
    USER_COLUMNS, VOTE_COLUMNS, decode_dt, decode_quality, encode_date, encode_dt,
    encode_event_target,
  },
};

type CoreError = convus_core::Error;

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn is_unique_violation(err: &rusqlite::Error) -> bool {
  matches!(
    err,
    rusqlite::Error::SqliteFailure(e, _)
      if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
  )
}

/// Turn a unique-constraint failure into the domain's uniqueness error.
fn uniqueness(
  err: rusqlite::Error,
  entity: &'static str,
  detail: impl FnOnce() -> String,
) -> Error {
  if is_unique_violation(&err) {
    CoreError::Uniqueness { entity, detail: detail() }.into()
  } else {
    err.into()
  }
}

fn ids(conn: &Connection, sql: &str, params: impl Params) -> Result<Vec<i64>> {
  let mut stmt = conn.prepare(sql)?;
  let ids = stmt
    .query_map(params, |r| r.get(0))?
    .collect::<rusqlite::Result<Vec<i64>>>()?;
  Ok(ids)
}

fn exists(conn: &Connection, sql: &str, params: impl Params) -> Result<bool> {
  Ok(conn.query_row(&format!("SELECT EXISTS ({sql})"), params, |r| r.get(0))?)
}

// ─── Users ───────────────────────────────────────────────────────────────────

pub fn insert_user(conn: &Connection, username: &str, now: DateTime<Utc>) -> Result<User> {
  let username = username.trim();
  let username_slug = slugify(username);
  if username_slug.is_empty() {
    return Err(CoreError::invalid("user", "username", "can't be blank").into());
  }

  conn
    .execute(
      "INSERT INTO users (username, username_slug, created_at) VALUES (?1, ?2, ?3)",
      params![username, username_slug, encode_dt(now)],
    )
    .map_err(|e| uniqueness(e, "user", || format!("username {username:?} is taken")))?;

  Ok(User {
    user_id: conn.last_insert_rowid(),
    username: username.to_owned(),
    username_slug,
    created_at: now,
  })
}

pub fn load_user(conn: &Connection, user_id: i64) -> Result<Option<User>> {
  conn
    .query_row(
      &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
      params![user_id],
      RawUser::from_row,
    )
    .optional()?
    .map(RawUser::into_user)
    .transpose()
}

// ─── Citations ───────────────────────────────────────────────────────────────

pub fn find_or_create_citation(
  conn: &Connection,
  url: &str,
  title: Option<String>,
  now: DateTime<Utc>,
) -> Result<Citation> {
  let url = normalize_url(url);
  let title = normalize_citation_title(title);

  let existing = conn
    .query_row(
      &format!("SELECT {CITATION_COLUMNS} FROM citations WHERE url = ?1"),
      params![url],
      RawCitation::from_row,
    )
    .optional()?;

  if let Some(raw) = existing {
    let mut citation = raw.into_citation()?;
    if citation.title.is_none() && title.is_some() {
      conn.execute(
        "UPDATE citations SET title = ?2 WHERE citation_id = ?1",
        params![citation.citation_id, title],
      )?;
      citation.title = title;
    }
    return Ok(citation);
  }

  conn.execute(
    "INSERT INTO citations (url, title, created_at) VALUES (?1, ?2, ?3)",
    params![url, title, encode_dt(now)],
  )?;

  Ok(Citation { citation_id: conn.last_insert_rowid(), url, title, created_at: now })
}

// ─── Reviews ─────────────────────────────────────────────────────────────────

pub fn load_review(conn: &Connection, review_id: i64) -> Result<Option<Review>> {
  conn
    .query_row(
      &format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE review_id = ?1"),
      params![review_id],
      RawReview::from_row,
    )
    .optional()?
    .map(RawReview::into_review)
    .transpose()
}

pub fn require_review(conn: &Connection, review_id: i64) -> Result<Review> {
  load_review(conn, review_id)?.ok_or_else(|| CoreError::ReviewNotFound(review_id).into())
}

fn collect_reviews(conn: &Connection, sql: &str, params: impl Params) -> Result<Vec<Review>> {
  let mut stmt = conn.prepare(sql)?;
  let raws = stmt
    .query_map(params, RawReview::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawReview::into_review).collect()
}

pub fn list_reviews(conn: &Connection, user_id: Option<i64>) -> Result<Vec<Review>> {
  collect_reviews(
    conn,
    &format!(
      "SELECT {REVIEW_COLUMNS} FROM reviews WHERE ?1 IS NULL OR user_id = ?1 \
       ORDER BY review_id"
    ),
    params![user_id],
  )
}

/// A user's reviews whose citation URL or submitted URL is `url`.
pub fn reviews_matching_url(conn: &Connection, user_id: i64, url: &str) -> Result<Vec<Review>> {
  collect_reviews(
    conn,
    &format!(
      "SELECT {REVIEW_COLUMNS} FROM reviews
       WHERE user_id = ?1
         AND (submitted_url = ?2
              OR citation_id IN (SELECT citation_id FROM citations WHERE url = ?3))
       ORDER BY review_id"
    ),
    params![user_id, url.trim(), normalize_url(url)],
  )
}

pub fn insert_review(
  conn: &Connection,
  input: &NewReview,
  citation_id: i64,
  now: DateTime<Utc>,
) -> Result<Review> {
  let submitted_url = input.submitted_url.trim().to_owned();
  let citation_title = normalize_citation_title(input.citation_title.clone());

  conn
    .execute(
      "INSERT INTO reviews
         (user_id, citation_id, submitted_url, citation_title, quality, agreement,
          topics_text, created_at, updated_at)
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
      params![
        input.user_id,
        citation_id,
        submitted_url,
        citation_title,
        input.quality.as_str(),
        input.agreement.as_str(),
        input.topics_text,
        encode_dt(now),
      ],
    )
    .map_err(|e| {
      uniqueness(e, "review", || {
        format!("user {} already reviewed citation {citation_id}", input.user_id)
      })
    })?;

  Ok(Review {
    review_id: conn.last_insert_rowid(),
    user_id: input.user_id,
    citation_id,
    submitted_url,
    citation_title,
    quality: input.quality,
    agreement: input.agreement,
    topics_text: input.topics_text.clone(),
    created_at: now,
    updated_at: now,
  })
}

pub fn write_review(conn: &Connection, review: &Review) -> Result<()> {
  conn
    .execute(
      "UPDATE reviews SET
         citation_id = ?2, submitted_url = ?3, citation_title = ?4, quality = ?5,
         agreement = ?6, topics_text = ?7, updated_at = ?8
       WHERE review_id = ?1",
      params![
        review.review_id,
        review.citation_id,
        review.submitted_url,
        review.citation_title,
        review.quality.as_str(),
        review.agreement.as_str(),
        review.topics_text,
        encode_dt(review.updated_at),
      ],
    )
    .map_err(|e| {
      uniqueness(e, "review", || {
        format!("user {} already reviewed citation {}", review.user_id, review.citation_id)
      })
    })?;
  Ok(())
}

/// Associations and votes go with the row.
pub fn delete_review(conn: &Connection, review_id: i64) -> Result<()> {
  conn.execute("DELETE FROM reviews WHERE review_id = ?1", params![review_id])?;
  Ok(())
}

// ─── Topics ──────────────────────────────────────────────────────────────────

fn select_topic(conn: &Connection, tail: &str, params: impl Params) -> Result<Option<Topic>> {
  conn
    .query_row(
      &format!("SELECT {TOPIC_COLUMNS} FROM topics {tail} LIMIT 1"),
      params,
      RawTopic::from_row,
    )
    .optional()?
    .map(RawTopic::into_topic)
    .transpose()
}

pub fn load_topic(conn: &Connection, topic_id: i64) -> Result<Option<Topic>> {
  select_topic(conn, "WHERE topic_id = ?1", params![topic_id])
}

pub fn require_topic(conn: &Connection, topic_id: i64) -> Result<Topic> {
  load_topic(conn, topic_id)?.ok_or_else(|| CoreError::TopicNotFound(topic_id).into())
}

/// Current slug first, then a previous slug.
pub fn find_topic_by_slug(conn: &Connection, slug: &str) -> Result<Option<Topic>> {
  if slug.is_empty() {
    return Ok(None);
  }
  select_topic(
    conn,
    "WHERE slug = ?1 OR previous_slug = ?1 ORDER BY slug = ?1 DESC, topic_id",
    params![slug],
  )
}

/// The topic a free-text topic line refers to: name ignoring case, then slug.
pub fn find_topic_for_name(conn: &Connection, name: &str) -> Result<Option<Topic>> {
  let name = name.trim();
  if name.is_empty() {
    return Ok(None);
  }
  // `name` carries NOCASE collation.
  if let Some(topic) = select_topic(conn, "WHERE name = ?1", params![name])? {
    return Ok(Some(topic));
  }
  find_topic_by_slug(conn, &slugify(name))
}

pub fn friendly_find_topic(conn: &Connection, reference: &str) -> Result<Option<Topic>> {
  match topic::classify_lookup(reference) {
    None => Ok(None),
    Some(TopicLookup::Id(topic_id)) => load_topic(conn, topic_id),
    Some(TopicLookup::Slug(slug)) => match find_topic_by_slug(conn, &slug)? {
      Some(topic) => Ok(Some(topic)),
      None => select_topic(conn, "WHERE name = ?1", params![reference.trim()]),
    },
  }
}

pub fn topic_conflicts(
  conn: &Connection,
  candidate: &TopicCandidate,
  exclude: Option<i64>,
) -> Result<TopicConflicts> {
  Ok(TopicConflicts {
    name_taken: exists(
      conn,
      "SELECT 1 FROM topics WHERE name = ?1 AND topic_id IS NOT ?2",
      params![candidate.name, exclude],
    )?,
    slug_taken: exists(
      conn,
      "SELECT 1 FROM topics WHERE slug = ?1 AND topic_id IS NOT ?2",
      params![candidate.slug, exclude],
    )?,
  })
}

/// Validate and insert. New topics start orphaned.
pub fn insert_topic(conn: &Connection, raw_name: &str, now: DateTime<Utc>) -> Result<Topic> {
  let candidate = TopicCandidate::new(raw_name);
  topic::validate(&candidate, topic_conflicts(conn, &candidate, None)?)?;

  conn
    .execute(
      "INSERT INTO topics (name, slug, previous_slug, orphaned, created_at, updated_at)
       VALUES (?1, ?2, NULL, 1, ?3, ?3)",
      params![candidate.name, candidate.slug, encode_dt(now)],
    )
    .map_err(|e| uniqueness(e, "topic", || format!("{:?} is taken", candidate.name)))?;

  Ok(Topic {
    topic_id:      conn.last_insert_rowid(),
    name:          candidate.name,
    slug:          candidate.slug,
    previous_slug: None,
    orphaned:      true,
    created_at:    now,
    updated_at:    now,
  })
}

/// Resolve a free-text topic line, creating the topic on first sight.
/// Returns whether it was created.
pub fn resolve_topic(conn: &Connection, name: &str, now: DateTime<Utc>) -> Result<(Topic, bool)> {
  match find_topic_for_name(conn, name)? {
    Some(topic) => Ok((topic, false)),
    None => Ok((insert_topic(conn, name, now)?, true)),
  }
}

/// Like [`resolve_topic`], but a reference of digits is a topic id.
pub fn find_or_create_topic(conn: &Connection, reference: &str, now: DateTime<Utc>) -> Result<Topic> {
  if let Some(TopicLookup::Id(topic_id)) = topic::classify_lookup(reference) {
    return require_topic(conn, topic_id);
  }
  Ok(resolve_topic(conn, reference, now)?.0)
}

pub fn write_topic_name(conn: &Connection, topic: &Topic) -> Result<()> {
  conn
    .execute(
      "UPDATE topics SET name = ?2, slug = ?3, previous_slug = ?4, updated_at = ?5
       WHERE topic_id = ?1",
      params![
        topic.topic_id,
        topic.name,
        topic.slug,
        topic.previous_slug,
        encode_dt(topic.updated_at),
      ],
    )
    .map_err(|e| uniqueness(e, "topic", || format!("{:?} is taken", topic.name)))?;
  Ok(())
}

pub fn list_topics(conn: &Connection, filter: TopicFilter) -> Result<Vec<Topic>> {
  let clause = match filter {
    TopicFilter::All => "",
    TopicFilter::Active => "WHERE orphaned = 0",
    TopicFilter::Orphaned => "WHERE orphaned = 1",
  };
  collect_topics(
    conn,
    &format!("SELECT {TOPIC_COLUMNS} FROM topics {clause} ORDER BY lower(name), topic_id"),
    [],
  )
}

pub fn topics_for_review(conn: &Connection, review_id: i64) -> Result<Vec<Topic>> {
  collect_topics(
    conn,
    &format!(
      "SELECT {TOPIC_COLUMNS} FROM topics
       WHERE topic_id IN (SELECT topic_id FROM review_topics WHERE review_id = ?1)
       ORDER BY lower(name), topic_id"
    ),
    params![review_id],
  )
}

fn collect_topics(conn: &Connection, sql: &str, params: impl Params) -> Result<Vec<Topic>> {
  let mut stmt = conn.prepare(sql)?;
  let raws = stmt
    .query_map(params, RawTopic::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawTopic::into_topic).collect()
}

pub fn associations_for_review(conn: &Connection, review_id: i64) -> Result<Vec<ReviewTopic>> {
  let mut stmt = conn.prepare(
    "SELECT review_id, topic_id, created_at FROM review_topics
     WHERE review_id = ?1 ORDER BY topic_id",
  )?;
  let rows = stmt
    .query_map(params![review_id], |r| {
      Ok((r.get::<_, i64>(0)?, r.get::<_, i64>(1)?, r.get::<_, String>(2)?))
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  rows
    .into_iter()
    .map(|(review_id, topic_id, created_at)| {
      Ok(ReviewTopic { review_id, topic_id, created_at: decode_dt(&created_at)? })
    })
    .collect()
}

pub fn topic_ids_for_review(conn: &Connection, review_id: i64) -> Result<Vec<i64>> {
  Ok(
    associations_for_review(conn, review_id)?
      .into_iter()
      .map(|rt| rt.topic_id)
      .collect(),
  )
}

pub fn review_ids_for_topic(conn: &Connection, topic_id: i64) -> Result<Vec<i64>> {
  ids(
    conn,
    "SELECT review_id FROM review_topics WHERE topic_id = ?1 ORDER BY review_id",
    params![topic_id],
  )
}

// ─── Orphan flags ────────────────────────────────────────────────────────────

/// Bring one topic's flag in line with its associations. Writes only on change.
pub fn refresh_orphaned(conn: &Connection, topic_id: i64, now: DateTime<Utc>) -> Result<bool> {
  let changed = conn.execute(
    "UPDATE topics
     SET orphaned = (NOT EXISTS (SELECT 1 FROM review_topics WHERE topic_id = ?1)),
         updated_at = ?2
     WHERE topic_id = ?1
       AND orphaned != (NOT EXISTS (SELECT 1 FROM review_topics WHERE topic_id = ?1))",
    params![topic_id, encode_dt(now)],
  )?;
  Ok(changed > 0)
}

pub fn refresh_all_orphaned(conn: &Connection, now: DateTime<Utc>) -> Result<usize> {
  Ok(conn.execute(
    "UPDATE topics
     SET orphaned = (NOT EXISTS (
           SELECT 1 FROM review_topics rt WHERE rt.topic_id = topics.topic_id)),
         updated_at = ?1
     WHERE orphaned != (NOT EXISTS (
           SELECT 1 FROM review_topics rt WHERE rt.topic_id = topics.topic_id))",
    params![encode_dt(now)],
  )?)
}

// ─── Reconciliation ──────────────────────────────────────────────────────────

/// Make the review's associations match its topic text.
///
/// Lines are resolved (and topics created) before anything is linked, so an
/// invalid line fails the call before any association changes.
pub fn reconcile_review(
  conn: &Connection,
  review: &Review,
  now: DateTime<Utc>,
) -> Result<ReconcileOutcome> {
  let mut created_topics = 0;
  let mut target = Vec::new();
  for name in review.topics() {
    let (topic, created) = resolve_topic(conn, &name, now)?;
    created_topics += usize::from(created);
    target.push(topic.topic_id);
  }

  let current = topic_ids_for_review(conn, review.review_id)?;
  let plan = plan_reconciliation(&target, &current);
  if plan.is_empty() {
    return Ok(ReconcileOutcome { created_topics, ..Default::default() });
  }

  for topic_id in &plan.to_add {
    conn.execute(
      "INSERT INTO review_topics (review_id, topic_id, created_at) VALUES (?1, ?2, ?3)",
      params![review.review_id, topic_id, encode_dt(now)],
    )?;
  }
  for topic_id in &plan.to_remove {
    conn.execute(
      "DELETE FROM review_topics WHERE review_id = ?1 AND topic_id = ?2",
      params![review.review_id, topic_id],
    )?;
  }
  for topic_id in plan.touched() {
    refresh_orphaned(conn, topic_id, now)?;
  }

  Ok(ReconcileOutcome {
    created_topics,
    added: plan.to_add.len(),
    removed: plan.to_remove.len(),
  })
}

// ─── Investigations ──────────────────────────────────────────────────────────

pub fn insert_investigation(
  conn: &Connection,
  topic: &Topic,
  start_at: Option<DateTime<Utc>>,
  end_at: Option<DateTime<Utc>>,
  now: DateTime<Utc>,
) -> Result<TopicInvestigation> {
  conn.execute(
    "INSERT INTO topic_investigations
       (topic_id, topic_name, start_at, end_at, created_at, updated_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
    params![
      topic.topic_id,
      topic.name,
      start_at.map(encode_dt),
      end_at.map(encode_dt),
      encode_dt(now),
    ],
  )?;

  Ok(TopicInvestigation {
    investigation_id: conn.last_insert_rowid(),
    topic_id: topic.topic_id,
    topic_name: topic.name.clone(),
    start_at,
    end_at,
    created_at: now,
    updated_at: now,
  })
}

pub fn load_investigation(
  conn: &Connection,
  investigation_id: i64,
) -> Result<Option<TopicInvestigation>> {
  conn
    .query_row(
      &format!(
        "SELECT {INVESTIGATION_COLUMNS} FROM topic_investigations WHERE investigation_id = ?1"
      ),
      params![investigation_id],
      RawInvestigation::from_row,
    )
    .optional()?
    .map(RawInvestigation::into_investigation)
    .transpose()
}

/// Copy a renamed topic's name onto its investigations.
pub fn refresh_investigation_names(
  conn: &Connection,
  topic: &Topic,
  now: DateTime<Utc>,
) -> Result<usize> {
  Ok(conn.execute(
    "UPDATE topic_investigations SET topic_name = ?2, updated_at = ?3
     WHERE topic_id = ?1 AND topic_name != ?2",
    params![topic.topic_id, topic.name, encode_dt(now)],
  )?)
}

// ─── Votes ───────────────────────────────────────────────────────────────────

pub fn load_vote(conn: &Connection, vote_id: i64) -> Result<Option<TopicInvestigationVote>> {
  conn
    .query_row(
      &format!("SELECT {VOTE_COLUMNS} FROM topic_investigation_votes WHERE vote_id = ?1"),
      params![vote_id],
      RawVote::from_row,
    )
    .optional()?
    .map(RawVote::into_vote)
    .transpose()
}

pub fn vote_exists(conn: &Connection, review_id: i64, investigation_id: i64) -> Result<bool> {
  exists(
    conn,
    "SELECT 1 FROM topic_investigation_votes WHERE review_id = ?1 AND investigation_id = ?2",
    params![review_id, investigation_id],
  )
}

pub fn votes_for_investigation(
  conn: &Connection,
  investigation_id: i64,
) -> Result<Vec<TopicInvestigationVote>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {VOTE_COLUMNS} FROM topic_investigation_votes
     WHERE investigation_id = ?1 ORDER BY vote_id"
  ))?;
  let raws = stmt
    .query_map(params![investigation_id], RawVote::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawVote::into_vote).collect()
}

pub fn investigations_voted_for_review(conn: &Connection, review_id: i64) -> Result<Vec<i64>> {
  ids(
    conn,
    "SELECT DISTINCT investigation_id FROM topic_investigation_votes
     WHERE review_id = ?1 ORDER BY investigation_id",
    params![review_id],
  )
}

/// The user's votes in the investigation, scored by their review's quality.
pub fn prior_votes(
  conn: &Connection,
  user_id: i64,
  investigation_id: i64,
) -> Result<Vec<PriorVote>> {
  let mut stmt = conn.prepare(
    "SELECT v.review_id, r.quality
     FROM topic_investigation_votes v
     JOIN reviews r ON r.review_id = v.review_id
     WHERE v.user_id = ?1 AND v.investigation_id = ?2
     ORDER BY v.review_id",
  )?;
  let rows = stmt
    .query_map(params![user_id, investigation_id], |r| {
      Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?))
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  rows
    .into_iter()
    .map(|(review_id, quality)| Ok(PriorVote::new(review_id, decode_quality(&quality)?)))
    .collect()
}

/// Insert and fill in the new `vote_id`.
pub fn insert_vote(conn: &Connection, vote: &mut TopicInvestigationVote) -> Result<()> {
  conn
    .execute(
      "INSERT INTO topic_investigation_votes
         (investigation_id, user_id, review_id, listing_order, recommended, manual_rank,
          created_at, updated_at)
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
      params![
        vote.investigation_id,
        vote.user_id,
        vote.review_id,
        vote.listing_order,
        vote.recommended,
        vote.manual_rank,
        encode_dt(vote.created_at),
        encode_dt(vote.updated_at),
      ],
    )
    .map_err(|e| {
      uniqueness(e, "topic investigation vote", || {
        format!(
          "review {} already has a vote in investigation {}",
          vote.review_id, vote.investigation_id
        )
      })
    })?;
  vote.vote_id = conn.last_insert_rowid();
  Ok(())
}

pub fn write_vote_rank(conn: &Connection, vote: &TopicInvestigationVote) -> Result<()> {
  conn.execute(
    "UPDATE topic_investigation_votes
     SET listing_order = ?2, recommended = ?3, manual_rank = ?4, updated_at = ?5
     WHERE vote_id = ?1",
    params![
      vote.vote_id,
      vote.listing_order,
      vote.recommended,
      vote.manual_rank,
      encode_dt(vote.updated_at),
    ],
  )?;
  Ok(())
}

/// Re-rank the investigation's auto-ranked votes as persisted votes. Returns
/// how many changed; manually ranked votes are left alone.
pub fn recalculate_listing_orders(
  conn: &Connection,
  investigation_id: i64,
  now: DateTime<Utc>,
) -> Result<usize> {
  let mut prior_by_user: HashMap<i64, Vec<PriorVote>> = HashMap::new();
  let mut changed = 0;

  for mut vote in votes_for_investigation(conn, investigation_id)? {
    if !vote.is_auto_rank() {
      continue;
    }
    let prior = match prior_by_user.entry(vote.user_id) {
      Entry::Occupied(e) => e.into_mut(),
      Entry::Vacant(e) => e.insert(prior_votes(conn, vote.user_id, investigation_id)?),
    };
    let Some(score) = prior.iter().find(|p| p.review_id == vote.review_id).map(|p| p.score)
    else {
      continue;
    };

    let ranked = RankedVote { review_id: vote.review_id, score, persisted: true };
    let (listing_order, recommended) = settle_rank(true, None, ranked, prior);
    if (listing_order, recommended) == (vote.listing_order, vote.recommended) {
      continue;
    }

    vote.listing_order = listing_order;
    vote.recommended = recommended;
    vote.updated_at = now;
    write_vote_rank(conn, &vote)?;
    changed += 1;
  }

  Ok(changed)
}

// ─── Events ──────────────────────────────────────────────────────────────────

pub fn insert_event(
  conn: &Connection,
  user_id: i64,
  kind: EventKind,
  target: EventTarget,
  created_date: NaiveDate,
  now: DateTime<Utc>,
) -> Result<Event> {
  conn.execute(
    "INSERT INTO events (user_id, kind, target, created_date, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5)",
    params![
      user_id,
      kind.as_str(),
      encode_event_target(&target)?,
      encode_date(created_date),
      encode_dt(now),
    ],
  )?;

  Ok(Event {
    event_id: conn.last_insert_rowid(),
    user_id,
    kind,
    target,
    created_date,
    created_at: now,
  })
}

pub fn events_for_user(conn: &Connection, user_id: i64) -> Result<Vec<Event>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {EVENT_COLUMNS} FROM events WHERE user_id = ?1 ORDER BY event_id"
  ))?;
  let raws = stmt
    .query_map(params![user_id], RawEvent::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawEvent::into_event).collect()
}
