//! [`SqliteStore`], the SQLite implementation of [`RatingStore`].

use std::{path::Path, sync::Arc};

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::{debug, info, warn};

use convus_core::{
  citation::Citation,
  event::{self, Event, EventKind, EventTarget},
  investigation::{NewInvestigation, TopicInvestigation, normalize_window},
  jobs::{Job, JobQueue},
  ranking::RankedVote,
  reconcile::{
    AssignmentFailure, AssignmentOutcome, ReconcileOutcome, TopicAssignment, plan_assignment,
  },
  review::{
    NewReview, Review, ReviewUpdate, validate_submitted_url, with_topic_added,
    with_topics_removed,
  },
  store::RatingStore,
  topic::{self, Topic, TopicCandidate, TopicFilter, next_previous_slug},
  user::User,
  vote::{NewVote, TopicInvestigationVote, VoteUpdate, settle_rank},
};

use crate::{Error, Result, queries, schema::SCHEMA};

type CoreError = convus_core::Error;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Convus ratings store backed by a single SQLite file.
///
/// Cloning is cheap: the connection and the job queue are both shared.
#[derive(Clone)]
pub struct SqliteStore {
  conn:  tokio_rusqlite::Connection,
  queue: Option<Arc<dyn JobQueue>>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, queue: None };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, used by tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, queue: None };
    store.init_schema().await?;
    Ok(store)
  }

  /// Route deferred work through `queue` instead of running it inline before
  /// the triggering call returns.
  pub fn with_queue(mut self, queue: impl JobQueue + 'static) -> Self {
    self.queue = Some(Arc::new(queue));
    self
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` against the connection outside any transaction.
  async fn read<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
  {
    self.conn.call(move |conn| Ok(f(conn))).await?
  }

  /// Run `f` in one transaction, committed only if `f` succeeds.
  async fn write<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Connection, DateTime<Utc>) -> Result<T> + Send + 'static,
  {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let out = f(&tx, Utc::now());
        if out.is_ok() {
          tx.commit()?;
        }
        Ok(out)
      })
      .await?
  }

  async fn dispatch(&self, job: Job) -> Result<()> {
    match &self.queue {
      Some(queue) => {
        debug!(job = job.name(), "job queued");
        queue.enqueue(job);
        Ok(())
      }
      None => self.run_job(job).await,
    }
  }

  /// Rewrite one review's topic text to include or exclude `topic`, then
  /// reconcile it. Returns whether the review is linked to `topic` afterwards.
  ///
  /// Lines are matched with the same resolver reconciliation uses, so a line
  /// naming another topic is never taken for this one.
  async fn retopic_review(&self, review_id: i64, topic: Topic, add: bool) -> Result<bool> {
    self
      .write(move |conn, now| {
        let mut review = queries::require_review(conn, review_id)?;
        let mut matching = Vec::new();
        for line in review.topics() {
          if queries::find_topic_for_name(conn, &line)?
            .is_some_and(|t| t.topic_id == topic.topic_id)
          {
            matching.push(line);
          }
        }
        let refers = |line: &str| matching.iter().any(|m| m == line);

        let text = review.topics_text.as_deref();
        let rewritten = if add {
          with_topic_added(text, &topic.name, refers)
        } else {
          with_topics_removed(text, refers)
        };
        review.topics_text = Some(rewritten);
        review.updated_at = now;
        queries::write_review(conn, &review)?;
        let outcome = queries::reconcile_review(conn, &review, now)?;
        debug!(
          review_id,
          topic_id = topic.topic_id,
          added = outcome.added,
          removed = outcome.removed,
          "review retopicked"
        );
        Ok(queries::topic_ids_for_review(conn, review_id)?.contains(&topic.topic_id))
      })
      .await
  }
}

#[cfg(test)]
impl SqliteStore {
  /// Run raw SQL, bypassing every invariant the store maintains.
  pub(crate) async fn execute_raw(&self, sql: &'static str) -> Result<usize> {
    self.read(move |conn| Ok(conn.execute(sql, [])?)).await
  }
}

// ─── RatingStore impl ────────────────────────────────────────────────────────

impl RatingStore for SqliteStore {
  type Error = Error;

  // ── Users & citations ─────────────────────────────────────────────────────

  async fn create_user(&self, username: String) -> Result<User> {
    let user = self.write(move |conn, now| queries::insert_user(conn, &username, now)).await?;
    debug!(user_id = user.user_id, "user created");
    Ok(user)
  }

  async fn get_user(&self, user_id: i64) -> Result<Option<User>> {
    self.read(move |conn| queries::load_user(conn, user_id)).await
  }

  async fn find_or_create_citation(&self, url: String, title: Option<String>) -> Result<Citation> {
    if url.trim().is_empty() {
      return Err(CoreError::invalid("citation", "url", "can't be blank").into());
    }
    self
      .write(move |conn, now| queries::find_or_create_citation(conn, &url, title, now))
      .await
  }

  // ── Reviews ───────────────────────────────────────────────────────────────

  async fn create_review(&self, input: NewReview) -> Result<Review> {
    validate_submitted_url(&input.submitted_url)?;

    self
      .write(move |conn, now| {
        if queries::load_user(conn, input.user_id)?.is_none() {
          return Err(CoreError::UserNotFound(input.user_id).into());
        }
        let citation = queries::find_or_create_citation(
          conn,
          &input.submitted_url,
          input.citation_title.clone(),
          now,
        )?;
        let review = queries::insert_review(conn, &input, citation.citation_id, now)?;

        if !input.skip_review_created_event {
          queries::insert_event(
            conn,
            review.user_id,
            EventKind::ReviewCreated,
            EventTarget::Review(review.review_id),
            event::created_date(Some(review.created_at), now),
            now,
          )?;
        }
        if !input.skip_topics_reconcile {
          let outcome = queries::reconcile_review(conn, &review, now)?;
          debug!(
            review_id = review.review_id,
            created_topics = outcome.created_topics,
            added = outcome.added,
            "review topics reconciled"
          );
        }

        info!(review_id = review.review_id, user_id = review.user_id, "review created");
        Ok(review)
      })
      .await
  }

  async fn get_review(&self, review_id: i64) -> Result<Option<Review>> {
    self.read(move |conn| queries::load_review(conn, review_id)).await
  }

  async fn list_reviews(&self, user_id: Option<i64>) -> Result<Vec<Review>> {
    self.read(move |conn| queries::list_reviews(conn, user_id)).await
  }

  async fn update_review(&self, review_id: i64, update: ReviewUpdate) -> Result<Review> {
    let (review, rerank) = self
      .write(move |conn, now| {
        let mut review = queries::require_review(conn, review_id)?;
        let url_changed = update
          .submitted_url
          .as_deref()
          .is_some_and(|url| url.trim() != review.submitted_url);
        let skip_reconcile = update.skip_topics_reconcile;
        let quality_changed = update.apply(&mut review);
        review.submitted_url = review.submitted_url.trim().to_owned();

        if url_changed {
          validate_submitted_url(&review.submitted_url)?;
          review.citation_id = queries::find_or_create_citation(
            conn,
            &review.submitted_url,
            review.citation_title.clone(),
            now,
          )?
          .citation_id;
        }
        review.updated_at = now;
        queries::write_review(conn, &review)?;

        if !skip_reconcile {
          queries::reconcile_review(conn, &review, now)?;
        }
        let rerank = if quality_changed {
          queries::investigations_voted_for_review(conn, review_id)?
        } else {
          Vec::new()
        };
        Ok((review, rerank))
      })
      .await?;

    for investigation_id in rerank {
      self.dispatch(Job::RecalculateListingOrders { investigation_id }).await?;
    }
    Ok(review)
  }

  async fn delete_review(&self, review_id: i64) -> Result<()> {
    let rerank = self
      .write(move |conn, now| {
        queries::require_review(conn, review_id)?;
        let topic_ids = queries::topic_ids_for_review(conn, review_id)?;
        let rerank = queries::investigations_voted_for_review(conn, review_id)?;
        queries::delete_review(conn, review_id)?;
        for topic_id in topic_ids {
          queries::refresh_orphaned(conn, topic_id, now)?;
        }
        Ok(rerank)
      })
      .await?;

    info!(review_id, "review deleted");
    for investigation_id in rerank {
      self.dispatch(Job::RecalculateListingOrders { investigation_id }).await?;
    }
    Ok(())
  }

  async fn find_review_for_url(&self, user_id: i64, url: String) -> Result<Option<Review>> {
    let reviews = self
      .read(move |conn| queries::reviews_matching_url(conn, user_id, &url))
      .await?;
    Ok(convus_core::dedup::preferred(&reviews).cloned())
  }

  // ── Topics ────────────────────────────────────────────────────────────────

  async fn friendly_find_topic(&self, reference: String) -> Result<Option<Topic>> {
    self.read(move |conn| queries::friendly_find_topic(conn, &reference)).await
  }

  async fn find_or_create_topic(&self, name: String) -> Result<Topic> {
    self.write(move |conn, now| queries::find_or_create_topic(conn, &name, now)).await
  }

  async fn get_topic(&self, topic_id: i64) -> Result<Option<Topic>> {
    self.read(move |conn| queries::load_topic(conn, topic_id)).await
  }

  async fn rename_topic(&self, topic_id: i64, name: String) -> Result<Topic> {
    let (topic, review_ids) = self
      .write(move |conn, now| {
        let mut topic = queries::require_topic(conn, topic_id)?;
        let candidate = TopicCandidate::new(&name);
        topic::validate(&candidate, queries::topic_conflicts(conn, &candidate, Some(topic_id))?)?;

        topic.previous_slug =
          next_previous_slug(&topic.slug, &candidate.slug, topic.previous_slug.take());
        topic.name = candidate.name;
        topic.slug = candidate.slug;
        topic.updated_at = now;
        queries::write_topic_name(conn, &topic)?;
        queries::refresh_investigation_names(conn, &topic, now)?;

        let review_ids = queries::review_ids_for_topic(conn, topic_id)?;
        Ok((topic, review_ids))
      })
      .await?;

    info!(topic_id, name = %topic.name, reviews = review_ids.len(), "topic renamed");
    for review_id in review_ids {
      self.dispatch(Job::ReconcileReviewTopics { review_id }).await?;
    }
    Ok(topic)
  }

  async fn list_topics(&self, filter: TopicFilter) -> Result<Vec<Topic>> {
    self.read(move |conn| queries::list_topics(conn, filter)).await
  }

  async fn review_topics(&self, review_id: i64) -> Result<Vec<Topic>> {
    self.read(move |conn| queries::topics_for_review(conn, review_id)).await
  }

  async fn topic_review_ids(&self, topic_id: i64) -> Result<Vec<i64>> {
    self.read(move |conn| queries::review_ids_for_topic(conn, topic_id)).await
  }

  // ── Reconciliation ────────────────────────────────────────────────────────

  async fn reconcile_review_topics(&self, review_id: i64) -> Result<ReconcileOutcome> {
    let outcome = self
      .write(move |conn, now| {
        let review = queries::require_review(conn, review_id)?;
        queries::reconcile_review(conn, &review, now)
      })
      .await?;
    debug!(
      review_id,
      created_topics = outcome.created_topics,
      added = outcome.added,
      removed = outcome.removed,
      "review topics reconciled"
    );
    Ok(outcome)
  }

  async fn assign_topic(&self, assignment: TopicAssignment) -> Result<AssignmentOutcome> {
    let TopicAssignment { topic_id, user_id, included, selected } = assignment;

    let (topic, plan) = self
      .read(move |conn| {
        let topic = queries::require_topic(conn, topic_id)?;
        let owned: Vec<i64> = queries::list_reviews(conn, Some(user_id))?
          .into_iter()
          .map(|r| r.review_id)
          .collect();
        let included: Vec<i64> = included.into_iter().filter(|id| owned.contains(id)).collect();
        let linked: Vec<i64> = queries::review_ids_for_topic(conn, topic_id)?
          .into_iter()
          .filter(|id| included.contains(id))
          .collect();
        Ok((topic, plan_assignment(&included, &selected, &linked)))
      })
      .await?;

    let mut outcome = AssignmentOutcome::default();
    let changes = plan
      .add
      .into_iter()
      .map(|id| (id, true))
      .chain(plan.remove.into_iter().map(|id| (id, false)));

    for (review_id, add) in changes {
      match self.retopic_review(review_id, topic.clone(), add).await {
        Ok(linked) if add && linked => outcome.added += 1,
        Ok(linked) if !add && !linked => outcome.removed += 1,
        Ok(_) => {
          warn!(review_id, topic_id, add, "topic text did not change the review's link");
          outcome.failed.push(AssignmentFailure {
            review_id,
            message: format!("topic text does not resolve to {:?}", topic.name),
          });
        }
        Err(e) => {
          warn!(review_id, topic_id, error = %e, "topic assignment failed for review");
          outcome.failed.push(AssignmentFailure { review_id, message: e.to_string() });
        }
      }
    }

    info!(
      topic_id,
      user_id,
      added = outcome.added,
      removed = outcome.removed,
      failed = outcome.failed.len(),
      "topic assignment applied"
    );
    Ok(outcome)
  }

  async fn recompute_orphans(&self) -> Result<usize> {
    let changed = self.write(queries::refresh_all_orphaned).await?;
    info!(changed, "orphan flags recomputed");
    Ok(changed)
  }

  // ── Investigations & votes ────────────────────────────────────────────────

  async fn create_investigation(&self, input: NewInvestigation) -> Result<TopicInvestigation> {
    input.validate()?;
    self
      .write(move |conn, now| {
        let topic = queries::find_or_create_topic(conn, &input.topic_name, now)?;
        let (start_at, end_at) = normalize_window(input.start_at, input.end_at);
        queries::insert_investigation(conn, &topic, start_at, end_at, now)
      })
      .await
  }

  async fn get_investigation(&self, investigation_id: i64) -> Result<Option<TopicInvestigation>> {
    self
      .read(move |conn| queries::load_investigation(conn, investigation_id))
      .await
  }

  async fn save_vote(&self, input: NewVote) -> Result<TopicInvestigationVote> {
    let vote = self
      .write(move |conn, now| {
        if queries::load_investigation(conn, input.investigation_id)?.is_none() {
          return Err(CoreError::InvestigationNotFound(input.investigation_id).into());
        }
        let review = queries::require_review(conn, input.review_id)?;
        if queries::vote_exists(conn, review.review_id, input.investigation_id)? {
          return Err(
            CoreError::Uniqueness {
              entity: "topic investigation vote",
              detail: format!(
                "review {} already has a vote in investigation {}",
                review.review_id, input.investigation_id
              ),
            }
            .into(),
          );
        }

        let user_id = input.user_id.unwrap_or(review.user_id);
        let auto_rank = !input.manual_rank && !input.skip_calculated_listing_order;
        let prior = if auto_rank {
          queries::prior_votes(conn, user_id, input.investigation_id)?
        } else {
          Vec::new()
        };
        let ranked = RankedVote {
          review_id: review.review_id,
          score:     review.default_score(),
          persisted: false,
        };
        let (listing_order, recommended) =
          settle_rank(auto_rank, input.listing_order, ranked, &prior);

        let mut vote = TopicInvestigationVote {
          vote_id: 0,
          investigation_id: input.investigation_id,
          user_id,
          review_id: review.review_id,
          listing_order,
          recommended,
          manual_rank: input.manual_rank,
          created_at: now,
          updated_at: now,
        };
        queries::insert_vote(conn, &mut vote)?;
        Ok(vote)
      })
      .await?;

    debug!(
      vote_id = vote.vote_id,
      investigation_id = vote.investigation_id,
      listing_order = vote.listing_order,
      "vote saved"
    );
    Ok(vote)
  }

  async fn update_vote(&self, vote_id: i64, update: VoteUpdate) -> Result<TopicInvestigationVote> {
    self
      .write(move |conn, now| {
        let mut vote = queries::load_vote(conn, vote_id)?.ok_or(CoreError::VoteNotFound(vote_id))?;
        if let Some(manual_rank) = update.manual_rank {
          vote.manual_rank = manual_rank;
        }

        let prior = if vote.is_auto_rank() {
          queries::prior_votes(conn, vote.user_id, vote.investigation_id)?
        } else {
          Vec::new()
        };
        let review = queries::require_review(conn, vote.review_id)?;
        let ranked = RankedVote {
          review_id: review.review_id,
          score:     review.default_score(),
          persisted: true,
        };
        let fixed = update.listing_order.or(Some(vote.listing_order));
        (vote.listing_order, vote.recommended) =
          settle_rank(vote.is_auto_rank(), fixed, ranked, &prior);
        vote.updated_at = now;

        queries::write_vote_rank(conn, &vote)?;
        Ok(vote)
      })
      .await
  }

  async fn investigation_votes(&self, investigation_id: i64) -> Result<Vec<TopicInvestigationVote>> {
    self
      .read(move |conn| queries::votes_for_investigation(conn, investigation_id))
      .await
  }

  async fn recalculate_listing_orders(&self, investigation_id: i64) -> Result<usize> {
    let changed = self
      .write(move |conn, now| queries::recalculate_listing_orders(conn, investigation_id, now))
      .await?;
    info!(investigation_id, changed, "listing orders recalculated");
    Ok(changed)
  }

  // ── Events & jobs ─────────────────────────────────────────────────────────

  async fn user_events(&self, user_id: i64) -> Result<Vec<Event>> {
    self.read(move |conn| queries::events_for_user(conn, user_id)).await
  }

  async fn run_job(&self, job: Job) -> Result<()> {
    match job {
      Job::ReconcileReviewTopics { review_id } => {
        match self.reconcile_review_topics(review_id).await {
          Err(Error::Core(CoreError::ReviewNotFound(_))) => {
            debug!(review_id, "review gone before reconciliation; skipping");
            Ok(())
          }
          result => result.map(|_| ()),
        }
      }
      Job::RecalculateListingOrders { investigation_id } => {
        self.recalculate_listing_orders(investigation_id).await.map(|_| ())
      }
    }
  }
}
