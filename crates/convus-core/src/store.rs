//! The `RatingStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `convus-store-sqlite`).
//! Callers such as the `convus` maintenance binary depend on this abstraction,
//! not on a concrete backend.

use std::future::Future;

use crate::{
  citation::Citation,
  event::Event,
  investigation::{NewInvestigation, TopicInvestigation},
  jobs::Job,
  reconcile::{AssignmentOutcome, ReconcileOutcome, TopicAssignment},
  review::{NewReview, Review, ReviewUpdate},
  topic::{Topic, TopicFilter},
  user::User,
  vote::{NewVote, TopicInvestigationVote, VoteUpdate},
};

/// Abstraction over a Convus store backend.
///
/// Every write that changes a review's topic text reconciles its topic
/// associations before returning (unless the caller opted out), and every
/// write that adds or removes an association leaves each touched topic's
/// `orphaned` flag equal to "has no reviews".
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes.
pub trait RatingStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users & citations ─────────────────────────────────────────────────

  /// Create a user. Usernames are unique by slug.
  fn create_user(
    &self,
    username: String,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    user_id: i64,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Resolve a URL to its citation, creating it on first sight. A title is
  /// only filled in when the citation has none.
  fn find_or_create_citation(
    &self,
    url: String,
    title: Option<String>,
  ) -> impl Future<Output = Result<Citation, Self::Error>> + Send + '_;

  // ── Reviews ───────────────────────────────────────────────────────────

  /// Persist a review, record its `review_created` event, and reconcile its
  /// topics. Fails with a uniqueness error if the user already reviewed the
  /// citation.
  fn create_review(
    &self,
    input: NewReview,
  ) -> impl Future<Output = Result<Review, Self::Error>> + Send + '_;

  fn get_review(
    &self,
    review_id: i64,
  ) -> impl Future<Output = Result<Option<Review>, Self::Error>> + Send + '_;

  /// All reviews in id order, optionally for one user.
  fn list_reviews(
    &self,
    user_id: Option<i64>,
  ) -> impl Future<Output = Result<Vec<Review>, Self::Error>> + Send + '_;

  /// Patch a review and reconcile its topics. A quality change queues a
  /// re-rank of every investigation the review was voted into.
  fn update_review(
    &self,
    review_id: i64,
    update: ReviewUpdate,
  ) -> impl Future<Output = Result<Review, Self::Error>> + Send + '_;

  /// Delete a review with its associations and votes, then recompute the
  /// orphan flag of every topic it was linked to.
  fn delete_review(
    &self,
    review_id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Best guess at the user's review of `url`, among reviews whose citation
  /// or submitted URL matches. See [`crate::dedup::preferred`].
  fn find_review_for_url(
    &self,
    user_id: i64,
    url: String,
  ) -> impl Future<Output = Result<Option<Review>, Self::Error>> + Send + '_;

  // ── Topics ────────────────────────────────────────────────────────────

  /// Look a topic up by id (all digits) or by current/previous slug.
  fn friendly_find_topic(
    &self,
    reference: String,
  ) -> impl Future<Output = Result<Option<Topic>, Self::Error>> + Send + '_;

  fn find_or_create_topic(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Topic, Self::Error>> + Send + '_;

  fn get_topic(
    &self,
    topic_id: i64,
  ) -> impl Future<Output = Result<Option<Topic>, Self::Error>> + Send + '_;

  /// Rename a topic, keeping the old slug as `previous_slug`. Linked reviews
  /// are re-reconciled through the job queue.
  fn rename_topic(
    &self,
    topic_id: i64,
    name: String,
  ) -> impl Future<Output = Result<Topic, Self::Error>> + Send + '_;

  /// Topics ordered by lowercase name.
  fn list_topics(
    &self,
    filter: TopicFilter,
  ) -> impl Future<Output = Result<Vec<Topic>, Self::Error>> + Send + '_;

  /// Topics currently associated with a review.
  fn review_topics(
    &self,
    review_id: i64,
  ) -> impl Future<Output = Result<Vec<Topic>, Self::Error>> + Send + '_;

  /// Ids of reviews currently associated with a topic.
  fn topic_review_ids(
    &self,
    topic_id: i64,
  ) -> impl Future<Output = Result<Vec<i64>, Self::Error>> + Send + '_;

  // ── Reconciliation ────────────────────────────────────────────────────

  /// Make the review's topic associations match its topic text exactly.
  /// Idempotent: a second call on an unchanged review writes nothing.
  fn reconcile_review_topics(
    &self,
    review_id: i64,
  ) -> impl Future<Output = Result<ReconcileOutcome, Self::Error>> + Send + '_;

  /// Add or remove one topic across many reviews. A failure on one review is
  /// recorded in the outcome and does not stop the others.
  fn assign_topic(
    &self,
    assignment: TopicAssignment,
  ) -> impl Future<Output = Result<AssignmentOutcome, Self::Error>> + Send + '_;

  /// Correct every topic's orphan flag; returns how many changed.
  fn recompute_orphans(&self) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  // ── Investigations & votes ────────────────────────────────────────────

  fn create_investigation(
    &self,
    input: NewInvestigation,
  ) -> impl Future<Output = Result<TopicInvestigation, Self::Error>> + Send + '_;

  fn get_investigation(
    &self,
    investigation_id: i64,
  ) -> impl Future<Output = Result<Option<TopicInvestigation>, Self::Error>> + Send + '_;

  /// Save a new vote, ranking it unless it is manually ranked. Fails with a
  /// uniqueness error if the review already has a vote in the investigation.
  fn save_vote(
    &self,
    input: NewVote,
  ) -> impl Future<Output = Result<TopicInvestigationVote, Self::Error>> + Send + '_;

  fn update_vote(
    &self,
    vote_id: i64,
    update: VoteUpdate,
  ) -> impl Future<Output = Result<TopicInvestigationVote, Self::Error>> + Send + '_;

  /// Votes of an investigation in submission order.
  fn investigation_votes(
    &self,
    investigation_id: i64,
  ) -> impl Future<Output = Result<Vec<TopicInvestigationVote>, Self::Error>> + Send + '_;

  /// Re-rank every auto-ranked vote; returns how many orders changed.
  fn recalculate_listing_orders(
    &self,
    investigation_id: i64,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  // ── Events & jobs ─────────────────────────────────────────────────────

  fn user_events(
    &self,
    user_id: i64,
  ) -> impl Future<Output = Result<Vec<Event>, Self::Error>> + Send + '_;

  /// Execute a deferred job. Jobs whose subject no longer exists succeed.
  fn run_job(&self, job: Job) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
