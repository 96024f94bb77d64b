//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{Duration, Utc};
use convus_core::{
  Error as CoreError, FieldError,
  event::{EventKind, EventTarget},
  investigation::{InvestigationStatus, NewInvestigation},
  reconcile::TopicAssignment,
  review::{NewReview, Quality, ReviewUpdate},
  store::RatingStore,
  topic::TopicFilter,
  vote::{NewVote, VoteUpdate},
};

use crate::{Error, SqliteStore, spawn_worker};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn user(s: &SqliteStore, name: &str) -> i64 {
  s.create_user(name.into()).await.unwrap().user_id
}

async fn investigation(s: &SqliteStore, topic: &str) -> i64 {
  s.create_investigation(NewInvestigation {
    topic_name: topic.into(),
    start_at:   None,
    end_at:     None,
  })
  .await
  .unwrap()
  .investigation_id
}

fn topic_names(topics: &[convus_core::topic::Topic]) -> Vec<&str> {
  topics.iter().map(|t| t.name.as_str()).collect()
}

// ─── Users & citations ───────────────────────────────────────────────────────

#[tokio::test]
async fn usernames_are_unique_by_slug() {
  let s = store().await;
  s.create_user("Ada Lovelace".into()).await.unwrap();
  let err = s.create_user("ada-lovelace".into()).await.unwrap_err();
  assert!(err.is_uniqueness());
}

#[tokio::test]
async fn citation_title_filled_in_once() {
  let s = store().await;
  let first = s
    .find_or_create_citation("https://example.com/a#top".into(), None)
    .await
    .unwrap();
  assert_eq!(first.url, "https://example.com/a");
  assert_eq!(first.title, None);

  let titled = s
    .find_or_create_citation("https://example.com/a".into(), Some("A".into()))
    .await
    .unwrap();
  assert_eq!(titled.citation_id, first.citation_id);
  assert_eq!(titled.title.as_deref(), Some("A"));

  let again = s
    .find_or_create_citation("https://example.com/a".into(), Some("B".into()))
    .await
    .unwrap();
  assert_eq!(again.title.as_deref(), Some("A"));
}

// ─── Reviews ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn one_review_per_user_and_citation() {
  let s = store().await;
  let ada = user(&s, "ada").await;
  let bob = user(&s, "bob").await;

  s.create_review(NewReview::new(ada, "https://example.com/a")).await.unwrap();
  let err = s
    .create_review(NewReview::new(ada, "https://example.com/a#again"))
    .await
    .unwrap_err();
  assert!(err.is_uniqueness());

  s.create_review(NewReview::new(bob, "https://example.com/a")).await.unwrap();
  assert_eq!(s.list_reviews(None).await.unwrap().len(), 2);
  assert_eq!(s.list_reviews(Some(ada)).await.unwrap().len(), 1);
}

#[tokio::test]
async fn review_for_unknown_user_rejected() {
  let s = store().await;
  let err = s.create_review(NewReview::new(99, "https://example.com")).await.unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::UserNotFound(99))));
}

#[tokio::test]
async fn error_url_rejected() {
  let s = store().await;
  let ada = user(&s, "ada").await;
  let err = s.create_review(NewReview::new(ada, "error")).await.unwrap_err();
  assert!(err.is_validation());
  assert!(s.list_reviews(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn review_created_event_recorded() {
  let s = store().await;
  let ada = user(&s, "ada").await;
  let review = s.create_review(NewReview::new(ada, "https://example.com/a")).await.unwrap();

  let events = s.user_events(ada).await.unwrap();
  assert_eq!(events.len(), 1);
  assert_eq!(events[0].kind, EventKind::ReviewCreated);
  assert_eq!(events[0].target, EventTarget::Review(review.review_id));
  assert_eq!(events[0].created_date, review.created_at.date_naive());

  let mut quiet = NewReview::new(ada, "https://example.com/b");
  quiet.skip_review_created_event = true;
  s.create_review(quiet).await.unwrap();
  assert_eq!(s.user_events(ada).await.unwrap().len(), 1);
}

#[tokio::test]
async fn find_review_for_url_matches_citation() {
  let s = store().await;
  let ada = user(&s, "ada").await;
  let review = s
    .create_review(NewReview::new(ada, "https://example.com/a").with_quality(Quality::High))
    .await
    .unwrap();

  let found = s
    .find_review_for_url(ada, "https://example.com/a#comments".into())
    .await
    .unwrap();
  assert_eq!(found.map(|r| r.review_id), Some(review.review_id));

  let missing = s
    .find_review_for_url(ada, "https://example.com/b".into())
    .await
    .unwrap();
  assert!(missing.is_none());
}

#[tokio::test]
async fn changing_url_moves_citation() {
  let s = store().await;
  let ada = user(&s, "ada").await;
  let review = s.create_review(NewReview::new(ada, "https://example.com/a")).await.unwrap();

  let updated = s
    .update_review(review.review_id, ReviewUpdate {
      submitted_url: Some(" https://example.com/b ".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(updated.submitted_url, "https://example.com/b");
  assert_ne!(updated.citation_id, review.citation_id);
}

// ─── Reconciliation ──────────────────────────────────────────────────────────

#[tokio::test]
async fn blank_lines_discarded() {
  let s = store().await;
  let ada = user(&s, "ada").await;
  let review = s
    .create_review(NewReview::new(ada, "https://example.com").with_topics("Climate\n\nPolicy\n"))
    .await
    .unwrap();

  let topics = s.review_topics(review.review_id).await.unwrap();
  assert_eq!(topic_names(&topics), ["Climate", "Policy"]);
  assert!(topics.iter().all(|t| t.is_active()));
}

#[tokio::test]
async fn reconcile_is_idempotent() {
  let s = store().await;
  let ada = user(&s, "ada").await;
  let review = s
    .create_review(NewReview::new(ada, "https://example.com").with_topics("Climate\nPolicy"))
    .await
    .unwrap();

  let first = s.reconcile_review_topics(review.review_id).await.unwrap();
  assert_eq!(first.writes(), 0);
  let second = s.reconcile_review_topics(review.review_id).await.unwrap();
  assert_eq!(second, first);
  assert_eq!(s.review_topics(review.review_id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn skipped_reconcile_runs_later() {
  let s = store().await;
  let ada = user(&s, "ada").await;
  let mut input = NewReview::new(ada, "https://example.com").with_topics("Climate");
  input.skip_topics_reconcile = true;
  let review = s.create_review(input).await.unwrap();
  assert!(s.review_topics(review.review_id).await.unwrap().is_empty());

  let outcome = s.reconcile_review_topics(review.review_id).await.unwrap();
  assert_eq!((outcome.created_topics, outcome.added, outcome.removed), (1, 1, 0));
}

#[tokio::test]
async fn names_match_case_insensitively_and_by_slug() {
  let s = store().await;
  let ada = user(&s, "ada").await;
  let bob = user(&s, "bob").await;
  s.create_review(NewReview::new(ada, "https://example.com/a").with_topics("Climate Policy"))
    .await
    .unwrap();
  s.create_review(NewReview::new(bob, "https://example.com/b").with_topics("climate-policy"))
    .await
    .unwrap();
  s.create_review(NewReview::new(bob, "https://example.com/c").with_topics("CLIMATE POLICY"))
    .await
    .unwrap();

  let topics = s.list_topics(TopicFilter::All).await.unwrap();
  assert_eq!(topic_names(&topics), ["Climate Policy"]);
  assert_eq!(s.topic_review_ids(topics[0].topic_id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn removing_last_association_orphans_topic() {
  let s = store().await;
  let ada = user(&s, "ada").await;
  let review = s
    .create_review(NewReview::new(ada, "https://example.com").with_topics("Climate\nPolicy"))
    .await
    .unwrap();

  s.update_review(review.review_id, ReviewUpdate {
    topics_text: Some("Policy".into()),
    ..Default::default()
  })
  .await
  .unwrap();

  let orphaned = s.list_topics(TopicFilter::Orphaned).await.unwrap();
  assert_eq!(topic_names(&orphaned), ["Climate"]);
  let active = s.list_topics(TopicFilter::Active).await.unwrap();
  assert_eq!(topic_names(&active), ["Policy"]);
}

#[tokio::test]
async fn shared_topic_stays_active_until_last_review_leaves() {
  let s = store().await;
  let ada = user(&s, "ada").await;
  let bob = user(&s, "bob").await;
  let a = s
    .create_review(NewReview::new(ada, "https://example.com/a").with_topics("Climate"))
    .await
    .unwrap();
  let b = s
    .create_review(NewReview::new(bob, "https://example.com/b").with_topics("Climate"))
    .await
    .unwrap();

  s.update_review(a.review_id, ReviewUpdate { topics_text: Some(String::new()), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(s.list_topics(TopicFilter::Orphaned).await.unwrap().len(), 0);

  s.delete_review(b.review_id).await.unwrap();
  let orphaned = s.list_topics(TopicFilter::Orphaned).await.unwrap();
  assert_eq!(topic_names(&orphaned), ["Climate"]);
}

#[tokio::test]
async fn numeric_topic_rolls_back_review() {
  let s = store().await;
  let ada = user(&s, "ada").await;
  let err = s
    .create_review(NewReview::new(ada, "https://example.com").with_topics("Climate\n2024"))
    .await
    .unwrap_err();

  assert_eq!(err.as_core().map(CoreError::field_errors), Some(
    &[FieldError::new("name", "can't be only numbers")][..]
  ));
  assert!(s.list_reviews(None).await.unwrap().is_empty());
  assert!(s.list_topics(TopicFilter::All).await.unwrap().is_empty());
  assert!(s.user_events(ada).await.unwrap().is_empty());
}

#[tokio::test]
async fn recompute_orphans_repairs_drift() {
  let s = store().await;
  let ada = user(&s, "ada").await;
  s.create_review(NewReview::new(ada, "https://example.com").with_topics("Climate"))
    .await
    .unwrap();
  s.find_or_create_topic("Energy".into()).await.unwrap();

  assert_eq!(s.recompute_orphans().await.unwrap(), 0);

  // Break the flags behind the store's back.
  s.execute_raw("UPDATE topics SET orphaned = NOT orphaned").await.unwrap();

  assert_eq!(s.recompute_orphans().await.unwrap(), 2);
  let orphaned = s.list_topics(TopicFilter::Orphaned).await.unwrap();
  assert_eq!(topic_names(&orphaned), ["Energy"]);
}

// ─── Topics ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn friendly_find_by_id_slug_and_name() {
  let s = store().await;
  let topic = s.find_or_create_topic("Climate Policy".into()).await.unwrap();
  assert!(topic.orphaned);

  let by_id = s.friendly_find_topic(topic.topic_id.to_string()).await.unwrap();
  let by_slug = s.friendly_find_topic("climate-policy".into()).await.unwrap();
  let by_name = s.friendly_find_topic("Climate Policy".into()).await.unwrap();
  for found in [by_id, by_slug, by_name] {
    assert_eq!(found.map(|t| t.topic_id), Some(topic.topic_id));
  }
  assert!(s.friendly_find_topic("energy".into()).await.unwrap().is_none());
  assert!(s.friendly_find_topic("  ".into()).await.unwrap().is_none());
}

#[tokio::test]
async fn rename_collision_rejected() {
  let s = store().await;
  s.find_or_create_topic("Climate".into()).await.unwrap();
  let energy = s.find_or_create_topic("Energy".into()).await.unwrap();

  let err = s.rename_topic(energy.topic_id, "climate".into()).await.unwrap_err();
  assert_eq!(err.as_core().map(CoreError::field_errors), Some(
    &[FieldError::new("name", "has already been taken")][..]
  ));

  let unchanged = s.get_topic(energy.topic_id).await.unwrap().unwrap();
  assert_eq!(unchanged.name, "Energy");
  assert_eq!(unchanged.slug, "energy");
  assert_eq!(unchanged.previous_slug, None);
}

#[tokio::test]
async fn rename_keeps_previous_slug_and_links() {
  let s = store().await;
  let ada = user(&s, "ada").await;
  let review = s
    .create_review(NewReview::new(ada, "https://example.com").with_topics("Climate"))
    .await
    .unwrap();
  let climate = s.friendly_find_topic("climate".into()).await.unwrap().unwrap();
  let inv = investigation(&s, "Climate").await;

  let renamed = s.rename_topic(climate.topic_id, "Climate Policy".into()).await.unwrap();
  assert_eq!(renamed.slug, "climate-policy");
  assert_eq!(renamed.previous_slug.as_deref(), Some("climate"));

  let old_link = s.friendly_find_topic("climate".into()).await.unwrap();
  assert_eq!(old_link.map(|t| t.topic_id), Some(climate.topic_id));

  // The review's text still says "Climate"; it keeps resolving to the topic.
  let topics = s.review_topics(review.review_id).await.unwrap();
  assert_eq!(topic_names(&topics), ["Climate Policy"]);
  assert_eq!(s.list_topics(TopicFilter::All).await.unwrap().len(), 1);

  let inv = s.get_investigation(inv).await.unwrap().unwrap();
  assert_eq!(inv.topic_name, "Climate Policy");
}

#[tokio::test]
async fn rename_to_numbers_rejected() {
  let s = store().await;
  let topic = s.find_or_create_topic("Climate".into()).await.unwrap();
  let err = s.rename_topic(topic.topic_id, "1234".into()).await.unwrap_err();
  assert!(err.is_validation());
}

// ─── Bulk assignment ─────────────────────────────────────────────────────────

#[tokio::test]
async fn assign_topic_adds_removes_and_records_failures() {
  let s = store().await;
  let ada = user(&s, "ada").await;
  let bob = user(&s, "bob").await;

  let r1 = s
    .create_review(NewReview::new(ada, "https://example.com/1").with_topics("Energy"))
    .await
    .unwrap();
  let mut broken = NewReview::new(ada, "https://example.com/2").with_topics("42");
  broken.skip_topics_reconcile = true;
  let r2 = s.create_review(broken).await.unwrap();
  let r3 = s.create_review(NewReview::new(ada, "https://example.com/3")).await.unwrap();
  let theirs = s.create_review(NewReview::new(bob, "https://example.com/1")).await.unwrap();

  let climate = s.find_or_create_topic("Climate".into()).await.unwrap();

  let outcome = s
    .assign_topic(TopicAssignment {
      topic_id: climate.topic_id,
      user_id:  ada,
      included: vec![r1.review_id, r2.review_id, r3.review_id, theirs.review_id],
      selected: vec![r1.review_id, r2.review_id, theirs.review_id],
    })
    .await
    .unwrap();
  assert_eq!((outcome.added, outcome.removed), (1, 0));
  assert_eq!(outcome.failed.len(), 1);
  assert_eq!(outcome.failed[0].review_id, r2.review_id);

  assert_eq!(s.topic_review_ids(climate.topic_id).await.unwrap(), [r1.review_id]);
  let r1 = s.get_review(r1.review_id).await.unwrap().unwrap();
  assert_eq!(r1.topics_text.as_deref(), Some("Energy\nClimate"));
  let r2 = s.get_review(r2.review_id).await.unwrap().unwrap();
  assert_eq!(r2.topics_text.as_deref(), Some("42"));

  let outcome = s
    .assign_topic(TopicAssignment {
      topic_id: climate.topic_id,
      user_id:  ada,
      included: vec![r1.review_id],
      selected: vec![],
    })
    .await
    .unwrap();
  assert_eq!((outcome.added, outcome.removed), (0, 1));

  let r1 = s.get_review(r1.review_id).await.unwrap().unwrap();
  assert_eq!(r1.topics_text.as_deref(), Some("Energy"));
  assert!(s.get_topic(climate.topic_id).await.unwrap().unwrap().orphaned);
}

#[tokio::test]
async fn assign_topic_ignores_lines_naming_another_topic() {
  let s = store().await;
  let ada = user(&s, "ada").await;

  // Weather's previous slug "climate" now collides with the other topic's name.
  let weather = s.find_or_create_topic("Climate".into()).await.unwrap();
  let weather = s.rename_topic(weather.topic_id, "Weather".into()).await.unwrap();
  assert_eq!(weather.previous_slug.as_deref(), Some("climate"));
  let climate = s.find_or_create_topic("Other".into()).await.unwrap();
  let climate = s.rename_topic(climate.topic_id, "Climate".into()).await.unwrap();

  let r1 = s
    .create_review(NewReview::new(ada, "https://example.com/1").with_topics("Climate"))
    .await
    .unwrap();
  let outcome = s
    .assign_topic(TopicAssignment {
      topic_id: weather.topic_id,
      user_id:  ada,
      included: vec![r1.review_id],
      selected: vec![r1.review_id],
    })
    .await
    .unwrap();
  assert_eq!((outcome.added, outcome.removed), (1, 0));
  assert!(outcome.failed.is_empty());
  let r1 = s.get_review(r1.review_id).await.unwrap().unwrap();
  assert_eq!(r1.topics_text.as_deref(), Some("Climate\nWeather"));
  let topics = s.review_topics(r1.review_id).await.unwrap();
  assert_eq!(topic_names(&topics), ["Climate", "Weather"]);

  let r2 = s
    .create_review(NewReview::new(ada, "https://example.com/2").with_topics("Weather\nClimate"))
    .await
    .unwrap();
  let outcome = s
    .assign_topic(TopicAssignment {
      topic_id: weather.topic_id,
      user_id:  ada,
      included: vec![r2.review_id],
      selected: vec![],
    })
    .await
    .unwrap();
  assert_eq!((outcome.added, outcome.removed), (0, 1));
  let r2 = s.get_review(r2.review_id).await.unwrap().unwrap();
  assert_eq!(r2.topics_text.as_deref(), Some("Climate"));
  assert_eq!(s.topic_review_ids(climate.topic_id).await.unwrap(), [r1.review_id, r2.review_id]);
  assert_eq!(s.topic_review_ids(weather.topic_id).await.unwrap(), [r1.review_id]);
}

// ─── Investigations & votes ──────────────────────────────────────────────────

#[tokio::test]
async fn investigation_window_normalised() {
  let s = store().await;
  let now = Utc::now();
  let inv = s
    .create_investigation(NewInvestigation {
      topic_name: "Climate".into(),
      start_at:   Some(now + Duration::days(1)),
      end_at:     Some(now - Duration::days(1)),
    })
    .await
    .unwrap();
  assert!(inv.start_at < inv.end_at);
  assert_eq!(inv.status_at(now), InvestigationStatus::Active);

  let stored = s.get_investigation(inv.investigation_id).await.unwrap().unwrap();
  assert_eq!(stored.topic_id, inv.topic_id);
  assert_eq!(stored.status_at(now + Duration::days(2)), InvestigationStatus::Ended);
}

#[tokio::test]
async fn high_quality_votes_rank_in_order() {
  let s = store().await;
  let ada = user(&s, "ada").await;
  let inv = investigation(&s, "Climate").await;
  let a = s
    .create_review(NewReview::new(ada, "https://example.com/a").with_quality(Quality::High))
    .await
    .unwrap();
  let b = s
    .create_review(NewReview::new(ada, "https://example.com/b").with_quality(Quality::High))
    .await
    .unwrap();

  let first = s.save_vote(NewVote::new(inv, a.review_id)).await.unwrap();
  assert_eq!(first.listing_order, 1001);
  assert!(first.recommended);
  assert_eq!(first.user_id, ada);

  let second = s.save_vote(NewVote::new(inv, b.review_id)).await.unwrap();
  assert_eq!(second.listing_order, 1002);

  let votes = s.investigation_votes(inv).await.unwrap();
  let ids: Vec<i64> = votes.iter().map(|v| v.vote_id).collect();
  assert_eq!(ids, [first.vote_id, second.vote_id]);
}

#[tokio::test]
async fn low_quality_vote_not_recommended() {
  let s = store().await;
  let ada = user(&s, "ada").await;
  let inv = investigation(&s, "Climate").await;
  let review = s
    .create_review(NewReview::new(ada, "https://example.com").with_quality(Quality::Low))
    .await
    .unwrap();

  let vote = s.save_vote(NewVote::new(inv, review.review_id)).await.unwrap();
  assert_eq!(vote.listing_order, -999);
  assert!(!vote.recommended);
}

#[tokio::test]
async fn duplicate_vote_rejected() {
  let s = store().await;
  let ada = user(&s, "ada").await;
  let inv = investigation(&s, "Climate").await;
  let review = s.create_review(NewReview::new(ada, "https://example.com")).await.unwrap();

  s.save_vote(NewVote::new(inv, review.review_id)).await.unwrap();
  let err = s.save_vote(NewVote::new(inv, review.review_id)).await.unwrap_err();
  assert!(err.is_uniqueness());

  let err = s.save_vote(NewVote::new(inv + 1, review.review_id)).await.unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::InvestigationNotFound(_))));
}

#[tokio::test]
async fn manual_rank_survives_recalculation() {
  let s = store().await;
  let ada = user(&s, "ada").await;
  let inv = investigation(&s, "Climate").await;
  let review = s
    .create_review(NewReview::new(ada, "https://example.com").with_quality(Quality::High))
    .await
    .unwrap();

  let vote = s.save_vote(NewVote::new(inv, review.review_id).manual(-5)).await.unwrap();
  assert_eq!((vote.listing_order, vote.recommended), (-5, false));

  assert_eq!(s.recalculate_listing_orders(inv).await.unwrap(), 0);

  let auto = s
    .update_vote(vote.vote_id, VoteUpdate { manual_rank: Some(false), listing_order: None })
    .await
    .unwrap();
  assert_eq!((auto.listing_order, auto.recommended), (1001, true));
}

#[tokio::test]
async fn quality_change_reranks_inline() {
  let s = store().await;
  let ada = user(&s, "ada").await;
  let inv = investigation(&s, "Climate").await;
  let a = s.create_review(NewReview::new(ada, "https://example.com/a")).await.unwrap();
  let b = s.create_review(NewReview::new(ada, "https://example.com/b")).await.unwrap();

  s.save_vote(NewVote::new(inv, a.review_id)).await.unwrap();
  let second = s.save_vote(NewVote::new(inv, b.review_id)).await.unwrap();
  assert_eq!(second.listing_order, 2);

  s.update_review(a.review_id, ReviewUpdate { quality: Some(Quality::High), ..Default::default() })
    .await
    .unwrap();

  let orders: Vec<i64> = s
    .investigation_votes(inv)
    .await
    .unwrap()
    .iter()
    .map(|v| v.listing_order)
    .collect();
  assert_eq!(orders, [1001, 1]);
  assert_eq!(s.recalculate_listing_orders(inv).await.unwrap(), 0);
}

#[tokio::test]
async fn deleting_review_drops_its_votes() {
  let s = store().await;
  let ada = user(&s, "ada").await;
  let inv = investigation(&s, "Climate").await;
  let a = s.create_review(NewReview::new(ada, "https://example.com/a")).await.unwrap();
  let b = s.create_review(NewReview::new(ada, "https://example.com/b")).await.unwrap();
  s.save_vote(NewVote::new(inv, a.review_id)).await.unwrap();
  s.save_vote(NewVote::new(inv, b.review_id)).await.unwrap();

  s.delete_review(a.review_id).await.unwrap();

  let votes = s.investigation_votes(inv).await.unwrap();
  assert_eq!(votes.len(), 1);
  assert_eq!((votes[0].review_id, votes[0].listing_order), (b.review_id, 1));
}

#[tokio::test]
async fn votes_rank_per_user() {
  let s = store().await;
  let ada = user(&s, "ada").await;
  let bob = user(&s, "bob").await;
  let inv = investigation(&s, "Climate").await;
  let a = s
    .create_review(NewReview::new(ada, "https://example.com/a").with_quality(Quality::High))
    .await
    .unwrap();
  let b = s
    .create_review(NewReview::new(bob, "https://example.com/b").with_quality(Quality::High))
    .await
    .unwrap();

  let ada_vote = s.save_vote(NewVote::new(inv, a.review_id)).await.unwrap();
  let bob_vote = s.save_vote(NewVote::new(inv, b.review_id)).await.unwrap();
  assert_eq!(ada_vote.listing_order, 1001);
  assert_eq!((bob_vote.user_id, bob_vote.listing_order), (bob, 1001));
  assert_eq!(s.recalculate_listing_orders(inv).await.unwrap(), 0);
}

#[tokio::test]
async fn explicit_voter_scopes_ranking() {
  let s = store().await;
  let ada = user(&s, "ada").await;
  let carol = user(&s, "carol").await;
  let inv = investigation(&s, "Climate").await;
  let mut reviews = Vec::new();
  for url in ["https://example.com/a", "https://example.com/b", "https://example.com/c"] {
    let review = s
      .create_review(NewReview::new(ada, url).with_quality(Quality::High))
      .await
      .unwrap();
    reviews.push(review.review_id);
  }

  s.save_vote(NewVote::new(inv, reviews[0])).await.unwrap();

  let mut vote = NewVote::new(inv, reviews[1]);
  vote.user_id = Some(carol);
  let first = s.save_vote(vote).await.unwrap();
  assert_eq!((first.user_id, first.listing_order), (carol, 1001));

  let mut vote = NewVote::new(inv, reviews[2]);
  vote.user_id = Some(carol);
  let second = s.save_vote(vote).await.unwrap();
  assert_eq!((second.user_id, second.listing_order), (carol, 1002));

  let stored = s.investigation_votes(inv).await.unwrap();
  let voters: Vec<i64> = stored.iter().map(|v| v.user_id).collect();
  assert_eq!(voters, [ada, carol, carol]);
  assert_eq!(s.recalculate_listing_orders(inv).await.unwrap(), 0);
}

#[tokio::test]
async fn skipped_calculation_keeps_given_order() {
  let s = store().await;
  let ada = user(&s, "ada").await;
  let inv = investigation(&s, "Climate").await;
  let a = s
    .create_review(NewReview::new(ada, "https://example.com/a").with_quality(Quality::High))
    .await
    .unwrap();
  let b = s.create_review(NewReview::new(ada, "https://example.com/b")).await.unwrap();

  let mut vote = NewVote::new(inv, a.review_id);
  vote.skip_calculated_listing_order = true;
  vote.listing_order = Some(-3);
  let vote = s.save_vote(vote).await.unwrap();
  assert_eq!((vote.listing_order, vote.recommended, vote.manual_rank), (-3, false, false));

  let mut vote = NewVote::new(inv, b.review_id);
  vote.skip_calculated_listing_order = true;
  vote.listing_order = Some(7);
  let vote = s.save_vote(vote).await.unwrap();
  assert_eq!((vote.listing_order, vote.recommended), (7, true));
}

// ─── Jobs ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn worker_runs_queued_reranks() {
  let base = store().await;
  let reader = base.clone();
  let (queue, worker) = spawn_worker(base.clone());
  let s = base.with_queue(queue);

  let ada = user(&s, "ada").await;
  let inv = investigation(&s, "Climate").await;
  let a = s.create_review(NewReview::new(ada, "https://example.com/a")).await.unwrap();
  let b = s.create_review(NewReview::new(ada, "https://example.com/b")).await.unwrap();
  s.save_vote(NewVote::new(inv, a.review_id)).await.unwrap();
  s.save_vote(NewVote::new(inv, b.review_id)).await.unwrap();

  s.update_review(a.review_id, ReviewUpdate { quality: Some(Quality::High), ..Default::default() })
    .await
    .unwrap();

  // Closing the queue lets the worker drain and exit.
  drop(s);
  worker.await.unwrap();

  let orders: Vec<i64> = reader
    .investigation_votes(inv)
    .await
    .unwrap()
    .iter()
    .map(|v| v.listing_order)
    .collect();
  assert_eq!(orders, [1001, 1]);
}

#[tokio::test]
async fn job_for_deleted_review_succeeds() {
  let s = store().await;
  s.run_job(convus_core::jobs::Job::ReconcileReviewTopics { review_id: 404 })
    .await
    .unwrap();
}
