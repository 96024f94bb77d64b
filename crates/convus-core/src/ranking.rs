//! Listing order for topic investigation votes.
//!
//! Orders are bucketed by score: high quality votes land just above 1000, low
//! quality just above -1000, neutral just above 0. Within a bucket each vote
//! ranks after the same user's votes on earlier reviews.

use crate::score::quality_score;
use crate::review::Quality;

/// One of the voter's votes in the same investigation, reduced to what the
/// ranking reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorVote {
  pub review_id: i64,
  pub score:     i64,
}

impl PriorVote {
  pub fn new(review_id: i64, quality: Quality) -> Self {
    Self { review_id, score: quality_score(quality) }
  }
}

/// The vote being ranked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankedVote {
  pub review_id: i64,
  pub score:     i64,
  /// Unsaved votes have no position yet and rank after every prior vote.
  pub persisted: bool,
}

/// `score + 1 + n`, where `n` counts preceding votes with the same score.
///
/// `prior` holds all of the voter's votes in the investigation. For a
/// persisted vote it may include the vote itself; only votes on strictly
/// earlier reviews are counted.
pub fn calculated_listing_order(vote: RankedVote, prior: &[PriorVote]) -> i64 {
  let preceding = prior
    .iter()
    .filter(|p| !vote.persisted || p.review_id < vote.review_id)
    .filter(|p| p.score == vote.score)
    .count() as i64;
  vote.score + 1 + preceding
}

pub fn recommended(listing_order: i64) -> bool { listing_order > 0 }
