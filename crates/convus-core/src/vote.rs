//! Topic investigation votes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ranking::{PriorVote, RankedVote, calculated_listing_order, recommended};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicInvestigationVote {
  pub vote_id:          i64,
  pub investigation_id: i64,
  pub user_id:          i64,
  pub review_id:        i64,
  pub listing_order:    i64,
  /// Always `listing_order > 0`.
  pub recommended:      bool,
  /// Freezes `listing_order` against automatic ranking.
  pub manual_rank:      bool,
  pub created_at:       DateTime<Utc>,
  pub updated_at:       DateTime<Utc>,
}

impl TopicInvestigationVote {
  pub fn is_auto_rank(&self) -> bool { !self.manual_rank }
}

/// Input to [`crate::store::RatingStore::save_vote`].
#[derive(Debug, Clone)]
pub struct NewVote {
  pub investigation_id:              i64,
  pub review_id:                     i64,
  /// Defaults to the review's author.
  pub user_id:                       Option<i64>,
  pub manual_rank:                   bool,
  /// Only used when the order is not calculated.
  pub listing_order:                 Option<i64>,
  pub skip_calculated_listing_order: bool,
}

impl NewVote {
  pub fn new(investigation_id: i64, review_id: i64) -> Self {
    Self {
      investigation_id,
      review_id,
      user_id: None,
      manual_rank: false,
      listing_order: None,
      skip_calculated_listing_order: false,
    }
  }

  pub fn manual(mut self, listing_order: i64) -> Self {
    self.manual_rank = true;
    self.listing_order = Some(listing_order);
    self
  }
}

/// Patch applied by [`crate::store::RatingStore::update_vote`].
#[derive(Debug, Clone, Default)]
pub struct VoteUpdate {
  pub manual_rank:   Option<bool>,
  pub listing_order: Option<i64>,
}

/// Listing order and recommendation for a vote about to be written.
///
/// Auto-ranked votes get a calculated order; otherwise `fixed` is kept (0 if
/// absent). `recommended` is derived either way.
pub fn settle_rank(
  auto_rank: bool,
  fixed: Option<i64>,
  vote: RankedVote,
  prior: &[PriorVote],
) -> (i64, bool) {
  let listing_order = if auto_rank {
    calculated_listing_order(vote, prior)
  } else {
    fixed.unwrap_or(0)
  };
  (listing_order, recommended(listing_order))
}
