//! Advisory choice between reviews that look like duplicates.
//!
//! Nothing here is enforced; the only hard rule is one review per
//! (user, citation).

use crate::review::{Agreement, Quality, Review};

/// Whether the reviewer said anything beyond the defaults.
pub fn has_non_default_attributes(review: &Review) -> bool {
  review.quality != Quality::Medium
    || review.agreement != Agreement::Neutral
    || !review.topics().is_empty()
}

/// Prefer reviews with non-default attributes; the highest id breaks ties.
pub fn preferred(reviews: &[Review]) -> Option<&Review> {
  reviews
    .iter()
    .max_by_key(|r| (has_non_default_attributes(r), r.review_id))
}
