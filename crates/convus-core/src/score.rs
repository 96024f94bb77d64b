//! Default review scores, bucketed by quality.

use crate::review::{Quality, Review};

pub const HIGH_QUALITY_SCORE: i64 = 1000;
pub const LOW_QUALITY_SCORE: i64 = -1000;
pub const NEUTRAL_SCORE: i64 = 0;

pub fn quality_score(quality: Quality) -> i64 {
  match quality {
    Quality::High => HIGH_QUALITY_SCORE,
    Quality::Low => LOW_QUALITY_SCORE,
    Quality::Medium => NEUTRAL_SCORE,
  }
}

pub fn default_score(review: &Review) -> i64 { quality_score(review.quality) }
