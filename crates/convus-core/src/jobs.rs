//! Deferred work.
//!
//! Jobs are delivered at least once and in no particular order, so every job
//! must be safe to run redundantly. Both jobs here recompute derived state from
//! what is stored and write nothing when it is already correct.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "job", rename_all = "snake_case")]
pub enum Job {
  ReconcileReviewTopics { review_id: i64 },
  RecalculateListingOrders { investigation_id: i64 },
}

impl Job {
  pub fn name(&self) -> &'static str {
    match self {
      Self::ReconcileReviewTopics { .. } => "reconcile_review_topics",
      Self::RecalculateListingOrders { .. } => "recalculate_listing_orders",
    }
  }
}

/// Fire-and-forget dispatch.
pub trait JobQueue: Send + Sync {
  fn enqueue(&self, job: Job);
}
