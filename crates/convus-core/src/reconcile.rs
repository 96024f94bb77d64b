//! Planning for review ↔ topic reconciliation.
//!
//! Backends resolve topic names to ids, hand the target and current id sets to
//! [`plan_reconciliation`], and apply the plan inside one transaction. An
//! unchanged review yields an empty plan, which makes reconciliation safe to
//! run any number of times.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

// ─── Single review ───────────────────────────────────────────────────────────

/// Association changes needed for one review.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
  pub to_add:    Vec<i64>,
  pub to_remove: Vec<i64>,
}

impl ReconcilePlan {
  pub fn is_empty(&self) -> bool { self.to_add.is_empty() && self.to_remove.is_empty() }

  /// Topics whose orphan flag must be recomputed after the plan is applied.
  pub fn touched(&self) -> impl Iterator<Item = i64> + '_ {
    self.to_add.iter().chain(&self.to_remove).copied()
  }
}

/// Diff the topic ids a review should have against the ones it has.
///
/// Order of `to_add` follows `target`, order of `to_remove` follows `current`.
pub fn plan_reconciliation(target: &[i64], current: &[i64]) -> ReconcilePlan {
  let target_set: HashSet<i64> = target.iter().copied().collect();
  let current_set: HashSet<i64> = current.iter().copied().collect();

  let mut seen = HashSet::new();
  let to_add = target
    .iter()
    .copied()
    .filter(|id| !current_set.contains(id) && seen.insert(*id))
    .collect();
  let to_remove = current
    .iter()
    .copied()
    .filter(|id| !target_set.contains(id))
    .collect();

  ReconcilePlan { to_add, to_remove }
}

/// What one reconciliation pass wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileOutcome {
  pub created_topics: usize,
  pub added:          usize,
  pub removed:        usize,
}

impl ReconcileOutcome {
  pub fn writes(&self) -> usize { self.created_topics + self.added + self.removed }
}

// ─── Bulk topic assignment ───────────────────────────────────────────────────

/// Add or remove one topic across a set of reviews.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicAssignment {
  pub topic_id: i64,
  /// Only this user's reviews are touched.
  pub user_id:  i64,
  /// Reviews the caller was shown; anything else is left alone.
  pub included: Vec<i64>,
  /// Reviews among `included` that should end up with the topic.
  pub selected: Vec<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentPlan {
  pub add:    Vec<i64>,
  pub remove: Vec<i64>,
}

/// `included` must already be limited to the acting user's reviews; `linked`
/// is the subset of `included` currently associated with the topic.
pub fn plan_assignment(included: &[i64], selected: &[i64], linked: &[i64]) -> AssignmentPlan {
  let selected: HashSet<i64> = selected.iter().copied().collect();
  let linked: HashSet<i64> = linked.iter().copied().collect();

  let mut seen = HashSet::new();
  let mut plan = AssignmentPlan::default();
  for id in included.iter().copied().filter(|id| seen.insert(*id)) {
    match (selected.contains(&id), linked.contains(&id)) {
      (true, false) => plan.add.push(id),
      (false, true) => plan.remove.push(id),
      _ => {}
    }
  }
  plan
}

/// Counts for UI feedback, plus reviews that could not be updated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentOutcome {
  pub added:   usize,
  pub removed: usize,
  pub failed:  Vec<AssignmentFailure>,
}

impl AssignmentOutcome {
  pub fn updated(&self) -> usize { self.added + self.removed }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentFailure {
  pub review_id: i64,
  pub message:   String,
}
