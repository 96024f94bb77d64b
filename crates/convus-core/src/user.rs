//! Users, the owners of reviews and votes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub user_id:       i64,
  pub username:      String,
  /// Unique; `slugify(username)`.
  pub username_slug: String,
  pub created_at:    DateTime<Utc>,
}
