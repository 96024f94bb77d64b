//! Citations, the articles reviews are about.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
  pub citation_id: i64,
  /// Normalised with [`normalize_url`].
  pub url:         String,
  pub title:       Option<String>,
  pub created_at:  DateTime<Utc>,
}

/// Trim the URL and drop any `#fragment`; fragments never change the article.
pub fn normalize_url(url: &str) -> String {
  let url = url.trim();
  url.split_once('#').map_or(url, |(base, _)| base).to_owned()
}
