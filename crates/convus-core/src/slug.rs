//! URL-safe slugs for topic names and usernames.

/// Collapse `name` into lowercase alphanumeric tokens joined by single dashes.
///
/// Deterministic and idempotent: `slugify(&slugify(s)) == slugify(s)`.
pub fn slugify(name: &str) -> String {
  let mut slug = String::with_capacity(name.len());
  let mut pending_dash = false;

  for c in name.chars().flat_map(char::to_lowercase) {
    if c.is_alphanumeric() {
      if pending_dash && !slug.is_empty() {
        slug.push('-');
      }
      pending_dash = false;
      slug.push(c);
    } else {
      pending_dash = true;
    }
  }

  slug
}

/// True for non-empty strings made only of ASCII digits. Such strings are
/// reserved for numeric ids and can never be a slug or a topic name.
pub fn is_numeric(s: &str) -> bool {
  !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}
