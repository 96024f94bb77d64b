//! SQL schema for the Convus SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// Ids are `AUTOINCREMENT` so they are never reused: review ids double as
/// submission order when ranking votes.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id       INTEGER PRIMARY KEY AUTOINCREMENT,
    username      TEXT NOT NULL,
    username_slug TEXT NOT NULL UNIQUE,
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS citations (
    citation_id INTEGER PRIMARY KEY AUTOINCREMENT,
    url         TEXT NOT NULL UNIQUE,
    title       TEXT,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS reviews (
    review_id      INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id        INTEGER NOT NULL REFERENCES users(user_id),
    citation_id    INTEGER NOT NULL REFERENCES citations(citation_id),
    submitted_url  TEXT NOT NULL,
    citation_title TEXT,
    quality        TEXT NOT NULL DEFAULT 'medium',   -- 'high' | 'medium' | 'low'
    agreement      TEXT NOT NULL DEFAULT 'neutral',  -- 'agree' | 'disagree' | 'neutral'
    topics_text    TEXT,
    created_at     TEXT NOT NULL,
    updated_at     TEXT NOT NULL,
    UNIQUE (user_id, citation_id)
);

CREATE TABLE IF NOT EXISTS topics (
    topic_id      INTEGER PRIMARY KEY AUTOINCREMENT,
    name          TEXT NOT NULL UNIQUE COLLATE NOCASE,
    slug          TEXT NOT NULL UNIQUE,
    previous_slug TEXT,
    -- Derived: no rows in review_topics. Only written by orphan recomputation.
    orphaned      INTEGER NOT NULL DEFAULT 1,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

-- Rows are created and destroyed by reconciliation, never updated.
CREATE TABLE IF NOT EXISTS review_topics (
    review_id  INTEGER NOT NULL REFERENCES reviews(review_id) ON DELETE CASCADE,
    topic_id   INTEGER NOT NULL REFERENCES topics(topic_id),
    created_at TEXT NOT NULL,
    PRIMARY KEY (review_id, topic_id)
);

CREATE TABLE IF NOT EXISTS topic_investigations (
    investigation_id INTEGER PRIMARY KEY AUTOINCREMENT,
    topic_id         INTEGER NOT NULL REFERENCES topics(topic_id),
    topic_name       TEXT NOT NULL,
    start_at         TEXT,
    end_at           TEXT,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS topic_investigation_votes (
    vote_id          INTEGER PRIMARY KEY AUTOINCREMENT,
    investigation_id INTEGER NOT NULL REFERENCES topic_investigations(investigation_id),
    user_id          INTEGER NOT NULL REFERENCES users(user_id),
    review_id        INTEGER NOT NULL REFERENCES reviews(review_id) ON DELETE CASCADE,
    listing_order    INTEGER NOT NULL DEFAULT 0,
    recommended      INTEGER NOT NULL DEFAULT 0,
    manual_rank      INTEGER NOT NULL DEFAULT 0,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL,
    UNIQUE (review_id, investigation_id)
);

-- The target is a JSON-encoded EventTarget, so there is no foreign key.
CREATE TABLE IF NOT EXISTS events (
    event_id     INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id      INTEGER NOT NULL REFERENCES users(user_id),
    kind         TEXT NOT NULL,
    target       TEXT NOT NULL,
    created_date TEXT NOT NULL,
    created_at   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS review_topics_topic_idx ON review_topics(topic_id);
CREATE INDEX IF NOT EXISTS topics_previous_slug_idx ON topics(previous_slug);
CREATE INDEX IF NOT EXISTS votes_investigation_user_idx
    ON topic_investigation_votes(investigation_id, user_id);
CREATE INDEX IF NOT EXISTS events_user_idx ON events(user_id);

PRAGMA user_version = 1;
";
