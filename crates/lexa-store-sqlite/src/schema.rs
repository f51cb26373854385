//! SQL schema for the Lexa SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Every issued identifier, with the base shape shared by all entities.
-- Rows are never deleted; soft deletion clears `active`.
CREATE TABLE IF NOT EXISTS entities (
    entity_id  TEXT PRIMARY KEY,
    kind       TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    active     INTEGER NOT NULL DEFAULT 1
);

-- ── Content ──────────────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS languages (
    language_id TEXT PRIMARY KEY REFERENCES entities(entity_id),
    name        TEXT NOT NULL UNIQUE,
    author_id   TEXT NOT NULL,
    official    INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS language_subscribers (
    language_id TEXT NOT NULL REFERENCES languages(language_id),
    user_id     TEXT NOT NULL,
    PRIMARY KEY (language_id, user_id)
);

CREATE TABLE IF NOT EXISTS word_contexts (
    context_id TEXT PRIMARY KEY REFERENCES entities(entity_id),
    name       TEXT NOT NULL UNIQUE,
    author_id  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS words (
    word_id              TEXT PRIMARY KEY REFERENCES entities(entity_id),
    name                 TEXT NOT NULL UNIQUE,
    language_id          TEXT NOT NULL REFERENCES languages(language_id),
    description          TEXT NOT NULL DEFAULT '',
    word_type            TEXT NOT NULL DEFAULT '',
    gender               TEXT NOT NULL DEFAULT '',
    practices            INTEGER NOT NULL DEFAULT 0,
    successful_practices INTEGER NOT NULL DEFAULT 0,
    context_id           TEXT REFERENCES word_contexts(context_id),
    author_id            TEXT NOT NULL,
    official             INTEGER NOT NULL,
    CHECK (successful_practices >= 0 AND successful_practices <= practices)
);

-- Undirected relation kept as forward edges. Every write stores both
-- directions in the same transaction.
CREATE TABLE IF NOT EXISTS word_synonyms (
    word_id    TEXT NOT NULL REFERENCES words(word_id),
    synonym_id TEXT NOT NULL REFERENCES words(word_id),
    PRIMARY KEY (word_id, synonym_id),
    CHECK (word_id != synonym_id)
);

-- ── Aggregation ──────────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS vocabulary_contexts (
    context_id TEXT PRIMARY KEY REFERENCES entities(entity_id),
    name       TEXT NOT NULL UNIQUE,
    author_id  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS vocabularies (
    vocabulary_id        TEXT PRIMARY KEY REFERENCES entities(entity_id),
    domestic_language_id TEXT NOT NULL REFERENCES languages(language_id),
    foreign_language_id  TEXT NOT NULL REFERENCES languages(language_id),
    author_id            TEXT NOT NULL,
    official             INTEGER NOT NULL,
    context_id           TEXT REFERENCES vocabulary_contexts(context_id),
    CHECK (domestic_language_id != foreign_language_id)
);

CREATE TABLE IF NOT EXISTS vocabulary_words (
    vocabulary_id TEXT NOT NULL REFERENCES vocabularies(vocabulary_id),
    side          TEXT NOT NULL CHECK (side IN ('domestic', 'foreign')),
    word_id       TEXT NOT NULL REFERENCES words(word_id),
    PRIMARY KEY (vocabulary_id, side, word_id)
);

CREATE TABLE IF NOT EXISTS packages (
    package_id  TEXT PRIMARY KEY REFERENCES entities(entity_id),
    name        TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL DEFAULT '',
    author_id   TEXT NOT NULL,
    official    INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS package_vocabularies (
    package_id    TEXT NOT NULL REFERENCES packages(package_id),
    vocabulary_id TEXT NOT NULL REFERENCES vocabularies(vocabulary_id),
    PRIMARY KEY (package_id, vocabulary_id)
);

CREATE TABLE IF NOT EXISTS package_subscribers (
    package_id TEXT NOT NULL REFERENCES packages(package_id),
    user_id    TEXT NOT NULL,
    PRIMARY KEY (package_id, user_id)
);

CREATE TABLE IF NOT EXISTS folders (
    folder_id   TEXT PRIMARY KEY REFERENCES entities(entity_id),
    name        TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL DEFAULT '',
    author_id   TEXT NOT NULL,
    official    INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS folder_packages (
    folder_id  TEXT NOT NULL REFERENCES folders(folder_id),
    package_id TEXT NOT NULL REFERENCES packages(package_id),
    PRIMARY KEY (folder_id, package_id)
);

CREATE TABLE IF NOT EXISTS folder_subscribers (
    folder_id TEXT NOT NULL REFERENCES folders(folder_id),
    user_id   TEXT NOT NULL,
    PRIMARY KEY (folder_id, user_id)
);

-- ── Progress ─────────────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS learnings (
    learning_id   TEXT PRIMARY KEY REFERENCES entities(entity_id),
    user_id       TEXT NOT NULL,
    vocabulary_id TEXT NOT NULL REFERENCES vocabularies(vocabulary_id),
    score         INTEGER NOT NULL DEFAULT 1,
    prev_score    INTEGER NOT NULL DEFAULT 1,
    UNIQUE (user_id, vocabulary_id)
);

CREATE INDEX IF NOT EXISTS entities_kind_idx   ON entities(kind);
CREATE INDEX IF NOT EXISTS words_language_idx  ON words(language_id);
CREATE INDEX IF NOT EXISTS learnings_user_idx  ON learnings(user_id);

PRAGMA user_version = 1;
";
