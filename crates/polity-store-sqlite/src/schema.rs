//! SQL schema for the Polity SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS identities (
    id          INTEGER PRIMARY KEY,
    parent_id   INTEGER REFERENCES identities(id),
    name        TEXT    NOT NULL,
    slug        TEXT    NOT NULL UNIQUE,
    abbr        TEXT    NOT NULL DEFAULT '',
    color       TEXT    NOT NULL,
    description TEXT    NOT NULL DEFAULT '',
    level       INTEGER NOT NULL CHECK (level >= 0),
    path        TEXT    NOT NULL DEFAULT '[]',  -- JSON array of ancestor ids, root-first
    is_active   INTEGER NOT NULL DEFAULT 1
);

-- One row per (ancestor, descendant) pair in every record's path.
-- Rewritten together with the record whenever its path changes.
CREATE TABLE IF NOT EXISTS identity_ancestors (
    ancestor_id   INTEGER NOT NULL REFERENCES identities(id),
    descendant_id INTEGER NOT NULL REFERENCES identities(id),
    depth         INTEGER NOT NULL CHECK (depth > 0),
    PRIMARY KEY (ancestor_id, descendant_id)
);

CREATE INDEX IF NOT EXISTS identities_parent_idx     ON identities(parent_id);
CREATE INDEX IF NOT EXISTS identities_order_idx      ON identities(level, name, id);
CREATE INDEX IF NOT EXISTS identity_ancestors_desc_idx ON identity_ancestors(descendant_id);

PRAGMA user_version = 1;
";
