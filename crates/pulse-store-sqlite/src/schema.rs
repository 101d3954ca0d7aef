//! SQL schema for the Pulse SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS members (
    member_id   TEXT PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE,
    email       TEXT,
    created_at  TEXT NOT NULL
);

-- One external identity maps to exactly one member.
-- Rows are never updated in place; rebinding means delete + reinsert,
-- which the core never does.
CREATE TABLE IF NOT EXISTS member_identifiers (
    member_id       TEXT NOT NULL REFERENCES members(member_id),
    source          TEXT NOT NULL,
    source_user_id  TEXT NOT NULL,
    recorded_at     TEXT NOT NULL,
    UNIQUE (source, source_user_id)
);

-- Activities are strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS member_activities (
    activity_uuid  TEXT PRIMARY KEY,
    member_id      TEXT NOT NULL REFERENCES members(member_id),
    source         TEXT NOT NULL,
    activity_type  TEXT NOT NULL,
    timestamp      TEXT NOT NULL,   -- ISO 8601 UTC; event time
    metadata       TEXT NOT NULL DEFAULT '{}',
    activity_id    TEXT,            -- source-derived natural key
    recorded_at    TEXT NOT NULL    -- ISO 8601 UTC; server-assigned
);

-- The dedup invariant: a natural key, when present, appears once.
CREATE UNIQUE INDEX IF NOT EXISTS activities_natural_key_idx
    ON member_activities(activity_id) WHERE activity_id IS NOT NULL;

CREATE INDEX IF NOT EXISTS activities_member_idx    ON member_activities(member_id);
CREATE INDEX IF NOT EXISTS activities_source_idx    ON member_activities(source);
CREATE INDEX IF NOT EXISTS activities_timestamp_idx ON member_activities(timestamp);
CREATE INDEX IF NOT EXISTS identifiers_member_idx   ON member_identifiers(member_id);

PRAGMA user_version = 1;
";
