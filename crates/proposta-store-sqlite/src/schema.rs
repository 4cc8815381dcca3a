//! SQL schema for the proposal SQLite store.
//!
//! Executed once at connection startup. Money columns hold hundredths as
//! integers; timestamps are fixed-width RFC 3339 strings so they sort
//! lexically; calendar dates are `YYYY-MM-DD`.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS customers (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    slug        TEXT NOT NULL UNIQUE,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS suppliers (
    id          TEXT PRIMARY KEY,
    legal_name  TEXT NOT NULL,
    specialty   TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

-- Last sequence number handed out per customer and year.
CREATE TABLE IF NOT EXISTS proposal_sequences (
    customer_id TEXT    NOT NULL REFERENCES customers(id),
    year        INTEGER NOT NULL,
    last_seq    INTEGER NOT NULL,
    PRIMARY KEY (customer_id, year)
);

CREATE TABLE IF NOT EXISTS proposals (
    id                TEXT PRIMARY KEY,
    customer_id       TEXT    NOT NULL REFERENCES customers(id),
    code              TEXT    NOT NULL UNIQUE,
    year              INTEGER NOT NULL,
    seq_number        INTEGER NOT NULL,
    project_name      TEXT    NOT NULL,
    scope_description TEXT    NOT NULL,
    invitation_code   TEXT,
    due_date          TEXT,
    estimated_value   INTEGER NOT NULL,
    final_value       INTEGER,
    outcome_reason    TEXT,
    status            TEXT    NOT NULL,
    created_by        TEXT    NOT NULL,
    created_at        TEXT    NOT NULL,
    updated_at        TEXT    NOT NULL,
    UNIQUE (customer_id, year, seq_number)
);

CREATE TABLE IF NOT EXISTS proposal_revisions (
    id               TEXT PRIMARY KEY,
    proposal_id      TEXT    NOT NULL REFERENCES proposals(id),
    revision_number  INTEGER NOT NULL,
    reason           TEXT,
    scope_changes    TEXT,
    notes            TEXT,
    value_before     INTEGER,
    value_after      INTEGER,
    discount         INTEGER,
    discount_percent INTEGER,
    created_by       TEXT    NOT NULL,
    created_at       TEXT    NOT NULL,
    UNIQUE (proposal_id, revision_number)
);

-- Append-only. No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS activity_log (
    seq          INTEGER PRIMARY KEY AUTOINCREMENT,
    id           TEXT NOT NULL UNIQUE,
    entity_type  TEXT NOT NULL,
    entity_id    TEXT NOT NULL,
    action       TEXT NOT NULL,
    metadata     TEXT NOT NULL,   -- JSON payload (inner data only)
    created_by   TEXT NOT NULL,
    created_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS proposal_suppliers (
    id                 TEXT PRIMARY KEY,
    proposal_id        TEXT NOT NULL REFERENCES proposals(id),
    revision_id        TEXT REFERENCES proposal_revisions(id),
    supplier_id        TEXT NOT NULL REFERENCES suppliers(id),
    role_description   TEXT,
    quoted_hourly_cost INTEGER,
    estimated_hours    INTEGER,
    quoted_total       INTEGER,
    created_at         TEXT NOT NULL,
    UNIQUE (proposal_id, supplier_id, revision_id)
);

CREATE TABLE IF NOT EXISTS proposal_attachments (
    id           TEXT PRIMARY KEY,
    proposal_id  TEXT    NOT NULL REFERENCES proposals(id),
    revision_id  TEXT    REFERENCES proposal_revisions(id),
    category     TEXT    NOT NULL,
    file_name    TEXT    NOT NULL,
    storage_path TEXT    NOT NULL UNIQUE,
    mime_type    TEXT    NOT NULL,
    size_bytes   INTEGER NOT NULL,
    uploaded_by  TEXT    NOT NULL,
    created_at   TEXT    NOT NULL
);

-- NULLs are distinct in UNIQUE constraints, so legacy unscoped links need
-- their own index.
CREATE UNIQUE INDEX IF NOT EXISTS proposal_suppliers_unscoped_idx
    ON proposal_suppliers(proposal_id, supplier_id)
    WHERE revision_id IS NULL;

CREATE INDEX IF NOT EXISTS activity_log_entity_idx
    ON activity_log(entity_type, entity_id, created_at DESC);
CREATE INDEX IF NOT EXISTS proposal_revisions_proposal_idx
    ON proposal_revisions(proposal_id);
CREATE INDEX IF NOT EXISTS proposal_attachments_proposal_idx
    ON proposal_attachments(proposal_id);
CREATE INDEX IF NOT EXISTS proposals_created_idx
    ON proposals(created_at);

PRAGMA user_version = 1;
";
