//! SQL schema for the cmdb SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Schemas are soft-deleted; names are only reserved while live.
CREATE TABLE IF NOT EXISTS schemas (
    schema_id   TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    display     TEXT NOT NULL,
    deleted     INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS schemas_name_uq
    ON schemas(name) WHERE deleted = 0;
CREATE UNIQUE INDEX IF NOT EXISTS schemas_display_uq
    ON schemas(display) WHERE deleted = 0;

CREATE TABLE IF NOT EXISTS fields (
    field_id      TEXT PRIMARY KEY,
    schema_id     TEXT NOT NULL REFERENCES schemas(schema_id),
    name          TEXT NOT NULL,
    display       TEXT NOT NULL,
    field_type    TEXT NOT NULL,   -- 'int' | 'float' | 'string' | 'datetime' | 'ip'
    required      INTEGER NOT NULL DEFAULT 0,
    multi         INTEGER NOT NULL DEFAULT 0,
    is_unique     INTEGER NOT NULL DEFAULT 0,
    default_value TEXT,            -- canonical JSON of the normalised default
    deleted       INTEGER NOT NULL DEFAULT 0
);

-- Field names are scoped to their schema.
CREATE UNIQUE INDEX IF NOT EXISTS fields_name_uq
    ON fields(schema_id, name) WHERE deleted = 0;
CREATE UNIQUE INDEX IF NOT EXISTS fields_display_uq
    ON fields(schema_id, display) WHERE deleted = 0;

-- Strictly append-only.
CREATE TABLE IF NOT EXISTS field_history (
    history_id    TEXT PRIMARY KEY,
    field_id      TEXT NOT NULL REFERENCES fields(field_id),
    schema_id     TEXT NOT NULL REFERENCES schemas(schema_id),
    name          TEXT NOT NULL,
    display       TEXT NOT NULL,
    field_type    TEXT NOT NULL,
    required      INTEGER NOT NULL,
    multi         INTEGER NOT NULL,
    is_unique     INTEGER NOT NULL,
    default_value TEXT,
    deleted       INTEGER NOT NULL,
    recorded_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS relationships (
    source_id TEXT NOT NULL REFERENCES fields(field_id),
    target_id TEXT NOT NULL REFERENCES fields(field_id),
    PRIMARY KEY (source_id, target_id)
);

CREATE TABLE IF NOT EXISTS entities (
    entity_id   TEXT PRIMARY KEY,
    schema_id   TEXT NOT NULL REFERENCES schemas(schema_id),
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS attribute_values (
    value_id    TEXT PRIMARY KEY,
    entity_id   TEXT NOT NULL REFERENCES entities(entity_id),
    field_id    TEXT NOT NULL REFERENCES fields(field_id),
    value       TEXT NOT NULL    -- canonical JSON, so equal values compare equal
);

-- Strictly append-only. value_id is not a foreign key: removed values keep
-- their history.
CREATE TABLE IF NOT EXISTS value_history (
    history_id  TEXT PRIMARY KEY,
    value_id    TEXT NOT NULL,
    entity_id   TEXT NOT NULL REFERENCES entities(entity_id),
    field_id    TEXT NOT NULL REFERENCES fields(field_id),
    value       TEXT NOT NULL,
    deleted     INTEGER NOT NULL DEFAULT 0,
    recorded_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS fields_schema_idx         ON fields(schema_id);
CREATE INDEX IF NOT EXISTS field_history_field_idx   ON field_history(field_id, recorded_at);
CREATE INDEX IF NOT EXISTS relationships_target_idx  ON relationships(target_id);
CREATE INDEX IF NOT EXISTS entities_schema_idx       ON entities(schema_id);
CREATE INDEX IF NOT EXISTS values_field_value_idx    ON attribute_values(field_id, value);
CREATE INDEX IF NOT EXISTS values_entity_field_idx   ON attribute_values(entity_id, field_id);
CREATE INDEX IF NOT EXISTS value_history_entity_idx  ON value_history(entity_id, field_id, recorded_at);

PRAGMA user_version = 1;
";
