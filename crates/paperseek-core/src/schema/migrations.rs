/// A schema migration.
#[derive(Debug)]
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub sql: &'static str,
}

const MIGRATION_001: &str = r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Papers sampled from the source dataset, in sample order (rowid)
CREATE TABLE IF NOT EXISTS papers (
    id TEXT PRIMARY KEY,
    dataset_row INTEGER NOT NULL UNIQUE,
    title TEXT NOT NULL,
    abstract TEXT NOT NULL,
    text TEXT NOT NULL,
    embedding BLOB,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Vector collections; dimension is fixed by the first insert unless declared
CREATE TABLE IF NOT EXISTS collections (
    name TEXT PRIMARY KEY,
    properties TEXT NOT NULL,
    metric TEXT NOT NULL,
    dimension INTEGER,
    created_at TEXT NOT NULL
);

-- Data objects: a payload of text properties plus one vector
CREATE TABLE IF NOT EXISTS objects (
    id TEXT PRIMARY KEY,
    collection TEXT NOT NULL REFERENCES collections(name) ON DELETE CASCADE,
    properties TEXT NOT NULL,
    vector BLOB NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_objects_collection ON objects(collection);
"#;

const MIGRATION_002: &str = r#"
-- Which sample and which embedding model produced the staged papers
CREATE TABLE IF NOT EXISTS store_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Model whose vectors a collection holds; queries must use the same model
ALTER TABLE collections ADD COLUMN model TEXT;
"#;

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "initial_schema",
        sql: MIGRATION_001,
    },
    Migration {
        version: 2,
        name: "provenance",
        sql: MIGRATION_002,
    },
];
