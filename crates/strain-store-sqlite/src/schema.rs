//! SQL schema for the strain SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id            TEXT PRIMARY KEY,
    username           TEXT NOT NULL,
    current_strain_id  TEXT,
    current_variant_id TEXT,
    root_user_id       TEXT,
    parent_user_id     TEXT,
    generation         INTEGER NOT NULL DEFAULT 0,
    tags_given         INTEGER NOT NULL DEFAULT 0,
    tags_received      INTEGER NOT NULL DEFAULT 0,
    direct_score       REAL    NOT NULL DEFAULT 0,
    indirect_score     REAL    NOT NULL DEFAULT 0,
    last_lat           REAL,
    last_lng           REAL,
    created_at         TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS strains (
    strain_id           TEXT PRIMARY KEY,
    origin_user_id      TEXT NOT NULL UNIQUE REFERENCES users(user_id),
    direct_infections   INTEGER NOT NULL DEFAULT 0,
    indirect_infections REAL    NOT NULL DEFAULT 0,
    total_infections    REAL    NOT NULL DEFAULT 0,
    depth               INTEGER NOT NULL DEFAULT 0,
    mutation_points     INTEGER NOT NULL DEFAULT 0,
    outbreak_count      INTEGER NOT NULL DEFAULT 0,
    variant_chain_depth INTEGER NOT NULL DEFAULT 0,
    countries           TEXT    NOT NULL DEFAULT '[]',
    created_at          TEXT NOT NULL
);

-- Tag rows are never deleted; only infection_event_id is back-filled.
CREATE TABLE IF NOT EXISTS tags (
    tag_id              TEXT PRIMARY KEY,
    tagger_id           TEXT NOT NULL,
    target_id           TEXT NOT NULL,
    strain_id           TEXT NOT NULL REFERENCES strains(strain_id),
    variant_id          TEXT,
    parent_tag_id       TEXT REFERENCES tags(tag_id),
    root_user_id        TEXT NOT NULL,
    origin_user_id      TEXT NOT NULL,
    generation          INTEGER NOT NULL,
    outbreak_multiplier REAL NOT NULL,
    region_multiplier   REAL NOT NULL,
    mutation_boost      REAL NOT NULL,
    variant_chain_bonus REAL NOT NULL,
    final_score         REAL NOT NULL,
    infection_method    TEXT,            -- NULL for root tags
    infection_event_id  TEXT,
    lat                 REAL,
    lng                 REAL,
    created_at          TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS infection_events (
    event_id    TEXT PRIMARY KEY,
    infector_id TEXT NOT NULL,
    infected_id TEXT NOT NULL,
    tag_ids     TEXT NOT NULL,           -- JSON array of tag ids
    method      TEXT NOT NULL,
    lat         REAL NOT NULL,
    lng         REAL NOT NULL,
    tier        INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL
);

-- Carried tags: append-only, one row per (user, tag).
CREATE TABLE IF NOT EXISTS user_tags (
    user_id          TEXT NOT NULL,
    tag_id           TEXT NOT NULL REFERENCES tags(tag_id),
    origin_user_id   TEXT NOT NULL,
    generation_depth INTEGER NOT NULL,
    created_at       TEXT NOT NULL,
    PRIMARY KEY (user_id, tag_id)
);

CREATE TABLE IF NOT EXISTS variants (
    variant_id TEXT PRIMARY KEY,
    name       TEXT NOT NULL,
    rarity     INTEGER NOT NULL,
    rules      TEXT NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS user_variants (
    user_id     TEXT NOT NULL,
    variant_id  TEXT NOT NULL REFERENCES variants(variant_id),
    unlocked_at TEXT NOT NULL,
    PRIMARY KEY (user_id, variant_id)
);

CREATE TABLE IF NOT EXISTS mutation_nodes (
    node_id TEXT PRIMARY KEY,
    name    TEXT NOT NULL,
    boost   TEXT NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS user_mutation_unlocks (
    user_id     TEXT NOT NULL,
    node_id     TEXT NOT NULL REFERENCES mutation_nodes(node_id),
    unlocked_at TEXT NOT NULL,
    PRIMARY KEY (user_id, node_id)
);

CREATE TABLE IF NOT EXISTS region_modifiers (
    region_id  TEXT PRIMARY KEY,
    multiplier REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS outbreak_zones (
    zone_id    TEXT PRIMARY KEY,
    region_id  TEXT NOT NULL,
    zone_type  TEXT NOT NULL,
    lat        REAL NOT NULL,
    lng        REAL NOT NULL,
    radius_m   REAL NOT NULL,
    multiplier REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS outbreak_events (
    outbreak_id TEXT PRIMARY KEY,
    region_id   TEXT NOT NULL,
    strain_id   TEXT NOT NULL,
    user_id     TEXT NOT NULL,
    multiplier  REAL NOT NULL,
    zone_type   TEXT NOT NULL,
    lat         REAL NOT NULL,
    lng         REAL NOT NULL,
    tag_count   INTEGER NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tag_drops (
    drop_id    TEXT PRIMARY KEY,
    creator_id TEXT NOT NULL,
    lat        REAL NOT NULL,
    lng        REAL NOT NULL,
    expires_at TEXT NOT NULL,
    claimed_by TEXT NOT NULL DEFAULT '[]'  -- JSON array of user ids
);

-- Ledger behind strains.mutation_points.
CREATE TABLE IF NOT EXISTS mutation_point_awards (
    award_id   TEXT PRIMARY KEY,
    strain_id  TEXT NOT NULL REFERENCES strains(strain_id),
    points     INTEGER NOT NULL,
    reason     TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS tags_target_idx         ON tags(target_id, created_at);
CREATE INDEX IF NOT EXISTS tags_strain_created_idx ON tags(strain_id, created_at);
CREATE INDEX IF NOT EXISTS tags_strain_variant_idx ON tags(strain_id, variant_id);
CREATE INDEX IF NOT EXISTS tags_root_idx           ON tags(origin_user_id) WHERE parent_tag_id IS NULL;

PRAGMA user_version = 1;
";
