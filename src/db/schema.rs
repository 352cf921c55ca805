//! SQL DDL for the SQLite backend.

/// Listing order is insertion order (`rowid`).
/// Ids are UUID strings, dates RFC 3339 text, plant image urls a JSON array.
/// Collection membership lives in `collection_plants`, ordered by `position`.
/// Every foreign key cascades, so deleting a user takes its plants and
/// collections, and deleting a plant drops it from every collection.
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL,
    password TEXT NOT NULL,
    first_name TEXT NOT NULL,
    second_name TEXT NOT NULL,
    about_me TEXT NULL,
    image_url TEXT NULL,
    role TEXT NOT NULL DEFAULT 'default'
);

CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);

CREATE TABLE IF NOT EXISTS plants (
    id TEXT PRIMARY KEY,
    common_name TEXT NOT NULL,
    scientific_name TEXT NOT NULL,
    plant_type TEXT NOT NULL,
    biome TEXT NOT NULL,
    image_urls TEXT NOT NULL DEFAULT '[]',
    note TEXT NULL,
    date TEXT NOT NULL,
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_plants_user_id ON plants(user_id);

CREATE TABLE IF NOT EXISTS collections (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    image_url TEXT NULL,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_collections_user_id ON collections(user_id);

CREATE TABLE IF NOT EXISTS collection_plants (
    collection_id TEXT NOT NULL REFERENCES collections(id) ON DELETE CASCADE,
    plant_id TEXT NOT NULL REFERENCES plants(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    PRIMARY KEY (collection_id, plant_id)
);

CREATE INDEX IF NOT EXISTS idx_collection_plants_plant_id ON collection_plants(plant_id)
"#;
