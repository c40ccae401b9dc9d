//! SQL DDL for initializing storage (SQLite).

/// Base tables. Spotify linkage columns are not part of `users` here; they are
/// added by [`USER_SPOTIFY_COLUMNS`] so databases created before the linkage
/// existed pick them up too.
///
/// Ranking tables:
/// - `UNIQUE(user_id, name)` (BINARY collation, so case-sensitive)
/// - index on `(user_id, rank_position)` for ordered listing
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS artist_rankings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    rank_position INTEGER NOT NULL,
    UNIQUE (user_id, name)
);

CREATE INDEX IF NOT EXISTS idx_artist_rankings_position ON artist_rankings(user_id, rank_position);

CREATE TABLE IF NOT EXISTS album_rankings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    rank_position INTEGER NOT NULL,
    UNIQUE (user_id, name)
);

CREATE INDEX IF NOT EXISTS idx_album_rankings_position ON album_rankings(user_id, rank_position);

CREATE TABLE IF NOT EXISTS song_rankings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    rank_position INTEGER NOT NULL,
    UNIQUE (user_id, name)
);

CREATE INDEX IF NOT EXISTS idx_song_rankings_position ON song_rankings(user_id, rank_position)
"#;

/// Additive columns on `users`, applied by check-and-add at startup.
pub const USER_SPOTIFY_COLUMNS: &[(&str, &str)] = &[
    ("spotify_id", "TEXT NULL"),
    ("spotify_refresh_token", "TEXT NULL"),
    ("spotify_access_token", "TEXT NULL"),
    ("spotify_token_expires_at", "TEXT NULL"), // RFC3339
];
