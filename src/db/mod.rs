//! Database module: models, schema and storage for persistent state.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows
//! - `schema.rs`: SQL DDL plus the additive Spotify columns
//! - `sqlite.rs`: pool construction and account storage
//! - `rankings.rs`: the dense-position ranked lists

pub mod models;
pub mod rankings;
pub mod schema;
pub mod sqlite;

pub use models::{DbAccount, SpotifyLink};
pub use rankings::RankingStore;
pub use schema::SQLITE_INIT;
pub use sqlite::{AccountStorage, SqlitePool, connect};
