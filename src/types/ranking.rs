use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// The three parallel ranking domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankingKind {
    Artist,
    Album,
    Song,
}

impl RankingKind {
    pub const ALL: [RankingKind; 3] = [RankingKind::Artist, RankingKind::Album, RankingKind::Song];

    /// Backing table; each kind owns one.
    pub fn table(self) -> &'static str {
        match self {
            RankingKind::Artist => "artist_rankings",
            RankingKind::Album => "album_rankings",
            RankingKind::Song => "song_rankings",
        }
    }

    /// Path segment under `/api`.
    pub fn route(self) -> &'static str {
        match self {
            RankingKind::Artist => "artists",
            RankingKind::Album => "albums",
            RankingKind::Song => "songs",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RankingKind::Artist => "Artist",
            RankingKind::Album => "Album",
            RankingKind::Song => "Song",
        }
    }
}

impl fmt::Display for RankingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.route())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct RankingEntry {
    pub id: i64,
    pub name: String,
    pub rank_position: i64,
}

/// Body of `POST /api/{kind}`. Older clients send `artist_name` and friends.
#[derive(Debug, Default, Deserialize)]
pub struct AddRankingRequest {
    #[serde(default, alias = "artist_name", alias = "album_name", alias = "song_name")]
    pub name: Option<String>,
}

/// Body of `PUT /api/{kind}/reorder`; kept loose so a non-list `order` is a 400, not a rejection.
#[derive(Debug, Default, Deserialize)]
pub struct ReorderRequest {
    #[serde(default)]
    pub order: Option<serde_json::Value>,
}

impl ReorderRequest {
    /// Ids in requested order. Entries that are not integers are dropped.
    pub fn into_ids(self) -> Option<Vec<i64>> {
        match self.order? {
            serde_json::Value::Array(items) if !items.is_empty() => {
                Some(items.iter().filter_map(serde_json::Value::as_i64).collect())
            }
            _ => None,
        }
    }
}
