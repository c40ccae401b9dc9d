//! Spotify Web API payloads (only the fields we read) and the shapes we hand to the UI.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Paging<T> {
    #[serde(default)]
    pub items: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimpleArtist {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtistObject {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlbumObject {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub artists: Vec<SimpleArtist>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackObject {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<SimpleArtist>,
    #[serde(default)]
    pub album: Option<AlbumObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub artists: Option<Paging<ArtistObject>>,
    #[serde(default)]
    pub tracks: Option<Paging<TrackObject>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecommendationsResponse {
    #[serde(default)]
    pub tracks: Vec<TrackObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    pub id: String,
}

/// What `/search` is asked for. Anything unrecognised falls back to artists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchType {
    Artist,
    Track,
    ArtistAndTrack,
}

impl SearchType {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::to_lowercase).as_deref() {
            Some("track") => SearchType::Track,
            Some("artist,track") => SearchType::ArtistAndTrack,
            _ => SearchType::Artist,
        }
    }

    pub fn as_param(self) -> &'static str {
        match self {
            SearchType::Artist => "artist",
            SearchType::Track => "track",
            SearchType::ArtistAndTrack => "artist,track",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub q: String,
    pub kind: SearchType,
    pub limit: u32,
}

/// Seeds for `/recommendations`. Spotify rejects a request with no seeds at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Seeds {
    pub artists: Vec<String>,
    pub tracks: Vec<String>,
}

impl Seeds {
    pub fn is_empty(&self) -> bool {
        self.artists.is_empty() && self.tracks.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Suggestion {
    Artist { name: String, id: String },
    Track { name: String, artist: String, id: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackSuggestion {
    pub name: String,
    pub artist: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtistSuggestion {
    pub name: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlbumSuggestion {
    pub name: String,
    pub artist: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackRecommendations {
    pub tracks: Vec<TrackSuggestion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Comma-join artist names, optionally keeping only the first `max`.
pub fn join_artist_names(artists: &[SimpleArtist], max: Option<usize>) -> String {
    artists
        .iter()
        .take(max.unwrap_or(usize::MAX))
        .map(|a| a.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
