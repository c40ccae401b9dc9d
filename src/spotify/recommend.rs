//! Read-only units of Spotify work behind the suggestion and recommendation routes.
//!
//! Each function takes an owned client handle and token so it can be moved into
//! [`crate::service::bounded::run_bounded`].

use crate::error::AppError;
use crate::spotify::endpoints::SpotifyApi;
use crate::types::spotify::{
    AlbumObject, AlbumSuggestion, ArtistSuggestion, SearchQuery, Seeds, Suggestion,
    TrackRecommendations, TrackSuggestion, join_artist_names,
};

use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

pub const NO_SEEDS_MESSAGE: &str = "Listen to more music on Spotify to get recommendations.";

const MAX_ALBUMS: usize = 25;
const ALBUM_ARTIST_NAMES: usize = 3;
const SEARCH_ARTIST_NAMES: usize = 3;

/// Tracks recommended from the user's top two artists and top track.
pub async fn recommended_tracks(
    api: Arc<dyn SpotifyApi>,
    token: String,
) -> Result<TrackRecommendations, AppError> {
    let (artists, tracks) = futures::try_join!(
        api.top_artists(&token, 3),
        api.top_tracks(&token, 2),
    )?;
    let seeds = Seeds {
        artists: artists.items.into_iter().take(2).map(|a| a.id).collect(),
        tracks: tracks.items.into_iter().take(1).map(|t| t.id).collect(),
    };
    if seeds.is_empty() {
        debug!("no listening history to seed recommendations");
        return Ok(TrackRecommendations {
            tracks: Vec::new(),
            message: Some(NO_SEEDS_MESSAGE.to_string()),
        });
    }

    let recs = api.recommendations(&token, &seeds, 15).await?;
    Ok(TrackRecommendations {
        tracks: recs
            .tracks
            .into_iter()
            .map(|t| TrackSuggestion {
                artist: join_artist_names(&t.artists, None),
                name: t.name,
                id: t.id,
            })
            .collect(),
        message: None,
    })
}

pub async fn top_artist_suggestions(
    api: Arc<dyn SpotifyApi>,
    token: String,
) -> Result<Vec<ArtistSuggestion>, AppError> {
    let artists = api.top_artists(&token, 20).await?;
    Ok(artists
        .items
        .into_iter()
        .map(|a| ArtistSuggestion {
            name: a.name,
            id: a.id,
        })
        .collect())
}

/// Albums from the user's top tracks first, then from recommendations, one
/// entry per album id.
pub async fn album_suggestions(
    api: Arc<dyn SpotifyApi>,
    token: String,
) -> Result<Vec<AlbumSuggestion>, AppError> {
    let mut albums = AlbumCollector::default();

    let top = api.top_tracks(&token, 50).await?;
    albums.extend(top.items.into_iter().filter_map(|t| t.album));

    let (artists, tracks) = futures::try_join!(
        api.top_artists(&token, 2),
        api.top_tracks(&token, 1),
    )?;
    let seeds = Seeds {
        artists: artists.items.into_iter().map(|a| a.id).collect(),
        tracks: tracks.items.into_iter().map(|t| t.id).collect(),
    };
    if !seeds.is_empty() && !albums.is_full() {
        let recs = api.recommendations(&token, &seeds, 20).await?;
        albums.extend(recs.tracks.into_iter().filter_map(|t| t.album));
    }

    Ok(albums.out)
}

#[derive(Default)]
struct AlbumCollector {
    seen: HashSet<String>,
    out: Vec<AlbumSuggestion>,
}

impl AlbumCollector {
    fn is_full(&self) -> bool {
        self.out.len() >= MAX_ALBUMS
    }

    fn extend(&mut self, albums: impl IntoIterator<Item = AlbumObject>) {
        for album in albums {
            if self.is_full() {
                return;
            }
            let Some(id) = album.id.filter(|id| !id.is_empty()) else {
                continue;
            };
            if !self.seen.insert(id.clone()) {
                continue;
            }
            self.out.push(AlbumSuggestion {
                name: album
                    .name
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| "Unknown".to_string()),
                artist: join_artist_names(&album.artists, Some(ALBUM_ARTIST_NAMES)),
                id,
            });
        }
    }
}

/// Artist and track matches for autocomplete, at most `2 * limit` entries.
pub async fn search_suggestions(
    api: Arc<dyn SpotifyApi>,
    token: String,
    query: SearchQuery,
) -> Result<Vec<Suggestion>, AppError> {
    let resp = api.search(&token, &query).await?;
    let artists = resp.artists.map(|p| p.items).unwrap_or_default();
    let tracks = resp.tracks.map(|p| p.items).unwrap_or_default();

    let mut out: Vec<Suggestion> = artists
        .into_iter()
        .map(|a| Suggestion::Artist {
            name: a.name,
            id: a.id,
        })
        .chain(tracks.into_iter().map(|t| Suggestion::Track {
            artist: join_artist_names(&t.artists, Some(SEARCH_ARTIST_NAMES)),
            name: t.name,
            id: t.id,
        }))
        .collect();
    out.truncate(2 * query.limit as usize);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spotify::fake::{FakeSpotify, artist, track};
    use crate::types::spotify::SearchType;

    fn api(fake: FakeSpotify) -> Arc<dyn SpotifyApi> {
        Arc::new(fake)
    }

    #[tokio::test]
    async fn tracks_are_seeded_from_two_artists_and_one_track() {
        let fake = Arc::new(FakeSpotify {
            top_artists: vec![artist("a1", "Air"), artist("a2", "Björk"), artist("a3", "Can")],
            top_tracks: vec![track("t1", "Roygbiv", None), track("t2", "Olson", None)],
            recommended: vec![track("r1", "La Femme d'Argent", None)],
            ..FakeSpotify::default()
        });

        let recs = recommended_tracks(fake.clone(), "tok".into()).await.unwrap();
        assert_eq!(recs.message, None);
        assert_eq!(
            recs.tracks,
            vec![TrackSuggestion {
                name: "La Femme d'Argent".into(),
                artist: "La Femme d'Argent artist".into(),
                id: "r1".into(),
            }]
        );
        let seeds = fake.last_seeds.lock().unwrap().clone().unwrap();
        assert_eq!(seeds.artists, vec!["a1", "a2"]);
        assert_eq!(seeds.tracks, vec!["t1"]);
    }

    #[tokio::test]
    async fn empty_history_yields_message_instead_of_call() {
        let fake = Arc::new(FakeSpotify::default());
        let recs = recommended_tracks(fake.clone(), "tok".into()).await.unwrap();
        assert!(recs.tracks.is_empty());
        assert_eq!(recs.message.as_deref(), Some(NO_SEEDS_MESSAGE));
        assert!(fake.last_seeds.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn upstream_failure_propagates() {
        let err = top_artist_suggestions(
            api(FakeSpotify {
                fail_api: true,
                ..FakeSpotify::default()
            }),
            "tok".into(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::UpstreamStatus(_)));
    }

    #[tokio::test]
    async fn albums_are_deduplicated_and_named() {
        let fake = FakeSpotify {
            top_artists: vec![artist("a1", "Air")],
            top_tracks: vec![
                track("t1", "Kelly", Some(("al1", "Moon Safari"))),
                track("t2", "Sexy Boy", Some(("al1", "Moon Safari"))),
                track("t3", "Untitled", Some(("al2", ""))),
                track("t4", "Single", None),
            ],
            recommended: vec![
                track("r1", "Again", Some(("al2", "Ignored"))),
                track("r2", "New", Some(("al3", "Talkie Walkie"))),
            ],
            ..FakeSpotify::default()
        };

        let albums = album_suggestions(api(fake), "tok".into()).await.unwrap();
        let names: Vec<_> = albums.iter().map(|a| (a.id.as_str(), a.name.as_str())).collect();
        assert_eq!(
            names,
            vec![("al1", "Moon Safari"), ("al2", "Unknown"), ("al3", "Talkie Walkie")]
        );
        assert_eq!(albums[0].artist, "Kelly artist");
    }

    #[tokio::test]
    async fn albums_are_capped() {
        let tracks: Vec<_> = (0..40)
            .map(|i| {
                let album_id = format!("al{i}");
                track(&format!("t{i}"), "x", Some((album_id.as_str(), "y")))
            })
            .collect();
        let fake = Arc::new(FakeSpotify {
            top_tracks: tracks,
            ..FakeSpotify::default()
        });
        let albums = album_suggestions(fake.clone(), "tok".into()).await.unwrap();
        assert_eq!(albums.len(), 25);
        // already full, no recommendation request
        assert!(fake.last_seeds.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn search_output_is_truncated_to_twice_the_limit() {
        let fake = FakeSpotify {
            top_artists: (0..5).map(|i| artist(&format!("a{i}"), "A")).collect(),
            top_tracks: (0..5).map(|i| track(&format!("t{i}"), "T", None)).collect(),
            ..FakeSpotify::default()
        };
        let query = SearchQuery {
            q: "ra".into(),
            kind: SearchType::ArtistAndTrack,
            limit: 3,
        };
        let out = search_suggestions(api(fake), "tok".into(), query).await.unwrap();
        assert_eq!(out.len(), 6);
        assert!(matches!(out[5], Suggestion::Track { ref id, .. } if id == "t0"));
    }
}
