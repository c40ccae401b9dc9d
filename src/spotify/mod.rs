//! Spotify integration: OAuth endpoints, per-account token guard, the shared
//! app-level token, and the units of work behind the recommendation routes.

pub mod credentials;
pub mod endpoints;
pub mod recommend;
pub mod service;

#[cfg(test)]
pub(crate) mod fake;

pub use credentials::{TokenGrant, TokenState, UserAccess};
pub use endpoints::{HttpSpotifyApi, SpotifyApi};
pub use service::SpotifyService;
