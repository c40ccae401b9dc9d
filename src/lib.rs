pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod service;
pub mod spotify;
pub mod types;

pub use error::AppError;
pub use router::{AppState, app_router};
pub use spotify::SpotifyService;
