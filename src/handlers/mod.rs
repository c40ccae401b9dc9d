pub mod auth;
pub mod rankings;
pub mod spotify;
