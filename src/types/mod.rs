pub mod ranking;
pub mod spotify;
