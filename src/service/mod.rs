pub mod bounded;
pub mod clock;
pub mod password;
