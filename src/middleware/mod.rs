pub mod payload;
pub mod session;

pub use payload::LenientJson;
pub use session::{BrowserAccount, CurrentAccount};
