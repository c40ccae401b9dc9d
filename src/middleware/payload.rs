use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;
use tracing::debug;

/// JSON body that never rejects: a missing, empty or malformed body
/// deserializes as `T::default()` so handlers report their own validation
/// errors.
#[derive(Debug, Clone, Default)]
pub struct LenientJson<T>(pub T);

impl<S, T> FromRequest<S> for LenientJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Default,
{
    type Rejection = std::convert::Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = match Bytes::from_request(req, state).await {
            Ok(b) => b,
            Err(e) => {
                debug!(error = %e, "request body unreadable; treating as empty");
                return Ok(LenientJson(T::default()));
            }
        };
        Ok(LenientJson(parse_lenient(&body)))
    }
}

fn parse_lenient<T: DeserializeOwned + Default>(body: &[u8]) -> T {
    if body.iter().all(u8::is_ascii_whitespace) {
        return T::default();
    }
    serde_json::from_slice(body).unwrap_or_else(|e| {
        debug!(error = %e, "malformed json body; treating as empty");
        T::default()
    })
}
