use axum::{Json, http::StatusCode, response::IntoResponse};
use oauth2::basic::BasicErrorResponseType;
use oauth2::reqwest::Error as ReqwestClientError;
use oauth2::{HttpClientError, RequestTokenError, StandardErrorResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;
use tracing::error;

#[derive(Debug, ThisError)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Duplicate(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("OAuth2 token request error: {0}")]
    Oauth2Token(String),

    #[error("OAuth2 server error: {error}")]
    Oauth2Server { error: String },

    #[error("Upstream error with status: {0}")]
    UpstreamStatus(StatusCode),

    #[error("Database error: {0}")]
    Database(#[from] SqlxError),

    #[error("External call failed: {0}")]
    ExternalFailure(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl
    From<
        RequestTokenError<
            HttpClientError<ReqwestClientError>,
            StandardErrorResponse<BasicErrorResponseType>,
        >,
    > for AppError
{
    fn from(
        e: RequestTokenError<
            HttpClientError<ReqwestClientError>,
            StandardErrorResponse<BasicErrorResponseType>,
        >,
    ) -> Self {
        match e {
            RequestTokenError::ServerResponse(err) => AppError::Oauth2Server {
                error: err.error().to_string(),
            },
            RequestTokenError::Request(req_e) => {
                AppError::Oauth2Token(format!("request failed: {}", req_e))
            }
            RequestTokenError::Parse(parse_err, _body) => AppError::Json(parse_err.into_inner()),
            RequestTokenError::Other(s) => AppError::Oauth2Token(s),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Duplicate(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Reqwest(_)
            | AppError::UrlParse(_)
            | AppError::Oauth2Token(_)
            | AppError::Oauth2Server { .. }
            | AppError::UpstreamStatus(_)
            | AppError::ExternalFailure(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Json(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let message = match &self {
            AppError::Validation(msg)
            | AppError::Duplicate(msg)
            | AppError::NotFound(msg)
            | AppError::Unauthorized(msg)
            | AppError::ServiceUnavailable(msg) => msg.clone(),
            _ if status == StatusCode::INTERNAL_SERVER_ERROR => {
                error!(error = %self, "request failed");
                "An internal server error occurred.".to_string()
            }
            _ => {
                error!(error = %self, "upstream request failed");
                "Upstream service is unavailable.".to_string()
            }
        };
        (status, Json(ApiErrorBody { error: message })).into_response()
    }
}

/// Error body returned by every JSON endpoint: `{"error": "..."}`.
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub error: String,
}
