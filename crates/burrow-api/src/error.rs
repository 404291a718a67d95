use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use tracing::error;

/// Request-level failure taxonomy. Denied outcomes (`Unauthorized`,
/// `LoginRequired`, `Forbidden`) are normal control flow; only `Storage`
/// is logged as an error.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    /// No identity where one is required; vote endpoints surface this as a
    /// hard 401.
    #[error("unauthorized")]
    Unauthorized,

    /// No identity on a mutation endpoint; the caller is sent to the login
    /// page instead of receiving an error.
    #[error("login required")]
    LoginRequired,

    /// Ownership mismatch, deliberately conflated with absence so callers
    /// cannot probe for the existence of rows they do not own.
    #[error("forbidden")]
    Forbidden,

    #[error("not found")]
    NotFound,

    /// Duplicate signup identity, reported generically without naming the
    /// colliding field.
    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl ApiError {
    /// A blocking task that failed to join is a server fault, not a caller
    /// mistake.
    pub fn join(err: tokio::task::JoinError) -> Self {
        ApiError::Storage(anyhow::anyhow!("blocking task failed: {err}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            ApiError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "you must be logged in").into_response()
            }
            ApiError::LoginRequired => Redirect::to("/login").into_response(),
            ApiError::Forbidden => {
                (StatusCode::FORBIDDEN, "not found or not yours").into_response()
            }
            ApiError::NotFound => (StatusCode::NOT_FOUND, "not found").into_response(),
            ApiError::Conflict(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            ApiError::Storage(err) => {
                error!("storage error: {err:#}");
                (StatusCode::INTERNAL_SERVER_ERROR, "server error").into_response()
            }
        }
    }
}
