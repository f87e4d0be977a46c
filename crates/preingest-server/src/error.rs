use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use preingest_core::error::PreingestError;

// ---------------------------------------------------------------------------
// Internal sentinel for explicit 400 Bad Request errors
// ---------------------------------------------------------------------------

/// Carries an explicit HTTP 400 through the `anyhow::Error` chain for request
/// problems that have no `PreingestError` counterpart.
#[derive(Debug)]
struct BadRequestError(String);

impl std::fmt::Display for BadRequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for BadRequestError {}

// ---------------------------------------------------------------------------
// AppError
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(BadRequestError(msg.into()).into())
    }

    fn status(&self) -> StatusCode {
        if self.0.downcast_ref::<BadRequestError>().is_some() {
            return StatusCode::BAD_REQUEST;
        }
        let Some(e) = self.0.downcast_ref::<PreingestError>() else {
            return StatusCode::INTERNAL_SERVER_ERROR;
        };
        match e {
            PreingestError::CollectionNotFound(_)
            | PreingestError::TargetNotFound(_)
            | PreingestError::ActionNotFound(_) => StatusCode::NOT_FOUND,
            PreingestError::InvalidCollectionName(_)
            | PreingestError::InvalidSettings(_)
            | PreingestError::UnencodablePath(_) => StatusCode::BAD_REQUEST,
            PreingestError::StepAlreadyExecuted(_) => StatusCode::CONFLICT,
            PreingestError::FixityService(_) | PreingestError::Http(_) => StatusCode::BAD_GATEWAY,
            PreingestError::SettingsNotFound(_)
            | PreingestError::Store(_)
            | PreingestError::Sqlite(_)
            | PreingestError::Io(_)
            | PreingestError::Yaml(_)
            | PreingestError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %format!("{:#}", self.0), "request failed");
        }
        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
