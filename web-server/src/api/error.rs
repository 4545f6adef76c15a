// web-server/src/api/error.rs
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use common::{LoginError, SessionError};
use serde_json::json;
use thiserror::Error;

/// Errors surfaced by the `/api` handlers as JSON bodies
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            ApiError::BadRequest(msg) | ApiError::Unauthorized(msg) => msg.clone(),
            ApiError::Internal(msg) => {
                // Details stay in the logs
                tracing::error!(error = %msg, "Internal server error");
                "Internal server error".to_string()
            }
        };

        HttpResponse::build(self.status_code()).json(json!({
            "error": message
        }))
    }
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl From<LoginError> for ApiError {
    fn from(e: LoginError) -> Self {
        match e {
            LoginError::InvalidWalletAddress => ApiError::BadRequest(e.to_string()),
            LoginError::InvalidChallenge | LoginError::InvalidSignature => {
                ApiError::Unauthorized(e.to_string())
            }
            LoginError::Session(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let bad: ApiError = LoginError::InvalidWalletAddress.into();
        assert_eq!(bad.status_code(), StatusCode::BAD_REQUEST);

        let forged: ApiError = LoginError::InvalidSignature.into();
        assert_eq!(forged.status_code(), StatusCode::UNAUTHORIZED);
        let replayed: ApiError = LoginError::InvalidChallenge.into();
        assert_eq!(replayed.error_response().status(), StatusCode::UNAUTHORIZED);

        let internal: ApiError = SessionError::Store("header encoding".into()).into();
        assert_eq!(internal.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(internal.error_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
