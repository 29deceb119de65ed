//! api error handling for http handlers

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use chronicle_types::format_created;
use serde::Serialize;
use tracing::{error, warn};

use crate::{Error, VERSION};

/// api error type for handler responses
#[derive(Debug)]
pub enum ApiError {
    /// malformed request (400)
    BadRequest(String),
    /// unknown or unauthenticated client (401)
    Unauthorized(String),
    /// signature, replay or privilege check failed (403)
    Forbidden(String),
    /// not found error (404)
    NotFound(String),
    /// internal server error (500)
    Internal(String),
}

impl ApiError {
    /// create internal server error from any error type
    pub fn internal(e: impl std::fmt::Display) -> Self {
        Self::Internal(e.to_string())
    }

    /// create bad request error
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    /// create unauthorized error
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    /// create forbidden error
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    /// create not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// http status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        match e {
            Error::SecurityViolation(msg) => {
                warn!(reason = %msg, "rejected request");
                ApiError::Forbidden(msg)
            }
            Error::SourceNotFound(_) | Error::TargetNotFound(_) => {
                ApiError::NotFound(e.to_string())
            }
            other => {
                error!(error = %other, "request failed");
                ApiError::Internal(other.to_string())
            }
        }
    }
}

/// error envelope, signed like any other response body
#[derive(Serialize)]
struct ErrorBody {
    version: &'static str,
    datetime: String,
    status: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg) => msg,
            // storage details stay in the log
            ApiError::Internal(_) => "internal server error".to_string(),
        };
        let body = ErrorBody {
            version: VERSION,
            datetime: format_created(Utc::now()),
            status: "ERROR",
            message,
        };
        (status, Json(body)).into_response()
    }
}

/// extension trait for converting results to apierror
pub trait ResultExt<T> {
    /// convert error to internal server error
    fn map_internal(self) -> Result<T, ApiError>;
    /// convert error to bad request
    fn map_bad_request(self) -> Result<T, ApiError>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    fn map_internal(self) -> Result<T, ApiError> {
        self.map_err(ApiError::internal)
    }

    fn map_bad_request(self) -> Result<T, ApiError> {
        self.map_err(|e| ApiError::bad_request(e.to_string()))
    }
}

/// extension trait for converting options to apierror
pub trait OptionExt<T> {
    /// convert none to unauthorized error
    fn or_unauthorized(self, msg: &str) -> Result<T, ApiError>;
    /// convert none to not found error
    fn or_not_found(self, msg: &str) -> Result<T, ApiError>;
}

impl<T> OptionExt<T> for Option<T> {
    fn or_unauthorized(self, msg: &str) -> Result<T, ApiError> {
        self.ok_or_else(|| ApiError::unauthorized(msg))
    }

    fn or_not_found(self, msg: &str) -> Result<T, ApiError> {
        self.ok_or_else(|| ApiError::not_found(msg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_errors_map_to_status() {
        let forbidden: ApiError = Error::SecurityViolation("bad".into()).into();
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

        let missing: ApiError = Error::SourceNotFound("x".into()).into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let failed: ApiError = Error::ChainAppendFailure("x".into()).into();
        assert_eq!(failed.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn internal_details_are_not_sent() {
        let response = ApiError::internal("database is locked").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ERROR");
        assert_eq!(json["message"], "internal server error");
    }
}
