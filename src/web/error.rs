//! Error responses of the download endpoint.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::FastlaneError;

/// Machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// No share with this id (404).
    NotFound,
    /// The share existed but has expired (410).
    Gone,
    /// Internal server error (500).
    InternalError,
}

impl ErrorCode {
    /// HTTP status for this code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Gone => StatusCode::GONE,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON body: `{"error": {"code": ..., "message": ..., "id": ...}}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: ErrorCode,
    pub message: String,
    /// Share the request was about, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Error returned by handlers.
#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    message: String,
    share_id: Option<String>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            share_id: None,
        }
    }

    /// 404 for an unknown share.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// 410 for an expired share.
    pub fn gone(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Gone, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Attach the id of the share the request named.
    pub fn for_share(mut self, id: impl Into<String>) -> Self {
        self.share_id = Some(id.into());
        self
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn share_id(&self) -> Option<&str> {
        self.share_id.as_deref()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status_code();
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
                id: self.share_id,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.share_id {
            Some(id) => write!(f, "{:?} ({}): {}", self.code, id, self.message),
            None => write!(f, "{:?}: {}", self.code, self.message),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<FastlaneError> for ApiError {
    fn from(err: FastlaneError) -> Self {
        match err {
            FastlaneError::NotFound(id) => ApiError::not_found("File not found").for_share(id),
            FastlaneError::Expired(id) => {
                tracing::debug!(%id, "Refused expired share");
                ApiError::gone("File expired").for_share(id)
            }
            FastlaneError::BlobMissing(id) => {
                tracing::error!(%id, "Blob missing for a live share");
                ApiError::internal("File content unavailable").for_share(id)
            }
            other => {
                tracing::error!("Internal error: {}", other);
                ApiError::internal("An internal error occurred")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_status() {
        assert_eq!(ErrorCode::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::Gone.status_code(), StatusCode::GONE);
        assert_eq!(
            ErrorCode::InternalError.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_from_fastlane_error() {
        let err: ApiError = FastlaneError::NotFound("abc".into()).into();
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(err.share_id(), Some("abc"));

        let err: ApiError = FastlaneError::Expired("abc".into()).into();
        assert_eq!(err.code(), ErrorCode::Gone);
        assert_eq!(err.message(), "File expired");

        let err: ApiError = FastlaneError::BlobMissing("abc".into()).into();
        assert_eq!(err.code(), ErrorCode::InternalError);
        assert_eq!(err.message(), "File content unavailable");

        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        let err: ApiError = FastlaneError::Io(io).into();
        assert_eq!(err.code(), ErrorCode::InternalError);
        assert_eq!(err.message(), "An internal error occurred");
        assert_eq!(err.share_id(), None);
    }

    #[test]
    fn test_error_body_serialization() {
        let body = ErrorBody {
            error: ErrorDetail {
                code: ErrorCode::Gone,
                message: "File expired".to_string(),
                id: Some("abc".to_string()),
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"]["code"], "GONE");
        assert_eq!(json["error"]["message"], "File expired");
        assert_eq!(json["error"]["id"], "abc");

        let body = ErrorBody {
            error: ErrorDetail {
                code: ErrorCode::NotFound,
                message: "File not found".to_string(),
                id: None,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json["error"].get("id").is_none());
    }

    #[test]
    fn test_display() {
        let err = ApiError::gone("File expired").for_share("abc");
        assert_eq!(err.to_string(), "Gone (abc): File expired");
    }
}
