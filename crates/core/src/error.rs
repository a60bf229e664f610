use axum::extract::multipart::MultipartRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures of the upload-and-relay pipeline
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("{0}")]
    Validation(String),

    #[error("Failed to parse upload: {0}")]
    Parse(String),

    #[error("Upload too large: {0}")]
    TooLarge(String),

    #[error("Failed to store upload: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Relay request failed: {0}")]
    Relay(String),
}

impl UploadError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            UploadError::Validation(_) => StatusCode::BAD_REQUEST,
            UploadError::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            UploadError::Parse(_) | UploadError::Storage(_) | UploadError::Relay(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<MultipartRejection> for UploadError {
    fn from(rejection: MultipartRejection) -> Self {
        UploadError::Parse(rejection.body_text())
    }
}

impl From<reqwest::Error> for UploadError {
    fn from(error: reqwest::Error) -> Self {
        UploadError::Relay(error.to_string())
    }
}

/// Error message attached to failed responses for request logging
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let mut response = (
            self.status_code(),
            Json(ErrorResponse {
                error: message.clone(),
            }),
        )
            .into_response();
        response.extensions_mut().insert(ErrorDetail(message));
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            UploadError::Validation("keywords are required".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            UploadError::Parse("bad body".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            UploadError::TooLarge("limit exceeded".into()).status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            UploadError::Storage(std::io::Error::other("disk full")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            UploadError::Relay("connection refused".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_validation_message_is_verbatim() {
        let err = UploadError::Validation("no files were uploaded".into());
        assert_eq!(err.to_string(), "no files were uploaded");
    }

    #[tokio::test]
    async fn test_into_response_body() {
        let response = UploadError::Relay("relay returned a non-JSON body".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.extensions().get::<ErrorDetail>().unwrap().0,
            "Relay request failed: relay returned a non-JSON body"
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            body.error,
            "Relay request failed: relay returned a non-JSON body"
        );
    }
}
