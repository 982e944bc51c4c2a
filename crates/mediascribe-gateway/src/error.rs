//! HTTP error mapping.

use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use mediascribe_media::{ConvertError, ProviderError};
use mediascribe_types::ErrorResponse;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("missing multipart field '{0}'")]
    MissingField(&'static str),
    #[error("invalid multipart body: {0}")]
    Multipart(#[from] MultipartError),
    #[error(transparent)]
    Convert(#[from] ConvertError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingField(_) => StatusCode::BAD_REQUEST,
            ApiError::Multipart(e) => e.status(),
            ApiError::Convert(ConvertError::Staging(_))
            | ApiError::Convert(ConvertError::Provider(ProviderError::Io(_))) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Convert(ConvertError::Provider(ProviderError::Timeout(_))) => {
                StatusCode::GATEWAY_TIMEOUT
            }
            ApiError::Convert(ConvertError::Provider(_)) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = %status, error = %self, "Request failed");
        } else {
            tracing::warn!(status = %status, error = %self, "Request rejected");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::MissingField("image").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Convert(ConvertError::Staging(std::io::Error::other("disk full"))).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::Convert(ProviderError::Timeout(Duration::from_secs(1)).into()).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            ApiError::Convert(
                ProviderError::Api {
                    status: 429,
                    message: "quota".into()
                }
                .into()
            )
            .status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::Convert(ProviderError::Io(std::io::Error::other("unreadable")).into())
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_staging_error_hides_detail() {
        let err = ApiError::Convert(ConvertError::Staging(std::io::Error::other(
            "File name too long at path \"/tmp/mediascribe-x\"",
        )));
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.error, "failed to stage upload");
    }

    #[test]
    fn test_missing_field_message() {
        assert_eq!(
            ApiError::MissingField("video").to_string(),
            "missing multipart field 'video'"
        );
    }
}
