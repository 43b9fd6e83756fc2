use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use propsearch_common::api::properties::ErrorBody;
use propsearch_common::PropSearchError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Search(#[from] PropSearchError),

    /// Query string or body could not be decoded.
    #[error("Invalid request: {0}")]
    BadRequest(String),
}

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::Search(err) => match err {
                PropSearchError::Configuration(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
                }
                PropSearchError::InvalidArgument(_) | PropSearchError::Validation(_) => {
                    (StatusCode::BAD_REQUEST, err.to_string())
                }
                PropSearchError::Upstream { status, body } => (
                    upstream_status(*status),
                    format!("Upstream API Error: {}", body),
                ),
                PropSearchError::Transport(_) => (StatusCode::BAD_GATEWAY, err.to_string()),
                PropSearchError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
            },
        }
    }
}

/// Pass the listing API's status through unless it is not an error status.
fn upstream_status(status: u16) -> StatusCode {
    match StatusCode::from_u16(status) {
        Ok(s) if s.is_client_error() || s.is_server_error() => s,
        _ => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %message, "Request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %message, "Request rejected");
        }
        metrics::counter!("api.errors", "status" => status.as_u16().to_string()).increment(1);

        let body = Json(ErrorBody {
            error: message,
            code: status.as_u16(),
        });

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: PropSearchError) -> StatusCode {
        ApiError::from(err).status_and_message().0
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_of(PropSearchError::Configuration("API_KEY".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(PropSearchError::invalid_argument("min_price", "must be an integer")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(PropSearchError::Transport("timed out".into())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(PropSearchError::NotFound("listing".into())),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_upstream_status_passthrough() {
        let (status, message) = ApiError::from(PropSearchError::Upstream {
            status: 404,
            body: "no such city".into(),
        })
        .status_and_message();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(message, "Upstream API Error: no such city");

        assert_eq!(
            status_of(PropSearchError::Upstream {
                status: 302,
                body: String::new()
            }),
            StatusCode::BAD_GATEWAY
        );
    }
}
