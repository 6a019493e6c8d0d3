//! Domain error to HTTP response mapping.

use crate::models::ErrorResponse;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use invite_core::InviteError;

pub struct ApiError(pub InviteError);

impl From<InviteError> for ApiError {
    fn from(e: InviteError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            InviteError::Validation(_) | InviteError::LengthExceeded { .. } => {
                (StatusCode::BAD_REQUEST, "validation")
            }
            InviteError::NoRecipients => (StatusCode::BAD_REQUEST, "no_recipients"),
            InviteError::DuplicateEmail(_) => (StatusCode::CONFLICT, "duplicate_email"),
            InviteError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            InviteError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            InviteError::SignatureInvalid => (StatusCode::UNAUTHORIZED, "signature_invalid"),
            InviteError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "configuration"),
            InviteError::Provider(_) => (StatusCode::BAD_GATEWAY, "provider"),
            InviteError::Serialization(_)
            | InviteError::Io(_)
            | InviteError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };

        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        }

        (
            status,
            Json(ErrorResponse {
                error: code.to_string(),
                message: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(e: InviteError) -> StatusCode {
        ApiError(e).into_response().status()
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(
            status_of(InviteError::Validation("bad".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_of(InviteError::NoRecipients), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(InviteError::LengthExceeded {
                limit: 500,
                actual: 501
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(InviteError::DuplicateEmail("a@x.edu".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(InviteError::NotFound("campaign".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(InviteError::SignatureInvalid),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(InviteError::Provider("down".into())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(InviteError::Config("missing".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
