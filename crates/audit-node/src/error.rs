use audit_core::AuditError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// HTTP face of `AuditError`.
pub struct ApiError(pub AuditError);

impl From<AuditError> for ApiError {
    fn from(err: AuditError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AuditError::MissingField(_) | AuditError::ScoreOverflow(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AuditError::NothingToExport => StatusCode::NOT_FOUND,
            AuditError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
