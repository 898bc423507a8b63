use crate::application::QuotaError;
use crate::infrastructure::RepositoryError;
use axum::http::StatusCode;

pub(super) fn map_quota_error(err: &QuotaError) -> (StatusCode, serde_json::Value) {
    match err {
        QuotaError::Denied { resource, reason } => (
            StatusCode::PAYMENT_REQUIRED,
            serde_json::json!({
                "error": "Quota exceeded",
                "resource": resource,
                "reason": reason
            }),
        ),
        QuotaError::Repository(RepositoryError::NotFound(_)) => (
            StatusCode::NOT_FOUND,
            serde_json::json!({ "error": "Employer not found" }),
        ),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            serde_json::json!({ "error": "Quota lookup failed" }),
        ),
    }
}

pub(super) fn map_create_employer_error(err: &RepositoryError) -> (StatusCode, serde_json::Value) {
    match err {
        RepositoryError::Conflict(_) => (
            StatusCode::CONFLICT,
            serde_json::json!({ "error": "Employer already exists" }),
        ),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            serde_json::json!({ "error": "Failed to create employer" }),
        ),
    }
}
