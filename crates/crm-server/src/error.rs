//! Mapping of service errors onto HTTP responses.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use crm_core::error::CrmError;
use crm_core::validation::NON_FIELD_ERRORS;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Crm(#[from] CrmError),

    #[error(transparent)]
    Body(#[from] JsonRejection),

    #[error(transparent)]
    Query(#[from] QueryRejection),

    #[error(transparent)]
    Path(#[from] PathRejection),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Crm(e) => crm_error_body(e),
            ApiError::Body(rejection) => {
                warn!(error = %rejection, "Rejected request body");
                (
                    StatusCode::BAD_REQUEST,
                    json!({ NON_FIELD_ERRORS: [rejection.body_text()] }),
                )
            }
            ApiError::Query(rejection) => (
                StatusCode::BAD_REQUEST,
                json!({ NON_FIELD_ERRORS: [rejection.body_text()] }),
            ),
            // Always 400, whatever status the rejection itself carries.
            ApiError::Path(rejection) => (
                StatusCode::BAD_REQUEST,
                json!({ NON_FIELD_ERRORS: [rejection.body_text()] }),
            ),
        };
        (status, Json(body)).into_response()
    }
}

fn crm_error_body(e: CrmError) -> (StatusCode, serde_json::Value) {
    match e {
        CrmError::Validation { field, message } => {
            (StatusCode::BAD_REQUEST, json!({ field: [message] }))
        }
        CrmError::Conflict { cause } => (StatusCode::BAD_REQUEST, json!({ "cause": cause })),
        CrmError::AuthenticationRequired => (
            StatusCode::FORBIDDEN,
            json!({ "detail": CrmError::AuthenticationRequired.to_string() }),
        ),
        CrmError::AuthorizationDenied { reason } => {
            (StatusCode::FORBIDDEN, json!({ "detail": reason }))
        }
        CrmError::NotFound { .. } => (StatusCode::NOT_FOUND, json!({ "detail": "Not found." })),
        other => {
            error!(error = %other, "Request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "detail": "Internal server error" }),
            )
        }
    }
}
