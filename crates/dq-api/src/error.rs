//! Maps engine failures onto HTTP responses.

use std::fmt;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use dq_core::error::AppError;
use serde_json::json;

#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self.0 {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_, _) => StatusCode::NOT_FOUND,
            AppError::ThreadClosed(_) | AppError::InvalidTransition { .. } => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let (kind, message) = match &self.0 {
            AppError::ValidationError(_) => ("validation_error", self.0.to_string()),
            AppError::Unauthorized(_) => ("unauthorized", self.0.to_string()),
            AppError::Forbidden(_) => ("forbidden", self.0.to_string()),
            AppError::NotFound(_, _) => ("not_found", self.0.to_string()),
            AppError::ThreadClosed(_) => ("thread_closed", self.0.to_string()),
            AppError::InvalidTransition { .. } => ("invalid_transition", self.0.to_string()),
            AppError::Internal(detail) => {
                log::error!("request failed: {detail}");
                ("internal", "internal service error".to_string())
            }
        };
        HttpResponse::build(self.status_code()).json(json!({ "error": kind, "message": message }))
    }
}
