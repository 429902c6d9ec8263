//! doctor-questions/crates/dq-api/src/middleware.rs Middleware
//!
//! Access logging, CORS, and the bearer-token identity extractor.

use actix_cors::Cors;
use actix_web::dev::Payload;
use actix_web::http::{header, Method};
use actix_web::middleware::Logger;
use actix_web::{web, FromRequest, HttpRequest};
use dq_core::error::AppError;
use dq_core::models::Identity;
use futures_util::future::{ready, Ready};

use crate::error::ApiError;
use crate::handlers::AppState;

// Returns a standard set of middleware for the API.
pub fn standard_middleware() -> Logger {
    // We use the 'default' logger which outputs:
    // remote-ip "request-line" status-code response-size "referrer" "user-agent"
    Logger::default()
}

// Configures CORS (Cross-Origin Resource Sharing)
// The patient and doctor UIs are served from a different origin.
pub fn cors_policy() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allowed_methods(vec![Method::GET, Method::POST, Method::DELETE])
        .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(3600)
}

/// The authenticated caller of a request.
pub struct Caller(pub Identity);

impl FromRequest for Caller {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authenticate(req).map(Caller))
    }
}

fn authenticate(req: &HttpRequest) -> Result<Identity, ApiError> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| AppError::Internal("application state not configured".into()))?;

    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split_once(' '))
        // Auth schemes are case-insensitive.
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
        .map(|(_, token)| token.trim())
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Unauthorized("missing bearer token".into()))?;

    Ok(state.auth.verify_token(token)?)
}
