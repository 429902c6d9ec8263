//! # AppError
//!
//! Centralized error handling for the doctor-questions engine.
//! Every failure leaves stored state untouched; callers may retry reads freely.

use thiserror::Error;
use uuid::Uuid;

use crate::models::ThreadStatus;

/// The primary error type for all dq-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed or empty required fields, rejected before any write
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Resource not found (e.g., Thread, Doctor)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Role or ownership mismatch
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Missing, malformed or expired credentials
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Write attempted on a terminal thread
    #[error("thread {0} is closed")]
    ThreadClosed(Uuid),

    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition { from: ThreadStatus, to: ThreadStatus },

    /// Infrastructure failure (e.g., DB down, disk full)
    #[error("internal service error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn thread_not_found(id: Uuid) -> Self {
        AppError::NotFound("Thread".to_string(), id.to_string())
    }

    pub fn doctor_not_found(id: Uuid) -> Self {
        AppError::NotFound("Doctor".to_string(), id.to_string())
    }
}

/// A specialized Result type for doctor-questions logic.
pub type Result<T> = std::result::Result<T, AppError>;
