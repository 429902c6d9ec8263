//! doctor-questions/crates/dq-core/src/lib.rs
//!
//! The central domain logic and interface definitions for the
//! patient-to-doctor question channel.

pub mod models;
pub mod traits;
pub mod error;
pub mod status;
pub mod locks;
pub mod engine;
pub mod sync;

// Re-exporting for easier access in other crates
pub use models::*;
pub use traits::*;
pub use error::*;
pub use engine::MessagingEngine;
