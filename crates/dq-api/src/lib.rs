//! # dq-api
//!
//! The web routing layer for the doctor-questions engine.

pub mod error;
pub mod handlers;
pub mod middleware;

use actix_web::web;

/// Configures the routes for the question channel.
///
/// # Developer Note
/// We use a scoped configuration to allow the main binary to mount
/// the API under different paths if needed (e.g., /api/v1/).
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("")
            // Directory of doctors a patient can address
            .route("/doctors", web::get().to(handlers::list_doctors))
            // Attachment upload, returns an opaque reference
            .route("/attachments", web::post().to(handlers::upload_attachment))
            // Patient's own questions
            .route("/my-questions", web::get().to(handlers::my_questions))
            .service(
                web::resource("/questions")
                    .route(web::get().to(handlers::assigned_questions))
                    .route(web::post().to(handlers::create_question)),
            )
            .service(
                web::resource("/questions/{id}")
                    .route(web::get().to(handlers::get_question))
                    .route(web::delete().to(handlers::delete_question)),
            )
            .service(
                web::resource("/questions/{id}/messages")
                    .route(web::get().to(handlers::get_messages))
                    .route(web::post().to(handlers::post_message)),
            )
            .route("/questions/{id}/close", web::post().to(handlers::close_question)),
    );
}
