//! # dq-api Handlers
//!
//! This module coordinates the flow between HTTP requests and the engine.
//! Handlers only translate; every rule lives in `dq_core::MessagingEngine`.

use std::sync::Arc;

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use dq_core::error::AppError;
use dq_core::models::{NewMessage, NewThread};
use dq_core::traits::{AttachmentStore, IdentityProvider};
use dq_core::MessagingEngine;
use futures_util::TryStreamExt;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::Caller;

/// State shared across all Actix-web workers.
pub struct AppState {
    pub engine: Arc<MessagingEngine>,
    pub store: Box<dyn AttachmentStore>,
    pub auth: Box<dyn IdentityProvider>,
    pub max_upload_bytes: usize,
}

type ApiResult = Result<HttpResponse, ApiError>;

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    pub since: Option<Uuid>,
}

/// CreateThread (patient).
pub async fn create_question(
    data: web::Data<AppState>,
    caller: Caller,
    body: web::Json<NewThread>,
) -> ApiResult {
    let thread = data.engine.create_thread(&caller.0, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(json!({
        "question_id": thread.id,
        "status": thread.status,
    })))
}

/// ListMyThreads (patient).
pub async fn my_questions(data: web::Data<AppState>, caller: Caller) -> ApiResult {
    let threads = data.engine.list_my_threads(&caller.0).await?;
    Ok(HttpResponse::Ok().json(threads))
}

/// ListAssignedThreads (doctor). Clients partition by status themselves.
pub async fn assigned_questions(data: web::Data<AppState>, caller: Caller) -> ApiResult {
    let threads = data.engine.list_assigned_threads(&caller.0).await?;
    Ok(HttpResponse::Ok().json(threads))
}

pub async fn get_question(
    data: web::Data<AppState>,
    caller: Caller,
    path: web::Path<Uuid>,
) -> ApiResult {
    let thread = data.engine.get_thread(&caller.0, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(thread))
}

/// GetThreadMessages, optionally `?since=<message_id>`.
pub async fn get_messages(
    data: web::Data<AppState>,
    caller: Caller,
    path: web::Path<Uuid>,
    query: web::Query<MessagesQuery>,
) -> ApiResult {
    let messages = data
        .engine
        .get_thread_messages(&caller.0, path.into_inner(), query.since)
        .await?;
    Ok(HttpResponse::Ok().json(messages))
}

/// AppendMessage (patient or doctor).
pub async fn post_message(
    data: web::Data<AppState>,
    caller: Caller,
    path: web::Path<Uuid>,
    body: web::Json<NewMessage>,
) -> ApiResult {
    let outcome = data
        .engine
        .append_message(&caller.0, path.into_inner(), body.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(json!({
        "message_id": outcome.message.id,
        "status": outcome.status,
    })))
}

/// CloseThread (assigned doctor).
pub async fn close_question(
    data: web::Data<AppState>,
    caller: Caller,
    path: web::Path<Uuid>,
) -> ApiResult {
    let thread = data.engine.close_thread(&caller.0, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(thread))
}

/// DeleteThread (owning patient).
pub async fn delete_question(
    data: web::Data<AppState>,
    caller: Caller,
    path: web::Path<Uuid>,
) -> ApiResult {
    data.engine.delete_thread(&caller.0, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// ListDoctors: open to anyone.
pub async fn list_doctors(data: web::Data<AppState>) -> ApiResult {
    let doctors = data.engine.list_doctors().await?;
    Ok(HttpResponse::Ok().json(doctors))
}

/// Stores the first file part of a multipart upload and returns the
/// reference to pass to CreateThread/AppendMessage.
pub async fn upload_attachment(
    data: web::Data<AppState>,
    _caller: Caller,
    mut payload: Multipart,
) -> ApiResult {
    let malformed = |e: actix_multipart::MultipartError| {
        ApiError(AppError::ValidationError(format!("malformed upload: {e}")))
    };

    while let Some(mut field) = payload.try_next().await.map_err(malformed)? {
        let file_name = match field.content_disposition().get_filename() {
            Some(name) => name.to_string(),
            // Plain form fields are ignored.
            None => continue,
        };

        let mut bytes = Vec::new();
        while let Some(chunk) = field.try_next().await.map_err(malformed)? {
            if bytes.len() + chunk.len() > data.max_upload_bytes {
                return Err(AppError::ValidationError(format!(
                    "attachment exceeds {} bytes",
                    data.max_upload_bytes
                ))
                .into());
            }
            bytes.extend_from_slice(&chunk);
        }

        let attachment_ref = data.store.save_upload(bytes, &file_name).await?;
        return Ok(HttpResponse::Created().json(json!({ "attachment_ref": attachment_ref })));
    }

    Err(AppError::ValidationError("no file in upload".into()).into())
}
