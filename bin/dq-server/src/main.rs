//! # dq-server Binary
//!
//! The entry point that assembles the application based on compile-time features.

mod config;

use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use dq_api::handlers::AppState;
use dq_api::middleware::{cors_policy, standard_middleware};
use dq_core::MessagingEngine;

#[cfg(feature = "db-sqlite")]
use dq_db_sqlite::SqliteQuestionRepo;

#[cfg(feature = "storage-local")]
use dq_storage_local::LocalAttachmentStore;

#[cfg(feature = "auth-simple")]
use dq_auth_simple::SimpleAuthProvider;

use config::Config;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let cfg = Config::from_env()?;

    // 1. Initialize Database Implementation
    #[cfg(feature = "db-sqlite")]
    let repo = Arc::new(SqliteQuestionRepo::new(&cfg.database_url).await?);

    // 2. Initialize Storage Implementation
    #[cfg(feature = "storage-local")]
    let store = LocalAttachmentStore::new(
        cfg.upload_dir.clone(),
        cfg.upload_url_prefix.clone(),
        cfg.max_upload_bytes,
    );

    // 3. Initialize Auth Implementation
    #[cfg(feature = "auth-simple")]
    let auth = SimpleAuthProvider::new(&cfg.token_secret);

    let engine = MessagingEngine::new(repo.clone(), repo.clone(), repo);

    let state = web::Data::new(AppState {
        engine: Arc::new(engine),
        store: Box::new(store),
        auth: Box::new(auth),
        max_upload_bytes: cfg.max_upload_bytes,
    });

    tokio::fs::create_dir_all(&cfg.upload_dir).await?;
    let upload_dir = cfg.upload_dir.clone();
    let upload_prefix = cfg.upload_url_prefix.clone();

    log::info!("doctor-questions starting on http://{}", cfg.bind_addr);

    HttpServer::new(move || {
        App::new()
            .wrap(standard_middleware())
            .wrap(cors_policy())
            .app_data(state.clone())
            .service(actix_files::Files::new(&upload_prefix, &upload_dir))
            .configure(dq_api::configure_routes)
    })
    .bind(&cfg.bind_addr)?
    .run()
    .await?;

    Ok(())
}
