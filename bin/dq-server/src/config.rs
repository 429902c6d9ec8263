//! Runtime settings, read from the environment (a `.env` file is honoured).

use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context};

pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub upload_dir: PathBuf,
    pub upload_url_prefix: String,
    pub token_secret: String,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let token_secret = env::var("DQ_TOKEN_SECRET").unwrap_or_default();
        if token_secret.trim().is_empty() {
            bail!("DQ_TOKEN_SECRET must be set");
        }

        Ok(Self {
            database_url: var_or("DQ_DATABASE_URL", "sqlite:doctor_questions.db"),
            bind_addr: var_or("DQ_BIND_ADDR", "127.0.0.1:8080"),
            upload_dir: var_or("DQ_UPLOAD_DIR", "./data/uploads").into(),
            upload_url_prefix: var_or("DQ_UPLOAD_URL_PREFIX", "/static/uploads"),
            token_secret,
            max_upload_bytes: parsed("DQ_MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
        })
    }
}

pub fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn parsed<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().with_context(|| format!("invalid {key}: {raw}")),
        Err(_) => Ok(default),
    }
}
