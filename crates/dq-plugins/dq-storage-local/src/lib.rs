//! # dq-storage-local
//! doctor-questions/crates/dq-plugins/dq-storage-local/src/lib.rs
//! Local filesystem implementation of `AttachmentStore`.
//! Features: Content-addressable storage and directory sharding.

use async_trait::async_trait;
use dq_core::error::{AppError, Result};
use dq_core::traits::AttachmentStore;
use log::debug;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

pub struct LocalAttachmentStore {
    /// Root directory for all uploads (e.g., "./data/uploads")
    root_path: PathBuf,
    /// Public URL prefix (e.g., "/static/uploads")
    url_prefix: String,
    /// Uploads larger than this are rejected
    max_bytes: usize,
}

impl LocalAttachmentStore {
    pub fn new(root: PathBuf, url_prefix: String, max_bytes: usize) -> Self {
        Self {
            root_path: root,
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
            max_bytes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root_path
    }

    /// Generates a sharded path: "ab/cd/abcd...hash.ext"
    fn get_sharded_path(&self, stored_name: &str) -> PathBuf {
        let mut path = self.root_path.clone();
        path.push(&stored_name[0..2]);
        path.push(&stored_name[2..4]);
        path.push(stored_name);
        path
    }

    fn get_url(&self, stored_name: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.url_prefix,
            &stored_name[0..2],
            &stored_name[2..4],
            stored_name
        )
    }
}

/// Keeps a short alphanumeric extension so downloads open with the right
/// application. Anything else is dropped.
fn safe_extension(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    let valid = !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then_some(ext)
}

fn io(e: std::io::Error) -> AppError {
    AppError::Internal(format!("attachment storage: {e}"))
}

#[async_trait]
impl AttachmentStore for LocalAttachmentStore {
    /// Saves an upload using its SHA-256 hash as the filename.
    /// This automatically deduplicates files.
    async fn save_upload(&self, data: Vec<u8>, file_name: &str) -> Result<String> {
        if data.is_empty() {
            return Err(AppError::ValidationError("attachment is empty".into()));
        }
        if data.len() > self.max_bytes {
            return Err(AppError::ValidationError(format!(
                "attachment exceeds {} bytes",
                self.max_bytes
            )));
        }

        // 1. Calculate Hash
        let mut hasher = Sha256::new();
        hasher.update(&data);
        let hash = hex::encode(hasher.finalize());
        let stored_name = match safe_extension(file_name) {
            Some(ext) => format!("{hash}.{ext}"),
            None => hash,
        };

        let target_path = self.get_sharded_path(&stored_name);

        // 2. Ensure directory exists
        if let Some(parent) = target_path.parent() {
            fs::create_dir_all(parent).await.map_err(io)?;
        }

        // 3. Save Original (if not exists)
        if fs::try_exists(&target_path).await.map_err(io)? {
            debug!("attachment {stored_name} already stored");
        } else {
            // Write beside the target, then rename, so readers never see a partial file.
            // Each writer gets its own temp file; identical uploads may race here.
            let tmp_path =
                target_path.with_file_name(format!("{stored_name}.{}.part", Uuid::new_v4()));
            fs::write(&tmp_path, &data).await.map_err(io)?;
            if let Err(e) = fs::rename(&tmp_path, &target_path).await {
                let _ = fs::remove_file(&tmp_path).await;
                // Same content under the same name: another writer got there first.
                if !fs::try_exists(&target_path).await.map_err(io)? {
                    return Err(io(e));
                }
            }
            debug!("attachment {stored_name} stored ({} bytes)", data.len());
        }

        Ok(self.get_url(&stored_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(max_bytes: usize) -> LocalAttachmentStore {
        let root = std::env::temp_dir().join(format!("dq-attachments-{}", Uuid::new_v4()));
        LocalAttachmentStore::new(root, "/static/uploads/".into(), max_bytes)
    }

    #[tokio::test]
    async fn test_identical_uploads_share_one_file() {
        let store = store(1024);
        let a = store.save_upload(b"lab results".to_vec(), "Results.PDF").await.unwrap();
        let b = store.save_upload(b"lab results".to_vec(), "copy.pdf").await.unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with("/static/uploads/"));
        assert!(a.ends_with(".pdf"));

        let stored_name = a.rsplit('/').next().unwrap();
        let on_disk = store.get_sharded_path(stored_name);
        assert_eq!(fs::read(&on_disk).await.unwrap(), b"lab results");
        fs::remove_dir_all(store.root()).await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_identical_uploads_all_succeed() {
        let store = std::sync::Arc::new(store(4 * 1024 * 1024));
        let payload = vec![42u8; 4 * 1024 * 1024];

        for _ in 0..5 {
            let uploads: Vec<_> = (0..8)
                .map(|i| {
                    let store = store.clone();
                    let payload = payload.clone();
                    tokio::spawn(async move {
                        store.save_upload(payload, &format!("scan-{i}.bin")).await
                    })
                })
                .collect();

            let mut urls = Vec::new();
            for upload in uploads {
                urls.push(upload.await.unwrap().unwrap());
            }
            assert!(urls.windows(2).all(|w| w[0] == w[1]));

            let stored_name = urls[0].rsplit('/').next().unwrap().to_string();
            let on_disk = store.get_sharded_path(&stored_name);
            assert_eq!(fs::read(&on_disk).await.unwrap().len(), payload.len());

            // No temp files left behind.
            let mut entries = fs::read_dir(on_disk.parent().unwrap()).await.unwrap();
            let mut names = Vec::new();
            while let Some(entry) = entries.next_entry().await.unwrap() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
            assert_eq!(names, vec![stored_name]);

            fs::remove_dir_all(store.root()).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_rejects_empty_and_oversized() {
        let store = store(4);
        assert!(matches!(
            store.save_upload(Vec::new(), "x.png").await,
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            store.save_upload(vec![0; 5], "x.png").await,
            Err(AppError::ValidationError(_))
        ));
    }

    #[test]
    fn test_safe_extension() {
        assert_eq!(safe_extension("scan.JPG").as_deref(), Some("jpg"));
        assert_eq!(safe_extension("archive.tar.gz").as_deref(), Some("gz"));
        assert_eq!(safe_extension("noext"), None);
        assert_eq!(safe_extension("evil.p/hp"), None);
        assert_eq!(safe_extension("trailing."), None);
    }
}
