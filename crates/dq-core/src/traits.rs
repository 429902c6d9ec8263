//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.
//! Repositories enforce the transactional rules themselves: the engine
//! never assumes a read followed by a write is atomic.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{AppendOutcome, Doctor, Identity, Message, Thread, ThreadStatus};

/// Durable storage of question threads.
#[async_trait]
pub trait ThreadRepo: Send + Sync {
    /// Inserts the thread and its first message in one transaction.
    async fn create_thread(&self, thread: Thread, first_message: Message) -> Result<()>;
    /// Threads owned by a patient, newest first.
    async fn list_for_patient(&self, patient_id: Uuid) -> Result<Vec<Thread>>;
    /// Threads assigned to a doctor across all statuses, newest first.
    async fn list_for_doctor(&self, doctor_id: Uuid) -> Result<Vec<Thread>>;
    async fn get_thread(&self, id: Uuid) -> Result<Option<Thread>>;
    /// Validates and applies a status change against the committed status.
    async fn transition_status(&self, id: Uuid, to: ThreadStatus) -> Result<Thread>;
    /// Deletes the thread and all its messages if `patient_id` owns it.
    async fn delete_thread(&self, id: Uuid, patient_id: Uuid) -> Result<()>;
}

/// Append-only message storage keyed by thread.
#[async_trait]
pub trait MessageRepo: Send + Sync {
    /// Appends a message, flipping `pending -> answered` on the first doctor
    /// reply in the same transaction. Rejects closed threads.
    async fn append(&self, message: Message) -> Result<AppendOutcome>;
    /// Messages ordered by `(created_at, id)`. With `since`, only those after
    /// that message; an unknown cursor returns the full list.
    async fn list(&self, thread_id: Uuid, since: Option<Uuid>) -> Result<Vec<Message>>;
}

/// Read-only doctor directory (owned by the surrounding application).
#[async_trait]
pub trait DoctorDirectory: Send + Sync {
    async fn list_doctors(&self) -> Result<Vec<Doctor>>;
    async fn get_doctor(&self, id: Uuid) -> Result<Option<Doctor>>;
}

/// Blob storage for message attachments.
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    /// Saves raw bytes and returns the opaque reference stored on the Message.
    async fn save_upload(&self, data: Vec<u8>, file_name: &str) -> Result<String>;
}

/// Resolves bearer credentials to an authenticated caller.
pub trait IdentityProvider: Send + Sync {
    fn verify_token(&self, token: &str) -> Result<Identity>;
}
