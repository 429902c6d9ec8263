//! # Domain Models
//!
//! These structs represent the core entities of the question/answer channel.
//! We use UUID v7 for time-ordered, globally unique identification, so id
//! order doubles as the tie-breaker for messages sharing a timestamp.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Which side of the conversation a user (or message) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Doctor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Doctor => "doctor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "patient" => Ok(Role::Patient),
            "doctor" => Ok(Role::Doctor),
            other => Err(AppError::ValidationError(format!("unknown role '{other}'"))),
        }
    }
}

/// The authenticated caller, as supplied by the authentication collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: Uuid,
    pub role: Role,
}

impl Identity {
    pub fn patient(user_id: Uuid) -> Self {
        Self { user_id, role: Role::Patient }
    }

    pub fn doctor(user_id: Uuid) -> Self {
        Self { user_id, role: Role::Doctor }
    }
}

/// Lifecycle status of a question thread. See [`crate::status`] for the rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadStatus {
    Pending,
    Answered,
    Closed,
}

impl ThreadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreadStatus::Pending => "pending",
            ThreadStatus::Answered => "answered",
            ThreadStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for ThreadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThreadStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ThreadStatus::Pending),
            "answered" => Ok(ThreadStatus::Answered),
            "closed" => Ok(ThreadStatus::Closed),
            other => Err(AppError::ValidationError(format!("unknown status '{other}'"))),
        }
    }
}

/// A patient's question to one doctor. Owns its messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    pub id: Uuid,
    pub subject: String,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub status: ThreadStatus,
    pub created_at: DateTime<Utc>,
}

/// One append-only utterance within a Thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub thread_id: Uuid,
    pub sender_role: Role,
    /// May be empty only when an attachment is present
    pub text: String,
    /// Opaque URL/handle returned by the AttachmentStore
    pub attachment_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Total order within a thread: creation time, then id.
    pub fn order_key(&self) -> (DateTime<Utc>, Uuid) {
        (self.created_at, self.id)
    }
}

/// Read-only directory entry for a doctor that patients can address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub display_name: String,
    pub specialization: Option<String>,
    /// Inactive doctors keep their threads but accept no new ones
    pub active: bool,
}

/// Input for opening a new thread.
#[derive(Debug, Clone, Deserialize)]
pub struct NewThread {
    pub subject: String,
    pub message: String,
    pub doctor_id: Uuid,
    #[serde(default)]
    pub attachment_ref: Option<String>,
}

/// Input for appending to an existing thread.
#[derive(Debug, Clone, Deserialize)]
pub struct NewMessage {
    #[serde(default, alias = "message")]
    pub text: String,
    #[serde(default)]
    pub attachment_ref: Option<String>,
}

/// Result of a message append: the stored message and the thread status
/// as committed in the same transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppendOutcome {
    pub message: Message,
    pub status: ThreadStatus,
}
