//! # Messaging Engine
//!
//! Sits between the transport and the repositories. Owns role-scoped
//! visibility, input validation and per-thread serialization of writes.
//! The status rules themselves are committed by the repositories so that no
//! reader ever sees a status without its triggering message.

use std::sync::Arc;

use chrono::Utc;
use log::{debug, info, warn};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::locks::ThreadLocks;
use crate::models::{
    AppendOutcome, Doctor, Identity, Message, NewMessage, NewThread, Role, Thread, ThreadStatus,
};
use crate::traits::{DoctorDirectory, MessageRepo, ThreadRepo};

pub struct MessagingEngine {
    threads: Arc<dyn ThreadRepo>,
    messages: Arc<dyn MessageRepo>,
    doctors: Arc<dyn DoctorDirectory>,
    locks: ThreadLocks,
}

impl MessagingEngine {
    pub fn new(
        threads: Arc<dyn ThreadRepo>,
        messages: Arc<dyn MessageRepo>,
        doctors: Arc<dyn DoctorDirectory>,
    ) -> Self {
        Self {
            threads,
            messages,
            doctors,
            locks: ThreadLocks::new(),
        }
    }

    /// Opens a thread together with its first (patient) message.
    pub async fn create_thread(&self, who: &Identity, req: NewThread) -> Result<Thread> {
        require_role(who, Role::Patient, "only patients can open questions")?;

        let subject = req.subject.trim();
        if subject.is_empty() {
            return Err(AppError::ValidationError("subject must not be empty".into()));
        }
        if req.message.trim().is_empty() {
            return Err(AppError::ValidationError("message must not be empty".into()));
        }
        let attachment_ref = normalize_attachment(req.attachment_ref)?;

        match self.doctors.get_doctor(req.doctor_id).await? {
            None => {
                return Err(AppError::ValidationError(format!(
                    "doctor {} does not exist",
                    req.doctor_id
                )))
            }
            Some(doctor) if !doctor.active => {
                return Err(AppError::ValidationError(format!(
                    "doctor {} is not accepting questions",
                    req.doctor_id
                )))
            }
            Some(_) => {}
        }

        let now = Utc::now();
        let thread = Thread {
            id: Uuid::now_v7(),
            subject: subject.to_string(),
            patient_id: who.user_id,
            doctor_id: req.doctor_id,
            status: ThreadStatus::Pending,
            created_at: now,
        };
        let first = Message {
            id: Uuid::now_v7(),
            thread_id: thread.id,
            sender_role: Role::Patient,
            text: req.message,
            attachment_ref,
            created_at: now,
        };

        self.threads.create_thread(thread.clone(), first).await?;
        info!(
            "thread {} opened by patient {} for doctor {}",
            thread.id, thread.patient_id, thread.doctor_id
        );
        Ok(thread)
    }

    /// ListMyThreads: every thread the calling patient owns.
    pub async fn list_my_threads(&self, who: &Identity) -> Result<Vec<Thread>> {
        require_role(who, Role::Patient, "only patients have their own questions")?;
        self.threads.list_for_patient(who.user_id).await
    }

    /// ListAssignedThreads: every thread assigned to the calling doctor, any status.
    pub async fn list_assigned_threads(&self, who: &Identity) -> Result<Vec<Thread>> {
        require_role(who, Role::Doctor, "only doctors have assigned questions")?;
        self.threads.list_for_doctor(who.user_id).await
    }

    pub async fn get_thread(&self, who: &Identity, thread_id: Uuid) -> Result<Thread> {
        let thread = self.load(thread_id).await?;
        authorize(who, &thread)?;
        Ok(thread)
    }

    /// GetThreadMessages, optionally only those after `since`.
    pub async fn get_thread_messages(
        &self,
        who: &Identity,
        thread_id: Uuid,
        since: Option<Uuid>,
    ) -> Result<Vec<Message>> {
        // Delete takes the same lock: check and read see one state.
        let _guard = self.locks.lock(thread_id).await;
        self.get_thread(who, thread_id).await?;
        self.messages.list(thread_id, since).await
    }

    /// AppendMessage from either party. The first doctor reply on a pending
    /// thread answers it; closed threads reject everything.
    pub async fn append_message(
        &self,
        who: &Identity,
        thread_id: Uuid,
        req: NewMessage,
    ) -> Result<AppendOutcome> {
        let attachment_ref = normalize_attachment(req.attachment_ref)?;
        if req.text.trim().is_empty() && attachment_ref.is_none() {
            return Err(AppError::ValidationError(
                "message needs text or an attachment".into(),
            ));
        }

        let _guard = self.locks.lock(thread_id).await;
        let thread = self.load(thread_id).await?;
        authorize(who, &thread)?;
        if thread.status.is_terminal() {
            warn!("rejected {} message on closed thread {}", who.role, thread_id);
            return Err(AppError::ThreadClosed(thread_id));
        }

        let message = Message {
            id: Uuid::now_v7(),
            thread_id,
            sender_role: who.role,
            text: req.text,
            attachment_ref,
            created_at: Utc::now(),
        };
        let outcome = self.messages.append(message).await?;

        if outcome.status != thread.status {
            info!("thread {} {} -> {}", thread_id, thread.status, outcome.status);
        }
        debug!("message {} appended to thread {}", outcome.message.id, thread_id);
        Ok(outcome)
    }

    /// Explicit status change by the assigned doctor. `answered` is only ever
    /// reached through a reply, so it is rejected here.
    pub async fn transition_status(
        &self,
        who: &Identity,
        thread_id: Uuid,
        to: ThreadStatus,
    ) -> Result<Thread> {
        require_role(who, Role::Doctor, "only the assigned doctor can change status")?;

        let _guard = self.locks.lock(thread_id).await;
        let thread = self.load(thread_id).await?;
        authorize(who, &thread)?;
        if to == ThreadStatus::Answered {
            return Err(AppError::InvalidTransition {
                from: thread.status,
                to,
            });
        }
        thread.status.transition(to)?;

        let updated = self.threads.transition_status(thread_id, to).await?;
        info!("thread {} {} -> {}", thread_id, thread.status, updated.status);
        Ok(updated)
    }

    /// CloseThread.
    pub async fn close_thread(&self, who: &Identity, thread_id: Uuid) -> Result<Thread> {
        self.transition_status(who, thread_id, ThreadStatus::Closed).await
    }

    /// DeleteThread: owner only, cascades to messages.
    pub async fn delete_thread(&self, who: &Identity, thread_id: Uuid) -> Result<()> {
        require_role(who, Role::Patient, "only the owning patient can delete a question")?;

        let _guard = self.locks.lock(thread_id).await;
        let thread = self.load(thread_id).await?;
        authorize(who, &thread)?;
        self.threads.delete_thread(thread_id, who.user_id).await?;
        info!("thread {} deleted by patient {}", thread_id, who.user_id);
        Ok(())
    }

    /// ListDoctors: the directory entries patients can address.
    pub async fn list_doctors(&self) -> Result<Vec<Doctor>> {
        let doctors = self.doctors.list_doctors().await?;
        Ok(doctors.into_iter().filter(|d| d.active).collect())
    }

    async fn load(&self, thread_id: Uuid) -> Result<Thread> {
        self.threads
            .get_thread(thread_id)
            .await?
            .ok_or_else(|| AppError::thread_not_found(thread_id))
    }
}

fn require_role(who: &Identity, role: Role, reason: &str) -> Result<()> {
    if who.role == role {
        Ok(())
    } else {
        Err(AppError::Forbidden(reason.to_string()))
    }
}

/// Patients see only their own threads, doctors only those assigned to them.
fn authorize(who: &Identity, thread: &Thread) -> Result<()> {
    let allowed = match who.role {
        Role::Patient => thread.patient_id == who.user_id,
        Role::Doctor => thread.doctor_id == who.user_id,
    };
    if allowed {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "thread {} is not visible to this {}",
            thread.id, who.role
        )))
    }
}

/// Attachment refs are stored verbatim; a blank ref means "no attachment".
fn normalize_attachment(attachment_ref: Option<String>) -> Result<Option<String>> {
    match attachment_ref {
        Some(r) if r.trim().is_empty() => Ok(None),
        Some(r) if r.chars().any(char::is_control) => Err(AppError::ValidationError(
            "attachment reference contains control characters".into(),
        )),
        other => Ok(other),
    }
}
