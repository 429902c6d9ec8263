//! # Status State Machine
//!
//! `pending -> answered -> closed`, plus `pending -> closed`.
//! Closed is terminal. Nothing moves backward and self-transitions are rejected.

use crate::error::{AppError, Result};
use crate::models::{Role, ThreadStatus};

impl ThreadStatus {
    /// Whether `self -> to` is a legal move.
    pub fn can_transition_to(self, to: ThreadStatus) -> bool {
        use ThreadStatus::*;
        matches!(
            (self, to),
            (Pending, Answered) | (Pending, Closed) | (Answered, Closed)
        )
    }

    /// Validates `self -> to`, returning the new status.
    pub fn transition(self, to: ThreadStatus) -> Result<ThreadStatus> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(AppError::InvalidTransition { from: self, to })
        }
    }

    pub fn is_terminal(self) -> bool {
        self == ThreadStatus::Closed
    }

    /// Status a thread holds after a message from `sender` is appended.
    ///
    /// Fails with `ThreadClosed` on a closed thread. Only the first doctor
    /// reply on a pending thread changes anything.
    pub fn after_append(self, sender: Role, thread_id: uuid::Uuid) -> Result<ThreadStatus> {
        match (self, sender) {
            (ThreadStatus::Closed, _) => Err(AppError::ThreadClosed(thread_id)),
            (ThreadStatus::Pending, Role::Doctor) => Ok(ThreadStatus::Answered),
            (current, _) => Ok(current),
        }
    }
}
