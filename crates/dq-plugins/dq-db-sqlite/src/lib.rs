//! # dq-db-sqlite Implementation
//!
//! This module implements the data mapping between the SQLite relational model
//! and the `dq-core` domain models.
//!
//! Every mutating transaction opens with a write statement, so SQLite takes
//! the write lock before anything is read and a check can never go stale
//! before its dependent write commits.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use dq_core::error::{AppError, Result};
use dq_core::models::{AppendOutcome, Doctor, Message, Role, Thread, ThreadStatus};
use dq_core::traits::{DoctorDirectory, MessageRepo, ThreadRepo};
use log::{debug, error};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, Transaction};
use uuid::Uuid;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS doctors (
        id             BLOB PRIMARY KEY,
        display_name   TEXT NOT NULL,
        specialization TEXT,
        active         BOOLEAN NOT NULL DEFAULT 1
    )",
    "CREATE TABLE IF NOT EXISTS threads (
        id         BLOB PRIMARY KEY,
        subject    TEXT NOT NULL,
        patient_id BLOB NOT NULL,
        doctor_id  BLOB NOT NULL,
        status     TEXT NOT NULL CHECK (status IN ('pending', 'answered', 'closed')),
        created_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_threads_patient ON threads (patient_id, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_threads_doctor ON threads (doctor_id, created_at)",
    "CREATE TABLE IF NOT EXISTS messages (
        id             BLOB PRIMARY KEY,
        thread_id      BLOB NOT NULL REFERENCES threads (id) ON DELETE CASCADE,
        sender_role    TEXT NOT NULL CHECK (sender_role IN ('patient', 'doctor')),
        text           TEXT NOT NULL,
        attachment_ref TEXT,
        created_at     TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_messages_thread ON messages (thread_id, created_at, id)",
];

const ALL_STATUSES: [ThreadStatus; 3] = [
    ThreadStatus::Pending,
    ThreadStatus::Answered,
    ThreadStatus::Closed,
];

pub struct SqliteQuestionRepo {
    pool: SqlitePool,
}

impl SqliteQuestionRepo {
    /// Connects and creates the schema if needed.
    ///
    /// In-memory databases live per connection, so they get a single
    /// long-lived connection.
    pub async fn new(url: &str) -> anyhow::Result<Self> {
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let mut options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(8)
        };
        let pool = pool_options.connect_with(options).await?;

        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }
        Ok(Self { pool })
    }

    /// Adds or updates a directory entry. Used by seeding and tests; the
    /// directory itself belongs to the surrounding application.
    pub async fn upsert_doctor(&self, doctor: &Doctor) -> Result<()> {
        sqlx::query(
            "INSERT INTO doctors (id, display_name, specialization, active) VALUES (?, ?, ?, ?)
             ON CONFLICT (id) DO UPDATE SET
                display_name = excluded.display_name,
                specialization = excluded.specialization,
                active = excluded.active",
        )
        .bind(uuid_to_blob(doctor.id))
        .bind(&doctor.display_name)
        .bind(&doctor.specialization)
        .bind(doctor.active)
        .execute(&self.pool)
        .await
        .map_err(db)?;
        Ok(())
    }

    async fn current_status(
        tx: &mut Transaction<'_, Sqlite>,
        thread_id: Uuid,
    ) -> Result<Option<ThreadStatus>> {
        let row = sqlx::query("SELECT status FROM threads WHERE id = ?")
            .bind(uuid_to_blob(thread_id))
            .fetch_optional(&mut **tx)
            .await
            .map_err(db)?;
        row.map(|r| parse_status(&r.get::<String, _>("status")))
            .transpose()
    }
}

// Helper for UUID conversion
fn uuid_to_blob(id: Uuid) -> Vec<u8> {
    id.as_bytes().to_vec()
}

fn blob_to_uuid(blob: &[u8]) -> Uuid {
    Uuid::from_slice(blob).unwrap_or_default()
}

fn db(e: sqlx::Error) -> AppError {
    error!("database error: {e}");
    AppError::Internal(format!("database error: {e}"))
}

fn parse_status(raw: &str) -> Result<ThreadStatus> {
    ThreadStatus::from_str(raw)
        .map_err(|_| AppError::Internal(format!("corrupt thread status '{raw}'")))
}

fn parse_role(raw: &str) -> Result<Role> {
    Role::from_str(raw).map_err(|_| AppError::Internal(format!("corrupt sender role '{raw}'")))
}

fn row_to_thread(row: &SqliteRow) -> Result<Thread> {
    Ok(Thread {
        id: blob_to_uuid(row.get::<Vec<u8>, _>("id").as_slice()),
        subject: row.get("subject"),
        patient_id: blob_to_uuid(row.get::<Vec<u8>, _>("patient_id").as_slice()),
        doctor_id: blob_to_uuid(row.get::<Vec<u8>, _>("doctor_id").as_slice()),
        status: parse_status(&row.get::<String, _>("status"))?,
        created_at: row.get("created_at"),
    })
}

fn row_to_message(row: &SqliteRow) -> Result<Message> {
    Ok(Message {
        id: blob_to_uuid(row.get::<Vec<u8>, _>("id").as_slice()),
        thread_id: blob_to_uuid(row.get::<Vec<u8>, _>("thread_id").as_slice()),
        sender_role: parse_role(&row.get::<String, _>("sender_role"))?,
        text: row.get("text"),
        attachment_ref: row.get("attachment_ref"),
        created_at: row.get("created_at"),
    })
}

fn row_to_doctor(row: &SqliteRow) -> Doctor {
    Doctor {
        id: blob_to_uuid(row.get::<Vec<u8>, _>("id").as_slice()),
        display_name: row.get("display_name"),
        specialization: row.get("specialization"),
        active: row.get("active"),
    }
}

#[async_trait]
impl ThreadRepo for SqliteQuestionRepo {
    /// Atomic operation to create a thread and its first message.
    ///
    /// # Developer Note
    /// Using a Transaction (tx) ensures we don't end up with "ghost threads"
    /// that have no initial message if the second insert fails.
    async fn create_thread(&self, thread: Thread, first_message: Message) -> Result<()> {
        if first_message.thread_id != thread.id || first_message.sender_role != Role::Patient {
            return Err(AppError::ValidationError(
                "first message must be the patient's, in the same thread".into(),
            ));
        }

        let mut tx = self.pool.begin().await.map_err(db)?;

        // 1. Insert Thread
        sqlx::query("INSERT INTO threads (id, subject, patient_id, doctor_id, status, created_at) VALUES (?, ?, ?, ?, ?, ?)")
            .bind(uuid_to_blob(thread.id))
            .bind(&thread.subject)
            .bind(uuid_to_blob(thread.patient_id))
            .bind(uuid_to_blob(thread.doctor_id))
            .bind(thread.status.as_str())
            .bind(thread.created_at)
            .execute(&mut *tx)
            .await
            .map_err(db)?;

        // 2. Insert the opening message
        sqlx::query("INSERT INTO messages (id, thread_id, sender_role, text, attachment_ref, created_at) VALUES (?, ?, ?, ?, ?, ?)")
            .bind(uuid_to_blob(first_message.id))
            .bind(uuid_to_blob(first_message.thread_id))
            .bind(first_message.sender_role.as_str())
            .bind(&first_message.text)
            .bind(&first_message.attachment_ref)
            .bind(first_message.created_at)
            .execute(&mut *tx)
            .await
            .map_err(db)?;

        tx.commit().await.map_err(db)?;
        Ok(())
    }

    async fn list_for_patient(&self, patient_id: Uuid) -> Result<Vec<Thread>> {
        let rows = sqlx::query("SELECT * FROM threads WHERE patient_id = ? ORDER BY created_at DESC, id DESC")
            .bind(uuid_to_blob(patient_id))
            .fetch_all(&self.pool)
            .await
            .map_err(db)?;
        rows.iter().map(row_to_thread).collect()
    }

    async fn list_for_doctor(&self, doctor_id: Uuid) -> Result<Vec<Thread>> {
        let rows = sqlx::query("SELECT * FROM threads WHERE doctor_id = ? ORDER BY created_at DESC, id DESC")
            .bind(uuid_to_blob(doctor_id))
            .fetch_all(&self.pool)
            .await
            .map_err(db)?;
        rows.iter().map(row_to_thread).collect()
    }

    async fn get_thread(&self, id: Uuid) -> Result<Option<Thread>> {
        let row = sqlx::query("SELECT * FROM threads WHERE id = ?")
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;
        row.as_ref().map(row_to_thread).transpose()
    }

    async fn transition_status(&self, id: Uuid, to: ThreadStatus) -> Result<Thread> {
        let sources: Vec<&str> = ALL_STATUSES
            .iter()
            .filter(|from| from.can_transition_to(to))
            .map(|from| from.as_str())
            .collect();

        let mut tx = self.pool.begin().await.map_err(db)?;

        let moved = if sources.is_empty() {
            0
        } else {
            let placeholders = vec!["?"; sources.len()].join(", ");
            let sql = format!(
                "UPDATE threads SET status = ? WHERE id = ? AND status IN ({placeholders})"
            );
            let mut query = sqlx::query(&sql).bind(to.as_str()).bind(uuid_to_blob(id));
            for source in &sources {
                query = query.bind(*source);
            }
            query.execute(&mut *tx).await.map_err(db)?.rows_affected()
        };

        if moved == 0 {
            return match Self::current_status(&mut tx, id).await? {
                None => Err(AppError::thread_not_found(id)),
                Some(from) => Err(AppError::InvalidTransition { from, to }),
            };
        }

        let row = sqlx::query("SELECT * FROM threads WHERE id = ?")
            .bind(uuid_to_blob(id))
            .fetch_one(&mut *tx)
            .await
            .map_err(db)?;
        let thread = row_to_thread(&row)?;
        tx.commit().await.map_err(db)?;
        Ok(thread)
    }

    async fn delete_thread(&self, id: Uuid, patient_id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db)?;

        let deleted = sqlx::query("DELETE FROM threads WHERE id = ? AND patient_id = ?")
            .bind(uuid_to_blob(id))
            .bind(uuid_to_blob(patient_id))
            .execute(&mut *tx)
            .await
            .map_err(db)?
            .rows_affected();

        if deleted == 0 {
            return match Self::current_status(&mut tx, id).await? {
                None => Err(AppError::thread_not_found(id)),
                Some(_) => Err(AppError::Forbidden(format!(
                    "thread {id} belongs to another patient"
                ))),
            };
        }

        // Normally already removed by the cascade; explicit for connections
        // opened without foreign key enforcement.
        let messages = sqlx::query("DELETE FROM messages WHERE thread_id = ?")
            .bind(uuid_to_blob(id))
            .execute(&mut *tx)
            .await
            .map_err(db)?
            .rows_affected();

        tx.commit().await.map_err(db)?;
        debug!("deleted thread {id} ({messages} orphaned messages swept)");
        Ok(())
    }
}

#[async_trait]
impl MessageRepo for SqliteQuestionRepo {
    async fn append(&self, message: Message) -> Result<AppendOutcome> {
        let mut tx = self.pool.begin().await.map_err(db)?;

        // 1. Insert only into a live thread
        let inserted = sqlx::query(
            "INSERT INTO messages (id, thread_id, sender_role, text, attachment_ref, created_at)
             SELECT ?, ?, ?, ?, ?, ?
             WHERE EXISTS (SELECT 1 FROM threads WHERE id = ? AND status != 'closed')",
        )
        .bind(uuid_to_blob(message.id))
        .bind(uuid_to_blob(message.thread_id))
        .bind(message.sender_role.as_str())
        .bind(&message.text)
        .bind(&message.attachment_ref)
        .bind(message.created_at)
        .bind(uuid_to_blob(message.thread_id))
        .execute(&mut *tx)
        .await
        .map_err(db)?
        .rows_affected();

        if inserted == 0 {
            return match Self::current_status(&mut tx, message.thread_id).await? {
                None => Err(AppError::thread_not_found(message.thread_id)),
                Some(_) => Err(AppError::ThreadClosed(message.thread_id)),
            };
        }

        // 2. First doctor reply answers a pending thread
        if message.sender_role == Role::Doctor {
            sqlx::query("UPDATE threads SET status = 'answered' WHERE id = ? AND status = 'pending'")
                .bind(uuid_to_blob(message.thread_id))
                .execute(&mut *tx)
                .await
                .map_err(db)?;
        }

        let status = Self::current_status(&mut tx, message.thread_id)
            .await?
            .ok_or_else(|| AppError::thread_not_found(message.thread_id))?;

        tx.commit().await.map_err(db)?;
        Ok(AppendOutcome { message, status })
    }

    async fn list(&self, thread_id: Uuid, since: Option<Uuid>) -> Result<Vec<Message>> {
        let cursor = match since {
            Some(cursor_id) => sqlx::query("SELECT created_at, id FROM messages WHERE id = ? AND thread_id = ?")
                .bind(uuid_to_blob(cursor_id))
                .bind(uuid_to_blob(thread_id))
                .fetch_optional(&self.pool)
                .await
                .map_err(db)?
                .map(|row| (row.get::<String, _>("created_at"), row.get::<Vec<u8>, _>("id"))),
            None => None,
        };

        let rows = match cursor {
            Some((created_at, id)) => sqlx::query(
                "SELECT * FROM messages
                 WHERE thread_id = ? AND (created_at > ? OR (created_at = ? AND id > ?))
                 ORDER BY created_at ASC, id ASC",
            )
            .bind(uuid_to_blob(thread_id))
            .bind(&created_at)
            .bind(&created_at)
            .bind(id)
            .fetch_all(&self.pool)
            .await
            .map_err(db)?,
            None => sqlx::query("SELECT * FROM messages WHERE thread_id = ? ORDER BY created_at ASC, id ASC")
                .bind(uuid_to_blob(thread_id))
                .fetch_all(&self.pool)
                .await
                .map_err(db)?,
        };

        rows.iter().map(row_to_message).collect()
    }
}

#[async_trait]
impl DoctorDirectory for SqliteQuestionRepo {
    async fn list_doctors(&self) -> Result<Vec<Doctor>> {
        let rows = sqlx::query("SELECT * FROM doctors ORDER BY display_name ASC, id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(db)?;
        Ok(rows.iter().map(row_to_doctor).collect())
    }

    async fn get_doctor(&self, id: Uuid) -> Result<Option<Doctor>> {
        let row = sqlx::query("SELECT * FROM doctors WHERE id = ?")
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;
        Ok(row.as_ref().map(row_to_doctor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn thread_with_op(patient_id: Uuid, doctor_id: Uuid) -> (Thread, Message) {
        let now = Utc::now();
        let thread = Thread {
            id: Uuid::now_v7(),
            subject: "Headache".into(),
            patient_id,
            doctor_id,
            status: ThreadStatus::Pending,
            created_at: now,
        };
        let op = Message {
            id: Uuid::now_v7(),
            thread_id: thread.id,
            sender_role: Role::Patient,
            text: "I have a headache".into(),
            attachment_ref: None,
            created_at: now,
        };
        (thread, op)
    }

    fn reply(thread_id: Uuid, role: Role, text: &str) -> Message {
        Message {
            id: Uuid::now_v7(),
            thread_id,
            sender_role: role,
            text: text.into(),
            attachment_ref: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get_thread() {
        let repo = SqliteQuestionRepo::new("sqlite::memory:").await.unwrap();
        let (thread, op) = thread_with_op(Uuid::now_v7(), Uuid::now_v7());

        repo.create_thread(thread.clone(), op.clone()).await.expect("Failed to create thread");

        let stored = repo.get_thread(thread.id).await.unwrap().unwrap();
        assert_eq!(stored.id, thread.id);
        assert_eq!(stored.status, ThreadStatus::Pending);
        let messages = repo.list(thread.id, None).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].sender_role, Role::Patient);
    }

    #[tokio::test]
    async fn test_create_rejects_foreign_first_message() {
        let repo = SqliteQuestionRepo::new("sqlite::memory:").await.unwrap();
        let (thread, mut op) = thread_with_op(Uuid::now_v7(), Uuid::now_v7());
        op.sender_role = Role::Doctor;

        let err = repo.create_thread(thread.clone(), op).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
        assert!(repo.get_thread(thread.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_doctor_append_flips_pending_once() {
        let repo = SqliteQuestionRepo::new("sqlite::memory:").await.unwrap();
        let (thread, op) = thread_with_op(Uuid::now_v7(), Uuid::now_v7());
        repo.create_thread(thread.clone(), op).await.unwrap();

        let patient = repo.append(reply(thread.id, Role::Patient, "still hurts")).await.unwrap();
        assert_eq!(patient.status, ThreadStatus::Pending);

        let doctor = repo.append(reply(thread.id, Role::Doctor, "Take painkillers")).await.unwrap();
        assert_eq!(doctor.status, ThreadStatus::Answered);

        let again = repo.append(reply(thread.id, Role::Patient, "thanks")).await.unwrap();
        assert_eq!(again.status, ThreadStatus::Answered);
        assert_eq!(repo.list(thread.id, None).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_append_to_closed_or_missing_thread() {
        let repo = SqliteQuestionRepo::new("sqlite::memory:").await.unwrap();
        let (thread, op) = thread_with_op(Uuid::now_v7(), Uuid::now_v7());
        repo.create_thread(thread.clone(), op).await.unwrap();
        repo.transition_status(thread.id, ThreadStatus::Closed).await.unwrap();

        let err = repo.append(reply(thread.id, Role::Doctor, "late")).await.unwrap_err();
        assert!(matches!(err, AppError::ThreadClosed(id) if id == thread.id));
        assert_eq!(repo.list(thread.id, None).await.unwrap().len(), 1);

        let missing = Uuid::now_v7();
        let err = repo.append(reply(missing, Role::Patient, "hello")).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_, _)));
    }

    #[tokio::test]
    async fn test_transition_rules_are_enforced_in_storage() {
        let repo = SqliteQuestionRepo::new("sqlite::memory:").await.unwrap();
        let (thread, op) = thread_with_op(Uuid::now_v7(), Uuid::now_v7());
        repo.create_thread(thread.clone(), op).await.unwrap();

        let closed = repo.transition_status(thread.id, ThreadStatus::Closed).await.unwrap();
        assert_eq!(closed.status, ThreadStatus::Closed);

        for to in ALL_STATUSES {
            let err = repo.transition_status(thread.id, to).await.unwrap_err();
            assert!(matches!(
                err,
                AppError::InvalidTransition { from: ThreadStatus::Closed, .. }
            ));
        }
        let err = repo.transition_status(Uuid::now_v7(), ThreadStatus::Closed).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_, _)));
    }

    #[tokio::test]
    async fn test_delete_cascades_and_checks_owner() {
        let repo = SqliteQuestionRepo::new("sqlite::memory:").await.unwrap();
        let owner = Uuid::now_v7();
        let (thread, op) = thread_with_op(owner, Uuid::now_v7());
        repo.create_thread(thread.clone(), op).await.unwrap();
        repo.append(reply(thread.id, Role::Doctor, "hi")).await.unwrap();

        let err = repo.delete_thread(thread.id, Uuid::now_v7()).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert_eq!(repo.list(thread.id, None).await.unwrap().len(), 2);

        repo.delete_thread(thread.id, owner).await.unwrap();
        assert!(repo.get_thread(thread.id).await.unwrap().is_none());
        assert!(repo.list(thread.id, None).await.unwrap().is_empty());

        let err = repo.delete_thread(thread.id, owner).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_, _)));
    }

    #[tokio::test]
    async fn test_list_since_cursor() {
        let repo = SqliteQuestionRepo::new("sqlite::memory:").await.unwrap();
        let (thread, op) = thread_with_op(Uuid::now_v7(), Uuid::now_v7());
        repo.create_thread(thread.clone(), op.clone()).await.unwrap();
        let second = repo.append(reply(thread.id, Role::Doctor, "2")).await.unwrap().message;
        let third = repo.append(reply(thread.id, Role::Patient, "3")).await.unwrap().message;

        let after_op: Vec<Uuid> = repo.list(thread.id, Some(op.id)).await.unwrap().iter().map(|m| m.id).collect();
        assert_eq!(after_op, vec![second.id, third.id]);
        assert!(repo.list(thread.id, Some(third.id)).await.unwrap().is_empty());

        // Unknown cursor: full resync.
        assert_eq!(repo.list(thread.id, Some(Uuid::now_v7())).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_same_timestamp_orders_by_id() {
        let repo = SqliteQuestionRepo::new("sqlite::memory:").await.unwrap();
        let (thread, op) = thread_with_op(Uuid::now_v7(), Uuid::now_v7());
        repo.create_thread(thread.clone(), op.clone()).await.unwrap();

        let mut a = reply(thread.id, Role::Patient, "a");
        let mut b = reply(thread.id, Role::Patient, "b");
        b.created_at = a.created_at;
        // Insert the later id first.
        std::mem::swap(&mut a.id, &mut b.id);
        repo.append(a.clone()).await.unwrap();
        repo.append(b.clone()).await.unwrap();

        let texts: Vec<String> = repo.list(thread.id, None).await.unwrap().into_iter().map(|m| m.text).collect();
        assert_eq!(texts, vec!["I have a headache", "b", "a"]);
    }

    #[tokio::test]
    async fn test_lists_are_scoped_and_newest_first() {
        let repo = SqliteQuestionRepo::new("sqlite::memory:").await.unwrap();
        let (patient, doctor) = (Uuid::now_v7(), Uuid::now_v7());
        let (older, op1) = thread_with_op(patient, doctor);
        repo.create_thread(older.clone(), op1).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let (newer, op2) = thread_with_op(patient, doctor);
        repo.create_thread(newer.clone(), op2).await.unwrap();
        let (other, op3) = thread_with_op(Uuid::now_v7(), Uuid::now_v7());
        repo.create_thread(other, op3).await.unwrap();

        let mine: Vec<Uuid> = repo.list_for_patient(patient).await.unwrap().iter().map(|t| t.id).collect();
        assert_eq!(mine, vec![newer.id, older.id]);
        let assigned: Vec<Uuid> = repo.list_for_doctor(doctor).await.unwrap().iter().map(|t| t.id).collect();
        assert_eq!(assigned, mine);
    }

    #[tokio::test]
    async fn test_doctor_directory_upsert() {
        let repo = SqliteQuestionRepo::new("sqlite::memory:").await.unwrap();
        let mut doctor = Doctor {
            id: Uuid::now_v7(),
            display_name: "Dr. Ayse".into(),
            specialization: Some("Neurology".into()),
            active: true,
        };
        repo.upsert_doctor(&doctor).await.unwrap();
        doctor.active = false;
        repo.upsert_doctor(&doctor).await.unwrap();

        let all = repo.list_doctors().await.unwrap();
        assert_eq!(all, vec![doctor.clone()]);
        assert_eq!(repo.get_doctor(doctor.id).await.unwrap(), Some(doctor));
        assert!(repo.get_doctor(Uuid::now_v7()).await.unwrap().is_none());
    }
}
