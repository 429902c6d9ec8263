//! # Client Synchronization
//!
//! Clients are disposable caches of the server's view, refreshed by polling.
//! Every refresh dedupes by id and replaces in place, so repeated polls of an
//! unchanged server never grow the local view.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use tokio::sync::{oneshot, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use crate::engine::MessagingEngine;
use crate::error::Result;
use crate::models::{Identity, Message, NewMessage, Role, Thread};

/// Anything the server identifies by a stable id.
pub trait Keyed {
    fn key(&self) -> Uuid;
}

impl Keyed for Thread {
    fn key(&self) -> Uuid {
        self.id
    }
}

impl Keyed for Message {
    fn key(&self) -> Uuid {
        self.id
    }
}

/// What a refresh changed in the local view.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncDelta {
    pub added: Vec<Uuid>,
    pub changed: Vec<Uuid>,
    pub removed: Vec<Uuid>,
}

impl SyncDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.removed.is_empty()
    }
}

/// Local copy of a server list (e.g. a thread list), kept in server order.
#[derive(Debug, Clone)]
pub struct SyncedList<T> {
    items: Vec<T>,
}

impl<T> Default for SyncedList<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Keyed + Clone + PartialEq> SyncedList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&T> {
        self.items.iter().find(|item| item.key() == id)
    }

    /// Replaces the view with a full server snapshot. Repeated ids in the
    /// snapshot collapse to their first occurrence.
    pub fn refresh(&mut self, snapshot: Vec<T>) -> SyncDelta {
        let mut seen = HashSet::with_capacity(snapshot.len());
        let fresh: Vec<T> = snapshot
            .into_iter()
            .filter(|item| seen.insert(item.key()))
            .collect();

        let previous: HashMap<Uuid, &T> = self.items.iter().map(|i| (i.key(), i)).collect();
        let mut delta = SyncDelta::default();
        for item in &fresh {
            match previous.get(&item.key()) {
                None => delta.added.push(item.key()),
                Some(old) if *old != item => delta.changed.push(item.key()),
                Some(_) => {}
            }
        }
        delta.removed = self
            .items
            .iter()
            .map(Keyed::key)
            .filter(|id| !seen.contains(id))
            .collect();

        self.items = fresh;
        delta
    }

    /// Applies a local mutation's result: replaces in place, or inserts at the
    /// front for unseen ids (lists are newest-first).
    pub fn upsert(&mut self, item: T) {
        match self.items.iter_mut().find(|i| i.key() == item.key()) {
            Some(slot) => *slot = item,
            None => self.items.insert(0, item),
        }
    }

    pub fn remove(&mut self, id: Uuid) -> Option<T> {
        let pos = self.items.iter().position(|i| i.key() == id)?;
        Some(self.items.remove(pos))
    }
}

/// A message sent optimistically but not yet confirmed by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMessage {
    pub local_id: Uuid,
    pub text: String,
    pub attachment_ref: Option<String>,
    pub staged_at: DateTime<Utc>,
}

/// Local copy of one thread's messages.
#[derive(Debug, Default, Clone)]
pub struct MessageLog {
    confirmed: Vec<Message>,
    pending: Vec<PendingMessage>,
    /// Newest message seen in a server fetch. Local confirms never move it,
    /// so peer messages committed before our own send are still fetched.
    fetched: Option<Uuid>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn confirmed(&self) -> &[Message] {
        &self.confirmed
    }

    pub fn pending(&self) -> &[PendingMessage] {
        &self.pending
    }

    /// Cursor for the next incremental fetch.
    pub fn cursor(&self) -> Option<Uuid> {
        self.fetched
    }

    /// Replaces confirmed messages with a full server snapshot.
    pub fn refresh(&mut self, snapshot: Vec<Message>) {
        self.confirmed.clear();
        self.fetched = None;
        self.apply_fetch(snapshot);
    }

    /// Merges the result of a `since = cursor()` fetch and advances the cursor.
    pub fn apply_fetch(&mut self, batch: Vec<Message>) -> usize {
        if let Some(newest) = batch.iter().max_by_key(|m| m.order_key()) {
            self.fetched = Some(newest.id);
        }
        self.merge(batch)
    }

    /// Merges a batch, ignoring ids already held. Returns how many were new.
    /// The fetch cursor is left alone.
    pub fn merge(&mut self, batch: Vec<Message>) -> usize {
        let mut known: HashSet<Uuid> = self.confirmed.iter().map(|m| m.id).collect();
        let before = self.confirmed.len();
        for message in batch {
            if known.insert(message.id) {
                self.confirmed.push(message);
            }
        }
        let added = self.confirmed.len() - before;
        if added > 0 {
            self.confirmed.sort_by_key(Message::order_key);
        }
        added
    }

    /// Stages an outgoing message and returns its local id.
    pub fn stage(&mut self, text: &str, attachment_ref: Option<&str>) -> Uuid {
        let local_id = Uuid::new_v4();
        self.pending.push(PendingMessage {
            local_id,
            text: text.to_string(),
            attachment_ref: attachment_ref.map(str::to_string),
            staged_at: Utc::now(),
        });
        local_id
    }

    /// Swaps a staged message for the server's copy.
    pub fn confirm(&mut self, local_id: Uuid, message: Message) -> bool {
        let staged = self.rollback(local_id).is_some();
        self.merge(vec![message]);
        staged
    }

    /// Drops a staged message after a failed send.
    pub fn rollback(&mut self, local_id: Uuid) -> Option<PendingMessage> {
        let pos = self.pending.iter().position(|p| p.local_id == local_id)?;
        Some(self.pending.remove(pos))
    }
}

/// Sends a message with optimistic staging; the staged copy is rolled back
/// and the error surfaced on failure. There is no automatic retry.
pub async fn send_message(
    engine: &MessagingEngine,
    who: &Identity,
    thread_id: Uuid,
    log: &Mutex<MessageLog>,
    req: NewMessage,
) -> Result<Message> {
    let local_id = with(log, |l| l.stage(&req.text, req.attachment_ref.as_deref()));

    match engine.append_message(who, thread_id, req).await {
        Ok(outcome) => {
            with(log, |l| l.confirm(local_id, outcome.message.clone()));
            Ok(outcome.message)
        }
        Err(e) => {
            with(log, |l| l.rollback(local_id));
            Err(e)
        }
    }
}

/// Polling intervals for the two client views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollCadence {
    pub threads: Duration,
    pub messages: Duration,
}

impl Default for PollCadence {
    fn default() -> Self {
        Self {
            threads: Duration::from_secs(3),
            messages: Duration::from_secs(3),
        }
    }
}

/// A background polling loop. Fetches immediately, then on every tick or
/// `refresh_now`. After `stop().await` returns, `apply` is never called again.
/// Dropping the handle also stops the loop, without waiting for it.
pub struct Poller {
    stop: Option<oneshot::Sender<()>>,
    refresh: Arc<Notify>,
    task: Option<JoinHandle<()>>,
}

impl Poller {
    pub fn spawn<T, F, Fut, A>(every: Duration, mut fetch: F, mut apply: A) -> Self
    where
        T: Send + 'static,
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        A: FnMut(T) + Send + 'static,
    {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let refresh = Arc::new(Notify::new());
        let wake = refresh.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => break,
                    _ = wake.notified() => ticker.reset(),
                    _ = ticker.tick() => {}
                }
                let fetched = tokio::select! {
                    biased;
                    _ = &mut stop_rx => break,
                    result = fetch() => result,
                };
                match fetched {
                    Ok(value) => apply(value),
                    // Reads are idempotent; the next tick is the retry.
                    Err(e) => warn!("poll failed: {e}"),
                }
            }
            debug!("poller stopped");
        });

        Self {
            stop: Some(stop_tx),
            refresh,
            task: Some(task),
        }
    }

    /// Re-fetches without waiting for the next tick (e.g. after a local mutation).
    pub fn refresh_now(&self) {
        self.refresh.notify_one();
    }

    pub async fn stop(mut self) {
        if let Some(tx) = self.stop.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        if let Some(tx) = self.stop.take() {
            let _ = tx.send(());
        }
    }
}

/// Polls the caller's thread list (own threads for patients, assigned
/// threads for doctors) into `view`.
pub fn watch_threads(
    engine: Arc<MessagingEngine>,
    who: Identity,
    every: Duration,
    view: Arc<Mutex<SyncedList<Thread>>>,
) -> Poller {
    Poller::spawn(
        every,
        move || {
            let engine = engine.clone();
            async move {
                match who.role {
                    Role::Patient => engine.list_my_threads(&who).await,
                    Role::Doctor => engine.list_assigned_threads(&who).await,
                }
            }
        },
        move |snapshot| {
            let delta = with(&*view, |v| v.refresh(snapshot));
            if !delta.is_empty() {
                debug!(
                    "thread list: {} added, {} changed, {} removed",
                    delta.added.len(),
                    delta.changed.len(),
                    delta.removed.len()
                );
            }
        },
    )
}

/// Polls one thread's messages into `log`, fetching only past its cursor.
pub fn watch_messages(
    engine: Arc<MessagingEngine>,
    who: Identity,
    thread_id: Uuid,
    every: Duration,
    log: Arc<Mutex<MessageLog>>,
) -> Poller {
    let reader = log.clone();
    Poller::spawn(
        every,
        move || {
            let engine = engine.clone();
            let since = with(&*reader, |l| l.cursor());
            async move { engine.get_thread_messages(&who, thread_id, since).await }
        },
        move |batch| {
            with(&*log, |l| l.apply_fetch(batch));
        },
    )
}

/// Runs `f` under the lock, recovering the data if a holder panicked.
fn with<S, R>(state: &Mutex<S>, f: impl FnOnce(&mut S) -> R) -> R {
    let mut guard = state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    f(&mut guard)
}
