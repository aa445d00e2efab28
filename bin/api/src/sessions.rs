//! Authenticated session registry.
//!
//! Each session exclusively owns one in-memory ledger and a background
//! task driving the three periodic processes: the profit accrual tick,
//! the best-effort sync push, and the unread-chat recount. The task is
//! torn down together with the session on logout.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use minecloud_core::Settings;
use minecloud_engine::User;
use minecloud_storage::models::ChatMessage;
use minecloud_storage::{PgPool, repos};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Current wall-clock time in epoch milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub struct SessionHandle {
    pub email: String,
    pub user: Arc<RwLock<User>>,
    /// Badge count maintained by the unread-chat poll.
    pub unread_chat: Arc<AtomicUsize>,
    scheduler: JoinHandle<()>,
}

#[derive(Default)]
pub struct Sessions {
    inner: Mutex<HashMap<String, Arc<SessionHandle>>>,
}

impl Sessions {
    /// Open a session for an authenticated user and start its scheduler.
    /// Returns the bearer token identifying the session.
    pub async fn open(&self, pool: PgPool, settings: &Settings, user: User) -> String {
        let token = Uuid::new_v4().simple().to_string();
        let email = user.email.clone();
        let shared = Arc::new(RwLock::new(user));
        let unread = Arc::new(AtomicUsize::new(0));

        let scheduler = tokio::spawn(run_schedulers(
            pool,
            settings.clone(),
            Arc::clone(&shared),
            Arc::clone(&unread),
        ));

        let handle = Arc::new(SessionHandle {
            email: email.clone(),
            user: shared,
            unread_chat: unread,
            scheduler,
        });
        self.inner.lock().await.insert(token.clone(), handle);
        tracing::info!(email = %email, "session opened");
        token
    }

    pub async fn get(&self, token: &str) -> Option<Arc<SessionHandle>> {
        self.inner.lock().await.get(token).cloned()
    }

    /// Tear the session down: stop the scheduler and push a final
    /// best-effort snapshot so the store sees the latest ledger.
    pub async fn close(&self, token: &str, pool: &PgPool) -> bool {
        let Some(handle) = self.inner.lock().await.remove(token) else {
            return false;
        };
        handle.scheduler.abort();
        let snapshot = handle.user.read().await.clone();
        if let Err(e) = repos::upsert_profile(pool, &snapshot).await {
            tracing::warn!(error = %e, email = %handle.email, "final sync push failed");
        }
        tracing::info!(email = %handle.email, "session closed");
        true
    }
}

/// The per-session scheduler loop. All three processes interleave on one
/// task, so no two ledger mutations from this loop ever overlap.
async fn run_schedulers(
    pool: PgPool,
    settings: Settings,
    user: Arc<RwLock<User>>,
    unread: Arc<AtomicUsize>,
) {
    let mut accrual = tokio::time::interval(Duration::from_secs(settings.accrual_tick_secs.max(1)));
    let mut sync = tokio::time::interval(Duration::from_secs(settings.sync_interval_secs.max(1)));
    let mut chat = tokio::time::interval(Duration::from_secs(1));

    // Locally cached message list for the unread recount; grown
    // incrementally from the newest cached timestamp.
    let mut cache: Vec<ChatMessage> = Vec::new();

    loop {
        tokio::select! {
            _ = accrual.tick() => {
                let now = now_ms();
                let mut ledger = user.write().await;
                let outcome = ledger.tick(now);
                if !outcome.completed.is_empty() {
                    tracing::info!(
                        email = %ledger.email,
                        completed = outcome.completed.len(),
                        "mining cycles completed"
                    );
                }
            }
            _ = sync.tick() => {
                let snapshot = user.read().await.clone();
                if let Err(e) = repos::upsert_profile(&pool, &snapshot).await {
                    // Best effort: the next interval pushes the latest
                    // snapshot, so nothing is queued or retried here.
                    tracing::warn!(error = %e, email = %snapshot.email, "sync push failed");
                }
            }
            _ = chat.tick() => {
                let newest = cache.last().map(|m| m.sent_at_ms).unwrap_or(0);
                match repos::messages_since(&pool, newest).await {
                    Ok(mut fresh) => cache.append(&mut fresh),
                    Err(e) => tracing::debug!(error = %e, "unread poll skipped"),
                }
                let (last_seen, email) = {
                    let ledger = user.read().await;
                    (ledger.last_seen_chat_ms, ledger.email.clone())
                };
                let count = cache
                    .iter()
                    .filter(|m| m.sent_at_ms > last_seen && m.sender_email != email)
                    .count();
                unread.store(count, Ordering::Relaxed);
            }
        }
    }
}
