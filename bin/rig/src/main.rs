//! MineCloud Rig — a headless authenticated session.
//!
//! Flow:
//! 1. Connect to the profile store & load the account by `SESSION_EMAIL`
//! 2. Run the accrual tick, sync push, and unread-chat recount on their
//!    own cadences under one cooperative loop
//! 3. On ctrl-c, push a final snapshot and exit
//!
//! This is the service analog of a logged-in client left open: profit
//! accrues only while some session process is running, and because
//! elapsed time is measured per device from its last accrual, a rig that
//! was down for an hour catches the fleet up on its first tick.

use std::time::Duration;

use eyre::{Result, eyre};
use minecloud_core::{Settings, telemetry};
use minecloud_engine::DeviceStatus;
use minecloud_storage::{self as storage, models::ChatMessage, repos};

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[tokio::main]
async fn main() -> Result<()> {
    // ── Initialisation ──────────────────────────────────────────────────
    telemetry::init();
    let settings = Settings::from_env()?;

    let email = std::env::var("SESSION_EMAIL")
        .map_err(|_| eyre!("SESSION_EMAIL must name the account to run"))?;

    tracing::info!(email = %email, "Starting MineCloud rig session");

    let pool = storage::connect(&settings.database_url).await?;
    tracing::info!("Connected to profile store");

    sqlx::migrate!("../../migrations").run(&pool).await?;

    // ── Load the ledger ─────────────────────────────────────────────────
    let stored = repos::fetch_profile(&pool, &email)
        .await?
        .ok_or_else(|| eyre!("no profile stored for {email}"))?;
    let mut user = stored.user;

    let running = user
        .devices
        .iter()
        .filter(|d| d.status == DeviceStatus::Running)
        .count();
    tracing::info!(
        balance = user.balance,
        devices = user.devices.len(),
        running,
        "Profile loaded"
    );

    // ── Session Loop ────────────────────────────────────────────────────
    let mut accrual =
        tokio::time::interval(Duration::from_secs(settings.accrual_tick_secs.max(1)));
    let mut sync = tokio::time::interval(Duration::from_secs(settings.sync_interval_secs.max(1)));
    let mut chat = tokio::time::interval(Duration::from_secs(1));

    let mut cache: Vec<ChatMessage> = Vec::new();
    let mut unread = 0usize;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Shutting down gracefully…");
                break;
            }
            _ = accrual.tick() => {
                let outcome = user.tick(now_ms());
                for instance_id in &outcome.completed {
                    tracing::info!(instance_id = %instance_id, "mining cycle completed");
                }
                if outcome.profit_delta > 0.0 {
                    tracing::debug!(
                        profit = outcome.profit_delta,
                        balance = user.balance,
                        "accrual tick"
                    );
                }
            }
            _ = sync.tick() => {
                // Best effort: a failed push is dropped and the next
                // interval sends the then-current snapshot.
                if let Err(e) = repos::upsert_profile(&pool, &user).await {
                    tracing::warn!(error = %e, "sync push failed");
                }
            }
            _ = chat.tick() => {
                let newest = cache.last().map(|m| m.sent_at_ms).unwrap_or(0);
                match repos::messages_since(&pool, newest).await {
                    Ok(mut fresh) => cache.append(&mut fresh),
                    Err(e) => tracing::debug!(error = %e, "unread poll skipped"),
                }
                let count = cache
                    .iter()
                    .filter(|m| m.sent_at_ms > user.last_seen_chat_ms
                        && m.sender_email != user.email)
                    .count();
                if count != unread {
                    unread = count;
                    tracing::info!(unread, "unread chat messages");
                }
            }
        }
    }

    // ── Final snapshot ──────────────────────────────────────────────────
    if let Err(e) = repos::upsert_profile(&pool, &user).await {
        tracing::warn!(error = %e, "final sync push failed");
    }

    tracing::info!("Rig session stopped.");
    Ok(())
}
