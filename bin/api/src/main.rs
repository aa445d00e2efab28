//! MineCloud API server — the operation surface over the account ledger.
//!
//! Authenticated sessions are held in memory; each one owns its ledger
//! exclusively and runs the accrual/sync/unread schedulers until logout.
//! Admin endpoints operate on the *persisted* record of the target user
//! through versioned writes, never on the caller's own session.

mod sessions;

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    routing::{delete, get, post},
};
use minecloud_core::{Settings, telemetry};
use minecloud_engine::{
    CycleTier, DEVICE_CATALOG, Transaction, User, WalletPolicy, WithdrawalReceipt, find_definition,
};
use minecloud_storage::models::NewChatMessage;
use minecloud_storage::{self as storage, PgPool, StoreError, repos};
use serde::{Deserialize, Serialize};

use crate::sessions::{SessionHandle, Sessions, now_ms};

/// Shared application state.
struct AppState {
    pool: PgPool,
    settings: Settings,
    sessions: Sessions,
}

#[tokio::main]
async fn main() {
    telemetry::init();
    let settings = Settings::from_env().expect("Failed to load settings");

    tracing::info!("Starting MineCloud API server");

    let pool = storage::connect(&settings.database_url)
        .await
        .expect("Failed to connect to database");

    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    tracing::info!("Profile store ready");

    let port = settings.api_port;
    let state = Arc::new(AppState {
        pool,
        settings,
        sessions: Sessions::default(),
    });

    let app = Router::new()
        .route("/api/v1/auth/register", post(register))
        .route("/api/v1/auth/login", post(login))
        .route("/api/v1/auth/reset-password", post(reset_password))
        .route("/api/v1/auth/exists/:email", get(email_exists))
        .route("/api/v1/session/logout", post(logout))
        .route("/api/v1/market/catalog", get(catalog))
        .route("/api/v1/account", get(account))
        .route("/api/v1/account/export", get(account_export))
        .route("/api/v1/account/onboarding", post(complete_onboarding))
        .route("/api/v1/account/recovery-key", post(confirm_recovery_key))
        .route("/api/v1/account/toggle-role", post(toggle_role))
        .route("/api/v1/wallet/deposit", post(deposit))
        .route("/api/v1/wallet/withdraw", post(withdraw))
        .route("/api/v1/devices/purchase", post(purchase_device))
        .route("/api/v1/devices/gift", post(claim_gift))
        .route("/api/v1/devices/:instance_id/activate", post(activate_cycle))
        .route("/api/v1/notifications/read", post(notifications_read))
        .route("/api/v1/notifications", delete(notifications_clear))
        .route("/api/v1/chat/send", post(chat_send))
        .route("/api/v1/chat/read", post(chat_read))
        .route("/api/v1/chat/unread", get(chat_unread))
        .route("/api/v1/admin/users", get(admin_users))
        .route("/api/v1/admin/pending", get(admin_pending))
        .route("/api/v1/admin/tx/:user_id/:tx_id/approve", post(admin_approve))
        .route("/api/v1/admin/tx/:user_id/:tx_id/reject", post(admin_reject))
        .route("/api/v1/admin/balance", post(admin_adjust_balance))
        .route("/health", get(health))
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind API port");
    axum::serve(listener, app).await.expect("Server error");
}

// ─── Request / Response Types ───────────────────────────────────────────────

#[derive(Serialize)]
struct ApiResponse<T: Serialize> {
    success: bool,
    data: T,
}

type ApiError = (StatusCode, Json<ApiResponse<String>>);

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    email: String,
    password: String,
    #[serde(default)]
    referral_code: Option<String>,
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResetPasswordRequest {
    email: String,
    new_password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DepositRequest {
    amount: f64,
    #[serde(default)]
    tx_hash: Option<String>,
}

#[derive(Deserialize)]
struct WithdrawRequest {
    amount: f64,
    address: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PurchaseRequest {
    definition_id: String,
}

#[derive(Deserialize)]
struct ActivateRequest {
    tier: CycleTier,
}

#[derive(Deserialize)]
struct ChatSendRequest {
    body: String,
}

#[derive(Deserialize)]
struct BalanceAdjustRequest {
    email: String,
    delta: f64,
}

#[derive(Serialize)]
struct SessionResponse {
    token: String,
    user: User,
}

#[derive(Serialize)]
struct ExistsResponse {
    exists: bool,
}

#[derive(Serialize)]
struct ExportResponse {
    blob: String,
}

#[derive(Serialize)]
struct UnreadResponse {
    unread: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WithdrawResponse {
    receipt: WithdrawalReceipt,
    balance: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PendingEntry {
    user_id: String,
    email: String,
    transaction: Transaction,
}

// ─── Helpers ────────────────────────────────────────────────────────────────

fn json_ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data,
    })
}

fn api_err(status: StatusCode, msg: impl Into<String>) -> ApiError {
    (
        status,
        Json(ApiResponse {
            success: false,
            data: msg.into(),
        }),
    )
}

/// Validation failures are the caller's problem, not the server's.
fn ledger_err(e: minecloud_engine::LedgerError) -> ApiError {
    api_err(StatusCode::BAD_REQUEST, e.to_string())
}

fn store_err(e: StoreError) -> ApiError {
    match e {
        StoreError::Conflict => api_err(
            StatusCode::CONFLICT,
            "record was modified concurrently; retry",
        ),
        other => api_err(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
    }
}

fn wallet_policy(settings: &Settings) -> WalletPolicy {
    WalletPolicy {
        min_deposit: settings.min_deposit,
        min_withdrawal: settings.min_withdrawal,
        withdrawal_fee_percent: settings.withdrawal_fee_percent,
    }
}

async fn require_session(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Arc<SessionHandle>, ApiError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| api_err(StatusCode::UNAUTHORIZED, "missing bearer token"))?;
    state
        .sessions
        .get(token)
        .await
        .ok_or_else(|| api_err(StatusCode::UNAUTHORIZED, "unknown session"))
}

async fn require_admin(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Arc<SessionHandle>, ApiError> {
    let session = require_session(state, headers).await?;
    if !session.user.read().await.is_admin() {
        return Err(api_err(StatusCode::FORBIDDEN, "admin role required"));
    }
    Ok(session)
}

/// Immediate best-effort push after a user-triggered mutation. On failure
/// the in-memory ledger stays authoritative until the next sync interval.
async fn push_snapshot(pool: &PgPool, user: &User) {
    if let Err(e) = repos::upsert_profile(pool, user).await {
        tracing::warn!(error = %e, email = %user.email, "snapshot push failed");
    }
}

/// Record a signup against the referrer's ledger. Best effort: a missing
/// code or a lost version race never fails the registration itself.
async fn record_referral_signup(pool: &PgPool, code: &str, referee_email: &str) {
    match repos::find_profile_by_referral_code(pool, code).await {
        Ok(Some(stored)) => {
            let mut referrer = stored.user;
            referrer.record_referral(referee_email, now_ms());
            if let Err(e) = repos::upsert_profile_versioned(pool, &referrer, stored.version).await {
                tracing::warn!(error = %e, code, "referral signup not recorded");
            }
        }
        Ok(None) => tracing::debug!(code, "referral code matches no profile"),
        Err(e) => tracing::warn!(error = %e, code, "referral lookup failed"),
    }
}

/// Flip the referee's entry on the referrer's ledger after their first
/// purchase. Best effort, same as signup recording.
async fn record_referral_purchase(pool: &PgPool, code: &str, referee_email: &str) {
    match repos::find_profile_by_referral_code(pool, code).await {
        Ok(Some(stored)) => {
            let mut referrer = stored.user;
            if referrer.mark_referral_purchased(referee_email) {
                if let Err(e) =
                    repos::upsert_profile_versioned(pool, &referrer, stored.version).await
                {
                    tracing::warn!(error = %e, code, "referral purchase not recorded");
                }
            }
        }
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, code, "referral lookup failed"),
    }
}

// ─── Handlers: health & catalog ─────────────────────────────────────────────

async fn health() -> &'static str {
    "ok"
}

/// GET /api/v1/market/catalog — the fixed device market.
async fn catalog() -> Json<ApiResponse<&'static [minecloud_engine::DeviceDefinition]>> {
    json_ok(&DEVICE_CATALOG[..])
}

// ─── Handlers: auth & session ───────────────────────────────────────────────

/// POST /api/v1/auth/register — create a profile and open a session.
async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<ApiResponse<SessionResponse>>, ApiError> {
    let mut user = User::register(&req.email, &req.password, req.referral_code.clone(), now_ms());
    user.push_notification(
        "Welcome!",
        "Your account was created successfully.".to_string(),
        minecloud_engine::NotificationKind::Success,
        now_ms(),
    );

    let created = repos::insert_profile(&state.pool, &user)
        .await
        .map_err(store_err)?;
    if !created {
        return Err(api_err(StatusCode::CONFLICT, "email already registered"));
    }

    if let Some(code) = &req.referral_code {
        record_referral_signup(&state.pool, code, &user.email).await;
    }

    let token = state
        .sessions
        .open(state.pool.clone(), &state.settings, user.clone())
        .await;
    Ok(json_ok(SessionResponse { token, user }))
}

/// POST /api/v1/auth/login — verify credentials and open a session.
async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<SessionResponse>>, ApiError> {
    let stored = repos::fetch_profile(&state.pool, &req.email)
        .await
        .map_err(store_err)?;

    let mut user = match stored {
        Some(p) if p.user.password.as_deref() == Some(req.password.as_str()) => p.user,
        // Same generic failure for a wrong password and an unknown email.
        _ => return Err(api_err(StatusCode::UNAUTHORIZED, "invalid credentials")),
    };

    user.push_notification(
        "Signed in",
        "Welcome back to MineCloud.".to_string(),
        minecloud_engine::NotificationKind::Success,
        now_ms(),
    );

    let token = state
        .sessions
        .open(state.pool.clone(), &state.settings, user.clone())
        .await;
    Ok(json_ok(SessionResponse { token, user }))
}

/// POST /api/v1/auth/reset-password.
async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<ApiResponse<&'static str>>, ApiError> {
    let stored = repos::fetch_profile(&state.pool, &req.email)
        .await
        .map_err(store_err)?
        .ok_or_else(|| api_err(StatusCode::NOT_FOUND, "unknown account"))?;

    let mut user = stored.user;
    user.password = Some(req.new_password);
    user.push_notification(
        "Password changed",
        "Your password was updated successfully.".to_string(),
        minecloud_engine::NotificationKind::Security,
        now_ms(),
    );
    repos::upsert_profile(&state.pool, &user)
        .await
        .map_err(store_err)?;
    Ok(json_ok("password updated"))
}

/// GET /api/v1/auth/exists/:email.
async fn email_exists(
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
) -> Result<Json<ApiResponse<ExistsResponse>>, ApiError> {
    let exists = repos::email_exists(&state.pool, &email)
        .await
        .map_err(store_err)?;
    Ok(json_ok(ExistsResponse { exists }))
}

/// POST /api/v1/session/logout — tear down the scheduler and session.
async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<&'static str>>, ApiError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| api_err(StatusCode::UNAUTHORIZED, "missing bearer token"))?;
    if state.sessions.close(token, &state.pool).await {
        Ok(json_ok("session closed"))
    } else {
        Err(api_err(StatusCode::UNAUTHORIZED, "unknown session"))
    }
}

// ─── Handlers: account ──────────────────────────────────────────────────────

/// GET /api/v1/account — current in-memory ledger snapshot.
async fn account(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let session = require_session(&state, &headers).await?;
    let snapshot = session.user.read().await.clone();
    Ok(json_ok(snapshot))
}

/// GET /api/v1/account/export — base64 blob of the full document.
async fn account_export(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<ExportResponse>>, ApiError> {
    let session = require_session(&state, &headers).await?;
    let blob = session
        .user
        .read()
        .await
        .export_blob()
        .map_err(|e| api_err(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(json_ok(ExportResponse { blob }))
}

/// POST /api/v1/account/onboarding.
async fn complete_onboarding(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let session = require_session(&state, &headers).await?;
    let snapshot = {
        let mut ledger = session.user.write().await;
        ledger.complete_onboarding();
        ledger.clone()
    };
    push_snapshot(&state.pool, &snapshot).await;
    Ok(json_ok(snapshot))
}

/// POST /api/v1/account/recovery-key.
async fn confirm_recovery_key(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let session = require_session(&state, &headers).await?;
    let snapshot = {
        let mut ledger = session.user.write().await;
        ledger.confirm_recovery_key_saved();
        ledger.clone()
    };
    push_snapshot(&state.pool, &snapshot).await;
    Ok(json_ok(snapshot))
}

// ─── Handlers: wallet ───────────────────────────────────────────────────────

/// POST /api/v1/wallet/deposit — records a pending deposit request.
async fn deposit(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<DepositRequest>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    let session = require_session(&state, &headers).await?;
    let policy = wallet_policy(&state.settings);
    let (tx_id, snapshot) = {
        let mut ledger = session.user.write().await;
        let tx_id = ledger
            .deposit(req.amount, req.tx_hash, &policy, now_ms())
            .map_err(ledger_err)?;
        (tx_id, ledger.clone())
    };
    push_snapshot(&state.pool, &snapshot).await;
    Ok(json_ok(tx_id))
}

/// POST /api/v1/wallet/withdraw — debits gross, reports the net payout.
async fn withdraw(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<WithdrawRequest>,
) -> Result<Json<ApiResponse<WithdrawResponse>>, ApiError> {
    let session = require_session(&state, &headers).await?;
    let policy = wallet_policy(&state.settings);
    let (receipt, snapshot) = {
        let mut ledger = session.user.write().await;
        let receipt = ledger
            .withdraw(req.amount, &req.address, &policy, now_ms())
            .map_err(ledger_err)?;
        (receipt, ledger.clone())
    };
    push_snapshot(&state.pool, &snapshot).await;
    Ok(json_ok(WithdrawResponse {
        balance: snapshot.balance,
        receipt,
    }))
}

// ─── Handlers: devices ──────────────────────────────────────────────────────

/// POST /api/v1/devices/purchase.
async fn purchase_device(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<PurchaseRequest>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let session = require_session(&state, &headers).await?;
    let def = find_definition(&req.definition_id).ok_or_else(|| {
        ledger_err(minecloud_engine::LedgerError::UnknownDefinition(
            req.definition_id.clone(),
        ))
    })?;

    let (snapshot, first_purchase) = {
        let mut ledger = session.user.write().await;
        let first = !ledger.has_purchased();
        ledger.purchase_device(def, now_ms()).map_err(ledger_err)?;
        (ledger.clone(), first)
    };
    push_snapshot(&state.pool, &snapshot).await;

    if first_purchase {
        if let Some(code) = &snapshot.referred_by {
            record_referral_purchase(&state.pool, code, &snapshot.email).await;
        }
    }
    Ok(json_ok(snapshot))
}

/// POST /api/v1/devices/gift — one-time welcome gift claim.
async fn claim_gift(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let session = require_session(&state, &headers).await?;
    let snapshot = {
        let mut ledger = session.user.write().await;
        ledger.claim_welcome_gift(now_ms()).map_err(ledger_err)?;
        ledger.clone()
    };
    push_snapshot(&state.pool, &snapshot).await;
    Ok(json_ok(snapshot))
}

/// POST /api/v1/devices/:instance_id/activate.
async fn activate_cycle(
    State(state): State<Arc<AppState>>,
    Path(instance_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<ActivateRequest>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let session = require_session(&state, &headers).await?;
    let snapshot = {
        let mut ledger = session.user.write().await;
        ledger
            .activate_cycle(&instance_id, req.tier, now_ms())
            .map_err(ledger_err)?;
        ledger.clone()
    };
    push_snapshot(&state.pool, &snapshot).await;
    Ok(json_ok(snapshot))
}

/// POST /api/v1/account/toggle-role — demo switch between user and admin.
async fn toggle_role(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let session = require_session(&state, &headers).await?;
    let snapshot = {
        let mut ledger = session.user.write().await;
        ledger.toggle_role();
        ledger.clone()
    };
    push_snapshot(&state.pool, &snapshot).await;
    Ok(json_ok(snapshot))
}

// ─── Handlers: notifications & chat ─────────────────────────────────────────

/// POST /api/v1/notifications/read.
async fn notifications_read(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let session = require_session(&state, &headers).await?;
    let snapshot = {
        let mut ledger = session.user.write().await;
        ledger.mark_notifications_read();
        ledger.clone()
    };
    push_snapshot(&state.pool, &snapshot).await;
    Ok(json_ok(snapshot))
}

/// DELETE /api/v1/notifications.
async fn notifications_clear(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let session = require_session(&state, &headers).await?;
    let snapshot = {
        let mut ledger = session.user.write().await;
        ledger.clear_notifications();
        ledger.clone()
    };
    push_snapshot(&state.pool, &snapshot).await;
    Ok(json_ok(snapshot))
}

/// POST /api/v1/chat/send — append a message to the support chat.
async fn chat_send(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ChatSendRequest>,
) -> Result<Json<ApiResponse<&'static str>>, ApiError> {
    let session = require_session(&state, &headers).await?;
    let msg = NewChatMessage {
        sender_email: session.email.clone(),
        body: req.body,
        sent_at_ms: now_ms(),
    };
    repos::insert_message(&state.pool, &msg)
        .await
        .map_err(store_err)?;
    Ok(json_ok("sent"))
}

/// POST /api/v1/chat/read — moves the unread watermark to now.
async fn chat_read(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<&'static str>>, ApiError> {
    let session = require_session(&state, &headers).await?;
    session.user.write().await.mark_chat_read(now_ms());
    Ok(json_ok("chat marked read"))
}

/// GET /api/v1/chat/unread — the badge count maintained by the poll.
async fn chat_unread(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<UnreadResponse>>, ApiError> {
    let session = require_session(&state, &headers).await?;
    Ok(json_ok(UnreadResponse {
        unread: session.unread_chat.load(Ordering::Relaxed),
    }))
}

// ─── Handlers: admin ────────────────────────────────────────────────────────

/// GET /api/v1/admin/users — every stored profile.
async fn admin_users(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<Vec<User>>>, ApiError> {
    require_admin(&state, &headers).await?;
    let profiles = repos::list_profiles(&state.pool).await.map_err(store_err)?;
    Ok(json_ok(profiles.into_iter().map(|p| p.user).collect()))
}

/// GET /api/v1/admin/pending — pending transactions across all users.
async fn admin_pending(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<Vec<PendingEntry>>>, ApiError> {
    require_admin(&state, &headers).await?;
    let profiles = repos::list_profiles(&state.pool).await.map_err(store_err)?;

    let mut pending = Vec::new();
    for profile in profiles {
        for tx in &profile.user.transactions {
            if tx.status == minecloud_engine::TransactionStatus::Pending {
                pending.push(PendingEntry {
                    user_id: profile.user.id.clone(),
                    email: profile.user.email.clone(),
                    transaction: tx.clone(),
                });
            }
        }
    }
    pending.sort_by_key(|e| std::cmp::Reverse(e.transaction.created_at_ms));
    Ok(json_ok(pending))
}

/// POST /api/v1/admin/tx/:user_id/:tx_id/approve.
///
/// Loads the target's persisted record, applies the approval, and writes
/// it back with a version check so racing admins cannot clobber each
/// other silently.
async fn admin_approve(
    State(state): State<Arc<AppState>>,
    Path((user_id, tx_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<&'static str>>, ApiError> {
    require_admin(&state, &headers).await?;
    let stored = repos::find_profile_by_user_id(&state.pool, &user_id)
        .await
        .map_err(store_err)?
        .ok_or_else(|| api_err(StatusCode::NOT_FOUND, "user not found"))?;

    let mut target = stored.user;
    target.approve_transaction(&tx_id).map_err(ledger_err)?;
    repos::upsert_profile_versioned(&state.pool, &target, stored.version)
        .await
        .map_err(store_err)?;
    tracing::info!(user_id, tx_id, "transaction approved");
    Ok(json_ok("approved"))
}

/// POST /api/v1/admin/tx/:user_id/:tx_id/reject.
async fn admin_reject(
    State(state): State<Arc<AppState>>,
    Path((user_id, tx_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<&'static str>>, ApiError> {
    require_admin(&state, &headers).await?;
    let stored = repos::find_profile_by_user_id(&state.pool, &user_id)
        .await
        .map_err(store_err)?
        .ok_or_else(|| api_err(StatusCode::NOT_FOUND, "user not found"))?;

    let mut target = stored.user;
    target.reject_transaction(&tx_id).map_err(ledger_err)?;
    repos::upsert_profile_versioned(&state.pool, &target, stored.version)
        .await
        .map_err(store_err)?;
    tracing::info!(user_id, tx_id, "transaction rejected");
    Ok(json_ok("rejected"))
}

/// POST /api/v1/admin/balance — direct balance edit by email.
async fn admin_adjust_balance(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<BalanceAdjustRequest>,
) -> Result<Json<ApiResponse<f64>>, ApiError> {
    require_admin(&state, &headers).await?;
    let stored = repos::fetch_profile(&state.pool, &req.email)
        .await
        .map_err(store_err)?
        .ok_or_else(|| api_err(StatusCode::NOT_FOUND, "user not found"))?;

    let mut target = stored.user;
    target.adjust_balance(req.delta);
    let new_balance = target.balance;
    repos::upsert_profile_versioned(&state.pool, &target, stored.version)
        .await
        .map_err(store_err)?;
    tracing::info!(email = %req.email, delta = req.delta, "balance adjusted");
    Ok(json_ok(new_balance))
}
