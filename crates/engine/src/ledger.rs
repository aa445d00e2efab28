//! The account ledger: the authoritative in-memory aggregate for one user.
//!
//! All mutations happen synchronously against this structure; persistence
//! is a whole-document snapshot pushed to the profile store afterwards.
//! Every operation validates its preconditions, applies the change, and
//! appends the transaction and notification records it implies.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::{CycleTier, DeviceDefinition, WELCOME_GIFT};
use crate::device::OwnedDevice;
use crate::error::LedgerError;

/// Notifications are a ring buffer: newest first, capped, oldest dropped.
pub const NOTIFICATION_CAP: usize = 20;

const CURRENCY: &str = "USDT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    Earning,
    Purchase,
    Upgrade,
    ReferralBonus,
}

/// A ledger entry. `Pending` is the only non-terminal status.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub amount: f64,
    pub kind: TransactionKind,
    pub status: TransactionStatus,
    pub created_at_ms: i64,
    pub currency: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub tx_hash: Option<String>,
    /// Fee withheld from the displayed payout of a withdrawal. The debit
    /// is still the gross amount.
    #[serde(default)]
    pub fee_amount: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Security,
    Profit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppNotification {
    pub id: String,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub created_at_ms: i64,
    pub is_read: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralEntry {
    pub email: String,
    pub joined_at_ms: i64,
    pub has_purchased: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    Admin,
}

/// Wallet limits and fees, injected from configuration.
#[derive(Debug, Clone, Copy)]
pub struct WalletPolicy {
    pub min_deposit: f64,
    pub min_withdrawal: f64,
    pub withdrawal_fee_percent: f64,
}

impl Default for WalletPolicy {
    fn default() -> Self {
        Self {
            min_deposit: 10.0,
            min_withdrawal: 10.0,
            withdrawal_fee_percent: 3.0,
        }
    }
}

impl WalletPolicy {
    pub fn fee(&self, amount: f64) -> f64 {
        amount * self.withdrawal_fee_percent / 100.0
    }

    /// The payout shown to the user; the ledger still debits gross.
    pub fn net_after_fee(&self, amount: f64) -> f64 {
        amount - self.fee(amount)
    }
}

/// Outcome of a successful withdrawal request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalReceipt {
    pub transaction_id: String,
    pub gross: f64,
    pub fee: f64,
    pub net: f64,
}

/// Aggregated result of one accrual tick across the whole fleet.
#[derive(Debug, Default, Clone)]
pub struct TickOutcome {
    pub profit_delta: f64,
    /// Instance ids of devices whose cycle completed during this tick.
    pub completed: Vec<String>,
}

impl TickOutcome {
    pub fn is_quiet(&self) -> bool {
        self.profit_delta == 0.0 && self.completed.is_empty()
    }
}

/// The full per-user record, persisted as one JSON document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    /// Opaque credential blob compared verbatim; hardening it is outside
    /// this core.
    #[serde(default)]
    pub password: Option<String>,
    pub balance: f64,
    pub total_deposits: f64,
    pub total_earnings: f64,
    pub referral_code: String,
    #[serde(default)]
    pub referred_by: Option<String>,
    #[serde(default)]
    pub referrals: Vec<ReferralEntry>,
    #[serde(default)]
    pub referral_count: u32,
    #[serde(default)]
    pub referral_earnings: f64,
    pub role: Role,
    #[serde(default)]
    pub devices: Vec<OwnedDevice>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub notifications: Vec<AppNotification>,
    #[serde(default)]
    pub has_seen_onboarding: bool,
    #[serde(default)]
    pub has_claimed_welcome_gift: bool,
    #[serde(default)]
    pub has_saved_recovery_key: bool,
    #[serde(default)]
    pub last_seen_chat_ms: i64,
}

impl User {
    /// Fresh account with zero balances and a generated referral code.
    pub fn register(
        email: &str,
        password: &str,
        referred_by: Option<String>,
        now_ms: i64,
    ) -> Self {
        let digits: u32 = rand::thread_rng().gen_range(1000..10000);
        Self {
            id: format!("USR-{}", Uuid::new_v4().simple()),
            email: email.trim().to_lowercase(),
            password: Some(password.to_string()),
            balance: 0.0,
            total_deposits: 0.0,
            total_earnings: 0.0,
            referral_code: format!("MINE-{digits}"),
            referred_by,
            referrals: Vec::new(),
            referral_count: 0,
            referral_earnings: 0.0,
            role: Role::User,
            devices: Vec::new(),
            transactions: Vec::new(),
            notifications: Vec::new(),
            has_seen_onboarding: false,
            has_claimed_welcome_gift: false,
            has_saved_recovery_key: false,
            last_seen_chat_ms: 0,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    // ── Wallet ──────────────────────────────────────────────────────────

    /// Request a deposit. The balance does not move until an admin
    /// approves the pending transaction.
    pub fn deposit(
        &mut self,
        amount: f64,
        tx_hash: Option<String>,
        policy: &WalletPolicy,
        now_ms: i64,
    ) -> Result<String, LedgerError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(LedgerError::InvalidAmount);
        }
        if amount < policy.min_deposit {
            return Err(LedgerError::BelowMinimum {
                minimum: policy.min_deposit,
            });
        }

        let tx = Transaction {
            id: format!("TX-DEP-{}", Uuid::new_v4().simple()),
            amount,
            kind: TransactionKind::Deposit,
            status: TransactionStatus::Pending,
            created_at_ms: now_ms,
            currency: CURRENCY.to_string(),
            address: None,
            tx_hash,
            fee_amount: None,
        };
        let id = tx.id.clone();
        self.transactions.insert(0, tx);
        self.push_notification(
            "Deposit requested",
            "Your transfer is being verified on the network.".to_string(),
            NotificationKind::Info,
            now_ms,
        );
        Ok(id)
    }

    /// Request a withdrawal. The gross amount is debited immediately; the
    /// fee only reduces the displayed payout and is recorded on the
    /// transaction so it stays visible in the ledger.
    pub fn withdraw(
        &mut self,
        amount: f64,
        address: &str,
        policy: &WalletPolicy,
        now_ms: i64,
    ) -> Result<WithdrawalReceipt, LedgerError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(LedgerError::InvalidAmount);
        }
        if amount < policy.min_withdrawal {
            return Err(LedgerError::BelowMinimum {
                minimum: policy.min_withdrawal,
            });
        }
        if amount > self.balance {
            return Err(LedgerError::InsufficientFunds {
                required: amount,
                available: self.balance,
            });
        }

        let fee = policy.fee(amount);
        let tx = Transaction {
            id: format!("TX-WDR-{}", Uuid::new_v4().simple()),
            amount,
            kind: TransactionKind::Withdrawal,
            status: TransactionStatus::Pending,
            created_at_ms: now_ms,
            currency: CURRENCY.to_string(),
            address: Some(address.to_string()),
            tx_hash: None,
            fee_amount: Some(fee),
        };
        let receipt = WithdrawalReceipt {
            transaction_id: tx.id.clone(),
            gross: amount,
            fee,
            net: policy.net_after_fee(amount),
        };
        self.balance -= amount;
        self.transactions.insert(0, tx);
        self.push_notification(
            "Withdrawal requested",
            "Your withdrawal request was received and is being processed.".to_string(),
            NotificationKind::Info,
            now_ms,
        );
        Ok(receipt)
    }

    // ── Devices ─────────────────────────────────────────────────────────

    /// Buy a device from the catalog: debit the price, record the
    /// completed purchase transaction, add the idle device to the fleet.
    pub fn purchase_device(
        &mut self,
        def: &DeviceDefinition,
        now_ms: i64,
    ) -> Result<String, LedgerError> {
        let device = OwnedDevice::purchase(def, self.balance, now_ms)?;
        let instance_id = device.instance_id.clone();

        self.balance -= def.price;
        self.devices.insert(0, device);
        self.transactions.insert(
            0,
            Transaction {
                id: format!("TX-PUR-{}", Uuid::new_v4().simple()),
                amount: def.price,
                kind: TransactionKind::Purchase,
                status: TransactionStatus::Completed,
                created_at_ms: now_ms,
                currency: CURRENCY.to_string(),
                address: None,
                tx_hash: None,
                fee_amount: None,
            },
        );
        self.push_notification(
            "Purchase complete",
            format!("You now own {}.", def.display_name),
            NotificationKind::Success,
            now_ms,
        );
        Ok(instance_id)
    }

    /// One-time grant of the pre-activated trial device.
    pub fn claim_welcome_gift(&mut self, now_ms: i64) -> Result<String, LedgerError> {
        if self.has_claimed_welcome_gift {
            return Err(LedgerError::GiftAlreadyClaimed);
        }
        let gift = OwnedDevice::welcome_gift(now_ms);
        let instance_id = gift.instance_id.clone();
        self.has_claimed_welcome_gift = true;
        self.devices.insert(0, gift);
        self.push_notification(
            "Welcome gift",
            format!("Your trial {} is already mining.", WELCOME_GIFT.display_name),
            NotificationKind::Profit,
            now_ms,
        );
        Ok(instance_id)
    }

    /// Start a cycle on an owned device.
    pub fn activate_cycle(
        &mut self,
        instance_id: &str,
        tier: CycleTier,
        now_ms: i64,
    ) -> Result<(), LedgerError> {
        let device = self
            .devices
            .iter_mut()
            .find(|d| d.instance_id == instance_id)
            .ok_or_else(|| LedgerError::DeviceNotFound(instance_id.to_string()))?;
        device.activate(tier, now_ms)?;
        let name = device.display_name.clone();
        let days = tier.duration_days();
        self.push_notification(
            "Mining started",
            format!("A {days}-day cycle is running on {name}."),
            NotificationKind::Success,
            now_ms,
        );
        Ok(())
    }

    /// One accrual tick over the whole fleet: every running device accrues
    /// once, the aggregate lands on the balance as a single increment, and
    /// each completing device emits one notification.
    pub fn tick(&mut self, now_ms: i64) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        let mut finished: Vec<(String, String)> = Vec::new();

        for device in &mut self.devices {
            let accrual = device.accrue(now_ms);
            outcome.profit_delta += accrual.profit_delta;
            if accrual.completed {
                finished.push((device.instance_id.clone(), device.display_name.clone()));
            }
        }

        if outcome.profit_delta > 0.0 {
            self.balance += outcome.profit_delta;
            self.total_earnings += outcome.profit_delta;
        }
        for (instance_id, name) in finished {
            self.push_notification(
                "Cycle complete",
                format!("The mining cycle on {name} has finished."),
                NotificationKind::Info,
                now_ms,
            );
            outcome.completed.push(instance_id);
        }
        outcome
    }

    // ── Admin mutations (applied to the target user's aggregate) ────────

    /// Approve a pending transaction. Deposit approval credits the balance
    /// and the lifetime deposit counter; withdrawal approval only settles
    /// the record (the debit already happened at request time).
    pub fn approve_transaction(&mut self, tx_id: &str) -> Result<(), LedgerError> {
        let tx = self
            .transactions
            .iter_mut()
            .find(|t| t.id == tx_id)
            .ok_or_else(|| LedgerError::TransactionNotFound(tx_id.to_string()))?;
        if tx.status != TransactionStatus::Pending {
            return Err(LedgerError::TransactionNotPending(tx_id.to_string()));
        }
        tx.status = TransactionStatus::Completed;
        if tx.kind == TransactionKind::Deposit {
            let amount = tx.amount;
            self.balance += amount;
            self.total_deposits += amount;
        }
        Ok(())
    }

    /// Reject a pending transaction. A rejected withdrawal refunds the
    /// debited amount.
    pub fn reject_transaction(&mut self, tx_id: &str) -> Result<(), LedgerError> {
        let tx = self
            .transactions
            .iter_mut()
            .find(|t| t.id == tx_id)
            .ok_or_else(|| LedgerError::TransactionNotFound(tx_id.to_string()))?;
        if tx.status != TransactionStatus::Pending {
            return Err(LedgerError::TransactionNotPending(tx_id.to_string()));
        }
        tx.status = TransactionStatus::Rejected;
        if tx.kind == TransactionKind::Withdrawal {
            let amount = tx.amount;
            self.balance += amount;
        }
        Ok(())
    }

    /// Direct balance edit from the admin panel.
    pub fn adjust_balance(&mut self, delta: f64) {
        self.balance += delta;
    }

    // ── Referrals ───────────────────────────────────────────────────────

    /// Record a newly registered referee on the referrer's ledger.
    pub fn record_referral(&mut self, email: &str, now_ms: i64) {
        self.referrals.push(ReferralEntry {
            email: email.to_lowercase(),
            joined_at_ms: now_ms,
            has_purchased: false,
        });
        self.referral_count += 1;
    }

    /// Flip the referee's entry once they make their first purchase.
    /// Returns false when no matching entry exists.
    pub fn mark_referral_purchased(&mut self, email: &str) -> bool {
        let email = email.to_lowercase();
        match self.referrals.iter_mut().find(|r| r.email == email) {
            Some(entry) => {
                entry.has_purchased = true;
                true
            }
            None => false,
        }
    }

    pub fn has_purchased(&self) -> bool {
        self.transactions
            .iter()
            .any(|t| t.kind == TransactionKind::Purchase)
    }

    // ── Notifications & flags ───────────────────────────────────────────

    pub fn push_notification(
        &mut self,
        title: &str,
        message: String,
        kind: NotificationKind,
        now_ms: i64,
    ) {
        self.notifications.insert(
            0,
            AppNotification {
                id: format!("NOT-{}", Uuid::new_v4().simple()),
                title: title.to_string(),
                message,
                kind,
                created_at_ms: now_ms,
                is_read: false,
            },
        );
        self.notifications.truncate(NOTIFICATION_CAP);
    }

    pub fn mark_notifications_read(&mut self) {
        for n in &mut self.notifications {
            n.is_read = true;
        }
    }

    pub fn clear_notifications(&mut self) {
        self.notifications.clear();
    }

    pub fn mark_chat_read(&mut self, now_ms: i64) {
        self.last_seen_chat_ms = now_ms;
    }

    pub fn complete_onboarding(&mut self) {
        self.has_seen_onboarding = true;
    }

    pub fn confirm_recovery_key_saved(&mut self) {
        self.has_saved_recovery_key = true;
    }

    pub fn toggle_role(&mut self) {
        self.role = match self.role {
            Role::User => Role::Admin,
            Role::Admin => Role::User,
        };
    }

    /// Base64 snapshot of the whole document, for the account export
    /// feature.
    pub fn export_blob(&self) -> Result<String, serde_json::Error> {
        serde_json::to_vec(self).map(|bytes| STANDARD.encode(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::find_definition;
    use crate::device::{DeviceStatus, MS_PER_DAY};

    const T0: i64 = 1_700_000_000_000;

    fn funded_user(balance: f64) -> User {
        let mut user = User::register("miner@example.com", "secret", None, T0);
        user.balance = balance;
        user
    }

    #[test]
    fn register_starts_from_zero() {
        let user = User::register(" Miner@Example.COM ", "secret", Some("MINE-1234".into()), T0);
        assert_eq!(user.email, "miner@example.com");
        assert_eq!(user.balance, 0.0);
        assert!(user.referral_code.starts_with("MINE-"));
        assert_eq!(user.referred_by.as_deref(), Some("MINE-1234"));
        assert!(!user.is_admin());
    }

    #[test]
    fn purchase_debits_exactly_and_records_everything() {
        let mut user = funded_user(100.0);
        let def = find_definition("pkg-2").unwrap();

        let instance_id = user.purchase_device(def, T0).unwrap();

        assert_eq!(user.balance, 60.0);
        assert_eq!(user.devices.len(), 1);
        assert_eq!(user.devices[0].instance_id, instance_id);
        assert_eq!(user.devices[0].status, DeviceStatus::Idle);
        assert_eq!(user.transactions[0].kind, TransactionKind::Purchase);
        assert_eq!(user.transactions[0].status, TransactionStatus::Completed);
        assert_eq!(user.notifications.len(), 1);
    }

    #[test]
    fn purchase_fails_without_funds() {
        let mut user = funded_user(11.0);
        let def = find_definition("pkg-1").unwrap();
        let err = user.purchase_device(def, T0).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
        assert_eq!(user.balance, 11.0);
        assert!(user.devices.is_empty());
        assert!(user.transactions.is_empty());
    }

    #[test]
    fn deposit_is_pending_and_leaves_balance_alone() {
        let mut user = funded_user(0.0);
        let policy = WalletPolicy::default();

        let err = user.deposit(9.99, None, &policy, T0).unwrap_err();
        assert_eq!(err, LedgerError::BelowMinimum { minimum: 10.0 });

        user.deposit(25.0, Some("0xabc".into()), &policy, T0).unwrap();
        assert_eq!(user.balance, 0.0);
        assert_eq!(user.transactions[0].status, TransactionStatus::Pending);
        assert_eq!(user.transactions[0].kind, TransactionKind::Deposit);
    }

    #[test]
    fn withdraw_debits_gross_and_reports_net() {
        let mut user = funded_user(100.0);
        let policy = WalletPolicy::default();

        let receipt = user.withdraw(50.0, "TX-wallet-addr", &policy, T0).unwrap();

        assert_eq!(user.balance, 50.0);
        assert_eq!(receipt.gross, 50.0);
        assert_eq!(receipt.fee, 1.5);
        assert_eq!(receipt.net, 48.5);
        assert_eq!(user.transactions[0].amount, 50.0);
        assert_eq!(user.transactions[0].fee_amount, Some(1.5));
        assert_eq!(user.transactions[0].status, TransactionStatus::Pending);
    }

    #[test]
    fn withdraw_gating() {
        let mut user = funded_user(100.0);
        let policy = WalletPolicy::default();

        assert_eq!(
            user.withdraw(9.0, "addr", &policy, T0).unwrap_err(),
            LedgerError::BelowMinimum { minimum: 10.0 }
        );
        assert!(matches!(
            user.withdraw(100.01, "addr", &policy, T0).unwrap_err(),
            LedgerError::InsufficientFunds { .. }
        ));
        assert_eq!(
            user.withdraw(-5.0, "addr", &policy, T0).unwrap_err(),
            LedgerError::InvalidAmount
        );
        assert_eq!(user.balance, 100.0);
    }

    #[test]
    fn gift_is_claimed_at_most_once() {
        let mut user = funded_user(0.0);
        user.claim_welcome_gift(T0).unwrap();
        assert!(user.has_claimed_welcome_gift);
        assert_eq!(user.devices[0].status, DeviceStatus::Running);

        let err = user.claim_welcome_gift(T0 + 1000).unwrap_err();
        assert_eq!(err, LedgerError::GiftAlreadyClaimed);
        assert_eq!(user.devices.len(), 1);
    }

    #[test]
    fn tick_aggregates_across_devices() {
        let mut user = funded_user(200.0);
        let def = find_definition("pkg-2").unwrap();
        let a = user.purchase_device(def, T0).unwrap();
        let b = user.purchase_device(def, T0).unwrap();
        user.activate_cycle(&a, CycleTier::MediumCycle, T0).unwrap();
        user.activate_cycle(&b, CycleTier::MediumCycle, T0).unwrap();

        let balance_before = user.balance;
        let earnings_before = user.total_earnings;
        let outcome = user.tick(T0 + 1000);

        let per_second = 40.0 * 2.5 / 100.0 / 86_400.0;
        assert!((outcome.profit_delta - 2.0 * per_second).abs() < 1e-12);
        assert!((user.balance - (balance_before + outcome.profit_delta)).abs() < 1e-12);
        assert!((user.total_earnings - (earnings_before + outcome.profit_delta)).abs() < 1e-12);
        assert!(outcome.completed.is_empty());
    }

    #[test]
    fn day_of_mining_converges_to_daily_value() {
        // $100 buys a $40 device, leaving $60. A 7-day cycle at 2.5%/day
        // earns $1.00 over the first 24 hours.
        let mut user = funded_user(100.0);
        let def = find_definition("pkg-2").unwrap();
        let id = user.purchase_device(def, T0).unwrap();
        assert_eq!(user.balance, 60.0);
        user.activate_cycle(&id, CycleTier::MediumCycle, T0).unwrap();
        assert_eq!(user.devices[0].expires_at_ms, Some(T0 + 604_800_000));

        let mut earned = 0.0;
        for i in 1..=86_400i64 {
            earned += user.tick(T0 + i * 1000).profit_delta;
        }
        assert!((earned - 1.0).abs() < 1e-6);
        assert!((user.balance - 61.0).abs() < 1e-6);
    }

    #[test]
    fn completion_emits_one_notification_per_device() {
        let mut user = funded_user(50.0);
        let def = find_definition("pkg-1").unwrap();
        let id = user.purchase_device(def, T0).unwrap();
        user.activate_cycle(&id, CycleTier::ShortCycle, T0).unwrap();

        user.clear_notifications();
        let outcome = user.tick(T0 + 3 * MS_PER_DAY);
        assert_eq!(outcome.completed, vec![id]);
        assert_eq!(user.notifications.len(), 1);
        assert_eq!(user.notifications[0].title, "Cycle complete");

        // A later tick on the completed fleet is quiet.
        let outcome = user.tick(T0 + 3 * MS_PER_DAY + 1000);
        assert!(outcome.is_quiet());
        assert_eq!(user.notifications.len(), 1);
    }

    #[test]
    fn notification_buffer_caps_at_twenty() {
        let mut user = funded_user(0.0);
        for i in 0..21 {
            user.push_notification("t", format!("message {i}"), NotificationKind::Info, T0 + i);
        }
        assert_eq!(user.notifications.len(), NOTIFICATION_CAP);
        // Newest first; the oldest (message 0) was evicted.
        assert_eq!(user.notifications[0].message, "message 20");
        assert_eq!(user.notifications[19].message, "message 1");
    }

    #[test]
    fn approve_deposit_credits_balance() {
        let mut user = funded_user(0.0);
        let policy = WalletPolicy::default();
        let tx_id = user.deposit(40.0, None, &policy, T0).unwrap();

        user.approve_transaction(&tx_id).unwrap();
        assert_eq!(user.balance, 40.0);
        assert_eq!(user.total_deposits, 40.0);

        // Terminal status: a second approval is rejected.
        let err = user.approve_transaction(&tx_id).unwrap_err();
        assert_eq!(err, LedgerError::TransactionNotPending(tx_id));
        assert_eq!(user.balance, 40.0);
    }

    #[test]
    fn reject_withdrawal_refunds_gross() {
        let mut user = funded_user(100.0);
        let policy = WalletPolicy::default();
        let receipt = user.withdraw(30.0, "addr", &policy, T0).unwrap();
        assert_eq!(user.balance, 70.0);

        user.reject_transaction(&receipt.transaction_id).unwrap();
        assert_eq!(user.balance, 100.0);
        assert_eq!(user.transactions[0].status, TransactionStatus::Rejected);
    }

    #[test]
    fn approving_a_withdrawal_settles_without_moving_funds() {
        let mut user = funded_user(100.0);
        let policy = WalletPolicy::default();
        let receipt = user.withdraw(30.0, "addr", &policy, T0).unwrap();

        user.approve_transaction(&receipt.transaction_id).unwrap();
        assert_eq!(user.balance, 70.0);
        assert_eq!(user.transactions[0].status, TransactionStatus::Completed);
    }

    #[test]
    fn referral_lifecycle() {
        let mut referrer = funded_user(0.0);
        referrer.record_referral("friend@example.com", T0);
        assert_eq!(referrer.referral_count, 1);
        assert!(!referrer.referrals[0].has_purchased);

        assert!(referrer.mark_referral_purchased("Friend@Example.com"));
        assert!(referrer.referrals[0].has_purchased);
        assert!(!referrer.mark_referral_purchased("stranger@example.com"));
    }

    #[test]
    fn read_and_clear_notifications() {
        let mut user = funded_user(0.0);
        user.push_notification("a", "b".into(), NotificationKind::Warning, T0);
        user.mark_notifications_read();
        assert!(user.notifications.iter().all(|n| n.is_read));
        user.clear_notifications();
        assert!(user.notifications.is_empty());
    }

    #[test]
    fn export_round_trips_through_base64() {
        let mut user = funded_user(42.0);
        user.claim_welcome_gift(T0).unwrap();
        let blob = user.export_blob().unwrap();

        let bytes = STANDARD.decode(blob).unwrap();
        let restored: User = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(restored.email, user.email);
        assert_eq!(restored.balance, 42.0);
        assert_eq!(restored.devices.len(), 1);
    }
}
