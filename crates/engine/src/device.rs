//! Lifecycle of one owned mining device.
//!
//! A device moves `Idle → Running → Completed`, and a `Completed` device
//! may be re-activated into a fresh cycle. Instances are never deleted;
//! the owner's fleet only grows.
//!
//! Profit accrues continuously while a device is `Running`. Each accrual
//! evaluation measures elapsed wall-clock time from the stored
//! `last_accrual_ms`, so a process that was suspended for an hour catches
//! up in a single call instead of losing the interval.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::{CycleTier, DeviceDefinition, WELCOME_GIFT};
use crate::error::LedgerError;

pub const MS_PER_DAY: i64 = 86_400_000;
const SECS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceStatus {
    Idle,
    Running,
    Completed,
}

/// One unit of owned virtual mining hardware.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnedDevice {
    pub instance_id: String,
    pub definition_id: String,
    pub display_name: String,
    /// Price snapshot taken at purchase; later catalog changes do not
    /// retroactively alter owned economics.
    pub price_at_purchase: f64,
    pub status: DeviceStatus,
    pub purchased_at_ms: i64,
    pub activated_at_ms: Option<i64>,
    pub expires_at_ms: Option<i64>,
    pub active_duration_days: Option<u32>,
    pub active_daily_rate_percent: Option<f64>,
    /// Timestamp of the last accrual evaluation for the current cycle.
    #[serde(default)]
    pub last_accrual_ms: Option<i64>,
    pub daily_profit_estimate: f64,
}

/// Result of one accrual evaluation.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Accrual {
    pub profit_delta: f64,
    /// True exactly once per cycle, on the call that crossed the expiry.
    pub completed: bool,
}

impl OwnedDevice {
    /// Buy a device from the catalog. The new instance starts `Idle`;
    /// debiting the balance is the caller's responsibility.
    pub fn purchase(
        def: &DeviceDefinition,
        balance: f64,
        now_ms: i64,
    ) -> Result<Self, LedgerError> {
        if balance < def.price {
            return Err(LedgerError::InsufficientFunds {
                required: def.price,
                available: balance,
            });
        }
        Ok(Self {
            instance_id: format!("DEV-{}", Uuid::new_v4().simple()),
            definition_id: def.id.to_string(),
            display_name: def.display_name.to_string(),
            price_at_purchase: def.price,
            status: DeviceStatus::Idle,
            purchased_at_ms: now_ms,
            activated_at_ms: None,
            expires_at_ms: None,
            active_duration_days: None,
            active_daily_rate_percent: None,
            last_accrual_ms: None,
            daily_profit_estimate: def.price * def.daily_profit_percent / 100.0,
        })
    }

    /// The one-time welcome gift arrives pre-activated: a 24-hour cycle at
    /// a rate tuned to pay out the full $5 device value.
    pub fn welcome_gift(now_ms: i64) -> Self {
        Self {
            instance_id: format!("GIFT-{}", Uuid::new_v4().simple()),
            definition_id: WELCOME_GIFT.id.to_string(),
            display_name: WELCOME_GIFT.display_name.to_string(),
            price_at_purchase: WELCOME_GIFT.price,
            status: DeviceStatus::Running,
            purchased_at_ms: now_ms,
            activated_at_ms: Some(now_ms),
            expires_at_ms: Some(now_ms + WELCOME_GIFT.duration_days as i64 * MS_PER_DAY),
            active_duration_days: Some(WELCOME_GIFT.duration_days),
            active_daily_rate_percent: Some(WELCOME_GIFT.daily_profit_percent),
            last_accrual_ms: Some(now_ms),
            daily_profit_estimate: WELCOME_GIFT.price * WELCOME_GIFT.daily_profit_percent / 100.0,
        }
    }

    /// Start a profit cycle. Valid from `Idle` and from `Completed` (a
    /// finished device can be restarted immediately); a device that is
    /// already `Running` rejects the call.
    pub fn activate(&mut self, tier: CycleTier, now_ms: i64) -> Result<(), LedgerError> {
        if self.status == DeviceStatus::Running {
            return Err(LedgerError::AlreadyRunning(self.instance_id.clone()));
        }
        self.status = DeviceStatus::Running;
        self.activated_at_ms = Some(now_ms);
        self.expires_at_ms = Some(now_ms + tier.duration_days() as i64 * MS_PER_DAY);
        self.active_duration_days = Some(tier.duration_days());
        self.active_daily_rate_percent = Some(tier.daily_rate_percent());
        self.last_accrual_ms = Some(now_ms);
        Ok(())
    }

    /// Evaluate profit since the previous evaluation.
    ///
    /// A non-`Running` device yields nothing. Crossing the expiry
    /// transitions the device to `Completed` with a zero delta: the
    /// remainder of the final partial interval is not back-filled, so the
    /// completion is observable exactly once and never over-pays.
    pub fn accrue(&mut self, now_ms: i64) -> Accrual {
        if self.status != DeviceStatus::Running {
            return Accrual::default();
        }
        let Some(expiry) = self.expires_at_ms else {
            return Accrual::default();
        };
        if now_ms >= expiry {
            self.status = DeviceStatus::Completed;
            self.last_accrual_ms = Some(now_ms);
            return Accrual {
                profit_delta: 0.0,
                completed: true,
            };
        }

        let since = self
            .last_accrual_ms
            .or(self.activated_at_ms)
            .unwrap_or(now_ms);
        let elapsed_ms = (now_ms - since).max(0);
        self.last_accrual_ms = Some(now_ms);

        let daily_value =
            self.price_at_purchase * self.active_daily_rate_percent.unwrap_or(0.0) / 100.0;
        Accrual {
            profit_delta: elapsed_ms as f64 / 1000.0 * daily_value / SECS_PER_DAY,
            completed: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::find_definition;

    const T0: i64 = 1_700_000_000_000;

    fn running_device(price: f64, tier: CycleTier) -> OwnedDevice {
        let def = DeviceDefinition {
            id: "pkg-test",
            display_name: "Test Rig",
            price,
            duration_days: 30,
            daily_profit_percent: 2.5,
            hashrate_label: "1 TH/s",
            icon_ref: "assets/test.jpg",
        };
        let mut dev = OwnedDevice::purchase(&def, price, T0).unwrap();
        dev.activate(tier, T0).unwrap();
        dev
    }

    #[test]
    fn purchase_requires_funds() {
        let def = find_definition("pkg-2").unwrap();
        let err = OwnedDevice::purchase(def, 39.99, T0).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));

        let dev = OwnedDevice::purchase(def, 40.0, T0).unwrap();
        assert_eq!(dev.status, DeviceStatus::Idle);
        assert_eq!(dev.price_at_purchase, 40.0);
        assert!(dev.expires_at_ms.is_none());
    }

    #[test]
    fn activate_sets_cycle_fields() {
        let def = find_definition("pkg-1").unwrap();
        let mut dev = OwnedDevice::purchase(def, 100.0, T0).unwrap();
        dev.activate(CycleTier::MediumCycle, T0).unwrap();

        assert_eq!(dev.status, DeviceStatus::Running);
        assert_eq!(dev.activated_at_ms, Some(T0));
        assert_eq!(dev.expires_at_ms, Some(T0 + 7 * MS_PER_DAY));
        assert_eq!(dev.active_daily_rate_percent, Some(2.5));
    }

    #[test]
    fn double_activation_is_rejected() {
        let mut dev = running_device(40.0, CycleTier::ShortCycle);
        let err = dev.activate(CycleTier::MediumCycle, T0 + 1000).unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyRunning(_)));
        // The original cycle is untouched.
        assert_eq!(dev.expires_at_ms, Some(T0 + 3 * MS_PER_DAY));
    }

    #[test]
    fn accrual_is_linear_in_elapsed_time() {
        let mut dev = running_device(40.0, CycleTier::MediumCycle);
        let a = dev.accrue(T0 + 1000);
        let per_second = 40.0 * 2.5 / 100.0 / 86_400.0;
        assert!((a.profit_delta - per_second).abs() < 1e-12);
        assert!(!a.completed);
        assert_eq!(dev.status, DeviceStatus::Running);
    }

    #[test]
    fn missed_ticks_are_not_lost() {
        // One evaluation after a long gap pays the same as many small ones.
        let mut slow = running_device(100.0, CycleTier::MediumCycle);
        let mut fast = running_device(100.0, CycleTier::MediumCycle);

        let mut fast_total = 0.0;
        for i in 1..=3600 {
            fast_total += fast.accrue(T0 + i * 1000).profit_delta;
        }
        let slow_total = slow.accrue(T0 + 3600 * 1000).profit_delta;
        assert!((fast_total - slow_total).abs() < 1e-9);
    }

    #[test]
    fn completion_fires_exactly_once() {
        let mut dev = running_device(40.0, CycleTier::ShortCycle);
        let expiry = dev.expires_at_ms.unwrap();

        let a = dev.accrue(expiry);
        assert!(a.completed);
        assert_eq!(a.profit_delta, 0.0);
        assert_eq!(dev.status, DeviceStatus::Completed);

        // Subsequent calls without re-activation change nothing.
        let b = dev.accrue(expiry + 5000);
        assert!(!b.completed);
        assert_eq!(b.profit_delta, 0.0);
        assert_eq!(dev.status, DeviceStatus::Completed);
    }

    #[test]
    fn completed_device_can_restart() {
        let mut dev = running_device(40.0, CycleTier::ShortCycle);
        let expiry = dev.expires_at_ms.unwrap();
        dev.accrue(expiry);
        assert_eq!(dev.status, DeviceStatus::Completed);

        dev.activate(CycleTier::MediumCycle, expiry + 1000).unwrap();
        assert_eq!(dev.status, DeviceStatus::Running);
        assert_eq!(dev.expires_at_ms, Some(expiry + 1000 + 7 * MS_PER_DAY));

        // The fresh cycle accrues from its own activation, not the old one.
        let a = dev.accrue(expiry + 2000);
        let per_second = 40.0 * 2.5 / 100.0 / 86_400.0;
        assert!((a.profit_delta - per_second).abs() < 1e-12);
    }

    #[test]
    fn gift_runs_out_of_the_box() {
        let dev = OwnedDevice::welcome_gift(T0);
        assert_eq!(dev.status, DeviceStatus::Running);
        assert_eq!(dev.expires_at_ms, Some(T0 + MS_PER_DAY));
        assert_eq!(dev.daily_profit_estimate, 5.0);
    }
}
