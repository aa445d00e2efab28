pub mod catalog;
pub mod device;
pub mod error;
pub mod ledger;

pub use catalog::{CycleTier, DEVICE_CATALOG, DeviceDefinition, WELCOME_GIFT, find_definition};
pub use device::{Accrual, DeviceStatus, MS_PER_DAY, OwnedDevice};
pub use error::LedgerError;
pub use ledger::{
    AppNotification, NotificationKind, Role, TickOutcome, Transaction, TransactionKind,
    TransactionStatus, User, WalletPolicy, WithdrawalReceipt,
};
