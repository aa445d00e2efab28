use thiserror::Error;

/// Validation outcomes for ledger operations.
///
/// These are local, non-fatal failures surfaced to the caller for display;
/// none of them aborts the session or rolls back prior state.
#[derive(Debug, Error, PartialEq)]
pub enum LedgerError {
    #[error("insufficient funds: need ${required:.2}, have ${available:.2}")]
    InsufficientFunds { required: f64, available: f64 },

    #[error("amount is below the ${minimum:.2} minimum")]
    BelowMinimum { minimum: f64 },

    #[error("amount must be greater than zero")]
    InvalidAmount,

    #[error("no device with instance id {0}")]
    DeviceNotFound(String),

    #[error("device {0} already has a running cycle")]
    AlreadyRunning(String),

    #[error("welcome gift was already claimed")]
    GiftAlreadyClaimed,

    #[error("no transaction with id {0}")]
    TransactionNotFound(String),

    #[error("transaction {0} is not pending")]
    TransactionNotPending(String),

    #[error("unknown device definition {0}")]
    UnknownDefinition(String),
}
