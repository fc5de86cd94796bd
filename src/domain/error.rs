use crate::domain::Money;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("ingestion failed: {0}")]
    Ingestion(String),

    #[error("{0}")]
    Validation(String),

    #[error("invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: Money, available: Money },

    #[error("duplicate idempotency key: {0}")]
    DuplicateIdempotencyKey(String),

    #[error("ledger corrupt: {0}")]
    LedgerCorruption(String),

    #[error("invalid suspension duration: {days} days (must be between 1 and 365)")]
    InvalidDuration { days: u32 },

    #[error("confirmation phrase does not match")]
    ConfirmationMismatch,

    #[error("account ineligible: {0}")]
    AccountIneligible(String),

    #[error("not found: {0}")]
    NotFound(String),
}
