pub mod account;
pub mod dispute;
pub mod entry;
pub mod error;
pub mod money;
pub mod operation;
pub mod traits;
pub mod withdrawal;

pub type UserId = u64;
pub type AdminId = u64;
pub type BookingId = u64;
pub type DisputeId = u64;
pub type WithdrawalId = u64;
pub type EntryId = u64;
pub type WarningId = u64;
pub type SuspensionId = u64;

pub use account::{AccountStatus, Balance, BankInfo, BlockRecord, Severity, Suspension, Warning};
pub use dispute::{
    DeferredRelease, Dispute, DisputeKind, DisputeListing, DisputePriority, DisputeStatus,
    EscrowHold, HoldStatus, Verdict,
};
pub use entry::{EntryKind, LedgerEntry, NewEntry, Reference, ReferenceKind};
pub use error::Error;
pub use money::Money;
pub use operation::Operation;
pub use traits::{Clock, DeadLetterQueue, EngineStore, ManualClock, OperationStream, SystemClock};
pub use withdrawal::{WithdrawalRequest, WithdrawalStatus};
