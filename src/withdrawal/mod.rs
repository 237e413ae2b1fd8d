//! Withdrawal requests
//!
//! A tenant submits a payout, confirms it, and an operator settles it by
//! debiting the tenant balance. Cancel is only possible before confirmation.
//!
//! ## Components
//! - `types`: payout rail, fee side and status enums
//! - `models`: request record, draft and projections
//! - `repository`: `WithdrawalStore` and the locked settlement
//! - `callback`: outbound submission notifier
//! - `service`: the lifecycle operations

pub mod callback;
pub mod error;
pub mod models;
pub mod repository;
pub mod service;
pub mod types;

pub use callback::{CallbackNotifier, HttpCallbackNotifier};
pub use error::WithdrawalError;
pub use models::{WithdrawalDraft, WithdrawalReceipt, WithdrawalRequest, WithdrawalView};
pub use repository::{PendingWithdrawal, SettleOutcome, TransitionOutcome, WithdrawalStore};
pub use service::WithdrawalService;
pub use types::{PayoutMethod, SubtractFrom, WithdrawalStatus};
