pub mod audit;
pub mod balance;
pub mod split;
pub mod wallet;

pub use audit::AppLog;
pub use balance::{Counterparty, GroupRef, NetBalance, NetBalances, PendingApproval};
pub use split::{ExpenseRef, Obligation, ParticipantInput, SettlementStatus, SplitMethod, SplitRecord};
pub use wallet::{WalletBalance, WalletTransaction, WalletTransactionKind};
