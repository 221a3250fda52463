pub const SPLIT_CREATED: &str = "SPLIT_CREATED";
pub const SPLIT_AMENDED: &str = "SPLIT_AMENDED";
pub const SPLIT_DELETED: &str = "SPLIT_DELETED";
pub const SETTLEMENT_REQUESTED: &str = "SETTLEMENT_REQUESTED";
pub const SETTLEMENT_APPROVED: &str = "SETTLEMENT_APPROVED";
pub const SETTLEMENT_REJECTED: &str = "SETTLEMENT_REJECTED";
pub const SETTLED_WITH_WALLET: &str = "SETTLED_WITH_WALLET";
pub const WALLET_DEPOSIT: &str = "WALLET_DEPOSIT";
pub const WALLET_WITHDRAWAL: &str = "WALLET_WITHDRAWAL";
pub const WALLET_TRANSFER: &str = "WALLET_TRANSFER";

pub const SPLITS_COLLECTION: &str = "splits";
pub const WALLETS_COLLECTION: &str = "wallets";
pub const WALLET_TRANSACTIONS_COLLECTION: &str = "wallet_transactions";

/// Percentages must sum to 100 within this.
pub const PERCENTAGE_TOLERANCE: rust_decimal::Decimal = rust_decimal::Decimal::from_parts(1, 0, 0, false, 2);
