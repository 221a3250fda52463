//! Internal per-user, per-currency balances.
//!
//! Every mutation runs as one atomic read-check-write unit against the
//! document store, so a balance can never be observed below zero and a
//! replayed request cannot move money twice.

use crate::core::constants::{WALLETS_COLLECTION, WALLET_TRANSACTIONS_COLLECTION};
use crate::core::errors::{LedgerError, ValidationError};
use crate::core::models::{SplitRecord, WalletBalance, WalletTransaction, WalletTransactionKind};
use crate::core::money::normalize_currency;
use crate::core::records::{load_split, save_split};
use crate::core::settlement::{SettlementEvent, apply_transition};
use crate::infrastructure::storage::{AtomicTransaction, DocumentStore, decode, encode, run_atomic_with};
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::Value;
use uuid::Uuid;

fn load_wallet(txn: &mut dyn AtomicTransaction, user_id: &str) -> Result<Option<WalletBalance>, LedgerError> {
    txn.get(WALLETS_COLLECTION, user_id)?.map(decode).transpose()
}

fn save_wallet(txn: &mut dyn AtomicTransaction, wallet: &mut WalletBalance) -> Result<(), LedgerError> {
    wallet.updated_at = Utc::now();
    txn.set(WALLETS_COLLECTION, &wallet.user_id, encode(&*wallet)?);
    Ok(())
}

fn debit(
    txn: &mut dyn AtomicTransaction,
    user_id: &str,
    currency: &str,
    amount: Decimal,
) -> Result<WalletBalance, LedgerError> {
    // a wallet that was never funded holds nothing
    let mut wallet = load_wallet(txn, user_id)?.unwrap_or_else(|| WalletBalance::empty(user_id));
    let available = wallet.balance(currency);
    if available < amount {
        return Err(LedgerError::InsufficientFunds {
            user_id: user_id.to_string(),
            currency: currency.to_string(),
            available,
            required: amount,
        });
    }
    wallet.balances.insert(currency.to_string(), available - amount);
    save_wallet(txn, &mut wallet)?;
    Ok(wallet)
}

fn credit(
    txn: &mut dyn AtomicTransaction,
    user_id: &str,
    currency: &str,
    amount: Decimal,
) -> Result<WalletBalance, LedgerError> {
    let mut wallet = load_wallet(txn, user_id)?.unwrap_or_else(|| WalletBalance::empty(user_id));
    let current = wallet.balance(currency);
    wallet.balances.insert(currency.to_string(), current + amount);
    save_wallet(txn, &mut wallet)?;
    Ok(wallet)
}

fn record_history(
    txn: &mut dyn AtomicTransaction,
    kind: WalletTransactionKind,
    from_user_id: Option<&str>,
    to_user_id: Option<&str>,
    amount: Decimal,
    currency: &str,
    split_id: Option<&str>,
) -> Result<(), LedgerError> {
    let parties = from_user_id.into_iter().chain(to_user_id).map(String::from).collect();
    let entry = WalletTransaction {
        id: Uuid::new_v4().to_string(),
        kind,
        from_user_id: from_user_id.map(String::from),
        to_user_id: to_user_id.map(String::from),
        amount,
        currency: currency.to_string(),
        split_id: split_id.map(String::from),
        parties,
        created_at: Utc::now(),
    };
    txn.set(WALLET_TRANSACTIONS_COLLECTION, &entry.id, encode(&entry)?);
    Ok(())
}

fn positive(amount: Decimal) -> Result<Decimal, LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveAmount(amount).into());
    }
    Ok(amount)
}

/// Result of a successful wallet settlement.
#[derive(Debug, Clone)]
pub struct WalletSettlement {
    pub record: SplitRecord,
    pub amount: Decimal,
    pub payer_balance: WalletBalance,
    pub participant_balance: WalletBalance,
}

pub struct WalletLedger<'a, S: DocumentStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: DocumentStore + ?Sized> WalletLedger<'a, S> {
    pub fn new(store: &'a S) -> Self {
        WalletLedger { store }
    }

    pub async fn balance(&self, user_id: &str) -> Result<WalletBalance, LedgerError> {
        match self.store.read_document(WALLETS_COLLECTION, user_id).await? {
            Some(doc) => decode(doc),
            None => Ok(WalletBalance::empty(user_id)),
        }
    }

    /// Newest first.
    pub async fn history(&self, user_id: &str) -> Result<Vec<WalletTransaction>, LedgerError> {
        let docs = self
            .store
            .query_by_array_contains(WALLET_TRANSACTIONS_COLLECTION, "parties", &Value::from(user_id))
            .await?;
        let mut entries = docs
            .into_iter()
            .map(decode)
            .collect::<Result<Vec<WalletTransaction>, _>>()?;
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    pub async fn deposit(&self, user_id: &str, amount: Decimal, currency: &str) -> Result<WalletBalance, LedgerError> {
        let amount = positive(amount)?;
        let currency = normalize_currency(currency)?;
        run_atomic_with(self.store, |txn| {
            let wallet = credit(txn, user_id, &currency, amount)?;
            record_history(txn, WalletTransactionKind::Deposit, None, Some(user_id), amount, &currency, None)?;
            Ok(wallet)
        })
        .await
    }

    pub async fn withdraw(&self, user_id: &str, amount: Decimal, currency: &str) -> Result<WalletBalance, LedgerError> {
        let amount = positive(amount)?;
        let currency = normalize_currency(currency)?;
        run_atomic_with(self.store, |txn| {
            let wallet = debit(txn, user_id, &currency, amount)?;
            record_history(txn, WalletTransactionKind::Withdrawal, Some(user_id), None, amount, &currency, None)?;
            Ok(wallet)
        })
        .await
    }

    /// Moves `amount` between two wallets. Returns `(from, to)` balances.
    pub async fn transfer_funds(
        &self,
        from_user_id: &str,
        to_user_id: &str,
        amount: Decimal,
        currency: &str,
    ) -> Result<(WalletBalance, WalletBalance), LedgerError> {
        let amount = positive(amount)?;
        let currency = normalize_currency(currency)?;
        if from_user_id == to_user_id {
            return Err(ValidationError::SelfTransfer.into());
        }
        run_atomic_with(self.store, |txn| {
            let from = debit(txn, from_user_id, &currency, amount)?;
            let to = credit(txn, to_user_id, &currency, amount)?;
            record_history(
                txn,
                WalletTransactionKind::Transfer,
                Some(from_user_id),
                Some(to_user_id),
                amount,
                &currency,
                None,
            )?;
            Ok((from, to))
        })
        .await
    }

    /// Settles `owing_user_id`'s share of a split from their wallet to the payer's.
    ///
    /// Obligation lookup, state check, balance check, debit, credit and the
    /// status flip all happen inside one atomic unit.
    pub async fn settle_with_wallet(&self, split_id: &str, owing_user_id: &str) -> Result<WalletSettlement, LedgerError> {
        run_atomic_with(self.store, |txn| {
            let mut record = load_split(txn, split_id)?;
            let amount = record
                .participant(owing_user_id)
                .map(|p| p.amount_owed)
                .ok_or_else(|| LedgerError::not_found("Obligation", &format!("{}/{}", split_id, owing_user_id)))?;
            apply_transition(&mut record, owing_user_id, owing_user_id, SettlementEvent::SettleWithWallet)?;

            let currency = record.currency.clone();
            let paid_by = record.paid_by.clone();
            let participant_balance = debit(txn, owing_user_id, &currency, amount)?;
            let payer_balance = credit(txn, &paid_by, &currency, amount)?;
            record.updated_at = Utc::now();
            save_split(txn, &record)?;
            record_history(
                txn,
                WalletTransactionKind::SplitSettlement,
                Some(owing_user_id),
                Some(&paid_by),
                amount,
                &currency,
                Some(split_id),
            )?;
            Ok(WalletSettlement {
                record,
                amount,
                payer_balance,
                participant_balance,
            })
        })
        .await
    }
}
