use crate::core::calculator::calculate_split;
use crate::core::constants::{
    SETTLED_WITH_WALLET, SETTLEMENT_APPROVED, SETTLEMENT_REJECTED, SETTLEMENT_REQUESTED, SPLIT_AMENDED,
    SPLIT_CREATED, SPLIT_DELETED, WALLET_DEPOSIT, WALLET_TRANSFER, WALLET_WITHDRAWAL,
};
use crate::core::editor::{SplitAmendment, amend_record};
use crate::core::errors::{LedgerError, ValidationError};
use crate::core::models::{
    AppLog, Counterparty, ExpenseRef, GroupRef, NetBalances, Obligation, ParticipantInput, PendingApproval,
    SettlementStatus, SplitMethod, SplitRecord, WalletBalance, WalletTransaction,
};
use crate::core::money::{minor_unit_scale, normalize_currency};
use crate::core::netting;
use crate::core::records::SplitRecordStore;
use crate::core::settlement::{SettlementEvent, apply_transition};
use crate::core::wallet::WalletLedger;
use crate::infrastructure::logging::LoggingService;
use crate::infrastructure::storage::DocumentStore;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct NewSplit {
    pub expense: ExpenseRef,
    pub split_method: SplitMethod,
    #[schema(value_type = String)]
    pub total_amount: Decimal,
    pub currency: String,
    pub paid_by: String,
    pub participants: Vec<ParticipantInput>,
    #[serde(default)]
    pub group_id: Option<String>,
}

impl NewSplit {
    /// Payer or participant.
    pub fn involves(&self, user_id: &str) -> bool {
        self.paid_by == user_id || self.participants.iter().any(|p| p.user_id == user_id)
    }
}

pub struct LedgerService<L: LoggingService, S: DocumentStore> {
    storage: S,
    logging: L,
}

impl<L: LoggingService, S: DocumentStore> LedgerService<L, S> {
    pub fn new(storage: S, logging: L) -> Self {
        LedgerService { storage, logging }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn records(&self) -> SplitRecordStore<'_, S> {
        SplitRecordStore::new(&self.storage)
    }

    fn wallets(&self) -> WalletLedger<'_, S> {
        WalletLedger::new(&self.storage)
    }

    async fn log_and_audit(
        &self,
        action: &str,
        details: serde_json::Value,
        user_id: Option<&str>,
    ) -> Result<(), LedgerError> {
        self.logging.log_action(action, details, user_id).await
    }

    fn validate_string_input(&self, field: &str, value: &str, max_length: usize) -> Result<(), LedgerError> {
        if value.trim().is_empty() {
            return Err(ValidationError::field(field, &format!("{} cannot be empty", field)).into());
        }
        if value.len() > max_length {
            return Err(
                ValidationError::field(field, &format!("{} cannot exceed {} characters", field, max_length)).into(),
            );
        }
        if value.chars().any(|c| c.is_control() || "<>{}[]".contains(c)) {
            return Err(ValidationError::field(field, &format!("{} contains invalid characters", field)).into());
        }
        Ok(())
    }

    fn validate_amount_input(&self, field: &str, amount: Decimal, currency: &str) -> Result<(), LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveAmount(amount).into());
        }
        let scale = minor_unit_scale(currency);
        if amount.normalize().scale() > scale {
            return Err(ValidationError::field(
                field,
                &format!("{} cannot have more than {} decimal places in {}", field, scale, currency),
            )
            .into());
        }
        Ok(())
    }

    // SPLITS

    pub fn calculate_split(
        &self,
        total_amount: Decimal,
        method: SplitMethod,
        currency: &str,
        participants: &[ParticipantInput],
        payer_id: Option<&str>,
    ) -> Result<Vec<Obligation>, LedgerError> {
        let currency = normalize_currency(currency)?;
        let obligations = calculate_split(total_amount, method, participants, payer_id, minor_unit_scale(&currency))?;
        debug!("Calculated {:?} split of {} {}: {:?}", method, total_amount, currency, obligations);
        Ok(obligations)
    }

    pub async fn create_split(&self, new_split: NewSplit) -> Result<SplitRecord, LedgerError> {
        self.validate_string_input("paid_by", &new_split.paid_by, 128)?;
        self.validate_string_input("expense.description", &new_split.expense.description, 255)?;
        for p in &new_split.participants {
            self.validate_string_input("participants.user_id", &p.user_id, 128)?;
        }
        let currency = normalize_currency(&new_split.currency)?;
        self.validate_amount_input("total_amount", new_split.total_amount, &currency)?;

        let participants = self.calculate_split(
            new_split.total_amount,
            new_split.split_method,
            &currency,
            &new_split.participants,
            Some(&new_split.paid_by),
        )?;

        let now = Utc::now();
        let record = SplitRecord {
            id: Uuid::new_v4().to_string(),
            original_expense_id: new_split.expense.id,
            original_expense_description: new_split.expense.description,
            currency,
            split_method: new_split.split_method,
            total_amount: new_split.total_amount,
            paid_by: new_split.paid_by,
            participants,
            involved_user_ids: Vec::new(),
            group_id: new_split.group_id,
            created_at: now,
            updated_at: now,
        };
        let record = self.records().create(record).await?;
        info!(
            "Created split {} of {} {} paid by {}",
            record.id, record.total_amount, record.currency, record.paid_by
        );

        self.log_and_audit(
            SPLIT_CREATED,
            json!({
                "split_id": record.id,
                "expense_id": record.original_expense_id,
                "group_id": record.group_id,
                "total_amount": record.total_amount,
                "currency": record.currency,
                "split_method": record.split_method,
            }),
            Some(record.paid_by.as_str()),
        )
        .await?;
        Ok(record)
    }

    pub async fn get_split(&self, split_id: &str) -> Result<SplitRecord, LedgerError> {
        self.records().get(split_id).await
    }

    pub async fn list_splits_for_user(&self, user_id: &str) -> Result<Vec<SplitRecord>, LedgerError> {
        self.records().list_for_user(user_id).await
    }

    pub async fn list_splits_for_group(&self, group_id: &str) -> Result<Vec<SplitRecord>, LedgerError> {
        self.records().list_for_group(group_id).await
    }

    pub async fn amend_split(
        &self,
        split_id: &str,
        amendment: SplitAmendment,
        actor_id: &str,
    ) -> Result<SplitRecord, LedgerError> {
        self.validate_string_input("paid_by", &amendment.paid_by, 128)?;
        let ((), record) = self
            .records()
            .update(split_id, |record| {
                if !record.involves(actor_id) {
                    return Err(LedgerError::unauthorized(actor_id, "amend split"));
                }
                self.validate_amount_input("total_amount", amendment.total_amount, &record.currency)?;
                amend_record(record, &amendment)
            })
            .await?;
        info!(
            "Amended split {} to {} {} paid by {}",
            record.id, record.total_amount, record.currency, record.paid_by
        );

        self.log_and_audit(
            SPLIT_AMENDED,
            json!({
                "split_id": record.id,
                "total_amount": record.total_amount,
                "paid_by": record.paid_by,
                "split_method": record.split_method,
            }),
            Some(actor_id),
        )
        .await?;
        Ok(record)
    }

    pub async fn delete_split(&self, split_id: &str, actor_id: &str) -> Result<(), LedgerError> {
        let record = self
            .records()
            .delete(split_id, |record| {
                if record.paid_by != actor_id {
                    return Err(LedgerError::unauthorized(actor_id, "delete split"));
                }
                Ok(())
            })
            .await?;
        info!("Deleted split {}", record.id);

        self.log_and_audit(
            SPLIT_DELETED,
            json!({ "split_id": record.id, "expense_id": record.original_expense_id }),
            Some(actor_id),
        )
        .await
    }

    // SETTLEMENT

    async fn transition(
        &self,
        split_id: &str,
        participant_id: &str,
        actor_id: &str,
        event: SettlementEvent,
        audit_action: &str,
    ) -> Result<SplitRecord, LedgerError> {
        let result = self
            .records()
            .update(split_id, |record| {
                let next = apply_transition(record, participant_id, actor_id, event)?;
                record.updated_at = Utc::now();
                Ok(next)
            })
            .await;
        let (next, record) = match result {
            Ok(done) => done,
            Err(err) => {
                warn!(
                    "Rejected {:?} on split {} for {} by {}: {}",
                    event, split_id, participant_id, actor_id, err
                );
                return Err(err);
            }
        };
        info!("Split {} obligation of {} is now {}", split_id, participant_id, next);

        self.log_and_audit(
            audit_action,
            json!({ "split_id": split_id, "participant_id": participant_id, "status": next }),
            Some(actor_id),
        )
        .await?;
        Ok(record)
    }

    pub async fn request_manual_settlement(&self, split_id: &str, actor_id: &str) -> Result<SplitRecord, LedgerError> {
        self.transition(
            split_id,
            actor_id,
            actor_id,
            SettlementEvent::RequestManualSettlement,
            SETTLEMENT_REQUESTED,
        )
        .await
    }

    pub async fn approve_settlement(
        &self,
        split_id: &str,
        participant_id: &str,
        actor_id: &str,
    ) -> Result<SplitRecord, LedgerError> {
        self.transition(split_id, participant_id, actor_id, SettlementEvent::Approve, SETTLEMENT_APPROVED)
            .await
    }

    pub async fn reject_settlement(
        &self,
        split_id: &str,
        participant_id: &str,
        actor_id: &str,
    ) -> Result<SplitRecord, LedgerError> {
        self.transition(split_id, participant_id, actor_id, SettlementEvent::Reject, SETTLEMENT_REJECTED)
            .await
    }

    pub async fn settle_with_wallet(&self, split_id: &str, participant_id: &str) -> Result<SplitRecord, LedgerError> {
        let settlement = match self.wallets().settle_with_wallet(split_id, participant_id).await {
            Ok(settlement) => settlement,
            Err(err) => {
                warn!("Wallet settlement of split {} by {} failed: {}", split_id, participant_id, err);
                return Err(err);
            }
        };
        info!(
            "Split {} obligation of {} settled from wallet: {} {}",
            split_id, participant_id, settlement.amount, settlement.record.currency
        );

        self.log_and_audit(
            SETTLED_WITH_WALLET,
            json!({
                "split_id": split_id,
                "participant_id": participant_id,
                "paid_to": settlement.record.paid_by,
                "amount": settlement.amount,
                "currency": settlement.record.currency,
            }),
            Some(participant_id),
        )
        .await?;
        Ok(settlement.record)
    }

    /// Obligations awaiting `user_id`'s approval as payer.
    pub async fn pending_approvals(&self, user_id: &str) -> Result<Vec<PendingApproval>, LedgerError> {
        let records = self.records().list_for_user(user_id).await?;
        Ok(records
            .iter()
            .filter(|r| r.paid_by == user_id)
            .flat_map(|r| {
                r.participants
                    .iter()
                    .filter(|p| p.settlement_status == SettlementStatus::PendingApproval)
                    .map(move |p| PendingApproval {
                        split_id: r.id.clone(),
                        description: r.original_expense_description.clone(),
                        participant_id: p.user_id.clone(),
                        participant_name: p.name.clone(),
                        currency: r.currency.clone(),
                        amount: p.amount_owed,
                    })
            })
            .collect())
    }

    // BALANCES

    pub async fn net_balances(
        &self,
        user_id: &str,
        friends: &[Counterparty],
        groups: &[GroupRef],
    ) -> Result<NetBalances, LedgerError> {
        let records = self.records().list_for_user(user_id).await?;
        let balances = netting::net_balances(&records, user_id, friends, groups);
        debug!("Net balances for {} over {} splits: {:?}", user_id, records.len(), balances);
        Ok(balances)
    }

    // WALLET

    pub async fn wallet_balance(&self, user_id: &str) -> Result<WalletBalance, LedgerError> {
        self.wallets().balance(user_id).await
    }

    pub async fn wallet_history(&self, user_id: &str) -> Result<Vec<WalletTransaction>, LedgerError> {
        self.wallets().history(user_id).await
    }

    pub async fn deposit(&self, user_id: &str, amount: Decimal, currency: &str) -> Result<WalletBalance, LedgerError> {
        let currency = normalize_currency(currency)?;
        self.validate_amount_input("amount", amount, &currency)?;
        let wallet = self.wallets().deposit(user_id, amount, &currency).await?;
        info!("Deposited {} {} into wallet of {}", amount, currency, user_id);

        self.log_and_audit(
            WALLET_DEPOSIT,
            json!({ "user_id": user_id, "amount": amount, "currency": currency }),
            Some(user_id),
        )
        .await?;
        Ok(wallet)
    }

    pub async fn withdraw(&self, user_id: &str, amount: Decimal, currency: &str) -> Result<WalletBalance, LedgerError> {
        let currency = normalize_currency(currency)?;
        self.validate_amount_input("amount", amount, &currency)?;
        let wallet = self.wallets().withdraw(user_id, amount, &currency).await?;
        info!("Withdrew {} {} from wallet of {}", amount, currency, user_id);

        self.log_and_audit(
            WALLET_WITHDRAWAL,
            json!({ "user_id": user_id, "amount": amount, "currency": currency }),
            Some(user_id),
        )
        .await?;
        Ok(wallet)
    }

    pub async fn transfer_funds(
        &self,
        from_user_id: &str,
        to_user_id: &str,
        amount: Decimal,
        currency: &str,
    ) -> Result<WalletBalance, LedgerError> {
        self.validate_string_input("to_user_id", to_user_id, 128)?;
        let currency = normalize_currency(currency)?;
        self.validate_amount_input("amount", amount, &currency)?;
        let (from, _) = self
            .wallets()
            .transfer_funds(from_user_id, to_user_id, amount, &currency)
            .await?;
        info!("Transferred {} {} from {} to {}", amount, currency, from_user_id, to_user_id);

        self.log_and_audit(
            WALLET_TRANSFER,
            json!({
                "from_user_id": from_user_id,
                "to_user_id": to_user_id,
                "amount": amount,
                "currency": currency,
            }),
            Some(from_user_id),
        )
        .await?;
        Ok(from)
    }

    pub async fn get_app_logs(&self) -> Result<Vec<AppLog>, LedgerError> {
        self.logging.get_logs().await
    }

    /// Audit entries recorded with `user_id` as the acting user.
    pub async fn get_app_logs_for_user(&self, user_id: &str) -> Result<Vec<AppLog>, LedgerError> {
        let logs = self.logging.get_logs().await?;
        Ok(logs
            .into_iter()
            .filter(|log| log.user_id.as_deref() == Some(user_id))
            .collect())
    }
}
