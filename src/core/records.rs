use crate::core::constants::SPLITS_COLLECTION;
use crate::core::errors::{LedgerError, ValidationError};
use crate::core::models::{SettlementStatus, SplitRecord};
use crate::core::money::{tolerance, within_tolerance};
use crate::infrastructure::storage::{
    AtomicTransaction, DocumentStore, FieldOp, decode, encode, run_atomic_with,
};
use serde_json::Value;
use std::collections::HashSet;

/// Checks the invariants every persisted record must satisfy and syncs
/// `involved_user_ids`.
pub fn validate_record(record: &mut SplitRecord) -> Result<(), LedgerError> {
    if record.participants.is_empty() {
        return Err(ValidationError::EmptyParticipants.into());
    }
    let mut seen = HashSet::new();
    for p in &record.participants {
        if !seen.insert(p.user_id.as_str()) {
            return Err(ValidationError::DuplicateParticipant(p.user_id.clone()).into());
        }
    }
    let allocated = record.allocated_amount();
    if !within_tolerance(allocated, record.total_amount, tolerance(&record.currency)) {
        return Err(ValidationError::AmountMismatch {
            expected: record.total_amount,
            actual: allocated,
        }
        .into());
    }
    record.refresh_involved_user_ids();
    Ok(())
}

/// Reads a split inside an atomic unit.
pub(crate) fn load_split(txn: &mut dyn AtomicTransaction, split_id: &str) -> Result<SplitRecord, LedgerError> {
    let doc = txn
        .get(SPLITS_COLLECTION, split_id)?
        .ok_or_else(|| LedgerError::not_found("Split", split_id))?;
    decode(doc)
}

pub(crate) fn save_split(txn: &mut dyn AtomicTransaction, record: &SplitRecord) -> Result<(), LedgerError> {
    txn.set(SPLITS_COLLECTION, &record.id, encode(record)?);
    Ok(())
}

fn decode_all(docs: Vec<Value>) -> Result<Vec<SplitRecord>, LedgerError> {
    let mut records = docs.into_iter().map(decode).collect::<Result<Vec<SplitRecord>, _>>()?;
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(records)
}

pub struct SplitRecordStore<'a, S: DocumentStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: DocumentStore + ?Sized> SplitRecordStore<'a, S> {
    pub fn new(store: &'a S) -> Self {
        SplitRecordStore { store }
    }

    /// Persists a new record. The payer's own entry is forced to `Settled`.
    pub async fn create(&self, mut record: SplitRecord) -> Result<SplitRecord, LedgerError> {
        let paid_by = record.paid_by.clone();
        if let Some(payer) = record.participant_mut(&paid_by) {
            payer.settlement_status = SettlementStatus::Settled;
        }
        validate_record(&mut record)?;
        let doc = encode(&record)?;
        let id = record.id.clone();
        run_atomic_with(self.store, move |txn| {
            if txn.get(SPLITS_COLLECTION, &id)?.is_some() {
                return Err(LedgerError::InternalServerError(format!("split id {} already in use", id)));
            }
            txn.set(SPLITS_COLLECTION, &id, doc.clone());
            Ok(())
        })
        .await?;
        Ok(record)
    }

    pub async fn get(&self, split_id: &str) -> Result<SplitRecord, LedgerError> {
        let doc = self
            .store
            .read_document(SPLITS_COLLECTION, split_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Split", split_id))?;
        decode(doc)
    }

    /// Every record where the user is payer or participant, newest first.
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<SplitRecord>, LedgerError> {
        let docs = self
            .store
            .query_by_array_contains(SPLITS_COLLECTION, "involved_user_ids", &Value::from(user_id))
            .await?;
        decode_all(docs)
    }

    pub async fn list_for_group(&self, group_id: &str) -> Result<Vec<SplitRecord>, LedgerError> {
        let docs = self
            .store
            .query_by_field(SPLITS_COLLECTION, "group_id", FieldOp::Equal, &Value::from(group_id))
            .await?;
        decode_all(docs)
    }

    /// Read-modify-write of one record as a single atomic unit, re-validated
    /// before it is written back.
    pub async fn update<T, F>(&self, split_id: &str, mut patch: F) -> Result<(T, SplitRecord), LedgerError>
    where
        T: Send,
        F: FnMut(&mut SplitRecord) -> Result<T, LedgerError> + Send,
    {
        run_atomic_with(self.store, |txn| {
            let mut record = load_split(txn, split_id)?;
            let output = patch(&mut record)?;
            validate_record(&mut record)?;
            save_split(txn, &record)?;
            Ok((output, record))
        })
        .await
    }

    /// Hard delete once `guard` accepts the current record. Wallet history is untouched.
    pub async fn delete<F>(&self, split_id: &str, mut guard: F) -> Result<SplitRecord, LedgerError>
    where
        F: FnMut(&SplitRecord) -> Result<(), LedgerError> + Send,
    {
        run_atomic_with(self.store, |txn| {
            let record = load_split(txn, split_id)?;
            guard(&record)?;
            txn.delete(SPLITS_COLLECTION, split_id);
            Ok(record)
        })
        .await
    }
}
