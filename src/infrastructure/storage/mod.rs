use crate::core::errors::LedgerError;
use async_trait::async_trait;
use serde_json::Value;

pub mod in_memory;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldOp {
    Equal,
    NotEqual,
}

/// Read/write view handed to an atomic operation. Writes become visible
/// only when the whole operation commits.
pub trait AtomicTransaction: Send {
    fn get(&mut self, collection: &str, id: &str) -> Result<Option<Value>, LedgerError>;
    fn set(&mut self, collection: &str, id: &str, data: Value);
    fn delete(&mut self, collection: &str, id: &str);
}

pub type AtomicOp<'a> = dyn FnMut(&mut dyn AtomicTransaction) -> Result<(), LedgerError> + Send + 'a;

/// Hosted document store the engine persists into.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn read_document(&self, collection: &str, id: &str) -> Result<Option<Value>, LedgerError>;
    /// Full replace.
    async fn write_document(&self, collection: &str, id: &str, data: Value) -> Result<(), LedgerError>;
    async fn delete_document(&self, collection: &str, id: &str) -> Result<(), LedgerError>;
    async fn query_by_field(
        &self,
        collection: &str,
        field: &str,
        op: FieldOp,
        value: &Value,
    ) -> Result<Vec<Value>, LedgerError>;
    async fn query_by_array_contains(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Value>, LedgerError>;
    /// Runs `op` so that all of its reads and writes apply as one unit.
    /// `op` may be invoked again after a write conflict; errors it returns
    /// abort the unit without retry.
    async fn run_atomic(&self, op: &mut AtomicOp<'_>) -> Result<(), LedgerError>;
}

/// [`DocumentStore::run_atomic`] returning a value produced by the last successful run.
pub async fn run_atomic_with<S, T, F>(store: &S, mut op: F) -> Result<T, LedgerError>
where
    S: DocumentStore + ?Sized,
    T: Send,
    F: FnMut(&mut dyn AtomicTransaction) -> Result<T, LedgerError> + Send,
{
    let mut output = None;
    store
        .run_atomic(&mut |txn: &mut dyn AtomicTransaction| {
            output = Some(op(txn)?);
            Ok(())
        })
        .await?;
    output.ok_or_else(|| LedgerError::InternalServerError("atomic operation produced no result".to_string()))
}

pub fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, LedgerError> {
    Ok(serde_json::from_value(value)?)
}

pub fn encode<T: serde::Serialize>(value: &T) -> Result<Value, LedgerError> {
    Ok(serde_json::to_value(value)?)
}
