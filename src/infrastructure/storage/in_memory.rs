use crate::core::errors::LedgerError;
use crate::infrastructure::storage::{AtomicOp, AtomicTransaction, DocumentStore, FieldOp};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, warn};

#[derive(Clone, Debug)]
struct StoredDocument {
    version: u64,
    data: Value,
}

type Collections = HashMap<String, HashMap<String, StoredDocument>>;
type DocKey = (String, String);

/// Optimistic-concurrency document store. Every document carries a version;
/// an atomic unit commits only if nothing it read has changed since.
#[derive(Clone)]
pub struct InMemoryDocumentStore {
    collections: Arc<RwLock<Collections>>,
    max_retries: u32,
    conflicts: Arc<AtomicU64>,
    forced_conflicts: Arc<AtomicU32>,
}

impl InMemoryDocumentStore {
    pub fn new(max_retries: u32) -> Self {
        InMemoryDocumentStore {
            collections: Arc::new(RwLock::new(HashMap::new())),
            max_retries,
            conflicts: Arc::new(AtomicU64::new(0)),
            forced_conflicts: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Number of commits rejected because a read document changed underneath.
    pub fn conflict_count(&self) -> u64 {
        self.conflicts.load(Ordering::SeqCst)
    }

    /// Makes the next `n` commits fail as if another writer got there first.
    #[cfg(test)]
    pub fn simulate_conflicts(&self, n: u32) {
        self.forced_conflicts.store(n, Ordering::SeqCst);
    }

    fn take_forced_conflict(&self) -> bool {
        self.forced_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        InMemoryDocumentStore::new(5)
    }
}

fn version_of(collections: &Collections, collection: &str, id: &str) -> Option<u64> {
    collections
        .get(collection)
        .and_then(|docs| docs.get(id))
        .map(|doc| doc.version)
}

fn apply_write(collections: &mut Collections, collection: &str, id: &str, data: Value) {
    let docs = collections.entry(collection.to_string()).or_default();
    let version = docs.get(id).map(|d| d.version + 1).unwrap_or(1);
    docs.insert(id.to_string(), StoredDocument { version, data });
}

fn sorted_matches<'a>(
    collections: &'a Collections,
    collection: &str,
    predicate: impl Fn(&Value) -> bool,
) -> Vec<Value> {
    let mut matches: Vec<(&'a String, &'a StoredDocument)> = collections
        .get(collection)
        .map(|docs| docs.iter().filter(|(_, doc)| predicate(&doc.data)).collect())
        .unwrap_or_default();
    matches.sort_by(|a, b| a.0.cmp(b.0));
    matches.into_iter().map(|(_, doc)| doc.data.clone()).collect()
}

struct BufferedTransaction<'a> {
    snapshot: &'a Collections,
    reads: HashMap<DocKey, Option<u64>>,
    writes: HashMap<DocKey, Option<Value>>,
}

impl<'a> BufferedTransaction<'a> {
    fn new(snapshot: &'a Collections) -> Self {
        BufferedTransaction {
            snapshot,
            reads: HashMap::new(),
            writes: HashMap::new(),
        }
    }
}

impl AtomicTransaction for BufferedTransaction<'_> {
    fn get(&mut self, collection: &str, id: &str) -> Result<Option<Value>, LedgerError> {
        let key = (collection.to_string(), id.to_string());
        if let Some(pending) = self.writes.get(&key) {
            return Ok(pending.clone());
        }
        let doc = self.snapshot.get(collection).and_then(|docs| docs.get(id));
        self.reads.entry(key).or_insert(doc.map(|d| d.version));
        Ok(doc.map(|d| d.data.clone()))
    }

    fn set(&mut self, collection: &str, id: &str, data: Value) {
        self.writes
            .insert((collection.to_string(), id.to_string()), Some(data));
    }

    fn delete(&mut self, collection: &str, id: &str) {
        self.writes.insert((collection.to_string(), id.to_string()), None);
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn read_document(&self, collection: &str, id: &str) -> Result<Option<Value>, LedgerError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|doc| doc.data.clone()))
    }

    async fn write_document(&self, collection: &str, id: &str, data: Value) -> Result<(), LedgerError> {
        let mut collections = self.collections.write().await;
        apply_write(&mut collections, collection, id, data);
        Ok(())
    }

    async fn delete_document(&self, collection: &str, id: &str) -> Result<(), LedgerError> {
        let mut collections = self.collections.write().await;
        if let Some(docs) = collections.get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }

    async fn query_by_field(
        &self,
        collection: &str,
        field: &str,
        op: FieldOp,
        value: &Value,
    ) -> Result<Vec<Value>, LedgerError> {
        let collections = self.collections.read().await;
        Ok(sorted_matches(&collections, collection, |doc| {
            let actual = doc.get(field).unwrap_or(&Value::Null);
            match op {
                FieldOp::Equal => actual == value,
                FieldOp::NotEqual => actual != value,
            }
        }))
    }

    async fn query_by_array_contains(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Value>, LedgerError> {
        let collections = self.collections.read().await;
        Ok(sorted_matches(&collections, collection, |doc| {
            doc.get(field)
                .and_then(Value::as_array)
                .is_some_and(|items| items.contains(value))
        }))
    }

    async fn run_atomic(&self, op: &mut AtomicOp<'_>) -> Result<(), LedgerError> {
        for attempt in 0..=self.max_retries {
            let (reads, writes) = {
                let snapshot = self.collections.read().await;
                let mut txn = BufferedTransaction::new(&snapshot);
                op(&mut txn)?;
                (txn.reads, txn.writes)
            };

            let mut collections = self.collections.write().await;
            let unchanged = reads
                .iter()
                .all(|((collection, id), version)| version_of(&collections, collection, id) == *version);
            if unchanged && !self.take_forced_conflict() {
                for ((collection, id), data) in writes {
                    match data {
                        Some(data) => apply_write(&mut collections, &collection, &id, data),
                        None => {
                            if let Some(docs) = collections.get_mut(&collection) {
                                docs.remove(&id);
                            }
                        }
                    }
                }
                return Ok(());
            }
            drop(collections);

            self.conflicts.fetch_add(1, Ordering::SeqCst);
            debug!("Atomic commit conflict on attempt {}, retrying", attempt + 1);
            tokio::task::yield_now().await;
        }

        warn!("Atomic operation gave up after {} retries", self.max_retries);
        Err(LedgerError::Transient(format!(
            "write conflict persisted after {} retries",
            self.max_retries
        )))
    }
}
