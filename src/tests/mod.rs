mod api_tests;
mod editor_tests;
mod wallet_tests;

use crate::core::models::{ExpenseRef, ParticipantInput, SplitMethod, SplitRecord};
use crate::core::services::{LedgerService, NewSplit};
use crate::infrastructure::logging::in_memory::InMemoryLogging;
use crate::infrastructure::storage::in_memory::InMemoryDocumentStore;
use rust_decimal::Decimal;

pub type TestService = LedgerService<InMemoryLogging, InMemoryDocumentStore>;

pub fn create_test_service() -> TestService {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let storage = InMemoryDocumentStore::new(5);
    let logging = InMemoryLogging::new();
    LedgerService::new(storage, logging)
}

pub fn participants(ids: &[&str]) -> Vec<ParticipantInput> {
    ids.iter().map(|id| ParticipantInput::new(id)).collect()
}

pub fn new_split(
    total_amount: Decimal,
    split_method: SplitMethod,
    paid_by: &str,
    participants: Vec<ParticipantInput>,
    group_id: Option<&str>,
) -> NewSplit {
    NewSplit {
        expense: ExpenseRef {
            id: "exp-1".to_string(),
            description: "Dinner".to_string(),
        },
        split_method,
        total_amount,
        currency: "EUR".to_string(),
        paid_by: paid_by.to_string(),
        participants,
        group_id: group_id.map(String::from),
    }
}

pub fn share(record: &SplitRecord, user_id: &str) -> Decimal {
    record
        .participant(user_id)
        .map(|p| p.amount_owed)
        .unwrap_or_else(|| panic!("no obligation for {}", user_id))
}
