//! Read-side "who owes whom", recomputed from a snapshot of split records.

use crate::core::models::{Counterparty, GroupRef, NetBalance, NetBalances, SplitRecord};
use crate::core::money::tolerance;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Signed contribution of one record to the user's position against `counterparty`.
///
/// Payer side: every other participant's unsettled share is owed to the user.
/// Participant side: the user's own unsettled share is owed to the payer.
fn record_contributions(record: &SplitRecord, user_id: &str) -> Vec<(String, Decimal)> {
    if record.paid_by == user_id {
        record
            .participants
            .iter()
            .filter(|p| p.user_id != user_id && !p.is_settled())
            .map(|p| (p.user_id.clone(), p.amount_owed))
            .collect()
    } else {
        match record.participant(user_id) {
            Some(own) if !own.is_settled() => vec![(record.paid_by.clone(), -own.amount_owed)],
            _ => Vec::new(),
        }
    }
}

/// Nets personal splits per friend and group splits per group, per currency.
///
/// Buckets smaller than one minor unit are dropped. Output follows the order
/// of `friends` and `groups`, then currency code.
pub fn net_balances(
    records: &[SplitRecord],
    user_id: &str,
    friends: &[Counterparty],
    groups: &[GroupRef],
) -> NetBalances {
    let mut friend_buckets: HashMap<(String, String), Decimal> = HashMap::new();
    let mut group_buckets: HashMap<(String, String), Decimal> = HashMap::new();

    for record in records.iter().filter(|r| r.involves(user_id)) {
        match &record.group_id {
            None => {
                for (counterparty, amount) in record_contributions(record, user_id) {
                    if friends.iter().any(|f| f.id == counterparty) {
                        *friend_buckets
                            .entry((counterparty, record.currency.clone()))
                            .or_insert(Decimal::ZERO) += amount;
                    }
                }
            }
            Some(group_id) => {
                if !groups.iter().any(|g| &g.id == group_id) {
                    continue;
                }
                let net: Decimal = record_contributions(record, user_id)
                    .into_iter()
                    .map(|(_, amount)| amount)
                    .sum();
                *group_buckets
                    .entry((group_id.clone(), record.currency.clone()))
                    .or_insert(Decimal::ZERO) += net;
            }
        }
    }

    NetBalances {
        friend_balances: collect_buckets(
            friend_buckets,
            friends.iter().map(|f| (f.id.as_str(), f.name.as_str())),
        ),
        group_balances: collect_buckets(
            group_buckets,
            groups.iter().map(|g| (g.id.as_str(), g.name.as_str())),
        ),
    }
}

fn collect_buckets<'a>(
    mut buckets: HashMap<(String, String), Decimal>,
    order: impl Iterator<Item = (&'a str, &'a str)>,
) -> Vec<NetBalance> {
    let mut out = Vec::new();
    for (id, name) in order {
        let mut currencies: Vec<(String, Decimal)> = buckets
            .iter()
            .filter(|((bucket_id, _), _)| bucket_id == id)
            .map(|((_, currency), amount)| (currency.clone(), *amount))
            .collect();
        currencies.sort_by(|a, b| a.0.cmp(&b.0));
        for (currency, amount) in currencies {
            buckets.remove(&(id.to_string(), currency.clone()));
            if amount.abs() < tolerance(&currency) {
                continue;
            }
            out.push(NetBalance {
                counterparty_id: id.to_string(),
                counterparty_name: name.to_string(),
                currency,
                amount,
            });
        }
    }
    out
}
