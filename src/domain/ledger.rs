use std::collections::HashMap;

use super::{Cents, Customer, CustomerId, Transaction};

/// Compute the balance a customer should hold according to its transaction log.
/// Balance = deposits - withdrawals + interest
pub fn replay_balance(customer_id: &str, transactions: &[Transaction]) -> Cents {
    transactions
        .iter()
        .filter(|t| t.customer_id == customer_id)
        .fold(0, |acc: Cents, t| acc.saturating_add(t.kind.balance_delta(t.amount)))
}

/// Replay every transaction into a map of customer_id -> expected balance.
pub fn replay_all_balances(transactions: &[Transaction]) -> HashMap<CustomerId, Cents> {
    let mut balances: HashMap<CustomerId, Cents> = HashMap::new();

    for transaction in transactions {
        let balance = balances.entry(transaction.customer_id.clone()).or_insert(0);
        *balance = balance.saturating_add(transaction.kind.balance_delta(transaction.amount));
    }

    balances
}

/// A customer whose stored balance disagrees with its transaction log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceMismatch {
    pub customer_id: CustomerId,
    pub stored: Cents,
    pub replayed: Cents,
}

/// Outcome of reconciling stored balances against the transaction log.
#[derive(Debug, Clone)]
pub struct IntegrityReport {
    pub customer_count: i64,
    pub transaction_count: i64,
    pub total_balance: Cents,
    pub mismatches: Vec<BalanceMismatch>,
    pub orphan_transactions: i64,
    pub issues: Vec<String>,
}

impl IntegrityReport {
    pub fn is_healthy(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Build an integrity report from stored customers and replayed balances.
pub fn build_integrity_report(
    customers: &[Customer],
    replayed: &HashMap<CustomerId, Cents>,
    transaction_count: i64,
    orphan_transactions: i64,
) -> IntegrityReport {
    let mut issues = Vec::new();

    let mismatches: Vec<BalanceMismatch> = customers
        .iter()
        .filter_map(|customer| {
            let expected = replayed.get(&customer.id).copied().unwrap_or(0);
            (expected != customer.balance).then(|| BalanceMismatch {
                customer_id: customer.id.clone(),
                stored: customer.balance,
                replayed: expected,
            })
        })
        .collect();

    for mismatch in &mismatches {
        issues.push(format!(
            "Customer {} holds {} cents but its transactions add up to {} cents",
            mismatch.customer_id, mismatch.stored, mismatch.replayed
        ));
    }

    if orphan_transactions > 0 {
        issues.push(format!(
            "{} transaction(s) reference unknown customers",
            orphan_transactions
        ));
    }

    IntegrityReport {
        customer_count: customers.len() as i64,
        transaction_count,
        total_balance: customers
            .iter()
            .fold(0, |acc: Cents, c| acc.saturating_add(c.balance)),
        mismatches,
        orphan_transactions,
        issues,
    }
}
