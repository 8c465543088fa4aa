use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Cents, CustomerId};

pub type TransactionId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Deposit,
    Withdraw,
    Interest,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "deposit",
            TransactionKind::Withdraw => "withdraw",
            TransactionKind::Interest => "interest",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "deposit" => Some(TransactionKind::Deposit),
            "withdraw" => Some(TransactionKind::Withdraw),
            "interest" => Some(TransactionKind::Interest),
            _ => None,
        }
    }

    /// Effect of a recorded `amount` of this kind on the balance.
    /// Amounts are stored as given; only withdrawals reduce the balance.
    pub fn balance_delta(&self, amount: Cents) -> Cents {
        match self {
            TransactionKind::Deposit | TransactionKind::Interest => amount,
            TransactionKind::Withdraw => amount.saturating_neg(),
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An append-only record of one balance change. Never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub customer_id: CustomerId,
    pub amount: Cents,
    pub kind: TransactionKind,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_roundtrip() {
        for kind in [
            TransactionKind::Deposit,
            TransactionKind::Withdraw,
            TransactionKind::Interest,
        ] {
            assert_eq!(TransactionKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(TransactionKind::from_str("credit"), None);
    }

    #[test]
    fn test_balance_delta() {
        assert_eq!(TransactionKind::Deposit.balance_delta(500), 500);
        assert_eq!(TransactionKind::Interest.balance_delta(25), 25);
        assert_eq!(TransactionKind::Withdraw.balance_delta(500), -500);
        // Negative deposits are recorded as given
        assert_eq!(TransactionKind::Deposit.balance_delta(-500), -500);
    }
}
