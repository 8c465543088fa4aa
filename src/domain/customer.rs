use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Cents;

pub type CustomerId = String;

/// ID prefix used for customers that do not belong to any group.
pub const DEFAULT_PREFIX: &str = "DM";

/// An account holder. The balance is only ever changed by ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub email: String,
    /// Acronym of the owning group; `None` for ungrouped customers.
    pub group_acronym: Option<String>,
    pub balance: Cents,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    pub fn new(
        id: CustomerId,
        name: String,
        email: String,
        group_acronym: Option<String>,
    ) -> Self {
        Self {
            id,
            name,
            email,
            group_acronym,
            balance: 0,
            created_at: Utc::now(),
        }
    }

    /// The group label shown to clients: the acronym, or the default prefix.
    pub fn group_label(&self) -> &str {
        self.group_acronym.as_deref().unwrap_or(DEFAULT_PREFIX)
    }
}
