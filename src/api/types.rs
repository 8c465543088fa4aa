//! Request and response bodies of the HTTP API.
//!
//! Amounts and balances travel as plain JSON numbers in currency units.
//! Request fields are optional so that a missing field is reported as a
//! validation error rather than a deserialization failure.

use serde::{Deserialize, Serialize};

use crate::domain::{cents_to_units, Customer, Group, GroupId, Transaction};

pub const CUSTOMER_CREATED: &str = "Customer created successfully";
pub const GROUP_CREATED: &str = "Group created";
pub const DEPOSIT_SUCCESSFUL: &str = "Deposit successful";
pub const WITHDRAWAL_SUCCESSFUL: &str = "Withdrawal successful";

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct CustomerView {
    pub id: String,
    pub name: String,
    pub email: String,
    /// Group acronym, or the default prefix for customers without a group.
    pub group: String,
    pub balance: f64,
}

impl From<&Customer> for CustomerView {
    fn from(customer: &Customer) -> Self {
        Self {
            id: customer.id.clone(),
            name: customer.name.clone(),
            email: customer.email.clone(),
            group: customer.group_label().to_string(),
            balance: cents_to_units(customer.balance),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct GroupView {
    pub id: GroupId,
    pub name: String,
    pub acronym: String,
}

impl From<Group> for GroupView {
    fn from(group: Group) -> Self {
        Self {
            id: group.id,
            name: group.name,
            acronym: group.acronym,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct TransactionView {
    pub id: i64,
    pub customer_id: String,
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: String,
}

impl From<&Transaction> for TransactionView {
    fn from(transaction: &Transaction) -> Self {
        Self {
            id: transaction.id,
            customer_id: transaction.customer_id.clone(),
            amount: cents_to_units(transaction.amount),
            kind: transaction.kind.to_string(),
            timestamp: transaction.timestamp.to_rfc3339(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateCustomerRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub group: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CustomerCreated {
    pub message: String,
    pub customer_id: String,
}

/// Body of `POST /group`, also read from the query string on `GET /group`.
#[derive(Debug, Default, Deserialize)]
pub struct CreateGroupRequest {
    pub name: Option<String>,
    pub acronym: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GroupCreated {
    pub message: String,
    pub group_id: GroupId,
    pub acronym: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct MovementRequest {
    pub customer_id: Option<String>,
    pub amount: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MovementResponse {
    pub message: String,
    pub new_balance: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub customer_id: String,
    pub balance: f64,
}
