use thiserror::Error;

use crate::domain::{AllocationError, Cents};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    #[error("Group not found: {0}")]
    GroupNotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("A group with this acronym or name already exists: {0}")]
    GroupAlreadyExists(String),

    #[error("Email already registered: {0}")]
    EmailAlreadyRegistered(String),

    #[error("Could not allocate a unique customer ID for prefix {prefix} (last tried {last_tried})")]
    CustomerIdConflict { prefix: String, last_tried: String },

    #[error("Insufficient balance for customer {customer_id}: balance {balance}, required {required}")]
    InsufficientBalance {
        customer_id: String,
        balance: Cents,
        required: Cents,
    },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Customer ID allocation failed: {0}")]
    Allocation(#[from] AllocationError),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl AppError {
    /// Duplicate group, duplicate email, or an ID collision that survived retries.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            AppError::GroupAlreadyExists(_)
                | AppError::EmailAlreadyRegistered(_)
                | AppError::CustomerIdConflict { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::CustomerNotFound(_) | AppError::GroupNotFound(_))
    }
}
