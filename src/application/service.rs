use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::{
    build_integrity_report, format_cents, id_prefix, interest_on, next_customer_id,
    normalize_acronym, replay_all_balances, Cents, Customer, Group, GroupId, IntegrityReport,
    NewGroup, Transaction,
};
use crate::storage::{
    Applied, BatchOutcome, CreditOutcome, DebitOutcome, Inserted, Repository, UniqueKey,
};

use super::AppError;

/// How many IDs a customer creation tries before reporting a conflict.
pub const MAX_ALLOCATION_ATTEMPTS: usize = 3;

pub const GROUP_INPUT_REQUIRED: &str = "Name and a 2 or 3 letter acronym are required";
pub const CUSTOMER_INPUT_REQUIRED: &str = "Name and email are required";

/// Application service providing the ledger operations.
/// This is the interface used by both the HTTP API and the CLI.
pub struct LedgerService {
    repo: Repository,
    /// One async lock per ID prefix, so allocations for a group never interleave.
    allocation_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl LedgerService {
    pub fn new(repo: Repository) -> Self {
        Self {
            repo,
            allocation_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Initialize a database at the given path (created if missing).
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }

    // ========================
    // Group operations
    // ========================

    /// Create a group. The acronym is upper-cased before the uniqueness check.
    pub async fn create_group(&self, name: &str, acronym: &str) -> Result<Group, AppError> {
        let group = NewGroup::parse(name, acronym)
            .ok_or_else(|| AppError::Validation(GROUP_INPUT_REQUIRED.to_string()))?;

        if self.repo.get_group_by_acronym(&group.acronym).await?.is_some() {
            return Err(AppError::GroupAlreadyExists(group.acronym));
        }

        match self.repo.insert_group(&group).await? {
            Inserted::Row(created) => {
                info!(group_id = created.id, acronym = %created.acronym, "group created");
                Ok(created)
            }
            Inserted::Duplicate(UniqueKey::GroupName) => Err(AppError::GroupAlreadyExists(group.name)),
            Inserted::Duplicate(_) => Err(AppError::GroupAlreadyExists(group.acronym)),
        }
    }

    /// Get a group by ID.
    pub async fn get_group(&self, id: GroupId) -> Result<Group, AppError> {
        self.repo
            .get_group(id)
            .await?
            .ok_or_else(|| AppError::GroupNotFound(id.to_string()))
    }

    /// Get a group by acronym (case-insensitive).
    pub async fn get_group_by_acronym(&self, acronym: &str) -> Result<Group, AppError> {
        let acronym = normalize_acronym(acronym);
        self.repo
            .get_group_by_acronym(&acronym)
            .await?
            .ok_or_else(|| AppError::GroupNotFound(acronym.clone()))
    }

    /// List all groups.
    pub async fn list_groups(&self) -> Result<Vec<Group>, AppError> {
        Ok(self.repo.list_groups().await?)
    }

    // ========================
    // Customer operations
    // ========================

    /// Compute the next free customer ID for `group` (or the default prefix).
    pub async fn allocate_customer_id(&self, group: Option<&Group>) -> Result<String, AppError> {
        let prefix = id_prefix(group);
        let last_id = self.repo.last_customer_id_with_prefix(prefix).await?;
        Ok(next_customer_id(prefix, last_id.as_deref())?)
    }

    /// Register a customer, optionally in the group with `group_acronym`.
    ///
    /// An acronym that matches no group registers the customer without one.
    pub async fn create_customer(
        &self,
        name: &str,
        email: &str,
        group_acronym: Option<&str>,
    ) -> Result<Customer, AppError> {
        let name = name.trim();
        let email = email.trim();
        if name.is_empty() || email.is_empty() {
            return Err(AppError::Validation(CUSTOMER_INPUT_REQUIRED.to_string()));
        }

        let group = match group_acronym.map(normalize_acronym).filter(|a| !a.is_empty()) {
            Some(acronym) => {
                let found = self.repo.get_group_by_acronym(&acronym).await?;
                if found.is_none() {
                    warn!(%acronym, "unknown group, registering customer without one");
                }
                found
            }
            None => None,
        };

        let prefix = id_prefix(group.as_ref()).to_string();
        let lock = self.allocation_lock(&prefix).await;
        let _guard = lock.lock().await;

        let mut last_tried = String::new();
        for attempt in 1..=MAX_ALLOCATION_ATTEMPTS {
            let id = self.allocate_customer_id(group.as_ref()).await?;
            let customer = Customer::new(
                id,
                name.to_string(),
                email.to_string(),
                group.as_ref().map(|g| g.acronym.clone()),
            );

            match self.repo.insert_customer(&customer).await? {
                Inserted::Row(()) => {
                    info!(customer_id = %customer.id, "customer created");
                    return Ok(customer);
                }
                Inserted::Duplicate(UniqueKey::CustomerEmail) => {
                    return Err(AppError::EmailAlreadyRegistered(email.to_string()));
                }
                Inserted::Duplicate(_) => {
                    warn!(attempt, customer_id = %customer.id, "customer ID already taken");
                    last_tried = customer.id;
                }
            }
        }

        Err(AppError::CustomerIdConflict { prefix, last_tried })
    }

    async fn allocation_lock(&self, prefix: &str) -> Arc<Mutex<()>> {
        let mut locks = self.allocation_locks.lock().await;
        locks.entry(prefix.to_string()).or_default().clone()
    }

    /// Get a customer by ID.
    pub async fn get_customer(&self, id: &str) -> Result<Customer, AppError> {
        self.repo
            .get_customer(id)
            .await?
            .ok_or_else(|| AppError::CustomerNotFound(id.to_string()))
    }

    /// List all customers.
    pub async fn list_customers(&self) -> Result<Vec<Customer>, AppError> {
        Ok(self.repo.list_customers().await?)
    }

    /// Current balance of a customer.
    pub async fn get_balance(&self, id: &str) -> Result<Cents, AppError> {
        Ok(self.get_customer(id).await?.balance)
    }

    /// A customer's transaction log, oldest first.
    pub async fn list_transactions(&self, customer_id: &str) -> Result<Vec<Transaction>, AppError> {
        let customer = self.get_customer(customer_id).await?;
        Ok(self.repo.list_transactions_for_customer(&customer.id).await?)
    }

    /// Every transaction in the ledger, oldest first.
    pub async fn list_all_transactions(&self) -> Result<Vec<Transaction>, AppError> {
        Ok(self.repo.list_transactions().await?)
    }

    // ========================
    // Ledger operations
    // ========================

    /// Add `amount` to a customer's balance and return the new balance.
    /// The amount is not required to be positive.
    pub async fn deposit(&self, customer_id: &str, amount: Cents) -> Result<Cents, AppError> {
        match self.repo.credit(customer_id, amount, Utc::now()).await? {
            CreditOutcome::Applied(Applied { balance, transaction }) => {
                info!(%customer_id, amount, balance, transaction_id = transaction.id, "deposit recorded");
                Ok(balance)
            }
            CreditOutcome::Overflow { balance } => {
                warn!(%customer_id, amount, balance, "deposit would overflow balance");
                Err(AppError::InvalidAmount(format!(
                    "depositing {} would overflow the balance of {}",
                    format_cents(amount),
                    customer_id
                )))
            }
            CreditOutcome::CustomerMissing => Err(AppError::CustomerNotFound(customer_id.to_string())),
        }
    }

    /// Subtract `amount` from a customer's balance and return the new balance.
    /// Fails without touching the balance if it does not cover `amount`.
    pub async fn withdraw(&self, customer_id: &str, amount: Cents) -> Result<Cents, AppError> {
        match self.repo.debit(customer_id, amount, Utc::now()).await? {
            DebitOutcome::Applied(Applied { balance, transaction }) => {
                info!(%customer_id, amount, balance, transaction_id = transaction.id, "withdrawal recorded");
                Ok(balance)
            }
            DebitOutcome::InsufficientFunds { balance } => {
                debug!(%customer_id, amount, balance, "withdrawal rejected");
                Err(AppError::InsufficientBalance {
                    customer_id: customer_id.to_string(),
                    balance,
                    required: amount,
                })
            }
            DebitOutcome::Overflow { balance } => {
                warn!(%customer_id, amount, balance, "withdrawal would overflow balance");
                Err(AppError::InvalidAmount(format!(
                    "withdrawing {} would overflow the balance of {}",
                    format_cents(amount),
                    customer_id
                )))
            }
            DebitOutcome::CustomerMissing => Err(AppError::CustomerNotFound(customer_id.to_string())),
        }
    }

    /// Credit interest at `rate` to every customer. Returns how many customers
    /// were credited. The whole batch commits together or not at all.
    pub async fn apply_interest_all(&self, rate: f64) -> Result<usize, AppError> {
        if !rate.is_finite() {
            return Err(AppError::InvalidAmount(format!("interest rate {}", rate)));
        }

        let outcome = self
            .repo
            .credit_interest_all(|balance| interest_on(balance, rate), Utc::now())
            .await?;

        match outcome {
            BatchOutcome::Applied(transactions) => {
                let total = transactions
                    .iter()
                    .fold(0 as Cents, |acc, t| acc.saturating_add(t.amount));
                info!(customers = transactions.len(), rate, total, "interest applied");
                Ok(transactions.len())
            }
            BatchOutcome::Overflow {
                customer_id,
                balance,
            } => {
                warn!(%customer_id, balance, rate, "interest would overflow balance");
                Err(AppError::InvalidAmount(format!(
                    "interest at rate {} would overflow the balance of {}",
                    rate, customer_id
                )))
            }
        }
    }

    // ========================
    // Integrity operations
    // ========================

    /// Reconcile every stored balance against its transaction log.
    pub async fn check_integrity(&self) -> Result<IntegrityReport, AppError> {
        let customers = self.repo.list_customers().await?;
        let transactions = self.repo.list_transactions().await?;
        let orphans = self.repo.count_orphan_transactions().await?;

        let replayed = replay_all_balances(&transactions);

        Ok(build_integrity_report(
            &customers,
            &replayed,
            transactions.len() as i64,
            orphans,
        ))
    }
}
