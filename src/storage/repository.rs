use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, Sqlite, SqlitePool};

use crate::domain::{
    Cents, Customer, Group, GroupId, NewGroup, Transaction, TransactionKind,
};

use super::MIGRATION_001_INITIAL;

/// Unique constraints a failed insert can trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueKey {
    CustomerId,
    CustomerEmail,
    GroupName,
    GroupAcronym,
}

/// Result of an insert that may collide with an existing row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inserted<T> {
    Row(T),
    Duplicate(UniqueKey),
}

/// A balance change that was written together with its transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub balance: Cents,
    pub transaction: Transaction,
}

/// Result of adding money to one customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreditOutcome {
    Applied(Applied),
    /// The new balance would not fit in `Cents`; nothing was written.
    Overflow { balance: Cents },
    /// No customer with that ID.
    CustomerMissing,
}

/// Result of taking money from one customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebitOutcome {
    Applied(Applied),
    /// The customer could not cover the amount; nothing was written.
    InsufficientFunds { balance: Cents },
    /// The new balance would not fit in `Cents`; nothing was written.
    Overflow { balance: Cents },
    /// No customer with that ID.
    CustomerMissing,
}

/// Result of crediting interest to every customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    Applied(Vec<Transaction>),
    /// Crediting this customer would overflow its balance; nothing was written.
    Overflow { customer_id: String, balance: Cents },
}

/// Repository for persisting and querying groups, customers and transactions.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // Group operations
    // ========================

    /// Insert a group, returning it with its assigned ID.
    pub async fn insert_group(&self, group: &NewGroup) -> Result<Inserted<Group>> {
        let result = sqlx::query("INSERT INTO groups (name, acronym) VALUES (?, ?) RETURNING id")
            .bind(&group.name)
            .bind(&group.acronym)
            .fetch_one(&self.pool)
            .await;

        match result {
            Ok(row) => Ok(Inserted::Row(Group {
                id: row.get("id"),
                name: group.name.clone(),
                acronym: group.acronym.clone(),
            })),
            Err(err) => match duplicate_key(&err) {
                Some(key) => Ok(Inserted::Duplicate(key)),
                None => Err(err).context("Failed to save group"),
            },
        }
    }

    /// Get a group by ID.
    pub async fn get_group(&self, id: GroupId) -> Result<Option<Group>> {
        let row = sqlx::query("SELECT id, name, acronym FROM groups WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch group")?;

        Ok(row.as_ref().map(Self::row_to_group))
    }

    /// Get a group by its (normalized) acronym.
    pub async fn get_group_by_acronym(&self, acronym: &str) -> Result<Option<Group>> {
        let row = sqlx::query("SELECT id, name, acronym FROM groups WHERE acronym = ?")
            .bind(acronym)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch group by acronym")?;

        Ok(row.as_ref().map(Self::row_to_group))
    }

    /// List all groups in creation order.
    pub async fn list_groups(&self) -> Result<Vec<Group>> {
        let rows = sqlx::query("SELECT id, name, acronym FROM groups ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list groups")?;

        Ok(rows.iter().map(Self::row_to_group).collect())
    }

    fn row_to_group(row: &sqlx::sqlite::SqliteRow) -> Group {
        Group {
            id: row.get("id"),
            name: row.get("name"),
            acronym: row.get("acronym"),
        }
    }

    // ========================
    // Customer operations
    // ========================

    /// Insert a new customer.
    pub async fn insert_customer(&self, customer: &Customer) -> Result<Inserted<()>> {
        let result = sqlx::query(
            r#"
            INSERT INTO customers (id, name, email, group_acronym, balance, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.group_acronym)
        .bind(customer.balance)
        .bind(customer.created_at.to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(Inserted::Row(())),
            Err(err) => match duplicate_key(&err) {
                Some(key) => Ok(Inserted::Duplicate(key)),
                None => Err(err).context("Failed to save customer"),
            },
        }
    }

    /// Get a customer by ID.
    pub async fn get_customer(&self, id: &str) -> Result<Option<Customer>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, email, group_acronym, balance, created_at
            FROM customers
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch customer")?;

        row.as_ref().map(Self::row_to_customer).transpose()
    }

    /// List all customers ordered by ID.
    pub async fn list_customers(&self) -> Result<Vec<Customer>> {
        let rows = sqlx::query(
            "SELECT id, name, email, group_acronym, balance, created_at FROM customers ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list customers")?;

        rows.iter().map(Self::row_to_customer).collect()
    }

    /// Greatest customer ID, in string order, made of `prefix` followed by digits.
    pub async fn last_customer_id_with_prefix(&self, prefix: &str) -> Result<Option<String>> {
        let row = sqlx::query(
            r#"
            SELECT id
            FROM customers
            WHERE substr(id, 1, length(?1)) = ?1
              AND length(id) > length(?1)
              AND substr(id, length(?1) + 1) NOT GLOB '*[^0-9]*'
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(prefix)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to look up last customer ID")?;

        Ok(row.map(|row| row.get("id")))
    }

    fn row_to_customer(row: &sqlx::sqlite::SqliteRow) -> Result<Customer> {
        let created_at_str: String = row.get("created_at");

        Ok(Customer {
            id: row.get("id"),
            name: row.get("name"),
            email: row.get("email"),
            group_acronym: row.get("group_acronym"),
            balance: row.try_get("balance").context("Invalid customer balance")?,
            created_at: parse_timestamp(&created_at_str).context("Invalid created_at timestamp")?,
        })
    }

    // ========================
    // Ledger operations
    // ========================

    /// Add `amount` to a customer's balance and append a deposit, in a
    /// single database transaction.
    ///
    /// The update is skipped when SQLite would have to widen the sum to REAL.
    pub async fn credit(
        &self,
        customer_id: &str,
        amount: Cents,
        timestamp: DateTime<Utc>,
    ) -> Result<CreditOutcome> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        let updated: Option<Cents> = sqlx::query_scalar(
            r#"
            UPDATE customers SET balance = balance + ?1
            WHERE id = ?2 AND typeof(balance + ?1) = 'integer'
            RETURNING balance
            "#,
        )
        .bind(amount)
        .bind(customer_id)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to update balance")?;

        let Some(balance) = updated else {
            return Ok(match Self::current_balance(&mut tx, customer_id).await? {
                Some(balance) => CreditOutcome::Overflow { balance },
                None => CreditOutcome::CustomerMissing,
            });
        };

        let transaction = Self::append_transaction(
            &mut tx,
            customer_id,
            TransactionKind::Deposit,
            amount,
            timestamp,
        )
        .await?;

        tx.commit().await.context("Failed to commit balance change")?;

        Ok(CreditOutcome::Applied(Applied {
            balance,
            transaction,
        }))
    }

    /// Subtract `amount` from a customer's balance and append a withdrawal, in
    /// a single database transaction.
    ///
    /// The update only happens while the balance covers `amount`; the check
    /// and the write are one statement.
    pub async fn debit(
        &self,
        customer_id: &str,
        amount: Cents,
        timestamp: DateTime<Utc>,
    ) -> Result<DebitOutcome> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        let updated: Option<Cents> = sqlx::query_scalar(
            r#"
            UPDATE customers SET balance = balance - ?1
            WHERE id = ?2 AND balance >= ?1 AND typeof(balance - ?1) = 'integer'
            RETURNING balance
            "#,
        )
        .bind(amount)
        .bind(customer_id)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to update balance")?;

        let Some(balance) = updated else {
            // Nothing written; work out which condition stopped the update
            return Ok(match Self::current_balance(&mut tx, customer_id).await? {
                Some(balance) if balance < amount => DebitOutcome::InsufficientFunds { balance },
                Some(balance) => DebitOutcome::Overflow { balance },
                None => DebitOutcome::CustomerMissing,
            });
        };

        let transaction = Self::append_transaction(
            &mut tx,
            customer_id,
            TransactionKind::Withdraw,
            amount,
            timestamp,
        )
        .await?;

        tx.commit().await.context("Failed to commit balance change")?;

        Ok(DebitOutcome::Applied(Applied {
            balance,
            transaction,
        }))
    }

    /// Credit `interest_for(balance)` to every customer as an interest
    /// transaction. All customers are updated in one database transaction, or
    /// none are.
    pub async fn credit_interest_all<F>(
        &self,
        interest_for: F,
        timestamp: DateTime<Utc>,
    ) -> Result<BatchOutcome>
    where
        F: Fn(Cents) -> Cents,
    {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        let rows = sqlx::query("SELECT id, balance FROM customers ORDER BY id")
            .fetch_all(&mut *tx)
            .await
            .context("Failed to load balances")?;

        let mut transactions = Vec::with_capacity(rows.len());
        for row in rows {
            let customer_id: String = row.try_get("id").context("Invalid customer id")?;
            let balance: Cents = row.try_get("balance").context("Invalid customer balance")?;
            let interest = interest_for(balance);

            let Some(new_balance) = balance.checked_add(interest) else {
                return Ok(BatchOutcome::Overflow {
                    customer_id,
                    balance,
                });
            };

            sqlx::query("UPDATE customers SET balance = ? WHERE id = ?")
                .bind(new_balance)
                .bind(&customer_id)
                .execute(&mut *tx)
                .await
                .context("Failed to update balance")?;

            transactions.push(
                Self::append_transaction(
                    &mut tx,
                    &customer_id,
                    TransactionKind::Interest,
                    interest,
                    timestamp,
                )
                .await?,
            );
        }

        tx.commit().await.context("Failed to commit batch")?;

        Ok(BatchOutcome::Applied(transactions))
    }

    async fn current_balance(
        tx: &mut sqlx::Transaction<'_, Sqlite>,
        customer_id: &str,
    ) -> Result<Option<Cents>> {
        sqlx::query_scalar("SELECT balance FROM customers WHERE id = ?")
            .bind(customer_id)
            .fetch_optional(&mut **tx)
            .await
            .context("Failed to fetch balance")
    }

    async fn append_transaction(
        tx: &mut sqlx::Transaction<'_, Sqlite>,
        customer_id: &str,
        kind: TransactionKind,
        amount: Cents,
        timestamp: DateTime<Utc>,
    ) -> Result<Transaction> {
        let row = sqlx::query(
            r#"
            INSERT INTO transactions (customer_id, amount, kind, timestamp)
            VALUES (?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(customer_id)
        .bind(amount)
        .bind(kind.as_str())
        .bind(timestamp.to_rfc3339())
        .fetch_one(&mut **tx)
        .await
        .context("Failed to save transaction")?;

        Ok(Transaction {
            id: row.get("id"),
            customer_id: customer_id.to_string(),
            amount,
            kind,
            timestamp,
        })
    }

    /// List every transaction in insertion order.
    pub async fn list_transactions(&self) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(
            "SELECT id, customer_id, amount, kind, timestamp FROM transactions ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list transactions")?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    /// List one customer's transactions in insertion order.
    pub async fn list_transactions_for_customer(&self, customer_id: &str) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(
            r#"
            SELECT id, customer_id, amount, kind, timestamp
            FROM transactions
            WHERE customer_id = ?
            ORDER BY id
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list transactions for customer")?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    /// Count transactions whose customer no longer exists.
    pub async fn count_orphan_transactions(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM transactions t
            WHERE NOT EXISTS (SELECT 1 FROM customers c WHERE c.id = t.customer_id)
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to count orphan transactions")?;

        Ok(count)
    }

    fn row_to_transaction(row: &sqlx::sqlite::SqliteRow) -> Result<Transaction> {
        let kind_str: String = row.get("kind");
        let timestamp_str: String = row.get("timestamp");

        Ok(Transaction {
            id: row.get("id"),
            customer_id: row.get("customer_id"),
            amount: row.try_get("amount").context("Invalid transaction amount")?,
            kind: TransactionKind::from_str(&kind_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid transaction kind: {}", kind_str))?,
            timestamp: parse_timestamp(&timestamp_str).context("Invalid transaction timestamp")?,
        })
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}

/// Map a SQLite uniqueness failure to the constraint it names.
/// SQLite reports these as "UNIQUE constraint failed: <table>.<column>".
fn duplicate_key(err: &sqlx::Error) -> Option<UniqueKey> {
    let sqlx::Error::Database(db_err) = err else {
        return None;
    };
    if !db_err.is_unique_violation() {
        return None;
    }

    match db_err.message().rsplit(": ").next()? {
        "customers.id" => Some(UniqueKey::CustomerId),
        "customers.email" => Some(UniqueKey::CustomerEmail),
        "groups.name" => Some(UniqueKey::GroupName),
        "groups.acronym" => Some(UniqueKey::GroupAcronym),
        _ => None,
    }
}
