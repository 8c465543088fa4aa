use anyhow::Result;
use std::io::Write;

use crate::application::LedgerService;
use crate::domain::format_cents;

/// Writes ledger data as CSV.
pub struct Exporter<'a> {
    service: &'a LedgerService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    /// Export the full transaction log, oldest first.
    pub async fn export_transactions_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let transactions = self.service.list_all_transactions().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["id", "customer_id", "kind", "amount", "timestamp"])?;

        for transaction in &transactions {
            csv_writer.write_record([
                transaction.id.to_string(),
                transaction.customer_id.clone(),
                transaction.kind.to_string(),
                format_cents(transaction.amount),
                transaction.timestamp.to_rfc3339(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(transactions.len())
    }

    /// Export every customer with its current balance.
    pub async fn export_customers_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let customers = self.service.list_customers().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["id", "name", "email", "group", "balance", "created_at"])?;

        for customer in &customers {
            csv_writer.write_record([
                customer.id.as_str(),
                customer.name.as_str(),
                customer.email.as_str(),
                customer.group_label(),
                &format_cents(customer.balance),
                &customer.created_at.to_rfc3339(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(customers.len())
    }
}
