// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use tally::application::LedgerService;
use tally::domain::{Cents, Customer, Group};
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = LedgerService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Same as `test_service`, shared for tests that spawn tasks.
pub async fn shared_service() -> Result<(Arc<LedgerService>, TempDir)> {
    let (service, temp_dir) = test_service().await?;
    Ok((Arc::new(service), temp_dir))
}

/// Test fixture: a couple of groups and customers
pub struct StandardCustomers;

impl StandardCustomers {
    /// Create groups "AB" (Alpha Bank) and "XYZ" (Xylophone Club)
    pub async fn create_groups(service: &LedgerService) -> Result<(Group, Group)> {
        let ab = service.create_group("Alpha Bank", "AB").await?;
        let xyz = service.create_group("Xylophone Club", "XYZ").await?;
        Ok((ab, xyz))
    }

    /// Create a customer in group `acronym` holding `balance` cents.
    pub async fn funded(
        service: &LedgerService,
        email: &str,
        acronym: Option<&str>,
        balance: Cents,
    ) -> Result<Customer> {
        let customer = service.create_customer("Test Customer", email, acronym).await?;
        if balance != 0 {
            service.deposit(&customer.id, balance).await?;
        }
        Ok(service.get_customer(&customer.id).await?)
    }
}
