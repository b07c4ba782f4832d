// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use ryugaku::application::CustomerService;
use ryugaku::domain::{CustomerRecord, NewCustomer, PaymentStatus};
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(CustomerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = CustomerService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Path of the database file inside a test directory
pub fn db_path(temp_dir: &TempDir) -> String {
    temp_dir.path().join("test.db").to_str().unwrap().to_string()
}

/// Registration form with the fields reports care about
pub fn form(
    name: &str,
    counselor: &str,
    received: &str,
    profit: &str,
    status: &str,
) -> NewCustomer {
    NewCustomer {
        name: name.into(),
        email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
        program_name: "Language course".into(),
        school_name: "Vancouver English Centre".into(),
        total_amount_received: received.into(),
        amount_paid_to_school: String::new(),
        agency_profit: profit.into(),
        payment_status: status.into(),
        program_start_date: "2024-04-01".into(),
        program_end_date: "2024-09-30".into(),
        assigned_to: counselor.into(),
        ..Default::default()
    }
}

/// Test fixture: a small agency roster
pub struct StandardCustomers;

impl StandardCustomers {
    /// Alice and Alan with Sato, Bob with Tanaka, 山田 unassigned
    pub async fn create(service: &CustomerService) -> Result<Vec<CustomerRecord>> {
        let mut created = Vec::new();
        for f in [
            form("Alice Smith", "Sato", "500000", "100000", PaymentStatus::COMPLETED),
            form("Bob Jones", "Tanaka", "300000", "50000", PaymentStatus::UNPAID),
            form("Alan Park", "Sato", "200000", "25000", PaymentStatus::PARTIALLY_PAID),
            form("山田 太郎", "", "150000", "30000", PaymentStatus::COMPLETED),
        ] {
            created.push(service.create_customer(f).await?);
        }
        Ok(created)
    }
}
