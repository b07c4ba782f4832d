mod repository;

pub use repository::*;

/// SQL migration for the customers table
pub const MIGRATION_001_CUSTOMERS: &str = include_str!("migrations/001_customers.sql");
