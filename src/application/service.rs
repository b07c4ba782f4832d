use crate::domain::{
    CustomerDraft, CustomerId, CustomerRecord, FilterCriteria, NewCustomer, filter_customers,
};
use crate::storage::Repository;

use super::{AppError, DashboardReport};

/// Application service providing high-level operations for the tracker.
/// This is the primary interface for any client (CLI, importers, tests).
pub struct CustomerService {
    repo: Repository,
}

impl CustomerService {
    /// Create a new customer service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Initialize a new database at the given path.
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
    // Customer operations
    // ========================

    /// Register a customer from form input.
    pub async fn create_customer(&self, form: NewCustomer) -> Result<CustomerRecord, AppError> {
        let draft = form.into_draft()?;
        self.store_customer(draft).await
    }

    /// Store an already-validated customer, e.g. one read from a snapshot.
    pub async fn store_customer(&self, draft: CustomerDraft) -> Result<CustomerRecord, AppError> {
        if draft.name.trim().is_empty() {
            return Err(AppError::MissingName);
        }

        let customer = self.repo.insert_customer(draft).await?;
        log::info!("registered customer {} ({})", customer.id, customer.name);
        Ok(customer)
    }

    /// Get a customer by ID.
    pub async fn get_customer(&self, id: CustomerId) -> Result<CustomerRecord, AppError> {
        self.repo
            .get_customer(id)
            .await?
            .ok_or(AppError::CustomerNotFound(id))
    }

    /// The full, unfiltered set of customers.
    pub async fn all_customers(&self) -> Result<Vec<CustomerRecord>, AppError> {
        Ok(self.repo.list_customers().await?)
    }

    /// Customers matching the list-view criteria, in store order.
    pub async fn list_customers(
        &self,
        criteria: &FilterCriteria,
    ) -> Result<Vec<CustomerRecord>, AppError> {
        let customers = self.all_customers().await?;
        let matching = filter_customers(&customers, criteria)
            .into_iter()
            .cloned()
            .collect::<Vec<_>>();

        log::debug!(
            "list: {} of {} customers match query '{}'",
            matching.len(),
            customers.len(),
            criteria.name_query()
        );
        Ok(matching)
    }

    /// Number of stored customers.
    pub async fn count_customers(&self) -> Result<i64, AppError> {
        Ok(self.repo.count_customers().await?)
    }

    // ========================
    // Reporting
    // ========================

    /// Dashboard figures over every stored customer.
    pub async fn dashboard(&self) -> Result<DashboardReport, AppError> {
        let customers = self.all_customers().await?;
        Ok(DashboardReport::build(&customers))
    }
}
