use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool};

use crate::domain::{Amount, CustomerDraft, CustomerId, CustomerRecord, PaymentStatus};

use super::MIGRATION_001_CUSTOMERS;

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

const CUSTOMER_COLUMNS: &str = "id, name, email, phone, program_name, school_name, \
    total_amount_received, amount_paid_to_school, agency_profit, payment_status, \
    program_start_date, program_end_date, assigned_to, notes";

/// Repository for persisting and querying customer records.
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
        sqlx::query(MIGRATION_001_CUSTOMERS)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;

        log::debug!("customers schema is up to date");
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// Insert a customer. The store assigns the id.
    pub async fn insert_customer(&self, draft: CustomerDraft) -> Result<CustomerRecord> {
        let query = sqlx::query(
            r#"
            INSERT INTO customers (
                name, email, phone, program_name, school_name,
                total_amount_received, amount_paid_to_school, agency_profit,
                payment_status, program_start_date, program_end_date,
                assigned_to, notes, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&draft.name)
        .bind(&draft.email)
        .bind(&draft.phone)
        .bind(&draft.program_name)
        .bind(&draft.school_name);

        let query = bind_amount(query, &draft.total_amount_received);
        let query = bind_amount(query, &draft.amount_paid_to_school);
        let query = bind_amount(query, &draft.agency_profit);

        let result = query
            .bind(draft.payment_status.as_str())
            .bind(&draft.program_start_date)
            .bind(&draft.program_end_date)
            .bind(&draft.assigned_to)
            .bind(&draft.notes)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .context("Failed to save customer")?;

        let id = result.last_insert_rowid();
        log::debug!("inserted customer {}", id);
        Ok(draft.with_id(id))
    }

    /// Get a customer by ID.
    pub async fn get_customer(&self, id: CustomerId) -> Result<Option<CustomerRecord>> {
        let sql = format!("SELECT {} FROM customers WHERE id = ?", CUSTOMER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch customer")?;

        row.as_ref().map(Self::row_to_customer).transpose()
    }

    /// List every customer, in insertion order.
    pub async fn list_customers(&self) -> Result<Vec<CustomerRecord>> {
        let sql = format!("SELECT {} FROM customers ORDER BY id", CUSTOMER_COLUMNS);
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list customers")?;

        rows.iter().map(Self::row_to_customer).collect()
    }

    /// Count stored customers.
    pub async fn count_customers(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM customers")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count customers")?;

        Ok(row.get("count"))
    }

    fn row_to_customer(row: &SqliteRow) -> Result<CustomerRecord> {
        let id: CustomerId = row.try_get("id").context("Invalid customer ID")?;

        Ok(CustomerRecord {
            id,
            name: row_text(row, "name"),
            email: row_text(row, "email"),
            phone: row_text(row, "phone"),
            program_name: row_text(row, "program_name"),
            school_name: row_text(row, "school_name"),
            total_amount_received: row_amount(row, "total_amount_received")
                .with_context(|| format!("Customer {}", id))?,
            amount_paid_to_school: row_amount(row, "amount_paid_to_school")
                .with_context(|| format!("Customer {}", id))?,
            agency_profit: row_amount(row, "agency_profit")
                .with_context(|| format!("Customer {}", id))?,
            payment_status: PaymentStatus::new(row_text(row, "payment_status")),
            program_start_date: row_text(row, "program_start_date"),
            program_end_date: row_text(row, "program_end_date"),
            assigned_to: row_text(row, "assigned_to"),
            notes: row_text(row, "notes"),
        })
    }
}

fn bind_amount<'q>(query: SqliteQuery<'q>, amount: &'q Amount) -> SqliteQuery<'q> {
    match amount {
        Amount::Value(v) => query.bind(*v),
        Amount::Missing => query.bind(None::<i64>),
        // Keep the original text so the problem stays visible in reports
        Amount::Malformed(raw) => query.bind(raw.as_str()),
    }
}

fn row_text(row: &SqliteRow, column: &str) -> String {
    row.try_get::<Option<String>, _>(column)
        .ok()
        .flatten()
        .unwrap_or_default()
}

/// Read an amount column whatever SQLite actually stored in it.
fn row_amount(row: &SqliteRow, column: &str) -> Result<Amount> {
    if let Ok(value) = row.try_get::<Option<i64>, _>(column) {
        return Ok(value.map_or(Amount::Missing, Amount::Value));
    }
    if let Ok(Some(text)) = row.try_get::<Option<String>, _>(column) {
        return Amount::from_stored_text(&text).with_context(|| format!("Invalid {}", column));
    }
    if let Ok(Some(value)) = row.try_get::<Option<f64>, _>(column) {
        return Amount::from_stored_float(value).with_context(|| format!("Invalid {}", column));
    }
    Ok(Amount::Malformed("<binary>".to_string()))
}
