use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::CustomerService;
use crate::domain::{AggregateReport, CustomerRecord, FilterCriteria, aggregate};

/// Column order shared by CSV export and import.
pub const CUSTOMER_CSV_HEADER: [&str; 14] = [
    "id",
    "name",
    "email",
    "phone",
    "program_name",
    "school_name",
    "total_amount_received",
    "amount_paid_to_school",
    "agency_profit",
    "payment_status",
    "program_start_date",
    "program_end_date",
    "assigned_to",
    "notes",
];

/// Full export of every customer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub customers: Vec<CustomerRecord>,
}

/// Exporter for converting customer data to various formats
pub struct Exporter<'a> {
    service: &'a CustomerService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a CustomerService) -> Self {
        Self { service }
    }

    /// Export the customers matching `criteria` to CSV format
    pub async fn export_customers_csv<W: Write>(
        &self,
        writer: W,
        criteria: &FilterCriteria,
    ) -> Result<usize> {
        let customers = self.service.list_customers(criteria).await?;
        write_customers_csv(writer, &customers)
    }

    /// Export dashboard figures to CSV format
    pub async fn export_report_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let customers = self.service.all_customers().await?;
        write_report_csv(writer, &aggregate(&customers))
    }

    /// Export every customer as a JSON snapshot
    pub async fn export_full_json<W: Write>(&self, mut writer: W) -> Result<CustomerSnapshot> {
        let customers = self.service.all_customers().await?;

        let snapshot = CustomerSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            customers,
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }
}

/// Write customers as CSV. Unusable amounts are written as stored.
pub fn write_customers_csv<W: Write>(writer: W, customers: &[CustomerRecord]) -> Result<usize> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(CUSTOMER_CSV_HEADER)?;

    for c in customers {
        csv_writer.write_record([
            c.id.to_string(),
            c.name.clone(),
            c.email.clone(),
            c.phone.clone(),
            c.program_name.clone(),
            c.school_name.clone(),
            c.total_amount_received.to_string(),
            c.amount_paid_to_school.to_string(),
            c.agency_profit.to_string(),
            c.payment_status.to_string(),
            c.program_start_date.clone(),
            c.program_end_date.clone(),
            c.assigned_to.clone(),
            c.notes.clone(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(customers.len())
}

/// Write report figures as `metric,counselor,amount` rows. Returns the
/// number of counselor rows.
pub fn write_report_csv<W: Write>(writer: W, report: &AggregateReport) -> Result<usize> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer.write_record(["metric", "counselor", "amount"])?;
    let revenue = report.total_revenue.to_string();
    let profit = report.total_profit.to_string();
    csv_writer.write_record(["total_revenue", "", revenue.as_str()])?;
    csv_writer.write_record(["total_profit", "", profit.as_str()])?;

    for entry in &report.profit_by_counselor {
        let amount = entry.profit.to_string();
        csv_writer.write_record([
            "counselor_profit",
            entry.counselor.as_str(),
            amount.as_str(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(report.profit_by_counselor.len())
}
