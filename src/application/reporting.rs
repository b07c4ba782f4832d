use serde::Serialize;

use crate::domain::{
    AggregateReport, AmountProblem, CustomerRecord, DataQualityIssue, aggregate, audit_amounts,
};

/// Everything the dashboard screen shows for one snapshot of customers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardReport {
    pub customer_count: usize,
    #[serde(flatten)]
    pub report: AggregateReport,
    /// Monetary fields that were counted as zero.
    pub issues: Vec<DataQualityIssue>,
}

impl DashboardReport {
    /// Aggregate a snapshot and flag unusable amounts as data-quality warnings.
    pub fn build(customers: &[CustomerRecord]) -> Self {
        let report = aggregate(customers);
        let issues = audit_amounts(customers);

        for issue in &issues {
            match &issue.problem {
                AmountProblem::Missing => log::warn!(
                    "data quality: customer {} has no {}, counted as 0",
                    issue.customer_id,
                    issue.field
                ),
                AmountProblem::Malformed(raw) => log::warn!(
                    "data quality: customer {} has non-numeric {} '{}', counted as 0",
                    issue.customer_id,
                    issue.field,
                    raw
                ),
            }
        }

        log::debug!(
            "dashboard: {} customers, {} counselors, {} data-quality issues",
            customers.len(),
            report.profit_by_counselor.len(),
            issues.len()
        );

        Self {
            customer_count: customers.len(),
            report,
            issues,
        }
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }
}
