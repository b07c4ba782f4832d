use super::customer::{CustomerRecord, PaymentStatus};

/// Which payment statuses a list view should show.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(PaymentStatus),
}

impl StatusFilter {
    /// The sentinel that selects every status.
    pub const ALL: &'static str = "all";

    /// `"all"` selects everything; any other text is an exact status label.
    pub fn parse(input: &str) -> Self {
        if input == Self::ALL {
            StatusFilter::All
        } else {
            StatusFilter::Only(PaymentStatus::new(input))
        }
    }

    pub fn matches(&self, status: &PaymentStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => wanted == status,
        }
    }
}

/// Name search plus status selection for the customer list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterCriteria {
    name_query: String,
    // name_query, lowercased once
    needle: String,
    status_filter: StatusFilter,
}

impl FilterCriteria {
    pub fn new(name_query: impl Into<String>, status_filter: StatusFilter) -> Self {
        let name_query = name_query.into();
        Self {
            needle: name_query.to_lowercase(),
            name_query,
            status_filter,
        }
    }

    /// Criteria that match every record.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn name_query(&self) -> &str {
        &self.name_query
    }

    /// Case-insensitive substring match on the name, exact match on status.
    pub fn matches(&self, record: &CustomerRecord) -> bool {
        self.status_filter.matches(&record.payment_status)
            && record.name.to_lowercase().contains(&self.needle)
    }
}

/// Select the records matching `criteria`, in their original order.
pub fn filter_customers<'a>(
    records: &'a [CustomerRecord],
    criteria: &FilterCriteria,
) -> Vec<&'a CustomerRecord> {
    records.iter().filter(|r| criteria.matches(r)).collect()
}
