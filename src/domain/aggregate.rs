use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::customer::{Amount, CustomerId, CustomerRecord};
use super::money::Total;

/// Profit attributed to one counselor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounselorProfit {
    pub counselor: String,
    pub profit: Total,
}

/// Profit per counselor, in the order each counselor was first seen.
///
/// Equality takes order into account, so two breakdowns are equal only if
/// they would render the same chart.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CounselorProfits {
    entries: Vec<CounselorProfit>,
}

impl CounselorProfits {
    pub fn get(&self, counselor: &str) -> Option<Total> {
        self.entries
            .iter()
            .find(|e| e.counselor == counselor)
            .map(|e| e.profit)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CounselorProfit> {
        self.entries.iter()
    }

    pub fn counselors(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.counselor.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a CounselorProfits {
    type Item = &'a CounselorProfit;
    type IntoIter = std::slice::Iter<'a, CounselorProfit>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Accumulates per-counselor sums while remembering first-seen order.
#[derive(Default)]
struct CounselorAccumulator<'a> {
    index: HashMap<&'a str, usize>,
    entries: Vec<CounselorProfit>,
}

impl<'a> CounselorAccumulator<'a> {
    fn add(&mut self, counselor: &'a str, profit: Total) {
        match self.index.get(counselor) {
            Some(&i) => self.entries[i].profit += profit,
            None => {
                self.index.insert(counselor, self.entries.len());
                self.entries.push(CounselorProfit {
                    counselor: counselor.to_string(),
                    profit,
                });
            }
        }
    }

    fn finish(self) -> CounselorProfits {
        CounselorProfits {
            entries: self.entries,
        }
    }
}

/// Dashboard figures for a set of customers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AggregateReport {
    pub total_revenue: Total,
    pub total_profit: Total,
    pub profit_by_counselor: CounselorProfits,
}

/// Compute revenue, profit and profit per counselor.
///
/// Counselors are grouped by the exact `assigned_to` text. Amounts that are
/// missing or not integers count as zero; the record still counts towards
/// its counselor's group.
pub fn aggregate(records: &[CustomerRecord]) -> AggregateReport {
    let mut total_revenue: Total = 0;
    let mut total_profit: Total = 0;
    let mut by_counselor = CounselorAccumulator::default();

    for record in records {
        let profit = Total::from(record.agency_profit.or_zero());
        total_revenue += Total::from(record.total_amount_received.or_zero());
        total_profit += profit;
        by_counselor.add(&record.assigned_to, profit);
    }

    AggregateReport {
        total_revenue,
        total_profit,
        profit_by_counselor: by_counselor.finish(),
    }
}

/// What is wrong with a monetary field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AmountProblem {
    Missing,
    Malformed(String),
}

/// A monetary field that was counted as zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataQualityIssue {
    pub customer_id: CustomerId,
    pub field: &'static str,
    pub problem: AmountProblem,
}

/// List every monetary field that `aggregate` would treat as zero for lack
/// of a usable value, in record order.
pub fn audit_amounts(records: &[CustomerRecord]) -> Vec<DataQualityIssue> {
    records
        .iter()
        .flat_map(|record| {
            record
                .amounts()
                .into_iter()
                .filter_map(move |(field, amount)| {
                    let problem = match amount {
                        Amount::Value(_) => return None,
                        Amount::Missing => AmountProblem::Missing,
                        Amount::Malformed(raw) => AmountProblem::Malformed(raw.clone()),
                    };
                    Some(DataQualityIssue {
                        customer_id: record.id,
                        field,
                        problem,
                    })
                })
        })
        .collect()
}
