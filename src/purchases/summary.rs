//! Recency / frequency / monetary aggregation over purchase history

use super::Purchase;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Days in one observation period
pub const PERIOD_DAYS: i64 = 365;

/// Per-customer indicators as of a reference point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerSummary {
    pub customer_id: u64,
    /// Days since the most recent purchase
    pub recency: i64,
    /// Days since the first purchase
    pub first_purchase: i64,
    /// Number of purchases
    pub frequency: u32,
    /// Average purchase amount
    pub amount: f64,
}

/// Purchase activity for one calendar year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyActivity {
    pub year: i32,
    pub purchases: u32,
    pub average_amount: f64,
    pub total_amount: f64,
}

/// Aggregates purchases relative to a fixed reference date
#[derive(Debug, Clone)]
pub struct PurchaseAggregator<'a> {
    purchases: &'a [Purchase],
    reference_date: NaiveDate,
}

#[derive(Default)]
struct Accumulator {
    min_days: i64,
    max_days: i64,
    count: u32,
    total: f64,
}

impl<'a> PurchaseAggregator<'a> {
    pub fn new(purchases: &'a [Purchase], reference_date: NaiveDate) -> Self {
        Self { purchases, reference_date }
    }

    pub fn reference_date(&self) -> NaiveDate {
        self.reference_date
    }

    fn days_since(&self, purchase: &Purchase) -> i64 {
        (self.reference_date - purchase.date).num_days()
    }

    /// Customer summaries as they stood `offset_days` before the reference date
    ///
    /// Only purchases older than the offset count, and recency and first
    /// purchase are measured from the shifted date. Results are ordered by
    /// customer id.
    pub fn customer_summaries(&self, offset_days: i64) -> Vec<CustomerSummary> {
        let mut by_customer: BTreeMap<u64, Accumulator> = BTreeMap::new();

        for purchase in self.purchases {
            let days = self.days_since(purchase);
            if days <= offset_days {
                continue;
            }

            let acc = by_customer.entry(purchase.customer_id).or_insert(Accumulator {
                min_days: days,
                max_days: days,
                ..Default::default()
            });
            acc.min_days = acc.min_days.min(days);
            acc.max_days = acc.max_days.max(days);
            acc.count += 1;
            acc.total += purchase.amount;
        }

        log::debug!(
            "Summarised {} customers at offset {} days",
            by_customer.len(),
            offset_days
        );

        by_customer
            .into_iter()
            .map(|(customer_id, acc)| CustomerSummary {
                customer_id,
                recency: acc.min_days - offset_days,
                first_purchase: acc.max_days - offset_days,
                frequency: acc.count,
                amount: acc.total / acc.count as f64,
            })
            .collect()
    }

    /// Revenue per customer over the year ending `offset_days` before the reference date
    ///
    /// Customers with no purchase in the window are not present.
    pub fn period_revenue(&self, offset_days: i64) -> HashMap<u64, f64> {
        let mut revenue = HashMap::new();
        for purchase in self.purchases {
            let days = self.days_since(purchase);
            if days > offset_days && days <= offset_days + PERIOD_DAYS {
                *revenue.entry(purchase.customer_id).or_insert(0.0) += purchase.amount;
            }
        }
        revenue
    }
}

/// Purchase count, average and total amount per calendar year
pub fn yearly_activity(purchases: &[Purchase]) -> Vec<YearlyActivity> {
    let mut by_year: BTreeMap<i32, (u32, f64)> = BTreeMap::new();
    for purchase in purchases {
        let entry = by_year.entry(purchase.date.year()).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += purchase.amount;
    }

    by_year
        .into_iter()
        .map(|(year, (count, total))| YearlyActivity {
            year,
            purchases: count,
            average_amount: total / count as f64,
            total_amount: total,
        })
        .collect()
}
