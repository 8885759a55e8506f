//! Purchase history loading and per-customer aggregation

pub mod loader;
mod summary;

pub use loader::{load_purchases, load_purchases_from_reader};
pub use summary::{yearly_activity, CustomerSummary, PurchaseAggregator, YearlyActivity, PERIOD_DAYS};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single purchase record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Purchase {
    pub customer_id: u64,
    pub amount: f64,
    pub date: NaiveDate,
}
