//! Managerial segmentation rules
//!
//! Recency splits customers into inactive, cold, warm and active bands.
//! Warm and active customers are further split into "new" (first purchase
//! inside the band) and high/low value by average purchase amount.

use super::assignment::SegmentAssignments;
use super::catalog::SegmentCatalog;
use crate::error::ClvResult;
use crate::purchases::CustomerSummary;
use serde::{Deserialize, Serialize};

/// Thresholds used to classify a customer summary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationRules {
    /// Recency above this many days is inactive
    pub inactive_after_days: i64,
    /// Recency above this (and up to inactive) is cold
    pub cold_after_days: i64,
    /// Recency above this (and up to cold) is warm; at or below is active
    pub warm_after_days: i64,
    /// Average purchase amount separating high from low value
    pub high_value_amount: f64,
}

impl Default for SegmentationRules {
    fn default() -> Self {
        Self {
            inactive_after_days: 3 * 365,
            cold_after_days: 2 * 365,
            warm_after_days: 365,
            high_value_amount: 100.0,
        }
    }
}

impl SegmentationRules {
    /// Standard catalog label for one customer
    pub fn classify(&self, customer: &CustomerSummary) -> &'static str {
        if customer.recency > self.inactive_after_days {
            "inactive"
        } else if customer.recency > self.cold_after_days {
            "cold"
        } else if customer.recency > self.warm_after_days {
            if customer.first_purchase <= self.cold_after_days {
                "new warm"
            } else if customer.amount < self.high_value_amount {
                "warm low value"
            } else {
                "warm high value"
            }
        } else if customer.first_purchase <= self.warm_after_days {
            "new active"
        } else if customer.amount < self.high_value_amount {
            "active low value"
        } else {
            "active high value"
        }
    }

    /// Classify every summary into assignments over the standard catalog
    pub fn assign(&self, customers: &[CustomerSummary]) -> ClvResult<SegmentAssignments> {
        let assignments = SegmentAssignments::from_labels(
            SegmentCatalog::standard(),
            customers.iter().map(|c| (c.customer_id, self.classify(c))),
        )?;
        log::debug!("Segmented {} customers", assignments.len());
        Ok(assignments)
    }
}
