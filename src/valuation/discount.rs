//! Geometric discount factors per projection period
//!
//! Factor for period `i` is `1 / (1 + rate)^i`, so period 0 is never discounted.

use crate::error::{ClvError, ClvResult};
use serde::{Deserialize, Serialize};

/// Default annual discount rate
pub const DEFAULT_DISCOUNT_RATE: f64 = 0.10;

/// Discount factors for periods 0..=horizon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountSeries {
    /// Discount rate per period
    rate: f64,

    /// Index = period, value = discount factor
    factors: Vec<f64>,
}

impl DiscountSeries {
    /// Build the series, failing fast on a negative rate or zero horizon
    pub fn new(rate: f64, horizon: usize) -> ClvResult<Self> {
        if !rate.is_finite() || rate < 0.0 {
            return Err(ClvError::InvalidInput(format!(
                "discount rate must be a non-negative number, got {}",
                rate
            )));
        }
        if horizon == 0 {
            return Err(ClvError::InvalidInput("horizon must be at least one period".into()));
        }

        let v = 1.0 / (1.0 + rate);
        let factors = (0..=horizon).map(|i| v.powi(i as i32)).collect();
        Ok(Self { rate, factors })
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn horizon(&self) -> usize {
        self.factors.len() - 1
    }

    pub fn factors(&self) -> &[f64] {
        &self.factors
    }

    /// Discount factor to a specific period
    pub fn factor(&self, period: usize) -> Option<f64> {
        self.factors.get(period).copied()
    }

    /// Present value of one amount per period, starting at period 0
    pub fn present_value(&self, amounts: &[f64]) -> f64 {
        amounts.iter().zip(&self.factors).map(|(a, v)| a * v).sum()
    }
}
