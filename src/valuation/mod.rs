//! Discounting and revenue valuation of projected populations

mod discount;
mod revenue;

pub use discount::{DiscountSeries, DEFAULT_DISCOUNT_RATE};
pub use revenue::{RevenuePerSegment, RevenueSeries, RevenueValuator};
