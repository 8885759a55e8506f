//! Customer Value - segment-transition projection of customer lifetime value
//!
//! This library provides:
//! - Purchase loading and recency/frequency/monetary aggregation
//! - Managerial segmentation over a fixed, ordered segment catalog
//! - Segment transition matrices built from consecutive periods
//! - Multi-period population projection with conservation checks
//! - Discounted revenue valuation of the projected customer base

pub mod error;
pub mod config;
pub mod segments;
pub mod purchases;
pub mod projection;
pub mod valuation;
pub mod model;

// Re-export commonly used types
pub use error::{ClvError, ClvResult, ModelWarning};
pub use config::ModelConfig;
pub use segments::{SegmentAssignments, SegmentCatalog, SegmentId, SegmentationRules};
pub use purchases::{CustomerSummary, Purchase, PurchaseAggregator};
pub use projection::{PopulationProjection, PopulationProjector, PopulationVector, TransitionBuilder, TransitionMatrix};
pub use valuation::{DiscountSeries, RevenuePerSegment, RevenueSeries, RevenueValuator};
pub use model::{ClvModel, ClvReport, PeriodInputs};
