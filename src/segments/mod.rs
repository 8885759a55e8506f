//! Segment catalog, per-period assignments and managerial segmentation

mod catalog;
mod assignment;
mod rules;

pub use catalog::{SegmentCatalog, SegmentId, ABSENT_LABEL, STANDARD_SEGMENTS};
pub use assignment::SegmentAssignments;
pub use rules::SegmentationRules;
