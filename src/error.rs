//! Error and warning types shared across the crate

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClvError {
    #[error("Unknown segment '{label}'")]
    UnknownSegment { label: String },

    #[error("Segment '{label}' appears more than once in the catalog")]
    DuplicateSegment { label: String },

    #[error("Segment catalog is empty")]
    EmptyCatalog,

    #[error("Inputs are indexed by different segment catalogs")]
    CatalogMismatch,

    #[error("Customer {customer_id} has more than one assignment in the same period")]
    DuplicateAssignment { customer_id: u64 },

    #[error("No customers observed in segment '{segment}' during the transition period")]
    UndefinedTransitionRow { segment: String },

    #[error("Catalog has no absent outcome; extend it with SegmentCatalog::with_absent_outcome")]
    MissingAbsentSegment,

    #[error("No revenue given for segment '{segment}'")]
    MissingRevenue { segment: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ClvResult<T> = Result<T, ClvError>;

/// Non-fatal conditions detected during a run
///
/// These are reported alongside results; each one is also logged when raised.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelWarning {
    /// A segment had zero originating customers; its row was filled per policy
    UndefinedTransitionRow { segment: String, policy: String },

    /// Projected total population drifted from the starting total
    PopulationConservation {
        period: usize,
        expected: f64,
        actual: f64,
    },
}

impl std::fmt::Display for ModelWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelWarning::UndefinedTransitionRow { segment, policy } => write!(
                f,
                "segment '{}' had no originating customers (row policy: {})",
                segment, policy
            ),
            ModelWarning::PopulationConservation { period, expected, actual } => write!(
                f,
                "period {} population {:.4} differs from starting total {:.4}",
                period, actual, expected
            ),
        }
    }
}
