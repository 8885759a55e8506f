//! Segment-to-segment transition matrices
//!
//! Counts are tallied from two consecutive periods of assignments, joined on
//! the customers of the earlier period, then each row is normalised into a
//! probability distribution over next-period segments.

use crate::error::{ClvError, ClvResult, ModelWarning};
use crate::segments::{SegmentAssignments, SegmentCatalog, SegmentId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Allowed deviation of a row sum from 1.0
pub const ROW_SUM_TOLERANCE: f64 = 1e-9;

/// Treatment of a segment with no originating customers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroRowPolicy {
    /// Customers in the segment stay where they are
    #[default]
    Identity,
    /// Row is left as zeros; any population there is lost during projection
    LeaveUndefined,
    /// Fail the build
    Reject,
}

impl fmt::Display for ZeroRowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ZeroRowPolicy::Identity => "identity",
            ZeroRowPolicy::LeaveUndefined => "leave_undefined",
            ZeroRowPolicy::Reject => "reject",
        };
        f.write_str(name)
    }
}

/// Treatment of period-t customers with no assignment in period t+1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbsentPolicy {
    /// Count them as moving to the catalog's absent outcome
    #[default]
    AbsorbingSegment,
    /// Leave them out of the row totals entirely
    ExcludeFromRow,
}

/// Raw transition tallies, rows = period t, columns = period t+1
#[derive(Debug, Clone)]
pub struct TransitionCounts {
    catalog: SegmentCatalog,
    counts: Vec<Vec<f64>>,
    /// Period-t customers left out because they had no next-period record
    pub excluded: usize,
}

impl TransitionCounts {
    pub fn catalog(&self) -> &SegmentCatalog {
        &self.catalog
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.counts
    }

    pub fn get(&self, from: SegmentId, to: SegmentId) -> ClvResult<f64> {
        self.catalog.check(from)?;
        self.catalog.check(to)?;
        Ok(self.counts[from.index()][to.index()])
    }

    pub fn row_total(&self, from: SegmentId) -> ClvResult<f64> {
        self.catalog.check(from)?;
        Ok(self.counts[from.index()].iter().sum())
    }
}

/// Row-stochastic matrix of segment transition probabilities
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionMatrix {
    catalog: SegmentCatalog,
    rows: Vec<Vec<f64>>,
    undefined_rows: Vec<SegmentId>,
    warnings: Vec<ModelWarning>,
}

impl TransitionMatrix {
    /// Build from explicit probabilities
    ///
    /// Every row must either sum to 1.0 or be entirely zero; all-zero rows
    /// are recorded as undefined.
    pub fn from_rows(catalog: SegmentCatalog, rows: Vec<Vec<f64>>) -> ClvResult<Self> {
        let k = catalog.len();
        if rows.len() != k || rows.iter().any(|r| r.len() != k) {
            return Err(ClvError::InvalidInput(format!(
                "transition matrix must be {}x{} to match the catalog",
                k, k
            )));
        }

        let mut undefined_rows = Vec::new();
        for (id, row) in catalog.ids().zip(&rows) {
            if row.iter().any(|p| !p.is_finite() || *p < 0.0 || *p > 1.0) {
                return Err(ClvError::InvalidInput(format!(
                    "row '{}' has a probability outside [0, 1]",
                    catalog.label_of(id)
                )));
            }
            let sum: f64 = row.iter().sum();
            if sum == 0.0 {
                undefined_rows.push(id);
            } else if (sum - 1.0).abs() > ROW_SUM_TOLERANCE {
                return Err(ClvError::InvalidInput(format!(
                    "row '{}' sums to {} instead of 1",
                    catalog.label_of(id),
                    sum
                )));
            }
        }

        Ok(Self {
            catalog,
            rows,
            undefined_rows,
            warnings: Vec::new(),
        })
    }

    /// Matrix where every customer stays in their segment
    pub fn identity(catalog: SegmentCatalog) -> Self {
        let k = catalog.len();
        let rows = (0..k)
            .map(|i| (0..k).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
            .collect();
        Self {
            catalog,
            rows,
            undefined_rows: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn catalog(&self) -> &SegmentCatalog {
        &self.catalog
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn probability(&self, from: SegmentId, to: SegmentId) -> ClvResult<f64> {
        self.catalog.check(from)?;
        self.catalog.check(to)?;
        Ok(self.rows[from.index()][to.index()])
    }

    /// Probabilities between two labels
    pub fn probability_of(&self, from: &str, to: &str) -> ClvResult<f64> {
        self.probability(self.catalog.id(from)?, self.catalog.id(to)?)
    }

    /// Segments whose rows were left all-zero
    pub fn undefined_rows(&self) -> &[SegmentId] {
        &self.undefined_rows
    }

    /// Conditions raised while this matrix was built
    pub fn warnings(&self) -> &[ModelWarning] {
        &self.warnings
    }

    /// True when every row is a probability distribution
    pub fn is_row_stochastic(&self) -> bool {
        self.rows
            .iter()
            .all(|r| (r.iter().sum::<f64>() - 1.0).abs() <= ROW_SUM_TOLERANCE)
    }
}

/// Builds transition matrices from consecutive periods of assignments
#[derive(Debug, Clone, Copy, Default)]
pub struct TransitionBuilder {
    pub zero_row_policy: ZeroRowPolicy,
    pub absent_policy: AbsentPolicy,
}

impl TransitionBuilder {
    pub fn new(zero_row_policy: ZeroRowPolicy, absent_policy: AbsentPolicy) -> Self {
        Self { zero_row_policy, absent_policy }
    }

    /// Tally (segment at t, segment at t+1) pairs for every period-t customer
    pub fn tally(
        &self,
        previous: &SegmentAssignments,
        next: &SegmentAssignments,
    ) -> ClvResult<TransitionCounts> {
        let catalog = previous.catalog().clone();
        catalog.ensure_same(next.catalog())?;

        let absent = match self.absent_policy {
            AbsentPolicy::AbsorbingSegment => Some(catalog.absent().ok_or(ClvError::MissingAbsentSegment)?),
            AbsentPolicy::ExcludeFromRow => None,
        };

        let k = catalog.len();
        let mut counts = vec![vec![0.0; k]; k];
        let mut excluded = 0;

        for (customer_id, from) in previous.iter() {
            match (next.get(customer_id), absent) {
                (Some(to), _) => counts[from.index()][to.index()] += 1.0,
                (None, Some(absent)) => counts[from.index()][absent.index()] += 1.0,
                (None, None) => excluded += 1,
            }
        }

        if excluded > 0 {
            log::warn!(
                "{} customers had no next-period record and were left out of transition rows",
                excluded
            );
        }

        Ok(TransitionCounts { catalog, counts, excluded })
    }

    /// Normalise tallies into probabilities, applying the zero-row policy
    pub fn normalize(&self, counts: &TransitionCounts) -> ClvResult<TransitionMatrix> {
        let catalog = counts.catalog.clone();
        let absent = catalog.absent();
        let k = catalog.len();

        let mut rows = Vec::with_capacity(k);
        let mut undefined_rows = Vec::new();
        let mut warnings = Vec::new();

        for from in catalog.ids() {
            let counted = &counts.counts[from.index()];
            let total: f64 = counted.iter().sum();
            if total > 0.0 {
                rows.push(counted.iter().map(|c| c / total).collect());
                continue;
            }

            let mut row = vec![0.0; k];

            // Customers who stopped purchasing stay stopped
            if Some(from) == absent {
                row[from.index()] = 1.0;
                rows.push(row);
                continue;
            }

            let label = catalog.label_of(from).to_string();
            match self.zero_row_policy {
                ZeroRowPolicy::Reject => {
                    return Err(ClvError::UndefinedTransitionRow { segment: label });
                }
                ZeroRowPolicy::Identity => row[from.index()] = 1.0,
                ZeroRowPolicy::LeaveUndefined => undefined_rows.push(from),
            }

            log::warn!(
                "Segment '{}' had no originating customers; applying {} row policy",
                label,
                self.zero_row_policy
            );
            warnings.push(ModelWarning::UndefinedTransitionRow {
                segment: label,
                policy: self.zero_row_policy.to_string(),
            });
            rows.push(row);
        }

        log::debug!("Built {}x{} transition matrix", k, k);

        Ok(TransitionMatrix {
            catalog,
            rows,
            undefined_rows,
            warnings,
        })
    }

    /// Tally and normalise in one step
    pub fn build(
        &self,
        previous: &SegmentAssignments,
        next: &SegmentAssignments,
    ) -> ClvResult<TransitionMatrix> {
        let counts = self.tally(previous, next)?;
        self.normalize(&counts)
    }
}
