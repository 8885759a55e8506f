//! Segment population vectors

use super::transition::TransitionMatrix;
use crate::error::{ClvError, ClvResult};
use crate::segments::{SegmentAssignments, SegmentCatalog, SegmentId};

/// Expected number of customers in each segment for one period
#[derive(Debug, Clone, PartialEq)]
pub struct PopulationVector {
    catalog: SegmentCatalog,
    values: Vec<f64>,
}

impl PopulationVector {
    /// Build from values in catalog order
    pub fn from_values(catalog: SegmentCatalog, values: Vec<f64>) -> ClvResult<Self> {
        if values.len() != catalog.len() {
            return Err(ClvError::InvalidInput(format!(
                "population has {} entries but catalog has {} segments",
                values.len(),
                catalog.len()
            )));
        }
        if let Some((i, v)) = values.iter().enumerate().find(|(_, v)| !v.is_finite() || **v < 0.0) {
            return Err(ClvError::InvalidInput(format!(
                "population for '{}' must be a non-negative number, got {}",
                catalog.labels()[i],
                v
            )));
        }
        Ok(Self { catalog, values })
    }

    /// Build from (label, count) pairs; unlisted segments are empty
    pub fn from_labels<'a, I>(catalog: SegmentCatalog, pairs: I) -> ClvResult<Self>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut values = vec![0.0; catalog.len()];
        for (label, count) in pairs {
            values[catalog.id(label)?.index()] += count;
        }
        Self::from_values(catalog, values)
    }

    /// Head count per segment of a period's assignments
    pub fn from_assignments(assignments: &SegmentAssignments) -> Self {
        Self {
            catalog: assignments.catalog().clone(),
            values: assignments.counts().into_iter().map(|c| c as f64).collect(),
        }
    }

    pub fn catalog(&self) -> &SegmentCatalog {
        &self.catalog
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, segment: SegmentId) -> ClvResult<f64> {
        self.catalog.check(segment)?;
        Ok(self.values[segment.index()])
    }

    /// Population of a segment by label
    pub fn count(&self, label: &str) -> ClvResult<f64> {
        self.get(self.catalog.id(label)?)
    }

    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Next period's expected population, `self · T`
    pub fn step(&self, transition: &TransitionMatrix) -> ClvResult<Self> {
        self.catalog.ensure_same(transition.catalog())?;

        let k = self.values.len();
        let mut next = vec![0.0; k];
        for (from, &population) in self.values.iter().enumerate() {
            if population == 0.0 {
                continue;
            }
            for (to, slot) in next.iter_mut().enumerate() {
                *slot += population * transition.rows()[from][to];
            }
        }

        Ok(Self {
            catalog: self.catalog.clone(),
            values: next,
        })
    }
}
