//! Fixed, ordered catalog of segment labels
//!
//! Every matrix and vector in the crate is indexed by a catalog. Two
//! structures can only be combined when they share the same catalog, which
//! keeps rows, columns and population entries aligned.

use crate::error::{ClvError, ClvResult};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Label of the synthetic outcome for customers with no record in the next period
pub const ABSENT_LABEL: &str = "no purchase";

/// Managerial segments in canonical order
pub const STANDARD_SEGMENTS: [&str; 8] = [
    "inactive",
    "cold",
    "warm high value",
    "warm low value",
    "new warm",
    "active high value",
    "active low value",
    "new active",
];

/// Position of a segment within its catalog
///
/// Carries a fingerprint of the catalog's labels, so an id can only be used
/// with catalogs that order segments identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentId {
    index: usize,
    catalog: u64,
}

impl SegmentId {
    pub fn index(self) -> usize {
        self.index
    }
}

#[derive(Debug)]
struct CatalogInner {
    labels: Vec<String>,
    index: HashMap<String, usize>,
    absent: Option<usize>,
    fingerprint: u64,
}

impl CatalogInner {
    /// Labels must already be known to be unique
    fn from_unique(labels: Vec<String>) -> Self {
        let index = labels.iter().enumerate().map(|(i, l)| (l.clone(), i)).collect::<HashMap<_, _>>();
        let absent = index.get(ABSENT_LABEL).copied();

        let mut hasher = DefaultHasher::new();
        labels.hash(&mut hasher);

        Self {
            labels,
            index,
            absent,
            fingerprint: hasher.finish(),
        }
    }
}

/// Ordered set of segment labels
///
/// Cloning is cheap; clones share the same label table.
#[derive(Debug, Clone)]
pub struct SegmentCatalog {
    inner: Arc<CatalogInner>,
}

impl SegmentCatalog {
    /// Build a catalog from labels in the order they should index matrices
    pub fn new<S: AsRef<str>>(labels: &[S]) -> ClvResult<Self> {
        if labels.is_empty() {
            return Err(ClvError::EmptyCatalog);
        }

        let mut owned: Vec<String> = Vec::with_capacity(labels.len());
        for label in labels {
            let label = label.as_ref().to_string();
            if owned.contains(&label) {
                return Err(ClvError::DuplicateSegment { label });
            }
            owned.push(label);
        }

        Ok(Self {
            inner: Arc::new(CatalogInner::from_unique(owned)),
        })
    }

    /// The eight managerial segments, inactive first and new active last
    pub fn standard() -> Self {
        let labels = STANDARD_SEGMENTS.iter().map(|s| s.to_string()).collect();
        Self {
            inner: Arc::new(CatalogInner::from_unique(labels)),
        }
    }

    /// Copy of this catalog with the absent outcome appended as the last segment
    ///
    /// Returns a clone unchanged when the outcome is already present.
    pub fn with_absent_outcome(&self) -> Self {
        if self.inner.absent.is_some() {
            return self.clone();
        }

        let mut labels = self.inner.labels.clone();
        labels.push(ABSENT_LABEL.to_string());
        Self {
            inner: Arc::new(CatalogInner::from_unique(labels)),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.labels.is_empty()
    }

    pub fn labels(&self) -> &[String] {
        &self.inner.labels
    }

    fn make_id(&self, index: usize) -> SegmentId {
        SegmentId {
            index,
            catalog: self.inner.fingerprint,
        }
    }

    /// Look up a label, failing for anything outside the catalog
    pub fn id(&self, label: &str) -> ClvResult<SegmentId> {
        self.inner
            .index
            .get(label)
            .map(|&i| self.make_id(i))
            .ok_or_else(|| ClvError::UnknownSegment { label: label.to_string() })
    }

    /// Segment at a given position, if in range
    pub fn get(&self, index: usize) -> Option<SegmentId> {
        (index < self.len()).then(|| self.make_id(index))
    }

    /// Fail unless `id` was issued by a catalog with this exact ordering
    pub fn check(&self, id: SegmentId) -> ClvResult<()> {
        if id.catalog == self.inner.fingerprint && id.index < self.len() {
            Ok(())
        } else {
            Err(ClvError::CatalogMismatch)
        }
    }

    /// Label of a segment id issued by this catalog
    pub fn label(&self, id: SegmentId) -> ClvResult<&str> {
        self.check(id)?;
        Ok(&self.inner.labels[id.index])
    }

    /// Label of an id already known to belong to this catalog
    pub fn label_of(&self, id: SegmentId) -> &str {
        &self.inner.labels[id.index]
    }

    /// Identifier of the absent outcome, when the catalog carries one
    pub fn absent(&self) -> Option<SegmentId> {
        self.inner.absent.map(|i| self.make_id(i))
    }

    /// All segments in catalog order
    pub fn ids(&self) -> impl Iterator<Item = SegmentId> {
        let fingerprint = self.inner.fingerprint;
        (0..self.len()).map(move |index| SegmentId { index, catalog: fingerprint })
    }

    /// Fail unless `other` indexes segments identically
    pub fn ensure_same(&self, other: &SegmentCatalog) -> ClvResult<()> {
        if self == other {
            Ok(())
        } else {
            Err(ClvError::CatalogMismatch)
        }
    }
}

impl PartialEq for SegmentCatalog {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.inner.labels == other.inner.labels
    }
}

impl Eq for SegmentCatalog {}

impl Default for SegmentCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Display for SegmentCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.inner.labels.join(", "))
    }
}
