//! HistogramPackage - a named, ordered group of histograms.

use crate::{Axis, BinStorage, Histogram};

/// A named, ordered collection of histograms.
///
/// Packages are created when the monitoring server sends its configuration
/// and are never shrunk afterwards; only the histograms inside change.
///
/// # Example
///
/// ```rust
/// use dqmwatch_types::{Axis, BinStorage, HistogramPackage};
///
/// let package = HistogramPackage::builder("SVD")
///     .histogram_1d("hits", "SVD hits", BinStorage::Float, Axis::new(100, 0.0, 100.0))
///     .histogram_2d(
///         "occupancy",
///         "SVD occupancy",
///         BinStorage::Int,
///         Axis::new(8, 0.0, 8.0),
///         Axis::new(6, 0.0, 6.0),
///     )
///     .build();
///
/// assert_eq!(package.len(), 2);
/// assert_eq!(package.index_of("occupancy"), Some(1));
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HistogramPackage {
    name: String,
    histograms: Vec<Histogram>,
}

impl HistogramPackage {
    /// Create an empty package.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            histograms: Vec::new(),
        }
    }

    /// Create a builder for constructing packages.
    pub fn builder(name: impl Into<String>) -> HistogramPackageBuilder {
        HistogramPackageBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a histogram.
    pub fn push(&mut self, histogram: Histogram) {
        self.histograms.push(histogram);
    }

    pub fn is_empty(&self) -> bool {
        self.histograms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.histograms.len()
    }

    pub fn get(&self, index: usize) -> Option<&Histogram> {
        self.histograms.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Histogram> {
        self.histograms.get_mut(index)
    }

    /// Position of the histogram with the given name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.histograms.iter().position(|h| h.name() == name)
    }

    pub fn by_name(&self, name: &str) -> Option<&Histogram> {
        self.histograms.iter().find(|h| h.name() == name)
    }

    pub fn by_name_mut(&mut self, name: &str) -> Option<&mut Histogram> {
        self.histograms.iter_mut().find(|h| h.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Histogram> {
        self.histograms.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Histogram> {
        self.histograms.iter_mut()
    }

    /// Reset every histogram (contents and shadow snapshots).
    pub fn reset(&mut self) {
        self.histograms.iter_mut().for_each(Histogram::reset);
    }

    /// Total entries across all histograms.
    pub fn total_entries(&self) -> f64 {
        self.histograms.iter().map(Histogram::entries).sum()
    }
}

/// Builder for `HistogramPackage` instances.
#[derive(Debug)]
pub struct HistogramPackageBuilder {
    name: String,
    histograms: Vec<Histogram>,
}

impl HistogramPackageBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            histograms: Vec::new(),
        }
    }

    /// Add a 1-D histogram.
    pub fn histogram_1d(
        mut self,
        name: impl Into<String>,
        title: impl Into<String>,
        storage: BinStorage,
        x: Axis,
    ) -> Self {
        self.histograms.push(Histogram::new_1d(name, title, storage, x));
        self
    }

    /// Add a 2-D histogram.
    pub fn histogram_2d(
        mut self,
        name: impl Into<String>,
        title: impl Into<String>,
        storage: BinStorage,
        x: Axis,
        y: Axis,
    ) -> Self {
        self.histograms.push(Histogram::new_2d(name, title, storage, x, y));
        self
    }

    /// Add a pre-built histogram.
    pub fn histogram(mut self, histogram: Histogram) -> Self {
        self.histograms.push(histogram);
        self
    }

    pub fn build(self) -> HistogramPackage {
        HistogramPackage {
            name: self.name,
            histograms: self.histograms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package() -> HistogramPackage {
        HistogramPackage::builder("PXD")
            .histogram_1d("a", "A", BinStorage::Float, Axis::new(2, 0.0, 2.0))
            .histogram_1d("b", "B", BinStorage::Double, Axis::new(3, 0.0, 3.0))
            .build()
    }

    #[test]
    fn test_lookup_by_name_and_index() {
        let p = package();
        assert_eq!(p.name(), "PXD");
        assert_eq!(p.len(), 2);
        assert_eq!(p.get(1).unwrap().name(), "b");
        assert_eq!(p.by_name("a").unwrap().title(), "A");
        assert_eq!(p.index_of("b"), Some(1));
        assert!(p.by_name("missing").is_none());
        assert!(p.get(2).is_none());
    }

    #[test]
    fn test_reset_all() {
        let mut p = package();
        p.by_name_mut("a").unwrap().apply_in_range(&[1.0, 1.0]).unwrap();
        p.get_mut(1).unwrap().apply_in_range(&[2.0, 2.0, 2.0]).unwrap();
        assert_eq!(p.total_entries(), 8.0);

        p.reset();
        assert_eq!(p.total_entries(), 0.0);
        assert!(p.iter().all(|h| h.tmp().is_none()));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_roundtrip() {
        let mut p = package();
        p.get_mut(0).unwrap().apply_in_range(&[3.0, 4.0]).unwrap();

        let json = serde_json::to_string(&p).unwrap();
        let parsed: HistogramPackage = serde_json::from_str(&json).unwrap();

        assert_eq!(p, parsed);
    }
}
