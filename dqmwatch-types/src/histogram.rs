//! Histograms and their derived shadow snapshots.

use std::fmt;
use std::str::FromStr;

use crate::{Axis, Binning, HistogramKind};

/// Numeric kind a histogram stores its bins as on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BinStorage {
    Char,
    Short,
    Int,
    Float,
    Double,
}

impl BinStorage {
    /// Bytes per bin value on the wire.
    pub const fn width(&self) -> usize {
        match self {
            BinStorage::Char => 1,
            BinStorage::Short => 2,
            BinStorage::Int | BinStorage::Float => 4,
            BinStorage::Double => 8,
        }
    }

    /// Suffix letter used in class tags.
    pub const fn suffix(&self) -> char {
        match self {
            BinStorage::Char => 'C',
            BinStorage::Short => 'S',
            BinStorage::Int => 'I',
            BinStorage::Float => 'F',
            BinStorage::Double => 'D',
        }
    }

    fn from_suffix(c: char) -> Option<Self> {
        match c {
            'C' => Some(BinStorage::Char),
            'S' => Some(BinStorage::Short),
            'I' => Some(BinStorage::Int),
            'F' => Some(BinStorage::Float),
            'D' => Some(BinStorage::Double),
            _ => None,
        }
    }
}

/// A parsed histogram class tag such as `TH1F` or `TH2D`.
///
/// The tag is parsed once when a histogram is configured; everything after
/// that dispatches on [`HistogramKind`] and [`BinStorage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HistogramClass {
    pub kind: HistogramKind,
    pub storage: BinStorage,
}

impl HistogramClass {
    pub const fn new(kind: HistogramKind, storage: BinStorage) -> Self {
        Self { kind, storage }
    }
}

impl fmt::Display for HistogramClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TH{}{}", self.kind.digit(), self.storage.suffix())
    }
}

/// Error returned when a class tag is not a known `TH1*`/`TH2*` tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseClassError(pub String);

impl fmt::Display for ParseClassError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown histogram class tag '{}'", self.0)
    }
}

impl std::error::Error for ParseClassError {}

impl FromStr for HistogramClass {
    type Err = ParseClassError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseClassError(s.into());
        let rest = s.strip_prefix("TH").ok_or_else(err)?;
        let mut chars = rest.chars();
        let kind = match chars.next() {
            Some('1') => HistogramKind::OneD,
            Some('2') => HistogramKind::TwoD,
            _ => return Err(err()),
        };
        let storage = chars.next().and_then(BinStorage::from_suffix).ok_or_else(err)?;
        if chars.next().is_some() {
            return Err(err());
        }
        Ok(Self { kind, storage })
    }
}

/// A full copy of a histogram's bin contents at one point in time.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BinSnapshot {
    contents: Vec<f64>,
    entries: f64,
}

impl BinSnapshot {
    /// Wrap a slot array; entries are the sum of all slots.
    pub fn new(contents: Vec<f64>) -> Self {
        let entries = contents.iter().sum();
        Self { contents, entries }
    }

    pub fn contents(&self) -> &[f64] {
        &self.contents
    }

    pub fn entries(&self) -> f64 {
        self.entries
    }

    /// Bin-wise `self - other`.
    fn minus(&self, other: &BinSnapshot) -> BinSnapshot {
        let contents = self
            .contents
            .iter()
            .zip(other.contents.iter())
            .map(|(a, b)| a - b)
            .collect();
        BinSnapshot::new(contents)
    }
}

/// Returned when a snapshot's slot count does not match the histogram binning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeError {
    pub expected: usize,
    pub actual: usize,
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "snapshot has {} slots, histogram expects {}",
            self.actual, self.expected
        )
    }
}

impl std::error::Error for ShapeError {}

/// A binned histogram as configured by the monitoring server.
///
/// Besides the live contents, a histogram keeps two shadow snapshots used
/// for rate-of-change display:
///
/// - `tmp`: the last full snapshot received
/// - `diff`: the delta between the two most recent snapshots whose entry
///   counts differed
///
/// Both are only touched by [`Histogram::apply_snapshot`] and
/// [`Histogram::reset`].
///
/// # Example
///
/// ```rust
/// use dqmwatch_types::{Axis, BinStorage, Histogram};
///
/// let mut h = Histogram::new_1d("h1", "hits", BinStorage::Float, Axis::new(4, 0.0, 4.0));
/// h.apply_in_range(&[1.0, 2.0, 3.0, 4.0]).unwrap();
/// h.apply_in_range(&[2.0, 4.0, 6.0, 8.0]).unwrap();
///
/// let diff = h.diff().unwrap();
/// assert_eq!(&diff.contents()[1..5], &[1.0, 2.0, 3.0, 4.0]);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Histogram {
    name: String,
    title: String,
    storage: BinStorage,
    binning: Binning,
    contents: Vec<f64>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    tmp: Option<BinSnapshot>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    diff: Option<BinSnapshot>,
}

impl Histogram {
    /// Create an empty histogram with the given binning.
    pub fn new(
        name: impl Into<String>,
        title: impl Into<String>,
        storage: BinStorage,
        binning: Binning,
    ) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            storage,
            binning,
            contents: vec![0.0; binning.slots()],
            tmp: None,
            diff: None,
        }
    }

    /// Create an empty 1-D histogram.
    pub fn new_1d(
        name: impl Into<String>,
        title: impl Into<String>,
        storage: BinStorage,
        x: Axis,
    ) -> Self {
        Self::new(name, title, storage, Binning::OneD { x })
    }

    /// Create an empty 2-D histogram.
    pub fn new_2d(
        name: impl Into<String>,
        title: impl Into<String>,
        storage: BinStorage,
        x: Axis,
        y: Axis,
    ) -> Self {
        Self::new(name, title, storage, Binning::TwoD { x, y })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn storage(&self) -> BinStorage {
        self.storage
    }

    pub fn binning(&self) -> &Binning {
        &self.binning
    }

    /// Move the free bounds of the x axis. Bin count is never changed.
    pub fn rescale_x(&mut self, lo: f64, hi: f64) -> bool {
        self.binning.x_mut().rescale(lo, hi)
    }

    pub fn kind(&self) -> HistogramKind {
        self.binning.kind()
    }

    pub fn class(&self) -> HistogramClass {
        HistogramClass::new(self.kind(), self.storage)
    }

    /// All storage slots, flow bins included.
    pub fn contents(&self) -> &[f64] {
        &self.contents
    }

    /// Sum of all bin contents.
    pub fn entries(&self) -> f64 {
        self.contents.iter().sum()
    }

    /// Content of a 1-D slot (0 = underflow).
    pub fn bin(&self, ix: usize) -> f64 {
        self.contents.get(ix).copied().unwrap_or(0.0)
    }

    /// Content of a 2-D slot.
    pub fn bin_2d(&self, ix: usize, iy: usize) -> f64 {
        self.bin(self.binning.slot(ix, iy))
    }

    /// In-range contents in wire order.
    pub fn in_range_contents(&self) -> impl Iterator<Item = f64> + '_ {
        self.binning.in_range_slots().map(move |slot| self.contents[slot])
    }

    /// Add `weight` at `x` (1-D) or at `(x, y)` for 2-D, where `y` is required.
    pub fn fill(&mut self, x: f64, y: Option<f64>, weight: f64) {
        let ix = self.binning.x().find_bin(x);
        let iy = match (self.binning.y(), y) {
            (Some(axis), Some(y)) => axis.find_bin(y),
            (Some(_), None) => return,
            (None, _) => 0,
        };
        let slot = self.binning.slot(ix, iy);
        if let Some(c) = self.contents.get_mut(slot) {
            *c += weight;
        }
    }

    /// Minimum and maximum of the in-range contents, for auto-scaling.
    pub fn content_range(&self) -> Option<(f64, f64)> {
        self.in_range_contents().fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }

    pub fn tmp(&self) -> Option<&BinSnapshot> {
        self.tmp.as_ref()
    }

    pub fn diff(&self) -> Option<&BinSnapshot> {
        self.diff.as_ref()
    }

    /// Apply a freshly received snapshot covering all storage slots.
    ///
    /// If the stored `tmp` has entries and the new entry count differs,
    /// `diff` becomes `new - tmp`. In every case `tmp` and the live contents
    /// become `new`. Unchanged entries leave `diff` exactly as it was.
    pub fn apply_snapshot(&mut self, contents: Vec<f64>) -> Result<(), ShapeError> {
        let expected = self.binning.slots();
        if contents.len() != expected {
            return Err(ShapeError {
                expected,
                actual: contents.len(),
            });
        }

        let new = BinSnapshot::new(contents);
        if let Some(tmp) = &self.tmp {
            if tmp.entries > 0.0 && new.entries != tmp.entries {
                self.diff = Some(new.minus(tmp));
            }
        }
        self.contents.clear();
        self.contents.extend_from_slice(&new.contents);
        self.tmp = Some(new);
        Ok(())
    }

    /// Apply a snapshot given as in-range values in wire order.
    pub fn apply_in_range(&mut self, values: &[f64]) -> Result<(), ShapeError> {
        let expected = self.binning.in_range_bins();
        if values.len() != expected {
            return Err(ShapeError {
                expected,
                actual: values.len(),
            });
        }
        let mut contents = vec![0.0; self.binning.slots()];
        for (slot, value) in self.binning.in_range_slots().zip(values.iter()) {
            contents[slot] = *value;
        }
        self.apply_snapshot(contents)
    }

    /// Zero the contents and drop both shadow snapshots.
    pub fn reset(&mut self) {
        self.contents.iter_mut().for_each(|c| *c = 0.0);
        self.tmp = None;
        self.diff = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h1() -> Histogram {
        Histogram::new_1d("h1", "test", BinStorage::Float, Axis::new(4, 0.0, 4.0))
    }

    #[test]
    fn test_class_tag_roundtrip() {
        let class: HistogramClass = "TH2D".parse().unwrap();
        assert_eq!(class.kind, HistogramKind::TwoD);
        assert_eq!(class.storage, BinStorage::Double);
        assert_eq!(class.to_string(), "TH2D");
    }

    #[test]
    fn test_class_tag_rejects_unknown() {
        assert!("TH3F".parse::<HistogramClass>().is_err());
        assert!("TH1".parse::<HistogramClass>().is_err());
        assert!("TH1FX".parse::<HistogramClass>().is_err());
        assert!("TProfile".parse::<HistogramClass>().is_err());
    }

    #[test]
    fn test_first_snapshot_sets_tmp_only() {
        let mut h = h1();
        h.apply_in_range(&[1.0, 2.0, 3.0, 4.0]).unwrap();

        assert_eq!(h.tmp().unwrap().entries(), 10.0);
        assert!(h.diff().is_none());
        assert_eq!(h.bin(1), 1.0);
        assert_eq!(h.bin(4), 4.0);
    }

    #[test]
    fn test_changed_entries_produce_diff() {
        let mut h = h1();
        h.apply_in_range(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        h.apply_in_range(&[2.0, 4.0, 6.0, 8.0]).unwrap();

        let diff = h.diff().unwrap();
        assert_eq!(diff.contents(), &[0.0, 1.0, 2.0, 3.0, 4.0, 0.0]);
        assert_eq!(h.tmp().unwrap().contents(), &[0.0, 2.0, 4.0, 6.0, 8.0, 0.0]);
    }

    #[test]
    fn test_unchanged_entries_keep_diff() {
        let mut h = h1();
        h.apply_in_range(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        h.apply_in_range(&[2.0, 4.0, 6.0, 8.0]).unwrap();
        let before = h.diff().cloned();

        // Same entry count, different shape: diff must not move.
        h.apply_in_range(&[8.0, 6.0, 4.0, 2.0]).unwrap();
        assert_eq!(h.diff().cloned(), before);
        assert_eq!(h.bin(1), 8.0);
        assert_eq!(h.tmp().unwrap().contents()[1], 8.0);
    }

    #[test]
    fn test_empty_tmp_never_diffs() {
        let mut h = h1();
        h.apply_in_range(&[0.0; 4]).unwrap();
        h.apply_in_range(&[1.0, 1.0, 1.0, 1.0]).unwrap();
        assert!(h.diff().is_none());
    }

    #[test]
    fn test_reset_clears_shadows() {
        let mut h = h1();
        h.apply_in_range(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        h.apply_in_range(&[2.0, 4.0, 6.0, 8.0]).unwrap();
        h.reset();

        assert_eq!(h.entries(), 0.0);
        assert!(h.tmp().is_none());
        assert!(h.diff().is_none());
        assert_eq!(h.contents().len(), 6);
    }

    #[test]
    fn test_shape_mismatch_is_rejected() {
        let mut h = h1();
        let err = h.apply_in_range(&[1.0, 2.0]).unwrap_err();
        assert_eq!(err, ShapeError { expected: 4, actual: 2 });
        assert!(h.tmp().is_none());
    }

    #[test]
    fn test_fill_2d_and_range() {
        let mut h = Histogram::new_2d(
            "hxy",
            "map",
            BinStorage::Int,
            Axis::new(2, 0.0, 2.0),
            Axis::new(2, 0.0, 2.0),
        );
        h.fill(0.5, Some(1.5), 3.0);
        h.fill(1.5, None, 1.0); // ignored: 2-D needs y
        assert_eq!(h.bin_2d(1, 2), 3.0);
        assert_eq!(h.entries(), 3.0);
        assert_eq!(h.content_range(), Some((0.0, 3.0)));
        assert_eq!(h.class().to_string(), "TH2I");
    }
}
