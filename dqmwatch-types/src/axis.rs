//! Axis binning and the one/two-dimensional layout of bin storage.

/// A uniformly binned axis.
///
/// Each bound carries a "fixed" flag. A fixed bound is never moved by
/// [`Axis::rescale`], which is what auto-scaling consumers call.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Axis {
    /// Number of in-range bins (excluding underflow/overflow).
    pub nbins: usize,
    /// Lower edge of the first in-range bin.
    pub min: f64,
    /// Upper edge of the last in-range bin.
    pub max: f64,
    /// Whether the lower bound is pinned.
    #[cfg_attr(feature = "serde", serde(default))]
    pub fixed_min: bool,
    /// Whether the upper bound is pinned.
    #[cfg_attr(feature = "serde", serde(default))]
    pub fixed_max: bool,
}

impl Axis {
    /// Create an axis with both bounds free.
    pub const fn new(nbins: usize, min: f64, max: f64) -> Self {
        Self {
            nbins,
            min,
            max,
            fixed_min: false,
            fixed_max: false,
        }
    }

    /// Pin the lower bound.
    pub fn with_fixed_min(mut self) -> Self {
        self.fixed_min = true;
        self
    }

    /// Pin the upper bound.
    pub fn with_fixed_max(mut self) -> Self {
        self.fixed_max = true;
        self
    }

    /// Number of storage slots along this axis, including underflow and overflow.
    pub const fn slots(&self) -> usize {
        self.nbins + 2
    }

    /// Width of one in-range bin.
    pub fn bin_width(&self) -> f64 {
        if self.nbins == 0 {
            return 0.0;
        }
        (self.max - self.min) / self.nbins as f64
    }

    /// Slot index for a coordinate: 0 is underflow, `nbins + 1` is overflow.
    pub fn find_bin(&self, x: f64) -> usize {
        if x.is_nan() || x < self.min {
            return 0;
        }
        if x >= self.max || self.nbins == 0 {
            return self.nbins + 1;
        }
        let bin = ((x - self.min) / self.bin_width()) as usize;
        (bin + 1).min(self.nbins)
    }

    /// Center of an in-range bin (1-based slot index).
    pub fn bin_center(&self, bin: usize) -> f64 {
        self.min + (bin as f64 - 0.5) * self.bin_width()
    }

    /// Move the free bounds to `lo`/`hi`. Returns true if anything changed.
    pub fn rescale(&mut self, lo: f64, hi: f64) -> bool {
        let mut changed = false;
        if !self.fixed_min && self.min != lo {
            self.min = lo;
            changed = true;
        }
        if !self.fixed_max && self.max != hi {
            self.max = hi;
            changed = true;
        }
        changed
    }
}

/// Dimensionality of a histogram, fixed when it is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HistogramKind {
    OneD,
    TwoD,
}

impl HistogramKind {
    /// Digit used in class tags (`TH1*` / `TH2*`).
    pub fn digit(&self) -> char {
        match self {
            HistogramKind::OneD => '1',
            HistogramKind::TwoD => '2',
        }
    }
}

/// Axis layout of a histogram.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Binning {
    OneD { x: Axis },
    TwoD { x: Axis, y: Axis },
}

impl Binning {
    pub fn kind(&self) -> HistogramKind {
        match self {
            Binning::OneD { .. } => HistogramKind::OneD,
            Binning::TwoD { .. } => HistogramKind::TwoD,
        }
    }

    pub fn x(&self) -> &Axis {
        match self {
            Binning::OneD { x } | Binning::TwoD { x, .. } => x,
        }
    }

    pub fn x_mut(&mut self) -> &mut Axis {
        match self {
            Binning::OneD { x } | Binning::TwoD { x, .. } => x,
        }
    }

    pub fn y(&self) -> Option<&Axis> {
        match self {
            Binning::OneD { .. } => None,
            Binning::TwoD { y, .. } => Some(y),
        }
    }

    /// Total number of storage slots, flow bins included.
    pub fn slots(&self) -> usize {
        match self {
            Binning::OneD { x } => x.slots(),
            Binning::TwoD { x, y } => x.slots() * y.slots(),
        }
    }

    /// Number of in-range bins, which is what travels on the wire.
    pub fn in_range_bins(&self) -> usize {
        match self {
            Binning::OneD { x } => x.nbins,
            Binning::TwoD { x, y } => x.nbins * y.nbins,
        }
    }

    /// Storage slot for a `(ix, iy)` pair. `iy` is ignored for 1-D.
    pub fn slot(&self, ix: usize, iy: usize) -> usize {
        match self {
            Binning::OneD { .. } => ix,
            Binning::TwoD { x, .. } => iy * x.slots() + ix,
        }
    }

    /// In-range storage slots in wire order (`for y: for x:` for 2-D).
    pub fn in_range_slots(&self) -> impl Iterator<Item = usize> + '_ {
        let (nx, ny) = match self {
            Binning::OneD { x } => (x.nbins, 1),
            Binning::TwoD { x, y } => (x.nbins, y.nbins),
        };
        let binning = *self;
        (1..=ny).flat_map(move |iy| (1..=nx).map(move |ix| binning.slot(ix, iy)))
    }
}
