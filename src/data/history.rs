//! Historical entry counts for sparklines and rate calculations.

use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use dqmwatch_types::HistogramPackage;

/// Maximum number of historical samples to keep.
const MAX_HISTORY_SIZE: usize = 60;

/// Tracks total entries per package over time.
///
/// One sample is recorded per update frame. A run boundary clears the
/// history, since entry counts restart from zero.
#[derive(Debug, Clone)]
pub struct History {
    /// Historical entry totals per package (package name -> samples).
    pub package_entries: HashMap<String, VecDeque<f64>>,
    /// Timestamps of samples for rate calculations.
    pub timestamps: VecDeque<Instant>,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    /// Create a new empty history.
    pub fn new() -> Self {
        Self {
            package_entries: HashMap::new(),
            timestamps: VecDeque::new(),
        }
    }

    /// Record the current totals of every package.
    pub fn record(&mut self, packages: &[HistogramPackage], at: Instant) {
        for package in packages {
            let entries = self
                .package_entries
                .entry(package.name().to_string())
                .or_default();
            entries.push_back(package.total_entries());
            if entries.len() > MAX_HISTORY_SIZE {
                entries.pop_front();
            }
        }

        self.timestamps.push_back(at);
        if self.timestamps.len() > MAX_HISTORY_SIZE {
            self.timestamps.pop_front();
        }
    }

    /// Forget everything, e.g. at a run boundary.
    pub fn clear(&mut self) {
        self.package_entries.clear();
        self.timestamps.clear();
    }

    /// Number of samples recorded.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Sparkline of entry growth (normalized to 0-7 for 8 bar levels).
    ///
    /// Returns an empty Vec if there's not enough history.
    pub fn get_entries_sparkline(&self, package: &str) -> Vec<u8> {
        let Some(values) = self.package_entries.get(package) else {
            return Vec::new();
        };

        if values.len() < 2 {
            return Vec::new();
        }

        let deltas: Vec<f64> = values
            .iter()
            .zip(values.iter().skip(1))
            .map(|(a, b)| b - a)
            .collect();

        let max = deltas.iter().copied().fold(1.0, f64::max);
        let min = deltas.iter().copied().fold(0.0, f64::min);
        let range = (max - min).max(1.0);

        deltas
            .iter()
            .map(|&v| {
                let normalized = ((v - min) / range * 7.0) as u8;
                normalized.min(7)
            })
            .collect()
    }

    /// Entries per second between the last two samples.
    ///
    /// Returns None if there's not enough history to calculate a rate.
    pub fn get_entries_rate(&self, package: &str) -> Option<f64> {
        let entries = self.package_entries.get(package)?;
        if entries.len() < 2 || self.timestamps.len() < 2 {
            return None;
        }

        let current = *entries.back()?;
        let previous = *entries.get(entries.len() - 2)?;

        let current_time = self.timestamps.back()?;
        let previous_time = self.timestamps.get(self.timestamps.len() - 2)?;
        let elapsed = current_time.duration_since(*previous_time).as_secs_f64();

        if elapsed > 0.0 {
            Some((current - previous) / elapsed)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dqmwatch_types::{Axis, BinStorage};
    use std::time::Duration;

    fn package(values: &[f64]) -> HistogramPackage {
        let mut p = HistogramPackage::builder("CDC")
            .histogram_1d("h1", "hits", BinStorage::Float, Axis::new(values.len(), 0.0, 1.0))
            .build();
        p.get_mut(0).unwrap().apply_in_range(values).unwrap();
        p
    }

    #[test]
    fn test_rate_between_samples() {
        let mut history = History::new();
        let t0 = Instant::now();
        history.record(&[package(&[1.0, 1.0])], t0);
        assert!(history.get_entries_rate("CDC").is_none());

        history.record(&[package(&[3.0, 3.0])], t0 + Duration::from_secs(2));
        assert_eq!(history.get_entries_rate("CDC"), Some(2.0));
        assert!(history.get_entries_rate("SVD").is_none());
    }

    #[test]
    fn test_history_is_bounded() {
        let mut history = History::new();
        let t0 = Instant::now();
        for i in 0..(MAX_HISTORY_SIZE + 10) {
            history.record(&[package(&[i as f64])], t0 + Duration::from_millis(i as u64));
        }
        assert_eq!(history.len(), MAX_HISTORY_SIZE);
        assert_eq!(history.package_entries["CDC"].len(), MAX_HISTORY_SIZE);
    }

    #[test]
    fn test_sparkline_levels() {
        let mut history = History::new();
        let t0 = Instant::now();
        for (i, v) in [0.0, 2.0, 6.0, 6.0].iter().enumerate() {
            history.record(&[package(&[*v])], t0 + Duration::from_secs(i as u64));
        }
        assert_eq!(history.get_entries_sparkline("CDC"), vec![3, 7, 0]);

        history.clear();
        assert!(history.is_empty());
        assert!(history.get_entries_sparkline("CDC").is_empty());
    }
}
