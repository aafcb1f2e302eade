//! Synthetic histogram packages for the demo server and tests.
//!
//! The filler draws from a seeded [`SmallRng`], so a given seed always
//! produces the same sequence of frames.

use dqmwatch_types::{Axis, BinStorage, Histogram, HistogramPackage};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Triangular};

/// Packages published by `dqmwatch demo-server`.
pub fn demo_packages() -> Vec<HistogramPackage> {
    vec![
        HistogramPackage::builder("CDC")
            .histogram_1d(
                "adc",
                "CDC ADC sum",
                BinStorage::Float,
                Axis::new(64, 0.0, 1024.0).with_fixed_min(),
            )
            .histogram_2d(
                "hitmap",
                "CDC hits per layer and sector",
                BinStorage::Short,
                Axis::new(16, 0.0, 16.0),
                Axis::new(8, 0.0, 8.0),
            )
            .build(),
        HistogramPackage::builder("ECL")
            .histogram_1d(
                "energy",
                "ECL cluster energy [GeV]",
                BinStorage::Double,
                Axis::new(50, 0.0, 5.0),
            )
            .histogram_1d(
                "timing",
                "ECL cluster time [ns]",
                BinStorage::Int,
                Axis::new(40, -100.0, 100.0),
            )
            .build(),
        HistogramPackage::builder("KLM")
            .histogram_2d(
                "occupancy",
                "KLM strip occupancy",
                BinStorage::Int,
                Axis::new(12, 0.0, 12.0),
                Axis::new(8, 0.0, 8.0),
            )
            .build(),
    ]
}

/// Adds synthetic events to histograms.
#[derive(Debug, Clone)]
pub struct DemoFiller {
    rng: SmallRng,
}

/// Triangular distribution over the axis range, peaked at its centre.
fn peaked(axis: &Axis) -> Option<Triangular<f64>> {
    Triangular::new(axis.min, axis.max, (axis.min + axis.max) / 2.0).ok()
}

impl DemoFiller {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Fill `events` entries into one histogram.
    pub fn fill_histogram(&mut self, histogram: &mut Histogram, events: usize) {
        let Some(x_dist) = peaked(histogram.binning().x()) else {
            tracing::debug!(histogram = histogram.name(), "empty x range, not filled");
            return;
        };
        let y_dist = match histogram.binning().y() {
            Some(axis) => match peaked(axis) {
                Some(dist) => Some(dist),
                None => {
                    tracing::debug!(histogram = histogram.name(), "empty y range, not filled");
                    return;
                }
            },
            None => None,
        };

        for _ in 0..events {
            let x = x_dist.sample(&mut self.rng);
            let y = y_dist.as_ref().map(|dist| dist.sample(&mut self.rng));
            histogram.fill(x, y, 1.0);
        }
    }

    /// Fill `events` entries into every histogram of every package.
    pub fn fill(&mut self, packages: &mut [HistogramPackage], events: usize) {
        for package in packages {
            for histogram in package.iter_mut() {
                self.fill_histogram(histogram, events);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_packages_shape() {
        let packages = demo_packages();
        let names: Vec<&str> = packages.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["CDC", "ECL", "KLM"]);
        assert!(packages.iter().all(|p| p.total_entries() == 0.0));
    }

    #[test]
    fn test_fill_is_deterministic() {
        let mut a = demo_packages();
        let mut b = demo_packages();
        DemoFiller::new(7).fill(&mut a, 100);
        DemoFiller::new(7).fill(&mut b, 100);

        for (pa, pb) in a.iter().zip(&b) {
            for (ha, hb) in pa.iter().zip(pb.iter()) {
                assert_eq!(ha.contents(), hb.contents());
                // Peaked values stay inside the axis range
                assert_eq!(ha.entries(), 100.0);
                assert_eq!(ha.in_range_contents().sum::<f64>(), 100.0);
            }
        }
    }

    #[test]
    fn test_seeds_differ() {
        let mut a = demo_packages();
        let mut b = demo_packages();
        DemoFiller::new(1).fill(&mut a, 50);
        DemoFiller::new(2).fill(&mut b, 50);
        assert_ne!(a[0].get(0).unwrap().contents(), b[0].get(0).unwrap().contents());
    }

    #[test]
    fn test_degenerate_axis_is_skipped() {
        let mut h = Histogram::new_1d("flat", "flat", BinStorage::Int, Axis::new(4, 1.0, 1.0));
        DemoFiller::new(3).fill_histogram(&mut h, 10);
        assert_eq!(h.entries(), 0.0);
    }
}
