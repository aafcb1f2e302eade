//! # dqmwatch-types
//!
//! Value types for live data-quality monitoring: binned histograms, their
//! axis layout, and the named packages a monitoring server groups them into.
//!
//! ## Design Goals
//!
//! - **Zero required dependencies**: usable by servers, viewers and tests alike
//! - **Optional serialization**: enable the `serde` feature to export state
//! - **Closed variants**: a histogram is 1-D or 2-D, decided once at
//!   configuration time and carried as data afterwards
//! - **Rate-of-change bookkeeping**: every histogram keeps the last full
//!   snapshot and the last delta so viewers can show what changed
//!
//! ## Features
//!
//! - `serde`: serialization via serde
//!
//! ## Example
//!
//! ```rust
//! use dqmwatch_types::{Axis, BinStorage, HistogramPackage};
//!
//! let mut package = HistogramPackage::builder("CDC")
//!     .histogram_1d("adc", "CDC ADC", BinStorage::Float, Axis::new(4, 0.0, 4.0))
//!     .build();
//!
//! let adc = package.by_name_mut("adc").unwrap();
//! adc.apply_in_range(&[1.0, 2.0, 3.0, 4.0]).unwrap();
//!
//! assert_eq!(adc.entries(), 10.0);
//! assert!(adc.diff().is_none());
//! ```

mod axis;
mod histogram;
mod package;

pub use axis::*;
pub use histogram::*;
pub use package::*;
