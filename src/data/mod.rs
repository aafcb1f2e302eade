//! Consumer-side data models.
//!
//! ## Submodules
//!
//! - [`history`]: Historical entry totals for sparklines and rate calculations
//! - [`view`]: [`MonitorView`], the state a presentation layer renders
//!
//! ## Data Flow
//!
//! ```text
//! SessionEvent (from the session thread)
//!        │
//!        ▼
//! MonitorView::apply()
//!        │
//!        ├──▶ latest packages and run identity
//!        │
//!        └──▶ History::record() (for sparklines and rates)
//! ```

pub mod history;
pub mod view;

pub use history::History;
pub use view::{MonitorView, PackageSummary, UpdateSummary};
