//! Consumer-side view of a monitoring session.

use std::time::Instant;

use dqmwatch_types::{Histogram, HistogramPackage};
use dqmwatch_wire::protocol::UpdateHeader;
use serde::Serialize;

use super::history::History;
use crate::session::{MonitorObserver, SessionEvent};

/// Everything a presentation layer needs, rebuilt from session events.
#[derive(Debug, Clone, Default)]
pub struct MonitorView {
    /// Packages the server offered.
    pub announced: Vec<String>,
    /// Latest state of the monitored packages.
    pub packages: Vec<HistogramPackage>,
    /// Run identity of the latest update.
    pub header: Option<UpdateHeader>,
    /// Whether the session is still live.
    pub connected: bool,
    /// Reason of the last reset, if any.
    pub last_reset: Option<String>,
    /// Updates received.
    pub updates: u64,
    /// Time of the last update.
    pub last_updated: Option<Instant>,
    pub history: History,
}

/// Per-package line of an update summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageSummary {
    pub name: String,
    pub histograms: usize,
    pub entries: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<f64>,
}

/// Compact description of the current view, printed once per update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateSummary {
    pub exp: i32,
    pub run: i32,
    pub state: i32,
    pub updates: u64,
    pub packages: Vec<PackageSummary>,
}

impl MonitorView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event into the view.
    pub fn apply(&mut self, event: &SessionEvent) {
        event.dispatch(self);
    }

    pub fn package(&self, name: &str) -> Option<&HistogramPackage> {
        self.packages.iter().find(|p| p.name() == name)
    }

    /// Look up `package/histogram`.
    pub fn histogram(&self, package: &str, name: &str) -> Option<&Histogram> {
        self.package(package)?.by_name(name)
    }

    pub fn summary(&self) -> Option<UpdateSummary> {
        let header = self.header?;
        let packages = self
            .packages
            .iter()
            .map(|p| PackageSummary {
                name: p.name().to_string(),
                histograms: p.len(),
                entries: p.total_entries(),
                rate: self.history.get_entries_rate(p.name()),
            })
            .collect();
        Some(UpdateSummary {
            exp: header.exp,
            run: header.run,
            state: header.state,
            updates: self.updates,
            packages,
        })
    }
}

impl MonitorObserver for MonitorView {
    fn on_package_list(&mut self, names: &[String]) {
        self.announced = names.to_vec();
        self.connected = true;
        self.last_reset = None;
    }

    fn on_configured(&mut self, packages: &[HistogramPackage]) {
        self.packages = packages.to_vec();
        self.history.clear();
    }

    fn on_update(&mut self, header: UpdateHeader, new_run: bool, packages: &[HistogramPackage]) {
        if new_run {
            self.history.clear();
        }
        let now = Instant::now();
        self.packages = packages.to_vec();
        self.header = Some(header);
        self.updates += 1;
        self.last_updated = Some(now);
        self.history.record(packages, now);
    }

    fn on_reset(&mut self, reason: &str) {
        self.connected = false;
        self.last_reset = Some(reason.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dqmwatch_types::{Axis, BinStorage};

    fn configured() -> HistogramPackage {
        HistogramPackage::builder("ECL")
            .histogram_1d("energy", "E", BinStorage::Double, Axis::new(2, 0.0, 2.0))
            .build()
    }

    fn updated(values: &[f64]) -> HistogramPackage {
        let mut p = configured();
        p.get_mut(0).unwrap().apply_in_range(values).unwrap();
        p
    }

    #[test]
    fn test_view_follows_events() {
        let mut view = MonitorView::new();
        view.apply(&SessionEvent::PackageList(vec!["ECL".into(), "KLM".into()]));
        view.apply(&SessionEvent::Configured(vec![configured()]));
        assert!(view.connected);
        assert!(view.summary().is_none());

        view.apply(&SessionEvent::Update {
            header: UpdateHeader::new(12, 3, 1),
            new_run: true,
            packages: vec![updated(&[1.0, 2.0])],
        });
        assert_eq!(view.updates, 1);
        assert_eq!(view.histogram("ECL", "energy").unwrap().entries(), 3.0);

        let summary = view.summary().unwrap();
        assert_eq!(summary.run, 3);
        assert_eq!(summary.packages[0].entries, 3.0);
        assert!(summary.packages[0].rate.is_none());

        view.apply(&SessionEvent::Reset {
            reason: "Connection closed".into(),
        });
        assert!(!view.connected);
        assert_eq!(view.last_reset.as_deref(), Some("Connection closed"));
    }

    #[test]
    fn test_new_run_clears_history() {
        let mut view = MonitorView::new();
        for (run, new_run) in [(1, true), (1, false), (2, true)] {
            view.apply(&SessionEvent::Update {
                header: UpdateHeader::new(1, run, 0),
                new_run,
                packages: vec![updated(&[1.0, 1.0])],
            });
        }
        assert_eq!(view.history.len(), 1);
    }

    #[test]
    fn test_summary_json() {
        let mut view = MonitorView::new();
        view.apply(&SessionEvent::Update {
            header: UpdateHeader::new(12, 3, 1),
            new_run: true,
            packages: vec![updated(&[1.0, 2.0])],
        });
        let json = serde_json::to_string(&view.summary().unwrap()).unwrap();
        assert_eq!(
            json,
            r#"{"exp":12,"run":3,"state":1,"updates":1,"packages":[{"name":"ECL","histograms":1,"entries":3.0}]}"#
        );
    }
}
