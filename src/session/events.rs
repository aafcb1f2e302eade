//! Events handed from the protocol thread to consumers.
//!
//! The protocol thread never calls consumer code. It sends owned snapshots
//! through a bounded channel and the consumer drains it on its own thread,
//! either directly or through [`SessionEvent::dispatch`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dqmwatch_types::HistogramPackage;
use dqmwatch_wire::protocol::UpdateHeader;
use tokio::sync::mpsc;

/// Default capacity of the event channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 16;

/// A notification from a running session.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Packages announced by the server.
    PackageList(Vec<String>),
    /// Freshly configured (empty) packages, in selection order.
    Configured(Vec<HistogramPackage>),
    /// State of every package after one update frame.
    Update {
        header: UpdateHeader,
        /// Whether this frame started a new run and histograms were reset.
        new_run: bool,
        packages: Vec<HistogramPackage>,
    },
    /// The session ended; consumers should show a disconnected state.
    Reset { reason: String },
}

/// Consumer-side callbacks, one per event kind.
pub trait MonitorObserver {
    fn on_package_list(&mut self, names: &[String]);
    fn on_configured(&mut self, packages: &[HistogramPackage]);
    fn on_update(&mut self, header: UpdateHeader, new_run: bool, packages: &[HistogramPackage]);
    fn on_reset(&mut self, reason: &str);
}

impl SessionEvent {
    /// Invoke the observer callback matching this event.
    pub fn dispatch<O: MonitorObserver + ?Sized>(&self, observer: &mut O) {
        match self {
            SessionEvent::PackageList(names) => observer.on_package_list(names),
            SessionEvent::Configured(packages) => observer.on_configured(packages),
            SessionEvent::Update {
                header,
                new_run,
                packages,
            } => observer.on_update(*header, *new_run, packages),
            SessionEvent::Reset { reason } => observer.on_reset(reason),
        }
    }

    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            SessionEvent::PackageList(_) => "package_list",
            SessionEvent::Configured(_) => "configured",
            SessionEvent::Update { .. } => "update",
            SessionEvent::Reset { .. } => "reset",
        }
    }
}

/// Sending half used by the protocol thread.
///
/// Lifecycle events block until there is room. Updates never block: when
/// the consumer lags they are dropped and counted, since the next update
/// carries a full snapshot anyway.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::Sender<SessionEvent>,
    dropped: Arc<AtomicU64>,
}

/// Create a bounded event channel.
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<SessionEvent>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let sender = EventSender {
        tx,
        dropped: Arc::new(AtomicU64::new(0)),
    };
    (sender, rx)
}

impl EventSender {
    /// Send a lifecycle event, blocking while the channel is full.
    ///
    /// Must not be called from inside an async runtime. Returns `false` once
    /// the receiver is gone.
    pub fn lifecycle(&self, event: SessionEvent) -> bool {
        let kind = event.kind();
        if self.tx.blocking_send(event).is_err() {
            tracing::debug!(kind, "event receiver dropped");
            return false;
        }
        true
    }

    /// Offer an update event without blocking. Returns `false` once the
    /// receiver is gone; a full channel drops the event but returns `true`.
    pub fn update(&self, event: SessionEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::warn!(dropped, "consumer lagging, update dropped");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Updates dropped so far because the consumer lagged.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub(crate) fn dropped_counter(&self) -> Arc<AtomicU64> {
        self.dropped.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl MonitorObserver for Recorder {
        fn on_package_list(&mut self, names: &[String]) {
            self.calls.push(format!("list {}", names.join(",")));
        }

        fn on_configured(&mut self, packages: &[HistogramPackage]) {
            self.calls.push(format!("configured {}", packages.len()));
        }

        fn on_update(&mut self, header: UpdateHeader, new_run: bool, _: &[HistogramPackage]) {
            self.calls.push(format!("update {} {}", header.run, new_run));
        }

        fn on_reset(&mut self, reason: &str) {
            self.calls.push(format!("reset {}", reason));
        }
    }

    fn update(run: i32) -> SessionEvent {
        SessionEvent::Update {
            header: UpdateHeader::new(1, run, 0),
            new_run: false,
            packages: Vec::new(),
        }
    }

    #[test]
    fn test_dispatch_reaches_observer() {
        let mut recorder = Recorder::default();
        let events = vec![
            SessionEvent::PackageList(vec!["CDC".into(), "ARICH".into()]),
            SessionEvent::Configured(vec![HistogramPackage::new("CDC")]),
            update(4),
            SessionEvent::Reset {
                reason: "closed".into(),
            },
        ];
        for event in &events {
            event.dispatch(&mut recorder);
        }
        assert_eq!(
            recorder.calls,
            vec!["list CDC,ARICH", "configured 1", "update 4 false", "reset closed"]
        );
    }

    #[test]
    fn test_full_channel_drops_updates() {
        let (tx, mut rx) = channel(1);
        assert!(tx.update(update(1)));
        assert!(tx.update(update(2)));
        assert!(tx.update(update(3)));
        assert_eq!(tx.dropped(), 2);

        match rx.try_recv().unwrap() {
            SessionEvent::Update { header, .. } => assert_eq!(header.run, 1),
            other => panic!("unexpected event {:?}", other),
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_closed_receiver_reports_false() {
        let (tx, rx) = channel(4);
        drop(rx);
        assert!(!tx.update(update(1)));
        assert!(!tx.lifecycle(SessionEvent::PackageList(Vec::new())));
    }

    #[tokio::test]
    async fn test_async_consumer() {
        let (tx, mut rx) = channel(8);
        let producer = std::thread::spawn(move || {
            tx.lifecycle(SessionEvent::PackageList(vec!["PXD".into()]));
            tx.update(update(7));
        });

        let first = rx.recv().await.unwrap();
        assert_eq!(first.kind(), "package_list");
        let second = rx.recv().await.unwrap();
        assert_eq!(second.kind(), "update");
        producer.join().unwrap();
    }
}
