//! # dqmwatch
//!
//! A client library and CLI for live data-quality monitoring servers.
//!
//! A monitoring server groups binned histograms into named packages and
//! streams their contents over TCP. This crate connects to such a server,
//! walks the list and configure handshake, and turns the stream of
//! compressed update frames into owned snapshots a presentation layer can
//! render.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         dqmwatch binary                          │
//! │  ┌─────────┐    ┌───────────────┐    ┌──────────┐    ┌────────┐  │
//! │  │ config  │───▶│   session     │───▶│   data   │───▶│ stdout │  │
//! │  │ (input) │    │ (own thread)  │    │  (view)  │    │ / JSON │  │
//! │  └─────────┘    └───────┬───────┘    └──────────┘    └────────┘  │
//! │                         │ bounded channel                        │
//! │                         ▼                                        │
//! │                    ┌─────────┐                                   │
//! │                    │ source  │◀── SessionSource (non-blocking)   │
//! │                    └─────────┘                                   │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`session`]**: the client state machine, run on a dedicated thread by
//!   [`SessionHandle`], publishing [`SessionEvent`]s through a bounded channel
//! - **[`source`]**: the [`DataSource`] trait for consumers that poll
//! - **[`data`]**: [`MonitorView`], the consumer-side model, and entry-rate
//!   history for sparklines
//! - **[`config`]**: [`ClientConfig`] loaded from TOML and the environment
//! - **[`demo`]**: synthetic packages served by `dqmwatch demo-server`
//!
//! The wire format lives in `dqmwatch-wire`, the histogram types in
//! `dqmwatch-types`.
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Serve synthetic histograms locally
//! dqmwatch demo-server --bind 127.0.0.1:9090
//!
//! # Monitor two packages, printing one JSON line per update
//! dqmwatch connect --host 127.0.0.1 -P CDC -P ECL --json
//! ```
//!
//! ### As a library
//!
//! ```no_run
//! use dqmwatch::{MonitorView, PackageSelection, SessionHandle};
//!
//! let (handle, mut events) =
//!     SessionHandle::connect("localhost:9090", PackageSelection::All, 16)?;
//! let mut view = MonitorView::new();
//! while let Some(event) = events.blocking_recv() {
//!     view.apply(&event);
//!     if let Some(summary) = view.summary() {
//!         println!("run {} with {} packages", summary.run, summary.packages.len());
//!     }
//! }
//! handle.join()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod config;
pub mod data;
pub mod demo;
pub mod session;
pub mod source;

// Re-export main types for convenience
pub use self::config::ClientConfig;
pub use data::{History, MonitorView, PackageSummary, UpdateSummary};
pub use session::{
    MonitorObserver, MonitorSession, PackageSelection, SessionEnd, SessionEvent, SessionHandle,
    SessionState,
};
pub use source::{DataSource, SessionSource};
