//! Client sessions against a monitoring server.
//!
//! A [`MonitorSession`] owns a blocking byte stream and all histogram state
//! for that connection. [`SessionHandle`] runs one on a dedicated thread and
//! hands back the receiving end of its event channel.
//!
//! ```text
//!  socket ──▶ MonitorSession ──(bounded mpsc)──▶ consumer
//!              (own thread)         │
//!                                   └─ SessionEvent::dispatch ─▶ MonitorObserver
//! ```
//!
//! ## States
//!
//! ```text
//! Connecting ─LIST─▶ Listing ─CONFIGURE─▶ Configured ─UPDATE─▶ Streaming ─┐
//!                                                                 ▲        │
//!                                                                 └─UPDATE─┘
//! any ──fault──▶ Error          any ──close / EOF between frames──▶ Closed
//! ```

mod events;
mod handle;
#[allow(clippy::module_inception)]
mod session;
mod state;

pub use events::{channel, EventSender, MonitorObserver, SessionEvent, DEFAULT_CHANNEL_CAPACITY};
pub use handle::SessionHandle;
pub use session::{MonitorSession, PackageSelection, SessionEnd};
pub use state::{Command, SessionState};
