//! Data source abstraction for receiving session events.
//!
//! Presentation code that runs its own loop polls a [`DataSource`] instead
//! of blocking on the session channel.

mod session;

pub use session::SessionSource;

use std::fmt::Debug;

use crate::session::SessionEvent;

/// Trait for receiving monitoring events without blocking.
///
/// # Example
///
/// ```
/// use dqmwatch::{DataSource, SessionSource};
/// use dqmwatch::session::channel;
///
/// let (_tx, rx) = channel(16);
/// let mut source = SessionSource::new(rx, "localhost:9090");
/// assert!(source.poll().is_none());
/// ```
pub trait DataSource: Send + Debug {
    /// Poll for the next event.
    ///
    /// Returns `Some(event)` if one is queued, `None` otherwise.
    /// This method should be non-blocking.
    fn poll(&mut self) -> Option<SessionEvent>;

    /// Returns a human-readable description of the source.
    fn description(&self) -> &str;

    /// Check if the source has ended with an error.
    ///
    /// Returns the reason of the last reset or disconnect, if any.
    fn error(&self) -> Option<&str>;
}
