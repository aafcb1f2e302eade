//! Session-backed data source.
//!
//! Drains the event channel of a [`SessionHandle`] without blocking.

use anyhow::Result;
use tokio::sync::mpsc;

use super::DataSource;
use crate::session::{PackageSelection, SessionEvent, SessionHandle};

/// A data source fed by a running monitoring session.
#[derive(Debug)]
pub struct SessionSource {
    receiver: mpsc::Receiver<SessionEvent>,
    description: String,
    last_error: Option<String>,
    handle: Option<SessionHandle>,
}

impl SessionSource {
    /// Wrap the receiving end of a session event channel.
    pub fn new(receiver: mpsc::Receiver<SessionEvent>, description: &str) -> Self {
        Self {
            receiver,
            description: format!("session: {}", description),
            last_error: None,
            handle: None,
        }
    }

    /// Connect to a server and start a session on its own thread.
    pub fn connect(addr: &str, selection: PackageSelection, capacity: usize) -> Result<Self> {
        let (handle, receiver) = SessionHandle::connect(addr, selection, capacity)?;
        let mut source = Self::new(receiver, addr);
        source.handle = Some(handle);
        Ok(source)
    }

    pub fn handle(&self) -> Option<&SessionHandle> {
        self.handle.as_ref()
    }

    /// Close the underlying session, if this source owns one.
    pub fn close(&self) {
        if let Some(handle) = &self.handle {
            handle.close();
        }
    }
}

impl DataSource for SessionSource {
    fn poll(&mut self) -> Option<SessionEvent> {
        match self.receiver.try_recv() {
            Ok(event) => {
                match &event {
                    SessionEvent::Reset { reason } => self.last_error = Some(reason.clone()),
                    SessionEvent::PackageList(_) => self.last_error = None,
                    _ => {}
                }
                Some(event)
            }
            Err(mpsc::error::TryRecvError::Empty) => None,
            Err(mpsc::error::TryRecvError::Disconnected) => {
                if self.last_error.is_none() {
                    self.last_error = Some("Session ended".to_string());
                }
                None
            }
        }
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}
