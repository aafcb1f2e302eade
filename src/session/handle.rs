//! Running a session on its own thread.

use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use tokio::sync::{mpsc, watch};

use super::events::{channel, SessionEvent};
use super::session::{MonitorSession, PackageSelection, SessionEnd};
use super::state::SessionState;

/// Owner's side of a session running on a dedicated thread.
///
/// Dropping the handle does not stop the session; call [`close`] for that.
///
/// [`close`]: SessionHandle::close
#[derive(Debug)]
pub struct SessionHandle {
    peer: String,
    socket: TcpStream,
    closing: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
    state: watch::Receiver<SessionState>,
    thread: Option<JoinHandle<SessionEnd>>,
}

impl SessionHandle {
    /// Connect to `addr` and start a session.
    pub fn connect<A: ToSocketAddrs + std::fmt::Display>(
        addr: A,
        selection: PackageSelection,
        capacity: usize,
    ) -> Result<(Self, mpsc::Receiver<SessionEvent>)> {
        tracing::info!(%addr, "connecting");
        let stream =
            TcpStream::connect(&addr).with_context(|| format!("Failed to connect to {}", addr))?;
        Self::spawn(stream, selection, capacity)
    }

    /// Start a session on an already connected socket.
    pub fn spawn(
        stream: TcpStream,
        selection: PackageSelection,
        capacity: usize,
    ) -> Result<(Self, mpsc::Receiver<SessionEvent>)> {
        stream.set_nodelay(true)?;
        let peer = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        let socket = stream.try_clone().context("Failed to clone session socket")?;
        let worker_socket = stream.try_clone().context("Failed to clone session socket")?;

        let (events, rx) = channel(capacity);
        let dropped = events.dropped_counter();
        let session = MonitorSession::new(stream, selection, events);
        let closing = session.close_flag();
        let state = session.subscribe_state();

        let thread = thread::Builder::new()
            .name(format!("dqm-session {}", peer))
            .spawn(move || {
                let end = session.run();
                // The handle keeps a clone of the socket, so dropping the
                // session's stream alone would leave the connection open.
                if let Err(e) = worker_socket.shutdown(Shutdown::Both) {
                    tracing::debug!(error = %e, "socket shutdown after session end");
                }
                end
            })
            .context("Failed to spawn session thread")?;

        let handle = Self {
            peer,
            socket,
            closing,
            dropped,
            state,
            thread: Some(thread),
        };
        Ok((handle, rx))
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Receiver that follows every state change.
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Updates dropped because the consumer lagged.
    pub fn dropped_updates(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Shut the socket down. The session thread sees the failed read,
    /// ends as `Closed` and emits a final `Reset`.
    pub fn close(&self) {
        if self.closing.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!(peer = %self.peer, "closing session");
        if let Err(e) = self.socket.shutdown(Shutdown::Both) {
            tracing::debug!(error = %e, "socket shutdown");
        }
    }

    /// Wait for the session thread to finish.
    pub fn join(mut self) -> Result<SessionEnd> {
        match self.thread.take() {
            Some(thread) => thread
                .join()
                .map_err(|_| anyhow::anyhow!("session thread panicked")),
            None => Ok(SessionEnd::Closed),
        }
    }
}
