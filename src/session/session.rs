//! The client side of the streaming protocol.

use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dqmwatch_types::HistogramPackage;
use dqmwatch_wire::protocol::{
    read_configure, read_list, read_list_end, read_opcode_or_eof, read_update, write_selection, Opcode,
    UpdateHeader,
};
use dqmwatch_wire::{ByteReader, CompressedBlock, Error};
use tokio::sync::watch;

use super::events::{EventSender, SessionEvent};
use super::state::{Command, SessionState};

/// Which announced packages to monitor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PackageSelection {
    #[default]
    All,
    Only(Vec<String>),
}

impl PackageSelection {
    /// `All` for an empty list, `Only` otherwise.
    pub fn from_names(names: Vec<String>) -> Self {
        if names.is_empty() {
            PackageSelection::All
        } else {
            PackageSelection::Only(names)
        }
    }

    pub fn selects(&self, name: &str) -> bool {
        match self {
            PackageSelection::All => true,
            PackageSelection::Only(names) => names.iter().any(|n| n == name),
        }
    }
}

/// How a session ended.
#[derive(Debug)]
pub enum SessionEnd {
    /// The peer left between frames, or the caller closed the session.
    Closed,
    /// A protocol or transport fault.
    Failed(Error),
}

impl SessionEnd {
    pub fn state(&self) -> SessionState {
        match self {
            SessionEnd::Closed => SessionState::Closed,
            SessionEnd::Failed(_) => SessionState::Error,
        }
    }
}

/// Drives one connection through list, configure and streaming.
///
/// All histogram state lives here and is only mutated on the thread that
/// runs the session. Consumers see owned copies through the event channel.
#[derive(Debug)]
pub struct MonitorSession<S> {
    reader: ByteReader<S>,
    state: SessionState,
    state_tx: watch::Sender<SessionState>,
    selection: PackageSelection,
    announced: Vec<String>,
    selected: Vec<String>,
    packages: Vec<HistogramPackage>,
    last_header: Option<UpdateHeader>,
    pool: CompressedBlock,
    events: EventSender,
    closing: Arc<AtomicBool>,
    /// Set when the server ended the stream between two update frames.
    peer_left: bool,
    frames: u64,
}

impl<S: Read + Write> MonitorSession<S> {
    pub fn new(stream: S, selection: PackageSelection, events: EventSender) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Connecting);
        Self {
            reader: ByteReader::stream(stream),
            state: SessionState::Connecting,
            state_tx,
            selection,
            announced: Vec::new(),
            selected: Vec::new(),
            packages: Vec::new(),
            last_header: None,
            pool: CompressedBlock::new(),
            events,
            closing: Arc::new(AtomicBool::new(false)),
            peer_left: false,
            frames: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Receiver that follows every state change.
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Flag that marks the next transport fault as a requested close.
    pub fn close_flag(&self) -> Arc<AtomicBool> {
        self.closing.clone()
    }

    pub fn packages(&self) -> &[HistogramPackage] {
        &self.packages
    }

    /// Packages announced by the server, selected or not.
    pub fn announced(&self) -> &[String] {
        &self.announced
    }

    pub fn last_header(&self) -> Option<UpdateHeader> {
        self.last_header
    }

    /// Update frames applied so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn transition(&mut self, command: Command) -> Option<SessionState> {
        let next = self.state.next(command)?;
        if next != self.state {
            tracing::debug!(from = %self.state, to = %next, "session state");
            self.state = next;
            self.state_tx.send_replace(next);
        }
        Some(next)
    }

    /// Read one server message and act on it.
    ///
    /// A server that ends the stream cleanly between two update frames
    /// yields `ConnectionClosed`, which [`run`](Self::run) reports as a
    /// clean close. Losing the stream anywhere else is a fault.
    pub fn step(&mut self) -> Result<SessionState, Error> {
        let Some(op) = read_opcode_or_eof(&mut self.reader)? else {
            if self.state == SessionState::Streaming {
                self.peer_left = true;
            }
            return Err(Error::ConnectionClosed);
        };
        let next = self.state.next(Command::from(op)).ok_or_else(|| {
            Error::ProtocolDesync(format!("{} not expected while {}", op, self.state))
        })?;

        match op {
            Opcode::List => self.handle_list()?,
            Opcode::Configure => self.handle_configure()?,
            Opcode::Update => self.handle_update()?,
        }

        self.transition(Command::from(op));
        debug_assert_eq!(self.state, next);
        Ok(self.state)
    }

    fn handle_list(&mut self) -> Result<(), Error> {
        let names = read_list(&mut self.reader)?;
        let selection: Vec<bool> = names.iter().map(|n| self.selection.selects(n)).collect();

        let stream = self.reader.get_mut();
        write_selection(stream, &selection)?;
        stream.flush()?;
        read_list_end(&mut self.reader)?;

        self.selected = names
            .iter()
            .zip(selection.iter())
            .filter(|(_, selected)| **selected)
            .map(|(name, _)| name.clone())
            .collect();
        tracing::info!(
            announced = names.len(),
            selected = self.selected.len(),
            "package list received"
        );
        if let PackageSelection::Only(wanted) = &self.selection {
            for name in wanted.iter().filter(|w| !names.contains(w)) {
                tracing::warn!(package = %name, "requested package not offered by server");
            }
        }

        self.announced = names;
        self.events
            .lifecycle(SessionEvent::PackageList(self.announced.clone()));
        Ok(())
    }

    fn handle_configure(&mut self) -> Result<(), Error> {
        self.packages = read_configure(&mut self.reader, &self.selected)?;
        let histograms: usize = self.packages.iter().map(HistogramPackage::len).sum();
        tracing::info!(
            packages = self.packages.len(),
            histograms,
            "configuration received"
        );
        self.events
            .lifecycle(SessionEvent::Configured(self.packages.clone()));
        Ok(())
    }

    fn handle_update(&mut self) -> Result<(), Error> {
        let staged = read_update(&mut self.reader, &mut self.pool, &self.packages)?;
        staged.validate(&self.packages)?;

        let header = staged.header;
        let new_run = self
            .last_header
            .map_or(true, |last| !last.same_run(&header));
        if new_run {
            if self.last_header.is_some() {
                tracing::info!(exp = header.exp, run = header.run, "run boundary, resetting histograms");
            }
            self.packages.iter_mut().for_each(HistogramPackage::reset);
        }
        staged.apply(&mut self.packages)?;

        self.last_header = Some(header);
        self.frames += 1;
        tracing::debug!(
            exp = header.exp,
            run = header.run,
            state = header.state,
            blocks = staged.packages.len(),
            frame = self.frames,
            "update applied"
        );

        self.events.update(SessionEvent::Update {
            header,
            new_run,
            packages: self.packages.clone(),
        });
        Ok(())
    }

    fn finish(&mut self, end: &SessionEnd) {
        let reason = match end {
            SessionEnd::Closed => {
                tracing::info!(frames = self.frames, "session closed");
                self.transition(Command::Close);
                "connection closed".to_string()
            }
            SessionEnd::Failed(e) => {
                tracing::warn!(error = %e, state = %self.state, "session failed");
                self.transition(Command::Fail);
                e.to_string()
            }
        };
        self.events.lifecycle(SessionEvent::Reset { reason });
    }

    /// Run until the connection ends. The stream is dropped on return,
    /// which closes the socket.
    pub fn run(mut self) -> SessionEnd {
        tracing::info!("session started");
        let end = loop {
            match self.step() {
                Ok(_) => continue,
                Err(e) => break self.classify(e),
            }
        };
        self.finish(&end);
        end
    }

    fn classify(&self, e: Error) -> SessionEnd {
        if self.closing.load(Ordering::SeqCst) {
            return SessionEnd::Closed;
        }
        match e {
            Error::ConnectionClosed if self.peer_left => SessionEnd::Closed,
            e => SessionEnd::Failed(e),
        }
    }
}
