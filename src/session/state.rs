//! Session states and the transition table between them.

use std::fmt;

use dqmwatch_wire::protocol::Opcode;

/// Lifecycle of a monitoring session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Connected, waiting for the package list.
    Connecting,
    /// Package list exchanged, waiting for the schema.
    Listing,
    /// Schema received, waiting for the first update.
    Configured,
    /// Receiving updates.
    Streaming,
    /// Ended cleanly: the peer left between frames or the caller closed it.
    Closed,
    /// Ended by a fault.
    Error,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Closed | SessionState::Error)
    }

    /// Next state after `command`, or `None` if the command is not allowed here.
    pub fn next(self, command: Command) -> Option<SessionState> {
        use Command::*;
        use SessionState::*;

        match (self, command) {
            (Closed | Error, _) => None,
            (_, Close) => Some(Closed),
            (_, Fail) => Some(Error),
            (Connecting, List) => Some(Listing),
            (Listing, Configure) => Some(Configured),
            (Configured | Streaming, Update) => Some(Streaming),
            _ => None,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Connecting => "connecting",
            SessionState::Listing => "listing",
            SessionState::Configured => "configured",
            SessionState::Streaming => "streaming",
            SessionState::Closed => "closed",
            SessionState::Error => "error",
        };
        f.write_str(s)
    }
}

/// Inputs that drive the session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    List,
    Configure,
    Update,
    Close,
    Fail,
}

impl From<Opcode> for Command {
    fn from(op: Opcode) -> Self {
        match op {
            Opcode::List => Command::List,
            Opcode::Configure => Command::Configure,
            Opcode::Update => Command::Update,
        }
    }
}
