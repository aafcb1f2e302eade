//! Publisher side of the protocol.
//!
//! [`ServerSession`] owns the histogram packages, walks a single client
//! through the list and configure exchange and then pushes update frames
//! whenever the caller asks for one. Each message is assembled in memory
//! and written with a single `write_all`.

use std::io::{Read, Write};

use dqmwatch_types::HistogramPackage;

use crate::codec::ByteReader;
use crate::error::{Error, Result};

use super::{read_selection, write_configure, write_list, write_list_end, write_update, UpdateHeader};

#[derive(Debug)]
pub struct ServerSession<S> {
    stream: S,
    packages: Vec<HistogramPackage>,
    /// Indices into `packages`, in the order the client configured them.
    selected: Vec<usize>,
    frames: u64,
}

impl<S: Read + Write> ServerSession<S> {
    pub fn new(stream: S, packages: Vec<HistogramPackage>) -> Self {
        Self {
            stream,
            packages,
            selected: Vec::new(),
            frames: 0,
        }
    }

    pub fn packages(&self) -> &[HistogramPackage] {
        &self.packages
    }

    pub fn packages_mut(&mut self) -> &mut [HistogramPackage] {
        &mut self.packages
    }

    pub fn package_mut(&mut self, name: &str) -> Option<&mut HistogramPackage> {
        self.packages.iter_mut().find(|p| p.name() == name)
    }

    /// Names of the packages the client selected.
    pub fn selected(&self) -> impl Iterator<Item = &str> {
        self.selected.iter().map(|i| self.packages[*i].name())
    }

    /// Update frames sent so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    pub fn into_inner(self) -> S {
        self.stream
    }

    fn send(&mut self, message: &[u8]) -> Result<()> {
        self.stream.write_all(message)?;
        self.stream.flush()?;
        Ok(())
    }

    /// Announce all packages and wait for the client's selection.
    pub fn list(&mut self) -> Result<()> {
        let names: Vec<String> = self.packages.iter().map(|p| p.name().to_string()).collect();
        let mut message = Vec::new();
        write_list(&mut message, &names)?;
        self.send(&message)?;

        let selection = read_selection(&mut ByteReader::stream(&mut self.stream), names.len())?;
        self.selected = selection
            .iter()
            .enumerate()
            .filter_map(|(i, selected)| selected.then_some(i))
            .collect();
        tracing::info!(
            announced = names.len(),
            selected = self.selected.len(),
            "client selection received"
        );

        let mut message = Vec::new();
        write_list_end(&mut message)?;
        self.send(&message)
    }

    /// Send the schema of the selected packages.
    pub fn configure(&mut self) -> Result<()> {
        let packages: Vec<&HistogramPackage> =
            self.selected.iter().map(|i| &self.packages[*i]).collect();
        let mut message = Vec::new();
        write_configure(&mut message, &packages)?;
        self.send(&message)
    }

    /// Run the list and configure exchange.
    pub fn handshake(&mut self) -> Result<()> {
        self.list()?;
        self.configure()
    }

    /// Send the current contents of every selected package.
    pub fn update(&mut self, header: UpdateHeader) -> Result<()> {
        if self.selected.is_empty() && !self.packages.is_empty() {
            tracing::debug!("no packages selected, sending empty update");
        }
        let packages: Vec<(usize, &HistogramPackage)> = self
            .selected
            .iter()
            .enumerate()
            .map(|(position, i)| (position, &self.packages[*i]))
            .collect();
        let mut message = Vec::new();
        write_update(&mut message, header, &packages)?;
        self.send(&message)?;
        self.frames += 1;
        tracing::debug!(
            exp = header.exp,
            run = header.run,
            frame = self.frames,
            bytes = message.len(),
            "update sent"
        );
        Ok(())
    }

    /// Send an update, treating a departed client as a clean end.
    ///
    /// Returns `Ok(false)` once the peer has gone away.
    pub fn try_update(&mut self, header: UpdateHeader) -> Result<bool> {
        match self.update(header) {
            Ok(()) => Ok(true),
            Err(Error::ConnectionClosed) => Ok(false),
            Err(Error::Io(e))
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::BrokenPipe
                        | std::io::ErrorKind::ConnectionReset
                        | std::io::ErrorKind::ConnectionAborted
                ) =>
            {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}
