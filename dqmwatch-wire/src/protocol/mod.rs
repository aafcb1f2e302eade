//! The histogram streaming protocol.
//!
//! A session runs through three message kinds, each introduced by a 4-byte
//! big-endian [`Opcode`]:
//!
//! 1. `LIST`: the server names its packages; the client answers with one
//!    selection byte per package, and the server closes with a sentinel.
//! 2. `CONFIGURE`: the schema of every histogram in each selected package.
//! 3. `UPDATE` (repeated): run identity plus one compressed block of bin
//!    contents per package.
//!
//! This module holds both halves of every message. The client decoders
//! return fully validated values and never touch caller state, so a frame
//! that fails halfway leaves nothing behind.

mod configure;
mod list;
pub mod server;
mod update;

use std::fmt;
use std::io::{Read, Write};

use dqmwatch_types::BinStorage;

use crate::codec::{ByteReader, ByteWrite};
use crate::error::{Error, Result};

pub use configure::{read_configure, read_histogram_schema, write_configure, write_histogram_schema};
pub use list::{read_list, read_list_end, read_selection, write_list, write_list_end, write_selection};
pub use update::{
    read_update, write_update, PackageUpdate, StagedUpdate, UpdateHeader, END_OF_PACKAGES,
};

/// Message kind sent by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    List,
    Configure,
    Update,
}

impl Opcode {
    pub const fn code(&self) -> i32 {
        match self {
            Opcode::List => 1,
            Opcode::Configure => 2,
            Opcode::Update => 3,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Opcode::List),
            2 => Some(Opcode::Configure),
            3 => Some(Opcode::Update),
            _ => None,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opcode::List => f.write_str("LIST"),
            Opcode::Configure => f.write_str("CONFIGURE"),
            Opcode::Update => f.write_str("UPDATE"),
        }
    }
}

pub fn read_opcode<R: Read>(r: &mut ByteReader<R>) -> Result<Opcode> {
    let code = r.read_int()?;
    Opcode::from_code(code).ok_or_else(|| Error::ProtocolDesync(format!("unknown opcode {}", code)))
}

/// Read the opcode that starts the next message, or `None` when the
/// source ends cleanly before its first byte.
///
/// Running out of data after the first byte is an error as usual.
pub fn read_opcode_or_eof<R: Read>(r: &mut ByteReader<R>) -> Result<Option<Opcode>> {
    let Some(first) = r.read_u8_or_eof()? else {
        return Ok(None);
    };
    let mut rest = [0u8; 3];
    r.read_exact_into(&mut rest)?;
    let code = i32::from_be_bytes([first, rest[0], rest[1], rest[2]]);
    Opcode::from_code(code)
        .map(Some)
        .ok_or_else(|| Error::ProtocolDesync(format!("unknown opcode {}", code)))
}

pub fn write_opcode<W: Write + ?Sized>(w: &mut W, op: Opcode) -> Result<()> {
    w.write_int(op.code())
}

/// Read one bin value in the histogram's storage width.
pub(crate) fn read_bin<R: Read>(r: &mut ByteReader<R>, storage: BinStorage) -> Result<f64> {
    Ok(match storage {
        BinStorage::Char => r.read_char()? as f64,
        BinStorage::Short => r.read_short()? as f64,
        BinStorage::Int => r.read_int()? as f64,
        BinStorage::Float => r.read_float()? as f64,
        BinStorage::Double => r.read_double()?,
    })
}

/// Write one bin value in the histogram's storage width. Integer storage
/// saturates.
pub(crate) fn write_bin<W: Write + ?Sized>(w: &mut W, storage: BinStorage, value: f64) -> Result<()> {
    match storage {
        BinStorage::Char => w.write_char(value as i8),
        BinStorage::Short => w.write_short(value as i16),
        BinStorage::Int => w.write_int(value as i32),
        BinStorage::Float => w.write_float(value as f32),
        BinStorage::Double => w.write_double(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_opcode_codes() {
        for op in [Opcode::List, Opcode::Configure, Opcode::Update] {
            let mut out = Vec::new();
            write_opcode(&mut out, op).unwrap();
            assert_eq!(out.len(), 4);
            assert_eq!(read_opcode(&mut ByteReader::buffer(&out)).unwrap(), op);
        }
        assert_eq!(Opcode::Update.code(), 3);
    }

    #[test]
    fn test_unknown_opcode() {
        let bytes = [0, 0, 0, 9];
        let err = read_opcode(&mut ByteReader::buffer(&bytes)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolDesync);
    }

    #[test]
    fn test_opcode_or_eof_at_boundary_only() {
        let mut empty = ByteReader::stream(&[][..]);
        assert!(read_opcode_or_eof(&mut empty).unwrap().is_none());

        let mut whole = ByteReader::stream(&[0u8, 0, 0, 2][..]);
        assert_eq!(read_opcode_or_eof(&mut whole).unwrap(), Some(Opcode::Configure));

        let mut partial = ByteReader::stream(&[0u8, 0][..]);
        let err = read_opcode_or_eof(&mut partial).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConnectionClosed);
    }

    #[test]
    fn test_bin_widths() {
        for storage in [
            BinStorage::Char,
            BinStorage::Short,
            BinStorage::Int,
            BinStorage::Float,
            BinStorage::Double,
        ] {
            let mut out = Vec::new();
            write_bin(&mut out, storage, 42.0).unwrap();
            assert_eq!(out.len(), storage.width());
            assert_eq!(read_bin(&mut ByteReader::buffer(&out), storage).unwrap(), 42.0);
        }
    }
}
