//! Typed big-endian primitives over byte streams.
//!
//! Every `write_*` produces exactly the bytes the matching `read_*`
//! consumes. Strings are a 4-byte big-endian length followed by the raw
//! bytes, with no encoding conversion.
//!
//! A [`ByteReader`] knows whether it sits on an in-memory buffer or on a
//! live transport, which decides how running out of data is reported:
//! [`Error::Truncated`] for buffers, [`Error::ConnectionClosed`] for streams.

use std::io::{self, Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Error, Result};

/// Upper bound for a single length-prefixed string read from a stream.
pub const MAX_STRING_LEN: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Buffer { len: usize },
    Stream,
}

/// Reader for the typed primitives of the wire format.
#[derive(Debug)]
pub struct ByteReader<R> {
    inner: R,
    origin: Origin,
    position: usize,
}

impl<'a> ByteReader<&'a [u8]> {
    /// Read from an in-memory buffer. Running out of bytes is `Truncated`.
    pub fn buffer(bytes: &'a [u8]) -> Self {
        Self {
            inner: bytes,
            origin: Origin::Buffer { len: bytes.len() },
            position: 0,
        }
    }
}

impl<R: Read> ByteReader<R> {
    /// Read from a live transport. EOF is `ConnectionClosed`.
    pub fn stream(inner: R) -> Self {
        Self {
            inner,
            origin: Origin::Stream,
            position: 0,
        }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Bytes left, if the reader sits on a buffer.
    pub fn remaining(&self) -> Option<usize> {
        match self.origin {
            Origin::Buffer { len } => Some(len - self.position),
            Origin::Stream => None,
        }
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn fault(&self, e: io::Error, what: &str) -> Error {
        match (e.kind(), self.origin) {
            (io::ErrorKind::UnexpectedEof, Origin::Buffer { .. }) => Error::Truncated(format!(
                "buffer ended reading {} at offset {}",
                what, self.position
            )),
            (io::ErrorKind::UnexpectedEof, Origin::Stream)
            | (io::ErrorKind::ConnectionReset, _)
            | (io::ErrorKind::ConnectionAborted, _)
            | (io::ErrorKind::BrokenPipe, _) => Error::ConnectionClosed,
            _ => Error::Io(e),
        }
    }

    fn advance<T>(&mut self, res: io::Result<T>, width: usize, what: &str) -> Result<T> {
        match res {
            Ok(v) => {
                self.position += width;
                Ok(v)
            }
            Err(e) => Err(self.fault(e, what)),
        }
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let res = self.inner.read_u8();
        self.advance(res, 1, "byte")
    }

    /// Read one byte, or `None` if the source ends cleanly before it.
    ///
    /// A reset transport is still an error, only an orderly end of data
    /// yields `None`.
    pub fn read_u8_or_eof(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => {
                    self.position += 1;
                    return Ok(Some(byte[0]));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(self.fault(e, "byte")),
            }
        }
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_char(&mut self) -> Result<i8> {
        let res = self.inner.read_i8();
        self.advance(res, 1, "char")
    }

    pub fn read_short(&mut self) -> Result<i16> {
        let res = self.inner.read_i16::<BigEndian>();
        self.advance(res, 2, "short")
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let res = self.inner.read_u16::<BigEndian>();
        self.advance(res, 2, "u16")
    }

    pub fn read_int(&mut self) -> Result<i32> {
        let res = self.inner.read_i32::<BigEndian>();
        self.advance(res, 4, "int")
    }

    pub fn read_long(&mut self) -> Result<i64> {
        let res = self.inner.read_i64::<BigEndian>();
        self.advance(res, 8, "long")
    }

    pub fn read_float(&mut self) -> Result<f32> {
        let res = self.inner.read_f32::<BigEndian>();
        self.advance(res, 4, "float")
    }

    pub fn read_double(&mut self) -> Result<f64> {
        let res = self.inner.read_f64::<BigEndian>();
        self.advance(res, 8, "double")
    }

    /// Read a length prefix and validate it against the source.
    pub fn read_length(&mut self, what: &str, max: usize) -> Result<usize> {
        let len = self.read_int()?;
        if len < 0 {
            return Err(Error::Truncated(format!("negative {} length {}", what, len)));
        }
        let len = len as usize;
        if let Some(remaining) = self.remaining() {
            if len > remaining {
                return Err(Error::Truncated(format!(
                    "{} length {} exceeds {} remaining bytes",
                    what, len, remaining
                )));
            }
        } else if len > max {
            return Err(Error::Truncated(format!(
                "{} length {} exceeds limit {}",
                what, len, max
            )));
        }
        Ok(len)
    }

    /// Fill `buf` completely.
    pub fn read_exact_into(&mut self, buf: &mut [u8]) -> Result<()> {
        let res = self.inner.read_exact(buf);
        self.advance(res, buf.len(), "bytes")
    }

    /// Read a length-prefixed byte string without any decoding.
    pub fn read_string_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.read_length("string", MAX_STRING_LEN)?;
        let mut buf = vec![0u8; len];
        self.read_exact_into(&mut buf)?;
        Ok(buf)
    }

    /// Read a length-prefixed string.
    ///
    /// Invalid UTF-8 is replaced, never dropped: the consumed length is
    /// always the declared one.
    pub fn read_string(&mut self) -> Result<String> {
        let bytes = self.read_string_bytes()?;
        match String::from_utf8(bytes) {
            Ok(s) => Ok(s),
            Err(e) => {
                tracing::debug!(len = e.as_bytes().len(), "non-UTF-8 string on the wire");
                Ok(String::from_utf8_lossy(e.as_bytes()).into_owned())
            }
        }
    }
}

/// Writer half of the typed primitives, available on every [`Write`].
pub trait ByteWrite: Write {
    fn write_bool(&mut self, v: bool) -> Result<()> {
        self.write_u8(v as u8)?;
        Ok(())
    }

    fn write_char(&mut self, v: i8) -> Result<()> {
        self.write_i8(v)?;
        Ok(())
    }

    fn write_short(&mut self, v: i16) -> Result<()> {
        self.write_i16::<BigEndian>(v)?;
        Ok(())
    }

    fn write_int(&mut self, v: i32) -> Result<()> {
        self.write_i32::<BigEndian>(v)?;
        Ok(())
    }

    fn write_long(&mut self, v: i64) -> Result<()> {
        self.write_i64::<BigEndian>(v)?;
        Ok(())
    }

    fn write_float(&mut self, v: f32) -> Result<()> {
        self.write_f32::<BigEndian>(v)?;
        Ok(())
    }

    fn write_double(&mut self, v: f64) -> Result<()> {
        self.write_f64::<BigEndian>(v)?;
        Ok(())
    }

    /// Write a length prefix checked against the `i32` range.
    fn write_length(&mut self, len: usize) -> Result<()> {
        let len = i32::try_from(len)
            .map_err(|_| Error::Truncated(format!("length {} does not fit the wire", len)))?;
        ByteWrite::write_int(self, len)
    }

    fn write_string_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_length(bytes.len())?;
        self.write_all(bytes)?;
        Ok(())
    }

    fn write_string(&mut self, s: &str) -> Result<()> {
        self.write_string_bytes(s.as_bytes())
    }
}

impl<W: Write + ?Sized> ByteWrite for W {}
