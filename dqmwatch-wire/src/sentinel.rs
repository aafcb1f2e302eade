//! Frame sentinel checked at every structural boundary of the protocol.

use std::io::{Read, Write};

use crate::codec::{ByteReader, ByteWrite};
use crate::error::{Error, Result};

/// Magic value closing each schema, package, message and framed record.
pub const SENTINEL: u16 = 0x7FFF;

/// Write the sentinel as 2 big-endian bytes.
pub fn write_sentinel<W: Write + ?Sized>(w: &mut W) -> Result<()> {
    w.write_short(SENTINEL as i16)
}

/// Read 2 bytes and fail with `ProtocolDesync` unless they are the sentinel.
///
/// `context` names the unit the sentinel closes and ends up in the error.
pub fn expect_sentinel<R: Read>(r: &mut ByteReader<R>, context: &str) -> Result<()> {
    let value = r.read_u16()?;
    if value != SENTINEL {
        tracing::warn!(context, value, "sentinel mismatch");
        return Err(Error::ProtocolDesync(format!(
            "expected sentinel {:#06x} after {}, got {:#06x}",
            SENTINEL, context, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_sentinel_bytes() {
        let mut out = Vec::new();
        write_sentinel(&mut out).unwrap();
        assert_eq!(out, vec![0x7F, 0xFF]);
        expect_sentinel(&mut ByteReader::buffer(&out), "test").unwrap();
    }

    #[test]
    fn test_mismatch_is_desync() {
        let bytes = [0x7F, 0xFE];
        let err = expect_sentinel(&mut ByteReader::buffer(&bytes), "histogram 'h1'").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolDesync);
        assert!(err.to_string().contains("histogram 'h1'"));
    }

    #[test]
    fn test_missing_sentinel_is_truncated() {
        let bytes = [0x7F];
        let err = expect_sentinel(&mut ByteReader::buffer(&bytes), "frame").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Truncated);
    }
}
