//! zlib-compressed payload blocks.
//!
//! On the wire a block is `uncompressed_hint: i32`, `compressed_len: i32`
//! and then `compressed_len` bytes of a zlib stream. The inflated payload is
//! read back through an in-memory [`ByteReader`], so running off its end is
//! `Truncated` rather than a closed connection.

use std::io::{Read, Write};

use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};

use crate::codec::{ByteReader, ByteWrite};
use crate::error::{Error, Result};

/// Upper bound for both the compressed and the inflated size of a block.
pub const MAX_BLOCK_LEN: usize = 64 * 1024 * 1024;

/// Reusable inflate state for a stream of compressed blocks.
///
/// Both buffers are cleared between blocks and keep their capacity, so a
/// session that streams blocks of similar size stops allocating after the
/// first few frames.
#[derive(Debug, Default)]
pub struct CompressedBlock {
    compressed: Vec<u8>,
    inflated: Vec<u8>,
}

impl CompressedBlock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capacity of the inflate buffer.
    pub fn capacity(&self) -> usize {
        self.inflated.capacity()
    }

    /// The payload of the last block read.
    pub fn payload(&self) -> &[u8] {
        &self.inflated
    }

    /// Read one block from `r` and return a reader over its inflated payload.
    pub fn read<R: Read>(&mut self, r: &mut ByteReader<R>) -> Result<ByteReader<&[u8]>> {
        let hint = r.read_int()?;
        if hint < 0 || hint as usize > MAX_BLOCK_LEN {
            return Err(Error::Truncated(format!(
                "block size hint {} out of range",
                hint
            )));
        }
        let len = r.read_length("compressed block", MAX_BLOCK_LEN)?;
        if len > MAX_BLOCK_LEN {
            return Err(Error::Truncated(format!(
                "compressed block length {} exceeds limit {}",
                len, MAX_BLOCK_LEN
            )));
        }

        self.compressed.clear();
        self.compressed.resize(len, 0);
        r.read_exact_into(&mut self.compressed)?;

        self.inflate(hint as usize)?;
        Ok(ByteReader::buffer(&self.inflated))
    }

    fn inflate(&mut self, hint: usize) -> Result<()> {
        self.inflated.clear();
        self.inflated.reserve(hint);

        let decoder = ZlibDecoder::new(&self.compressed[..]);
        let limit = MAX_BLOCK_LEN as u64 + 1;
        decoder
            .take(limit)
            .read_to_end(&mut self.inflated)
            .map_err(|e| Error::DecompressionFailed(e.to_string()))?;

        if self.inflated.len() > MAX_BLOCK_LEN {
            return Err(Error::DecompressionFailed(format!(
                "inflated block exceeds {} bytes",
                MAX_BLOCK_LEN
            )));
        }
        if self.inflated.len() != hint {
            tracing::debug!(hint, actual = self.inflated.len(), "block size hint mismatch");
        }
        Ok(())
    }

    /// Deflate `payload` and write it as one block.
    pub fn write<W: Write + ?Sized>(w: &mut W, payload: &[u8]) -> Result<()> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(payload)?;
        let compressed = encoder.finish()?;

        w.write_length(payload.len())?;
        w.write_length(compressed.len())?;
        w.write_all(&compressed)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn block(payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        CompressedBlock::write(&mut out, payload).unwrap();
        out
    }

    #[test]
    fn test_block_payload_reads_back() {
        let mut payload = Vec::new();
        payload.write_string("CDC").unwrap();
        payload.write_int(42).unwrap();
        let wire = block(&payload);

        let mut pool = CompressedBlock::new();
        let mut outer = ByteReader::buffer(&wire);
        let mut inner = pool.read(&mut outer).unwrap();
        assert_eq!(inner.read_string().unwrap(), "CDC");
        assert_eq!(inner.read_int().unwrap(), 42);
        assert_eq!(inner.remaining(), Some(0));
        assert_eq!(outer.remaining(), Some(0));
    }

    #[test]
    fn test_buffers_are_reused() {
        let big = vec![7u8; 4096];
        let small = vec![1u8; 16];
        let mut pool = CompressedBlock::new();

        pool.read(&mut ByteReader::buffer(&block(&big))).unwrap();
        let capacity = pool.capacity();
        assert!(capacity >= 4096);

        pool.read(&mut ByteReader::buffer(&block(&small))).unwrap();
        assert_eq!(pool.payload(), &small[..]);
        assert_eq!(pool.capacity(), capacity);
    }

    #[test]
    fn test_corrupt_stream_fails() {
        let mut wire = Vec::new();
        wire.write_int(10).unwrap();
        wire.write_int(6).unwrap();
        wire.extend_from_slice(&[0xde, 0xad, 0xbe, 0xef, 0x00, 0x01]);

        let err = CompressedBlock::new()
            .read(&mut ByteReader::buffer(&wire))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DecompressionFailed);
    }

    #[test]
    fn test_negative_length_is_truncated() {
        let mut wire = Vec::new();
        wire.write_int(10).unwrap();
        wire.write_int(-4).unwrap();

        let err = CompressedBlock::new()
            .read(&mut ByteReader::buffer(&wire))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Truncated);
    }

    #[test]
    fn test_short_block_on_stream_is_closed() {
        let mut wire = block(b"payload");
        wire.truncate(wire.len() - 2);

        let err = CompressedBlock::new()
            .read(&mut ByteReader::stream(&wire[..]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConnectionClosed);
    }
}
