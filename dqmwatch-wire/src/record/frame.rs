//! Standalone record exchange: each record is followed by a sentinel so a
//! reader can verify it consumed exactly one record.

use std::io::{Read, Write};

use crate::codec::ByteReader;
use crate::error::Result;
use crate::sentinel::{expect_sentinel, write_sentinel};

use super::TypedRecord;

pub fn write_record_frame<W: Write + ?Sized>(w: &mut W, record: &TypedRecord) -> Result<()> {
    record.encode(w)?;
    write_sentinel(w)
}

pub fn read_record_frame<R: Read>(r: &mut ByteReader<R>) -> Result<TypedRecord> {
    let mut record = TypedRecord::default();
    record.decode(r)?;
    expect_sentinel(r, &format!("record '{}'", record.name()))?;
    tracing::trace!(path = record.path(), name = record.name(), "record frame");
    Ok(record)
}
