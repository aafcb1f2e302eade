use std::io::{Read, Write};

use crate::codec::{ByteReader, ByteWrite};
use crate::error::{Error, Result};

use super::{Field, FieldType, FieldValue, ListMetadata, RecordList, TypedRecord};

/// Smallest possible encoded record: empty path, empty name, zero fields.
const MIN_RECORD_LEN: usize = 12;

/// Initial allocation cap for counts read off the wire.
const PREALLOC_LIMIT: usize = 1024;

impl TypedRecord {
    /// Write path, name, field count and each field in insertion order.
    pub fn encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<()> {
        w.write_string(&self.path)?;
        w.write_string(&self.name)?;
        w.write_length(self.fields.len())?;
        for field in &self.fields {
            w.write_string(&field.name)?;
            w.write_int(field.value.field_type().tag())?;
            encode_value(w, &field.value)?;
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.encode(&mut out)?;
        Ok(out)
    }

    /// Replace this record with the one read from `r`.
    ///
    /// The record is reset first, so on error it is left empty rather than
    /// holding a mix of old and new fields.
    pub fn decode<R: Read>(&mut self, r: &mut ByteReader<R>) -> Result<()> {
        self.reset();
        let path = r.read_string()?;
        let name = r.read_string()?;
        self.set_identity(path, name);

        let count = read_count(r, "field", &self.name)?;
        self.fields.reserve(count.min(PREALLOC_LIMIT));
        for _ in 0..count {
            let field_name = r.read_string()?;
            let tag = r.read_int()?;
            let ty = FieldType::from_tag(tag).ok_or_else(|| {
                Error::ProtocolDesync(format!(
                    "unknown type tag {} for field '{}' in record '{}'",
                    tag, field_name, self.name
                ))
            })?;
            if self.has_field(&field_name) {
                return Err(Error::ProtocolDesync(format!(
                    "duplicate field '{}' in record '{}'",
                    field_name, self.name
                )));
            }
            let value = decode_value(r, ty, &field_name)?;
            self.fields.push(Field {
                name: field_name,
                value,
            });
        }
        Ok(())
    }

    /// Decode one record from a complete in-memory buffer.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut record = TypedRecord::default();
        record.decode(&mut ByteReader::buffer(bytes))?;
        Ok(record)
    }
}

fn encode_value<W: Write + ?Sized>(w: &mut W, value: &FieldValue) -> Result<()> {
    match value {
        FieldValue::Bool(v) => w.write_bool(*v),
        FieldValue::Char(v) => w.write_char(*v),
        FieldValue::Short(v) => w.write_short(*v),
        FieldValue::Int(v) => w.write_int(*v),
        FieldValue::Long(v) => w.write_long(*v),
        FieldValue::Float(v) => w.write_float(*v),
        FieldValue::Double(v) => w.write_double(*v),
        FieldValue::Text(v) | FieldValue::Enum(v) => w.write_string(v),
        FieldValue::Object(list) => {
            encode_metadata(w, &list.metadata)?;
            w.write_length(list.len())?;
            for child in list.iter() {
                child.encode(w)?;
            }
            Ok(())
        }
    }
}

fn encode_metadata<W: Write + ?Sized>(w: &mut W, meta: &ListMetadata) -> Result<()> {
    w.write_int(meta.revision)?;
    w.write_string(&meta.origin)?;
    w.write_string(&meta.node)?;
    w.write_string(&meta.table)
}

fn decode_value<R: Read>(r: &mut ByteReader<R>, ty: FieldType, field: &str) -> Result<FieldValue> {
    Ok(match ty {
        FieldType::Bool => FieldValue::Bool(r.read_bool()?),
        FieldType::Char => FieldValue::Char(r.read_char()?),
        FieldType::Short => FieldValue::Short(r.read_short()?),
        FieldType::Int => FieldValue::Int(r.read_int()?),
        FieldType::Long => FieldValue::Long(r.read_long()?),
        FieldType::Float => FieldValue::Float(r.read_float()?),
        FieldType::Double => FieldValue::Double(r.read_double()?),
        FieldType::Text => FieldValue::Text(r.read_string()?),
        FieldType::Enum => FieldValue::Enum(r.read_string()?),
        FieldType::Object => FieldValue::Object(decode_list(r, field)?),
    })
}

fn decode_metadata<R: Read>(r: &mut ByteReader<R>) -> Result<ListMetadata> {
    Ok(ListMetadata {
        revision: r.read_int()?,
        origin: r.read_string()?,
        node: r.read_string()?,
        table: r.read_string()?,
    })
}

fn decode_list<R: Read>(r: &mut ByteReader<R>, field: &str) -> Result<RecordList> {
    let metadata = decode_metadata(r)?;
    let count = read_count(r, "child", field)?;

    let mut list = RecordList::new(metadata);
    for i in 0..count {
        let mut child = TypedRecord::default();
        match child.decode(r) {
            Ok(()) => list.push(child),
            Err(cause @ (Error::Truncated(_) | Error::ConnectionClosed)) => {
                return Err(Error::Truncated(format!(
                    "object list '{}' declares {} records, data ended in record {}: {}",
                    field, count, i, cause
                )));
            }
            Err(e) => return Err(e),
        }
    }
    Ok(list)
}

/// Read a count and, on buffers, reject one that cannot possibly fit.
fn read_count<R: Read>(r: &mut ByteReader<R>, what: &str, owner: &str) -> Result<usize> {
    let count = r.read_int()?;
    if count < 0 {
        return Err(Error::Truncated(format!(
            "negative {} count {} in '{}'",
            what, count, owner
        )));
    }
    let count = count as usize;
    if what == "child" {
        if let Some(remaining) = r.remaining() {
            if count.saturating_mul(MIN_RECORD_LEN) > remaining {
                return Err(Error::Truncated(format!(
                    "object list '{}' declares {} records but only {} bytes remain",
                    owner, count, remaining
                )));
            }
        }
    }
    Ok(count)
}
