use std::io::{Read, Write};

use crate::codec::{ByteReader, ByteWrite};
use crate::error::{Error, Result};
use crate::sentinel::{expect_sentinel, write_sentinel};

use super::{write_opcode, Opcode};

/// Upper bound on the number of packages a server may announce.
const MAX_PACKAGES: usize = 4096;

/// Server: announce the available packages.
pub fn write_list<W: Write + ?Sized>(w: &mut W, names: &[String]) -> Result<()> {
    write_opcode(w, Opcode::List)?;
    w.write_length(names.len())?;
    for name in names {
        w.write_string(name)?;
    }
    Ok(())
}

/// Client: read the package names that follow a `LIST` opcode.
pub fn read_list<R: Read>(r: &mut ByteReader<R>) -> Result<Vec<String>> {
    let count = r.read_int()?;
    let count = match usize::try_from(count) {
        Ok(count) if count <= MAX_PACKAGES => count,
        _ => {
            return Err(Error::ProtocolDesync(format!(
                "server announced {} packages",
                count
            )))
        }
    };
    (0..count).map(|_| r.read_string()).collect()
}

/// Client: one byte per announced package, 1 to monitor it.
pub fn write_selection<W: Write + ?Sized>(w: &mut W, selection: &[bool]) -> Result<()> {
    for selected in selection {
        w.write_bool(*selected)?;
    }
    Ok(())
}

/// Server: read the client's selection for `count` packages.
pub fn read_selection<R: Read>(r: &mut ByteReader<R>, count: usize) -> Result<Vec<bool>> {
    (0..count).map(|_| r.read_bool()).collect()
}

/// Server: close the list exchange.
pub fn write_list_end<W: Write + ?Sized>(w: &mut W) -> Result<()> {
    write_sentinel(w)
}

/// Client: verify the sentinel closing the list exchange.
pub fn read_list_end<R: Read>(r: &mut ByteReader<R>) -> Result<()> {
    expect_sentinel(r, "package list")
}
