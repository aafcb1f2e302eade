//! # dqmwatch-wire
//!
//! Binary formats spoken between a data-quality monitoring server and its
//! viewers.
//!
//! - [`codec`]: big-endian primitives and length-prefixed strings
//! - [`record`]: self-describing typed records with nested object lists
//! - [`sentinel`]: the `0x7FFF` marker closing every structural unit
//! - [`block`]: zlib-compressed payload blocks with pooled buffers
//! - [`protocol`]: the list / configure / update exchange, both directions
//!
//! Everything here is blocking `std::io` over any `Read`/`Write`; the
//! session layer decides which thread runs it.
//!
//! ## Quick Start
//!
//! ```rust
//! use dqmwatch_wire::codec::ByteReader;
//! use dqmwatch_wire::record::{read_record_frame, write_record_frame, TypedRecord};
//!
//! let mut status = TypedRecord::new("rc", "status");
//! status.add_enum("state", "RUNNING").unwrap();
//! status.add_int("run", 1042).unwrap();
//!
//! let mut wire = Vec::new();
//! write_record_frame(&mut wire, &status).unwrap();
//!
//! let decoded = read_record_frame(&mut ByteReader::buffer(&wire)).unwrap();
//! assert_eq!(decoded.get_int("run").unwrap(), 1042);
//! ```

pub mod block;
pub mod codec;
pub mod error;
pub mod protocol;
pub mod record;
pub mod sentinel;

pub use block::CompressedBlock;
pub use codec::{ByteReader, ByteWrite};
pub use error::{Error, ErrorKind, Result};
pub use sentinel::SENTINEL;

// Re-export types for convenience
pub use dqmwatch_types::{Histogram, HistogramPackage};
