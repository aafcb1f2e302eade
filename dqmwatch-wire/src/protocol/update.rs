use std::io::{Read, Write};

use dqmwatch_types::HistogramPackage;

use crate::block::CompressedBlock;
use crate::codec::{ByteReader, ByteWrite};
use crate::error::{Error, Result};
use crate::sentinel::{expect_sentinel, write_sentinel};

use super::{read_bin, write_bin, write_opcode, Opcode};

/// Package index that ends the block list of an update frame.
pub const END_OF_PACKAGES: i32 = -1;

/// Run identity carried at the start of every update frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct UpdateHeader {
    pub exp: i32,
    pub run: i32,
    pub state: i32,
}

impl UpdateHeader {
    pub const fn new(exp: i32, run: i32, state: i32) -> Self {
        Self { exp, run, state }
    }

    /// Whether both headers belong to the same experiment and run.
    pub fn same_run(&self, other: &UpdateHeader) -> bool {
        self.exp == other.exp && self.run == other.run
    }
}

/// Decoded bin contents for one package, in-range values per histogram in
/// configured order.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageUpdate {
    pub index: usize,
    pub histograms: Vec<Vec<f64>>,
}

/// A fully decoded and validated update frame, not yet applied.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedUpdate {
    pub header: UpdateHeader,
    pub packages: Vec<PackageUpdate>,
}

impl StagedUpdate {
    /// Check that every snapshot fits the histogram it targets.
    pub fn validate(&self, packages: &[HistogramPackage]) -> Result<()> {
        for update in &self.packages {
            let package = packages.get(update.index).ok_or_else(|| {
                Error::ProtocolDesync(format!("no package at index {}", update.index))
            })?;
            for (i, values) in update.histograms.iter().enumerate() {
                let expected = package
                    .get(i)
                    .map(|h| h.binning().in_range_bins())
                    .ok_or_else(|| {
                        Error::ProtocolDesync(format!(
                            "package '{}' has no histogram {}",
                            package.name(),
                            i
                        ))
                    })?;
                if values.len() != expected {
                    return Err(Error::ProtocolDesync(format!(
                        "histogram {} of '{}' expects {} bins, got {}",
                        i,
                        package.name(),
                        expected,
                        values.len()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Apply every snapshot to `packages`.
    ///
    /// The whole frame is validated before the first histogram is touched,
    /// so an error leaves `packages` as it was.
    pub fn apply(&self, packages: &mut [HistogramPackage]) -> Result<()> {
        self.validate(packages)?;

        for update in &self.packages {
            let package = &mut packages[update.index];
            for (histogram, values) in package.iter_mut().zip(update.histograms.iter()) {
                histogram
                    .apply_in_range(values)
                    .map_err(|e| Error::ProtocolDesync(e.to_string()))?;
            }
        }
        Ok(())
    }
}

/// Client: read the body of an `UPDATE` message against the configured
/// `packages`. Nothing is applied; see [`StagedUpdate::apply`].
pub fn read_update<R: Read>(
    r: &mut ByteReader<R>,
    pool: &mut CompressedBlock,
    packages: &[HistogramPackage],
) -> Result<StagedUpdate> {
    let header = UpdateHeader {
        exp: r.read_int()?,
        run: r.read_int()?,
        state: r.read_int()?,
    };

    let mut staged = Vec::new();
    loop {
        let index = r.read_int()?;
        if index == END_OF_PACKAGES {
            break;
        }
        let package = usize::try_from(index)
            .ok()
            .and_then(|i| packages.get(i))
            .ok_or_else(|| {
                Error::ProtocolDesync(format!(
                    "update names package index {} of {}",
                    index,
                    packages.len()
                ))
            })?;
        let mut payload = pool.read(r)?;
        let histograms = read_package_payload(&mut payload, package)?;
        staged.push(PackageUpdate {
            index: index as usize,
            histograms,
        });
    }
    expect_sentinel(r, "update frame")?;

    Ok(StagedUpdate {
        header,
        packages: staged,
    })
}

fn read_package_payload(
    r: &mut ByteReader<&[u8]>,
    package: &HistogramPackage,
) -> Result<Vec<Vec<f64>>> {
    let name = r.read_string()?;
    if name != package.name() {
        return Err(Error::ProtocolDesync(format!(
            "update block carries package '{}', expected '{}'",
            name,
            package.name()
        )));
    }

    let count = r.read_int()?;
    if count < 0 || count as usize > package.len() {
        return Err(Error::ProtocolDesync(format!(
            "update for '{}' carries {} histograms, {} configured",
            name,
            count,
            package.len()
        )));
    }

    let mut histograms = Vec::with_capacity(count as usize);
    for histogram in package.iter().take(count as usize) {
        let hname = r.read_string()?;
        if hname != histogram.name() {
            return Err(Error::ProtocolDesync(format!(
                "update for '{}' carries histogram '{}', expected '{}'",
                name,
                hname,
                histogram.name()
            )));
        }
        let storage = histogram.storage();
        let values = (0..histogram.binning().in_range_bins())
            .map(|_| read_bin(r, storage))
            .collect::<Result<Vec<f64>>>()?;
        expect_sentinel(r, &format!("histogram '{}'", hname))?;
        histograms.push(values);
    }
    expect_sentinel(r, &format!("package '{}'", name))?;

    if let Some(extra) = r.remaining().filter(|n| *n > 0) {
        tracing::debug!(package = %name, extra, "trailing bytes in update block");
    }
    Ok(histograms)
}

/// Server: serialize the in-range contents of one package.
pub(crate) fn encode_package_payload(package: &HistogramPackage) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    out.write_string(package.name())?;
    out.write_length(package.len())?;
    for histogram in package.iter() {
        out.write_string(histogram.name())?;
        for value in histogram.in_range_contents() {
            write_bin(&mut out, histogram.storage(), value)?;
        }
        write_sentinel(&mut out)?;
    }
    write_sentinel(&mut out)?;
    Ok(out)
}

/// Server: write a full update frame. Each package is paired with the
/// index the client configured it under.
pub fn write_update<W: Write + ?Sized>(
    w: &mut W,
    header: UpdateHeader,
    packages: &[(usize, &HistogramPackage)],
) -> Result<()> {
    write_opcode(w, Opcode::Update)?;
    w.write_int(header.exp)?;
    w.write_int(header.run)?;
    w.write_int(header.state)?;
    for (index, package) in packages {
        w.write_length(*index)?;
        CompressedBlock::write(w, &encode_package_payload(package)?)?;
    }
    w.write_int(END_OF_PACKAGES)?;
    write_sentinel(w)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::protocol::read_opcode;
    use dqmwatch_types::{Axis, BinStorage};

    fn configured() -> Vec<HistogramPackage> {
        vec![HistogramPackage::builder("CDC")
            .histogram_1d("h1", "hits", BinStorage::Float, Axis::new(4, 0.0, 4.0))
            .histogram_2d(
                "map",
                "map",
                BinStorage::Int,
                Axis::new(2, 0.0, 2.0),
                Axis::new(2, 0.0, 2.0),
            )
            .build()]
    }

    fn frame(source: &HistogramPackage, header: UpdateHeader) -> Vec<u8> {
        let mut wire = Vec::new();
        write_update(&mut wire, header, &[(0, source)]).unwrap();
        wire
    }

    fn decode(wire: &[u8], packages: &[HistogramPackage]) -> Result<StagedUpdate> {
        let mut r = ByteReader::buffer(wire);
        assert_eq!(read_opcode(&mut r)?, Opcode::Update);
        read_update(&mut r, &mut CompressedBlock::new(), packages)
    }

    #[test]
    fn test_update_stages_in_range_values() {
        let mut source = configured().remove(0);
        source
            .get_mut(0)
            .unwrap()
            .apply_in_range(&[1.0, 2.0, 3.0, 4.0])
            .unwrap();
        source
            .get_mut(1)
            .unwrap()
            .apply_in_range(&[5.0, 6.0, 7.0, 8.0])
            .unwrap();

        let staged = decode(&frame(&source, UpdateHeader::new(10, 2, 1)), &configured()).unwrap();
        assert_eq!(staged.header, UpdateHeader::new(10, 2, 1));
        assert_eq!(staged.packages.len(), 1);
        assert_eq!(staged.packages[0].histograms[0], vec![1.0, 2.0, 3.0, 4.0]);
        // for y: for x:
        assert_eq!(staged.packages[0].histograms[1], vec![5.0, 6.0, 7.0, 8.0]);

        let mut target = configured();
        staged.apply(&mut target).unwrap();
        assert_eq!(target[0].get(1).unwrap().bin_2d(2, 1), 6.0);
        assert_eq!(target[0].get(1).unwrap().bin_2d(1, 2), 7.0);
    }

    #[test]
    fn test_package_name_mismatch() {
        let other = HistogramPackage::builder("SVD")
            .histogram_1d("h1", "hits", BinStorage::Float, Axis::new(4, 0.0, 4.0))
            .build();
        let err = decode(&frame(&other, UpdateHeader::default()), &configured()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolDesync);
    }

    #[test]
    fn test_histogram_name_mismatch() {
        let renamed = HistogramPackage::builder("CDC")
            .histogram_1d("h2", "hits", BinStorage::Float, Axis::new(4, 0.0, 4.0))
            .build();
        let err = decode(&frame(&renamed, UpdateHeader::default()), &configured()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolDesync);
        assert!(err.to_string().contains("'h2'"));
    }

    #[test]
    fn test_unknown_package_index() {
        let source = configured().remove(0);
        let mut wire = Vec::new();
        write_update(&mut wire, UpdateHeader::default(), &[(3, &source)]).unwrap();
        let err = decode(&wire, &configured()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolDesync);
    }

    #[test]
    fn test_corrupt_frame_sentinel() {
        let source = configured().remove(0);
        let mut wire = frame(&source, UpdateHeader::default());
        let last = wire.len() - 1;
        wire[last] = 0x00;
        let err = decode(&wire, &configured()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolDesync);
    }

    #[test]
    fn test_corrupt_block_sentinel() {
        let package = HistogramPackage::builder("P")
            .histogram_1d("h", "h", BinStorage::Char, Axis::new(1, 0.0, 1.0))
            .build();
        let mut payload = Vec::new();
        payload.write_string("P").unwrap();
        payload.write_int(1).unwrap();
        payload.write_string("h").unwrap();
        payload.write_char(9).unwrap();
        payload.write_short(0x7FFE).unwrap();

        let mut wire = Vec::new();
        write_opcode(&mut wire, Opcode::Update).unwrap();
        for v in [1, 1, 1, 0] {
            wire.write_int(v).unwrap();
        }
        CompressedBlock::write(&mut wire, &payload).unwrap();
        wire.write_int(END_OF_PACKAGES).unwrap();
        write_sentinel(&mut wire).unwrap();

        let err = decode(&wire, &[package]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolDesync);
        assert!(err.to_string().contains("histogram 'h'"));
    }

    #[test]
    fn test_apply_checks_shapes_first() {
        let staged = StagedUpdate {
            header: UpdateHeader::default(),
            packages: vec![PackageUpdate {
                index: 0,
                histograms: vec![vec![1.0, 1.0, 1.0, 1.0], vec![1.0]],
            }],
        };
        let mut packages = configured();
        let before = packages.clone();
        assert!(staged.apply(&mut packages).is_err());
        assert_eq!(packages, before);
    }
}
