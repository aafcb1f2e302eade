use std::io::{Read, Write};

use dqmwatch_types::{Axis, Binning, Histogram, HistogramClass, HistogramKind, HistogramPackage};

use crate::codec::{ByteReader, ByteWrite};
use crate::error::{Error, Result};
use crate::sentinel::{expect_sentinel, write_sentinel};

use super::{write_opcode, Opcode};

/// Upper bound on histograms per package.
const MAX_HISTOGRAMS: usize = 65_536;

/// Upper bound on storage slots of a single histogram.
const MAX_SLOTS: usize = 1 << 24;

/// Server: write the schema of every histogram in `packages`.
pub fn write_configure<W: Write + ?Sized>(w: &mut W, packages: &[&HistogramPackage]) -> Result<()> {
    write_opcode(w, Opcode::Configure)?;
    for package in packages {
        w.write_length(package.len())?;
        for histogram in package.iter() {
            write_histogram_schema(w, histogram)?;
        }
        write_sentinel(w)?;
    }
    write_sentinel(w)
}

/// Server: class tag, name, title, axes, sentinel.
pub fn write_histogram_schema<W: Write + ?Sized>(w: &mut W, histogram: &Histogram) -> Result<()> {
    w.write_string(&histogram.class().to_string())?;
    w.write_string(histogram.name())?;
    w.write_string(histogram.title())?;
    let binning = histogram.binning();
    write_axis(w, binning.x())?;
    if let Some(y) = binning.y() {
        write_axis(w, y)?;
    }
    write_sentinel(w)
}

fn write_axis<W: Write + ?Sized>(w: &mut W, axis: &Axis) -> Result<()> {
    w.write_length(axis.nbins)?;
    w.write_double(axis.min)?;
    w.write_double(axis.max)
}

/// Client: read the body of a `CONFIGURE` message for the selected packages,
/// in selection order.
pub fn read_configure<R: Read>(
    r: &mut ByteReader<R>,
    selected: &[String],
) -> Result<Vec<HistogramPackage>> {
    let mut packages = Vec::with_capacity(selected.len());
    for name in selected {
        let count = r.read_int()?;
        if count < 0 || count as usize > MAX_HISTOGRAMS {
            return Err(Error::ProtocolDesync(format!(
                "package '{}' declares {} histograms",
                name, count
            )));
        }
        let mut package = HistogramPackage::new(name.clone());
        for _ in 0..count {
            let histogram = read_histogram_schema(r)?;
            if package.index_of(histogram.name()).is_some() {
                return Err(Error::ProtocolDesync(format!(
                    "duplicate histogram '{}' in package '{}'",
                    histogram.name(),
                    name
                )));
            }
            package.push(histogram);
        }
        expect_sentinel(r, &format!("package '{}'", name))?;
        tracing::debug!(package = %name, histograms = package.len(), "configured package");
        packages.push(package);
    }
    expect_sentinel(r, "configure message")?;
    Ok(packages)
}

/// Client: read one histogram schema and build an empty histogram from it.
pub fn read_histogram_schema<R: Read>(r: &mut ByteReader<R>) -> Result<Histogram> {
    let tag = r.read_string()?;
    let class: HistogramClass = tag
        .parse()
        .map_err(|e| Error::ProtocolDesync(format!("{}", e)))?;
    let name = r.read_string()?;
    let title = r.read_string()?;

    let x = read_axis(r, &name)?;
    let binning = match class.kind {
        HistogramKind::OneD => Binning::OneD { x },
        HistogramKind::TwoD => Binning::TwoD {
            x,
            y: read_axis(r, &name)?,
        },
    };
    if binning.slots() > MAX_SLOTS {
        return Err(Error::ProtocolDesync(format!(
            "histogram '{}' has {} bins",
            name,
            binning.slots()
        )));
    }
    expect_sentinel(r, &format!("histogram '{}'", name))?;
    Ok(Histogram::new(name, title, class.storage, binning))
}

fn read_axis<R: Read>(r: &mut ByteReader<R>, histogram: &str) -> Result<Axis> {
    let nbins = r.read_int()?;
    let min = r.read_double()?;
    let max = r.read_double()?;
    if nbins < 0 || nbins as usize > MAX_SLOTS {
        return Err(Error::ProtocolDesync(format!(
            "histogram '{}' axis has {} bins",
            histogram, nbins
        )));
    }
    Ok(Axis::new(nbins as usize, min, max))
}
