//! Partition Materialization
//!
//! Writes each planned part as `header + records + footer`, so every file carries the
//! source's root wrapper and parses on its own.

use super::types::*;

use std::fs::File;
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

pub fn partition_file_name(index: usize) -> String {
    format!("part_{:04}.xml", index)
}

/// Writes every part of `plan` into `run_dir`, in index order.
pub fn write_partitions<R: Read + Seek>(
    source: &mut R,
    plan: &PartitionPlan,
    run_dir: &Path,
) -> Result<Vec<Partition>, PartitionError> {
    let header = read_bytes(source, plan.header)?;
    let footer = read_bytes(source, plan.footer)?;

    let mut partitions = Vec::with_capacity(plan.parts.len());
    for part in &plan.parts {
        let path = run_dir.join(partition_file_name(part.index));
        write_one(source, &path, &header, part.range, &footer)?;

        tracing::debug!(
            "Wrote partition {} ({} records, {} bytes) to {}",
            part.index,
            part.record_count,
            part.range.len(),
            path.display()
        );

        partitions.push(Partition {
            index: part.index,
            source_range: part.range,
            record_count: part.record_count,
            path,
        });
    }
    Ok(partitions)
}

fn read_bytes<R: Read + Seek>(source: &mut R, range: ByteRange) -> io::Result<Vec<u8>> {
    let mut buf = vec![0u8; range.len() as usize];
    source.seek(SeekFrom::Start(range.start))?;
    source.read_exact(&mut buf)?;
    Ok(buf)
}

fn write_one<R: Read + Seek>(
    source: &mut R,
    path: &PathBuf,
    header: &[u8],
    body: ByteRange,
    footer: &[u8],
) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    out.write_all(header)?;

    source.seek(SeekFrom::Start(body.start))?;
    let copied = io::copy(&mut (&mut *source).take(body.len()), &mut out)?;
    if copied != body.len() {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("expected {} bytes, copied {}", body.len(), copied),
        ));
    }

    out.write_all(footer)?;
    out.flush()
}

/// Writes `manifest.json` listing the partitions in index order.
pub fn write_manifest(set: &PartitionSet) -> io::Result<PathBuf> {
    let path = set.manifest_path();
    let file = BufWriter::new(File::create(&path)?);
    serde_json::to_writer_pretty(file, set)?;
    Ok(path)
}

/// Reads a manifest written by `write_manifest`.
pub fn read_manifest(path: &Path) -> io::Result<PartitionSet> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(io::BufReader::new(file))?)
}
