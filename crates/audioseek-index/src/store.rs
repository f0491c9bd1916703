//! On-disk persistence for the segment index.
//!
//! Two aligned artifacts, written and loaded as a unit:
//!
//! 1. Vector file: little-endian binary - `ASKV` magic, format version,
//!    dimension, row count, then the normalized f32 rows in row-major order.
//! 2. Metadata file: one pretty-printed JSON array of descriptor records,
//!    human-inspectable, record *i* describing vector row *i*.
//!
//! Loading validates the header and the cross-file row counts; misalignment
//! is an error, never silently repaired.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::descriptor::SegmentDescriptor;
use crate::error::{IndexError, IndexResult};
use crate::index::VectorIndex;
use crate::meta::MetadataStore;
use crate::segment_index::SegmentIndex;

const VECTOR_MAGIC: &[u8; 4] = b"ASKV";
const VECTOR_FORMAT_VERSION: u16 = 1;

/// Writes both artifacts of a segment index.
pub fn save_index(
    index: &SegmentIndex,
    vector_path: &Path,
    metadata_path: &Path,
) -> IndexResult<()> {
    let mut writer = BufWriter::new(File::create(vector_path)?);
    write_vectors(&mut writer, index.vectors())?;
    writer.flush()?;

    let meta_file = BufWriter::new(File::create(metadata_path)?);
    serde_json::to_writer_pretty(meta_file, index.metadata().records())?;
    Ok(())
}

/// Loads both artifacts and rebinds them, validating row alignment.
pub fn load_index(vector_path: &Path, metadata_path: &Path) -> IndexResult<SegmentIndex> {
    let mut reader = BufReader::new(File::open(vector_path)?);
    let vectors = read_vectors(&mut reader)?;

    let meta_file = BufReader::new(File::open(metadata_path)?);
    let records: Vec<SegmentDescriptor> = serde_json::from_reader(meta_file)?;

    SegmentIndex::from_parts(vectors, MetadataStore::from_records(records))
}

fn write_vectors<W: Write>(writer: &mut W, index: &VectorIndex) -> IndexResult<()> {
    writer.write_all(VECTOR_MAGIC)?;
    writer.write_u16::<LittleEndian>(VECTOR_FORMAT_VERSION)?;
    writer.write_u32::<LittleEndian>(index.dim() as u32)?;
    writer.write_u64::<LittleEndian>(index.count() as u64)?;
    for &value in index.rows_flat() {
        writer.write_f32::<LittleEndian>(value)?;
    }
    Ok(())
}

fn read_vectors<R: Read>(reader: &mut R) -> IndexResult<VectorIndex> {
    let mut magic = [0u8; 4];
    reader
        .read_exact(&mut magic)
        .map_err(|_| IndexError::corrupt("file too short for header"))?;
    if &magic != VECTOR_MAGIC {
        return Err(IndexError::corrupt("bad magic tag"));
    }

    let version = reader.read_u16::<LittleEndian>()?;
    if version != VECTOR_FORMAT_VERSION {
        return Err(IndexError::corrupt(format!(
            "unsupported format version {version}"
        )));
    }

    let dim = reader.read_u32::<LittleEndian>()? as usize;
    if dim == 0 {
        return Err(IndexError::corrupt("dimension is zero"));
    }
    let count = reader.read_u64::<LittleEndian>()? as usize;

    let mut data = Vec::with_capacity(count * dim);
    for _ in 0..count * dim {
        let value = reader
            .read_f32::<LittleEndian>()
            .map_err(|_| IndexError::corrupt("truncated vector data"))?;
        data.push(value);
    }
    VectorIndex::from_raw(dim, data)
}
