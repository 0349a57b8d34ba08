//! Index artifact format and atomic save/load.
//!
//! An artifact stores the fitted hash functions and the bucket tables, never
//! the vectors themselves; loading requires the same dataset the index was
//! built from. Layout, all integers little-endian:
//!
//! ```text
//! magic "VCNO" | version u32 | crc32 u32 | body
//! body: family tag u8 | n u64 | dim u32 | tables u32
//!       | family parameter block
//!       | per table: bucket count u64, then (key u64, len u32, ids u32...)
//! ```
//!
//! The checksum covers the body only. Buckets are written in ascending key
//! order so the same index always produces the same bytes. Saving writes to
//! `<path>.tmp`, syncs, then renames over the destination, so a crash
//! mid-write never leaves a truncated artifact at the final path.

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::dataset::{Dataset, Element};
use crate::error::{LshError, Result};
use crate::family::{FamilyTag, HashFamily};
use crate::table::Buckets;

const MAGIC: [u8; 4] = *b"VCNO";
const VERSION: u32 = 1;

fn corrupt(msg: impl Into<String>) -> LshError {
    LshError::CorruptArtifact(msg.into())
}

fn truncated() -> LshError {
    corrupt("truncated artifact")
}

// Little-endian scalar primitives shared with the family parameter blocks.

pub(crate) fn write_u8<W: Write>(w: &mut W, v: u8) -> Result<()> {
    w.write_all(&[v])?;
    Ok(())
}

pub(crate) fn write_u32<W: Write>(w: &mut W, v: u32) -> Result<()> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

pub(crate) fn write_u64<W: Write>(w: &mut W, v: u64) -> Result<()> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

pub(crate) fn write_f32<W: Write>(w: &mut W, v: f32) -> Result<()> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

pub(crate) fn read_u8<R: Read>(r: &mut R) -> Result<u8> {
    let mut b = [0u8; 1];
    r.read_exact(&mut b).map_err(|_| truncated())?;
    Ok(b[0])
}

pub(crate) fn read_u32<R: Read>(r: &mut R) -> Result<u32> {
    let mut b = [0u8; 4];
    r.read_exact(&mut b).map_err(|_| truncated())?;
    Ok(u32::from_le_bytes(b))
}

pub(crate) fn read_u64<R: Read>(r: &mut R) -> Result<u64> {
    let mut b = [0u8; 8];
    r.read_exact(&mut b).map_err(|_| truncated())?;
    Ok(u64::from_le_bytes(b))
}

pub(crate) fn read_f32<R: Read>(r: &mut R) -> Result<f32> {
    let mut b = [0u8; 4];
    r.read_exact(&mut b).map_err(|_| truncated())?;
    Ok(f32::from_le_bytes(b))
}

pub(crate) fn read_len<R: Read>(r: &mut R) -> Result<usize> {
    usize::try_from(read_u64(r)?).map_err(|_| corrupt("length does not fit in usize"))
}

pub(crate) fn write_f32_slice<W: Write>(w: &mut W, vs: &[f32]) -> Result<()> {
    write_u64(w, vs.len() as u64)?;
    for &v in vs {
        write_f32(w, v)?;
    }
    Ok(())
}

pub(crate) fn read_f32_vec<R: Read>(r: &mut R) -> Result<Vec<f32>> {
    let len = read_len(r)?;
    let mut vs = Vec::with_capacity(len.min(1 << 24));
    for _ in 0..len {
        vs.push(read_f32(r)?);
    }
    Ok(vs)
}

pub(crate) fn write_u32_slice<W: Write>(w: &mut W, vs: &[u32]) -> Result<()> {
    write_u64(w, vs.len() as u64)?;
    for &v in vs {
        write_u32(w, v)?;
    }
    Ok(())
}

pub(crate) fn read_u32_vec<R: Read>(r: &mut R) -> Result<Vec<u32>> {
    let len = read_len(r)?;
    let mut vs = Vec::with_capacity(len.min(1 << 24));
    for _ in 0..len {
        vs.push(read_u32(r)?);
    }
    Ok(vs)
}

pub(crate) fn write_u64_slice<W: Write>(w: &mut W, vs: &[u64]) -> Result<()> {
    write_u64(w, vs.len() as u64)?;
    for &v in vs {
        write_u64(w, v)?;
    }
    Ok(())
}

pub(crate) fn read_u64_vec<R: Read>(r: &mut R) -> Result<Vec<u64>> {
    let len = read_len(r)?;
    let mut vs = Vec::with_capacity(len.min(1 << 24));
    for _ in 0..len {
        vs.push(read_u64(r)?);
    }
    Ok(vs)
}

/// Serialize a fitted index and atomically replace `path` with it.
pub(crate) fn save_index<T, F>(
    path: &Path,
    n: usize,
    dim: usize,
    family: &F,
    tables: &[Buckets],
) -> Result<()>
where
    T: Element,
    F: HashFamily<T>,
{
    let mut body = Vec::new();
    write_u8(&mut body, F::TAG as u8)?;
    write_u64(&mut body, n as u64)?;
    write_u32(&mut body, dim as u32)?;
    write_u32(&mut body, tables.len() as u32)?;
    family.write_params(&mut body)?;
    for table in tables {
        let records = table.sorted_records();
        write_u64(&mut body, records.len() as u64)?;
        for (key, ids) in records {
            write_u64(&mut body, key)?;
            write_u32(&mut body, ids.len() as u32)?;
            for &id in ids {
                write_u32(&mut body, id)?;
            }
        }
    }

    let checksum = crc32fast::hash(&body);
    // Suffix the whole file name: `a.idx` and `a.bin` must not share a
    // temp file.
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    let mut file = File::create(&tmp)?;
    file.write_all(&MAGIC)?;
    write_u32(&mut file, VERSION)?;
    write_u32(&mut file, checksum)?;
    file.write_all(&body)?;
    file.sync_all()?;
    std::fs::rename(&tmp, path)?;

    info!(
        path = %path.display(),
        family = F::TAG.name(),
        bytes = body.len() + 12,
        "saved index artifact"
    );
    Ok(())
}

/// Load a fitted index from `path`, validating it against `dataset`.
///
/// Every malformed-input case (bad magic, version skew, checksum mismatch,
/// family mismatch, dataset shape mismatch, truncation, out-of-range point
/// identifiers) surfaces as [`LshError::CorruptArtifact`].
pub(crate) fn load_index<T, F>(path: &Path, dataset: &Dataset<T>) -> Result<(F, Vec<Buckets>)>
where
    T: Element,
    F: HashFamily<T>,
{
    let mut reader = BufReader::new(File::open(path)?);

    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic).map_err(|_| truncated())?;
    if magic != MAGIC {
        return Err(corrupt("bad magic"));
    }
    let version = read_u32(&mut reader)?;
    if version != VERSION {
        return Err(corrupt(format!(
            "unsupported artifact version {version}, expected {VERSION}"
        )));
    }
    let expected_crc = read_u32(&mut reader)?;

    let mut body = Vec::new();
    reader.read_to_end(&mut body)?;
    let actual_crc = crc32fast::hash(&body);
    if actual_crc != expected_crc {
        return Err(corrupt(format!(
            "checksum mismatch: stored {expected_crc:#010x}, computed {actual_crc:#010x}"
        )));
    }

    let mut r = body.as_slice();
    let tag = FamilyTag::try_from(read_u8(&mut r)?)?;
    if tag != F::TAG {
        return Err(corrupt(format!(
            "artifact holds a {} index, expected {}",
            tag.name(),
            F::TAG.name()
        )));
    }
    let n = read_len(&mut r)?;
    let dim = read_u32(&mut r)? as usize;
    if n != dataset.len() || dim != dataset.dim() {
        return Err(corrupt(format!(
            "artifact was built from a {n} x {dim} dataset, got {} x {}",
            dataset.len(),
            dataset.dim()
        )));
    }
    let table_count = read_u32(&mut r)? as usize;

    let family = F::read_params(&mut r)?;
    if family.tables() != table_count {
        return Err(corrupt("table count disagrees with family parameters"));
    }
    if family.dim() != dim {
        return Err(corrupt("dimension disagrees with family parameters"));
    }

    let mut tables = Vec::with_capacity(table_count);
    for _ in 0..table_count {
        let mut buckets = Buckets::for_key_bits(family.key_bits());
        let bucket_count = read_len(&mut r)?;
        for _ in 0..bucket_count {
            let key = read_u64(&mut r)?;
            if let Some(bits) = family.key_bits() {
                if bits < 64 && key >= 1u64 << bits {
                    return Err(corrupt(format!("bucket key {key} exceeds key width")));
                }
            }
            let len = read_u32(&mut r)? as usize;
            for _ in 0..len {
                let id = read_u32(&mut r)?;
                if id as usize >= n {
                    return Err(corrupt(format!("point id {id} out of range (n = {n})")));
                }
                buckets.insert(key, id);
            }
        }
        tables.push(buckets);
    }
    if !r.is_empty() {
        return Err(corrupt("trailing bytes after table data"));
    }

    info!(
        path = %path.display(),
        family = tag.name(),
        tables = table_count,
        "loaded index artifact"
    );
    Ok((family, tables))
}
