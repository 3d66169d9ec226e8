//! Per-frame timestamp files
//!
//! Canonical timestamps are stored as `<stream>_timestamps.npy`: a NumPy
//! `.npy` v1.0 container holding a one-dimensional `>f8` array, i.e. a small
//! text header followed by one big-endian 8-byte float (seconds) per frame.
//!
//! Legacy raw `.time` sidecars have no header at all:
//! - mobile: big-endian f64 seconds
//! - pi: little-endian u64 nanoseconds

use crate::error::{IoResultExt, RecordingError, Result};
use byteorder::{BigEndian, ByteOrder, LittleEndian, WriteBytesExt};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

/// Suffix of canonical timestamp files
pub const TIMESTAMPS_SUFFIX: &str = "_timestamps.npy";

const NPY_MAGIC: &[u8] = b"\x93NUMPY";
const NPY_ALIGNMENT: usize = 64;

static DESCR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"'descr'\s*:\s*'([<>=|]?)f8'").expect("descr pattern is valid")
});
static SHAPE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"'shape'\s*:\s*\(\s*(\d+)\s*,?\s*\)").expect("shape pattern is valid")
});
static FORTRAN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"'fortran_order'\s*:\s*(True|False)").expect("fortran_order pattern is valid")
});

/// Encoding of a legacy raw time file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawTimeFormat {
    /// Big-endian f64 seconds
    BigEndianSeconds,
    /// Little-endian u64 nanoseconds
    LittleEndianNanos,
}

/// Canonical timestamp file path for a raw time file (`world.time` → `world_timestamps.npy`)
pub fn timestamps_path_for(raw_time: &Path) -> PathBuf {
    let stem = raw_time
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    raw_time.with_file_name(format!("{}{}", stem, TIMESTAMPS_SUFFIX))
}

/// Decode the bytes of a raw time file into seconds
pub fn decode_raw_time(
    bytes: &[u8],
    format: RawTimeFormat,
) -> std::result::Result<Vec<f64>, String> {
    if bytes.len() % 8 != 0 {
        return Err(format!(
            "length {} is not a multiple of 8 bytes",
            bytes.len()
        ));
    }

    let values = bytes
        .chunks_exact(8)
        .map(|chunk| match format {
            RawTimeFormat::BigEndianSeconds => BigEndian::read_f64(chunk),
            RawTimeFormat::LittleEndianNanos => LittleEndian::read_u64(chunk) as f64 / 1e9,
        })
        .collect();

    Ok(values)
}

/// Read and decode a raw time file
pub fn read_raw_time(path: &Path, format: RawTimeFormat) -> Result<Vec<f64>> {
    let bytes = std::fs::read(path).at_path(path)?;
    decode_raw_time(&bytes, format).map_err(|detail| RecordingError::CorruptTimestamps {
        path: path.to_path_buf(),
        detail,
    })
}

/// Encode timestamps as a `.npy` v1.0 `>f8` array
pub fn encode_npy(timestamps: &[f64]) -> Vec<u8> {
    let mut header = format!(
        "{{'descr': '>f8', 'fortran_order': False, 'shape': ({},), }}",
        timestamps.len()
    );
    // magic(6) + version(2) + header length(2) + header, padded to alignment, ending in '\n'
    let preamble = NPY_MAGIC.len() + 4;
    let unpadded = preamble + header.len() + 1;
    let padding = (NPY_ALIGNMENT - unpadded % NPY_ALIGNMENT) % NPY_ALIGNMENT;
    header.extend(std::iter::repeat(' ').take(padding));
    header.push('\n');

    let mut out = Vec::with_capacity(preamble + header.len() + timestamps.len() * 8);
    out.extend_from_slice(NPY_MAGIC);
    out.extend_from_slice(&[1, 0]);
    // Vec<u8> writes are infallible
    let _ = out.write_u16::<LittleEndian>(header.len() as u16);
    out.extend_from_slice(header.as_bytes());
    for ts in timestamps {
        let _ = out.write_f64::<BigEndian>(*ts);
    }
    out
}

/// Decode a one-dimensional `f8` `.npy` array (either byte order)
pub fn decode_npy(bytes: &[u8]) -> std::result::Result<Vec<f64>, String> {
    if bytes.len() < NPY_MAGIC.len() + 4 || &bytes[..NPY_MAGIC.len()] != NPY_MAGIC {
        return Err("missing .npy magic".to_string());
    }

    let major = bytes[NPY_MAGIC.len()];
    let (header_len, header_start) = match major {
        1 => (LittleEndian::read_u16(&bytes[8..10]) as usize, 10),
        2 | 3 => {
            if bytes.len() < 12 {
                return Err("truncated .npy header".to_string());
            }
            (LittleEndian::read_u32(&bytes[8..12]) as usize, 12)
        }
        other => return Err(format!("unsupported .npy version {}", other)),
    };

    let data_start = header_start + header_len;
    if bytes.len() < data_start {
        return Err("truncated .npy header".to_string());
    }
    let header = std::str::from_utf8(&bytes[header_start..data_start])
        .map_err(|_| "header is not valid text".to_string())?;

    let descr = DESCR_RE
        .captures(header)
        .ok_or_else(|| "array dtype is not f8".to_string())?;
    let big_endian = &descr[1] == ">";

    if let Some(order) = FORTRAN_RE.captures(header) {
        if &order[1] == "True" {
            return Err("fortran-ordered arrays are not supported".to_string());
        }
    }

    let count: usize = SHAPE_RE
        .captures(header)
        .and_then(|c| c[1].parse().ok())
        .ok_or_else(|| "array is not one-dimensional".to_string())?;

    let expected_len = count
        .checked_mul(8)
        .ok_or_else(|| format!("array of {} values is too large", count))?;
    let data = &bytes[data_start..];
    if data.len() != expected_len {
        return Err(format!(
            "expected {} values ({} bytes), found {} bytes",
            count,
            expected_len,
            data.len()
        ));
    }

    let values = data
        .chunks_exact(8)
        .map(|chunk| {
            if big_endian {
                BigEndian::read_f64(chunk)
            } else {
                LittleEndian::read_f64(chunk)
            }
        })
        .collect();
    Ok(values)
}

/// Write a canonical timestamp file atomically
pub fn write_timestamps(path: &Path, timestamps: &[f64]) -> Result<()> {
    prec_common::fs_utils::atomic_write(path, &encode_npy(timestamps)).at_path(path)
}

/// Read a canonical timestamp file
pub fn read_timestamps(path: &Path) -> Result<Vec<f64>> {
    let bytes = std::fs::read(path).at_path(path)?;
    decode_npy(&bytes).map_err(|detail| RecordingError::CorruptTimestamps {
        path: path.to_path_buf(),
        detail,
    })
}
