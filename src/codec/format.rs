//! Clip file framing: header size prefix, file header and clip-set header.
//!
//! ```text
//! i32   header_byte_size   (covers everything before the payload, itself included)
//! u32   magic              "GHST"
//! u32   version
//! u8    compression
//! u8    quantization
//! i64   uncompressed payload size
//! ClipSetHeader
//! payload bytes
//! ```

use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};

use super::wire::{
    WireFormat, read_f32, read_i64, read_string, read_string_set, read_u8, read_u32, read_vec,
    write_f32, write_i32, write_i64, write_string, write_string_set, write_u8, write_u32, write_vec,
};
use crate::error::{ReplayError, Result};
use crate::pose::{ClipSetHeader, Transform, UserPayload};
use crate::schema::{CompressionMethod, FileOptions, QuantizationMethod};

/// Magic number identifying a clip file.
pub const CLIP_MAGIC: u32 = u32::from_le_bytes(*b"GHST");

/// Current format version.
pub const CLIP_VERSION: u32 = 1;

/// Fixed-size header describing how the payload was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub options: FileOptions,
    /// Payload size before compression.
    pub uncompressed_size: u64,
}

impl FileHeader {
    /// Magic(4) + Version(4) + Compression(1) + Quantization(1) + UncompressedSize(8)
    pub const SIZE: usize = 18;

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        write_u32(w, CLIP_MAGIC)?;
        write_u32(w, CLIP_VERSION)?;
        write_u8(w, self.options.compression as u8)?;
        write_u8(w, self.options.quantization as u8)?;
        write_i64(w, self.uncompressed_size as i64)
    }

    /// Read and validate the header.
    pub fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        let magic = read_u32(r)?;
        let version = read_u32(r)?;
        if magic != CLIP_MAGIC || version != CLIP_VERSION {
            return Err(ReplayError::RuntimeVersionMismatch { magic, version });
        }

        let compression = read_u8(r)?;
        let compression = CompressionMethod::from_u8(compression)
            .ok_or(ReplayError::UnknownCompression(compression))?;
        let quantization = read_u8(r)?;
        let quantization = QuantizationMethod::from_u8(quantization)
            .ok_or(ReplayError::UnknownQuantization(quantization))?;

        let size = read_i64(r)?;
        let uncompressed_size = u64::try_from(size)
            .map_err(|_| ReplayError::InvalidData(format!("Negative payload size {size}")))?;

        Ok(Self {
            options: FileOptions {
                compression,
                quantization,
            },
            uncompressed_size,
        })
    }
}

impl WireFormat for ClipSetHeader {
    fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        write_string(w, &self.name)?;
        write_string(w, &self.level)?;
        write_string_set(w, &self.tags)?;
        self.spawn_transform.write_to(w)?;
        write_f32(w, self.max_record_time)?;
        write_f32(w, self.sampling_interval)?;
        write_f32(w, self.total_length)?;
        self.group_payload.write_to(w)?;
        write_vec(w, &self.entity_payloads)
    }

    fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        Ok(Self {
            name: read_string(r)?,
            level: read_string(r)?,
            tags: read_string_set(r)?,
            spawn_transform: Transform::read_from(r)?,
            max_record_time: read_f32(r)?,
            sampling_interval: read_f32(r)?,
            total_length: read_f32(r)?,
            group_payload: UserPayload::read_from(r)?,
            entity_payloads: read_vec(r)?,
        })
    }
}

/// Write size prefix, file header and clip header, back-patching the size prefix.
pub fn write_header_block(
    file_header: &FileHeader,
    clip_header: &ClipSetHeader,
) -> io::Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());

    // Placeholder, patched below
    write_i32(&mut out, 0)?;
    file_header.write_to(&mut out)?;
    clip_header.write_to(&mut out)?;

    let header_size = out.position();
    let header_size = i32::try_from(header_size)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "Clip header exceeds i32 size"))?;
    out.seek(SeekFrom::Start(0))?;
    write_i32(&mut out, header_size)?;

    Ok(out.into_inner())
}

/// Declared header size at the start of `bytes`.
pub fn read_header_size(bytes: &[u8]) -> Result<usize> {
    let Some(prefix) = bytes.get(..4) else {
        return Err(ReplayError::TruncatedFile {
            expected: 4,
            actual: bytes.len(),
        });
    };
    let mut buf = [0u8; 4];
    buf.copy_from_slice(prefix);
    let size = i32::from_le_bytes(buf);
    let size = usize::try_from(size)
        .ok()
        .filter(|&s| s >= 4 + FileHeader::SIZE)
        .ok_or_else(|| ReplayError::InvalidData(format!("Invalid header size {size}")))?;
    Ok(size)
}

/// Parse the header block; `bytes` must hold at least the declared header size.
///
/// Returns the headers and the declared header size. The payload is not touched.
pub fn read_header_block(bytes: &[u8]) -> Result<(FileHeader, ClipSetHeader, usize)> {
    let header_size = read_header_size(bytes)?;
    if bytes.len() < header_size {
        return Err(ReplayError::TruncatedFile {
            expected: header_size,
            actual: bytes.len(),
        });
    }

    let mut r = Cursor::new(&bytes[4..header_size]);
    let file_header = FileHeader::read_from(&mut r).map_err(|e| match e {
        ReplayError::Io(err) => ReplayError::from_read(err, header_size, bytes.len()),
        other => other,
    })?;
    let clip_header = ClipSetHeader::read_from(&mut r)
        .map_err(|e| ReplayError::from_read(e, header_size, bytes.len()))?;

    Ok((file_header, clip_header, header_size))
}
