//! Encoding pipeline and file helpers.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use log::{debug, info, warn};

use super::body::{read_body, write_body};
use super::compress::{compress, decompress};
use super::format::{FileHeader, read_header_block, read_header_size, write_header_block};
use super::range::accumulate_ranges;
use crate::error::{ReplayError, Result};
use crate::pose::{ClipSet, ClipSetHeader};
use crate::schema::FileOptions;

/// Encode a clip set into one blob.
///
/// Clips with fewer than two samples are dropped first and ranges are
/// recomputed, so `clip_set` is modified in place.
pub fn encode_clip_set(clip_set: &mut ClipSet, options: FileOptions) -> Result<Vec<u8>> {
    let dropped = clip_set.retain_valid();
    if dropped > 0 {
        warn!("Skipping {dropped} clip(s) with fewer than 2 samples");
    }
    if !clip_set.is_valid() {
        return Err(ReplayError::EmptyGroup);
    }

    accumulate_ranges(&mut clip_set.clips);
    let body = write_body(&clip_set.clips, options.quantization)?;
    let payload = compress(&body, options.compression)?;

    let file_header = FileHeader {
        options,
        uncompressed_size: body.len() as u64,
    };
    let mut out = write_header_block(&file_header, &clip_set.header)?;
    let header_size = out.len();
    out.extend_from_slice(&payload);

    debug!(
        "Encoded {} clips: header {} bytes, payload {} -> {} bytes ({:?}, {:?})",
        clip_set.clips.len(),
        header_size,
        body.len(),
        payload.len(),
        options.compression,
        options.quantization
    );
    Ok(out)
}

/// Headers plus still-compressed payload of a clip file.
#[derive(Debug, Clone)]
pub struct RawClipFile {
    pub file_header: FileHeader,
    pub clip_header: ClipSetHeader,
    pub payload: Vec<u8>,
}

impl RawClipFile {
    /// Decompress and deserialize the payload.
    pub fn decode(&self) -> Result<ClipSet> {
        let size = usize::try_from(self.file_header.uncompressed_size).map_err(|_| {
            ReplayError::InvalidData(format!(
                "Payload size {} does not fit in memory",
                self.file_header.uncompressed_size
            ))
        })?;
        let body = decompress(&self.payload, size, self.file_header.options.compression)?;
        let clips = read_body(&body, self.file_header.options.quantization)?;
        Ok(ClipSet {
            header: self.clip_header.clone(),
            clips,
        })
    }
}

/// Split a blob into headers and payload without decompressing.
pub fn read_raw(bytes: &[u8]) -> Result<RawClipFile> {
    let (file_header, clip_header, header_size) = read_header_block(bytes)?;
    Ok(RawClipFile {
        file_header,
        clip_header,
        payload: bytes[header_size..].to_vec(),
    })
}

/// Decode a blob produced by [`encode_clip_set`].
pub fn decode_clip_set(bytes: &[u8]) -> Result<ClipSet> {
    read_raw(bytes)?.decode()
}

/// Read only the headers of a blob.
pub fn read_header(bytes: &[u8]) -> Result<(FileHeader, ClipSetHeader)> {
    let (file_header, clip_header, _) = read_header_block(bytes)?;
    Ok((file_header, clip_header))
}

/// Encode and write a clip set to `path`.
pub fn write_clip_file<P: AsRef<Path>>(
    path: P,
    clip_set: &mut ClipSet,
    options: FileOptions,
) -> Result<usize> {
    let bytes = encode_clip_set(clip_set, options)?;
    write_encoded(path, &bytes)?;
    Ok(bytes.len())
}

/// Write an already encoded blob to `path`, creating parent directories.
pub fn write_encoded<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    writer.write_all(bytes)?;
    writer.flush()?;
    info!("Saved clip file {} ({} bytes)", path.as_ref().display(), bytes.len());
    Ok(())
}

/// Read and decode a whole clip file.
pub fn read_clip_file<P: AsRef<Path>>(path: P) -> Result<ClipSet> {
    let bytes = std::fs::read(path.as_ref())?;
    decode_clip_set(&bytes)
}

/// Read a clip file's headers without loading the payload.
pub fn read_header_from_path<P: AsRef<Path>>(path: P) -> Result<(FileHeader, ClipSetHeader)> {
    let file = File::open(path.as_ref())?;
    let file_len = file.metadata()?.len();
    let mut reader = BufReader::new(file);

    let mut prefix = [0u8; 4];
    let read = read_fully(&mut reader, &mut prefix)?;
    let header_size = read_header_size(&prefix[..read])?;
    if header_size as u64 > file_len {
        return Err(ReplayError::TruncatedFile {
            expected: header_size,
            actual: file_len as usize,
        });
    }

    let mut block = vec![0u8; header_size];
    block[..4].copy_from_slice(&prefix);
    let read = read_fully(&mut reader, &mut block[4..])?;
    read_header(&block[..4 + read])
}

/// Fill `buf` as far as the stream allows; returns bytes read.
fn read_fully<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{
        ActivityInterval, Clip, Sample, SubPartKind, SubPartMeta, Transform, UserPayload,
    };
    use crate::schema::{CompressionMethod, QuantizationMethod};
    use glam::{Quat, Vec3};
    use tempfile::tempdir;

    fn clip_set() -> ClipSet {
        let samples: Vec<Sample> = (0..10)
            .map(|i| {
                let f = i as f32;
                Sample::new(f * 0.1, i).with_transform(
                    "root",
                    Transform::new(
                        Vec3::new(f, 1.0, 0.0),
                        Quat::from_rotation_y(0.1 * f),
                        Vec3::ONE,
                    ),
                )
            })
            .collect();
        let clip = Clip {
            primary_part: "root".to_string(),
            intervals: vec![ActivityInterval::new(
                SubPartMeta::new("root", SubPartKind::StaticMesh),
                0,
                10,
            )],
            samples,
            ..Default::default()
        };
        let mut set = ClipSet {
            clips: vec![clip],
            ..Default::default()
        };
        set.header.name = "run".to_string();
        set.header.total_length = 0.9;
        set.header.entity_payloads = vec![UserPayload::new("Hp", vec![100])];
        set
    }

    #[test]
    fn test_encode_decode_all_options() {
        for compression in CompressionMethod::ALL {
            if compression == CompressionMethod::Lz4 && !cfg!(feature = "lz4") {
                continue;
            }
            for quantization in QuantizationMethod::ALL {
                let options = FileOptions {
                    compression,
                    quantization,
                };
                let mut set = clip_set();
                let bytes = encode_clip_set(&mut set, options).unwrap();
                let decoded = decode_clip_set(&bytes).unwrap();

                assert_eq!(decoded.header, set.header);
                assert_eq!(decoded.clips.len(), 1);
                assert_eq!(decoded.clips[0].intervals, set.clips[0].intervals);
                assert_eq!(decoded.clips[0].ranges, set.clips[0].ranges);
                let last = &decoded.clips[0].samples[9].transforms["root"];
                assert!((last.translation.x - 9.0).abs() < 0.01, "{options:?}");
            }
        }
    }

    #[test]
    fn test_empty_set_rejected() {
        let mut set = clip_set();
        set.clips[0].samples.truncate(1);
        assert!(matches!(
            encode_clip_set(&mut set, FileOptions::default()),
            Err(ReplayError::EmptyGroup)
        ));
        assert!(set.header.entity_payloads.is_empty());
    }

    #[test]
    fn test_header_only_read() {
        let mut set = clip_set();
        let bytes = encode_clip_set(&mut set, FileOptions::default()).unwrap();
        let (file_header, clip_header, header_size) = read_header_block(&bytes).unwrap();

        // Header parses even when the payload is missing entirely.
        let (fh, ch) = read_header(&bytes[..header_size]).unwrap();
        assert_eq!(fh, file_header);
        assert_eq!(ch, clip_header);
        assert_eq!(ch.name, "run");
    }

    #[test]
    fn test_truncated_payload() {
        let mut set = clip_set();
        let options = FileOptions {
            compression: CompressionMethod::None,
            quantization: QuantizationMethod::StandardHigh,
        };
        let bytes = encode_clip_set(&mut set, options).unwrap();
        let err = decode_clip_set(&bytes[..bytes.len() - 8]).unwrap_err();
        assert!(matches!(err, ReplayError::TruncatedFile { .. }));

        let mut raw = read_raw(&bytes).unwrap();
        raw.payload.truncate(raw.payload.len() - 8);
        raw.file_header.uncompressed_size = raw.payload.len() as u64;
        assert!(matches!(raw.decode(), Err(ReplayError::TruncatedFile { .. })));
    }

    #[test]
    fn test_corrupt_magic() {
        let mut set = clip_set();
        let mut bytes = encode_clip_set(&mut set, FileOptions::default()).unwrap();
        bytes[4] ^= 0xFF;
        assert!(matches!(
            decode_clip_set(&bytes),
            Err(ReplayError::RuntimeVersionMismatch { .. })
        ));
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("run.ghst");

        let mut set = clip_set();
        let written = write_clip_file(&path, &mut set, FileOptions::default()).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len() as usize, written);

        let (_, header) = read_header_from_path(&path).unwrap();
        assert_eq!(header, set.header);

        let loaded = read_clip_file(&path).unwrap();
        assert_eq!(loaded.clips.len(), 1);
        assert_eq!(loaded.clips[0].samples.len(), 10);
    }

    #[test]
    fn test_header_from_short_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("short.ghst");
        std::fs::write(&path, [1u8, 0]).unwrap();
        assert!(matches!(
            read_header_from_path(&path),
            Err(ReplayError::TruncatedFile { expected: 4, actual: 2 })
        ));
    }

    #[test]
    fn test_header_size_beyond_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("huge.ghst");
        std::fs::write(&path, i32::MAX.to_le_bytes()).unwrap();
        assert!(matches!(
            read_header_from_path(&path),
            Err(ReplayError::TruncatedFile {
                expected: 2_147_483_647,
                actual: 4
            })
        ));
    }
}
