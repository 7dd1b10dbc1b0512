//! Payload compression keyed by [`CompressionMethod`].

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::{GzEncoder, ZlibEncoder};

use crate::error::{ReplayError, Result};
use crate::schema::CompressionMethod;

/// Compress `data` with `method`. `None` copies the input.
pub fn compress(data: &[u8], method: CompressionMethod) -> Result<Vec<u8>> {
    let failed = |e: std::io::Error| ReplayError::CompressionFailure(format!("{method:?}: {e}"));
    match method {
        CompressionMethod::None => Ok(data.to_vec()),
        CompressionMethod::Zlib => {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(data).map_err(failed)?;
            encoder.finish().map_err(failed)
        }
        CompressionMethod::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(data).map_err(failed)?;
            encoder.finish().map_err(failed)
        }
        CompressionMethod::Lz4 => compress_lz4(data),
    }
}

/// Inverse of [`compress`]; the output must be exactly `expected_size` bytes.
///
/// `None` copies the input as-is; a short copy is caught by the body parser.
pub fn decompress(
    data: &[u8],
    expected_size: usize,
    method: CompressionMethod,
) -> Result<Vec<u8>> {
    let out = match method {
        CompressionMethod::None => return Ok(data.to_vec()),
        CompressionMethod::Zlib => read_bounded(ZlibDecoder::new(data), expected_size, method)?,
        CompressionMethod::Gzip => read_bounded(GzDecoder::new(data), expected_size, method)?,
        CompressionMethod::Lz4 => decompress_lz4(data, expected_size)?,
    };
    if out.len() != expected_size {
        return Err(ReplayError::DecompressionFailure(format!(
            "{method:?}: expected {expected_size} bytes, got {}",
            out.len()
        )));
    }
    Ok(out)
}

/// Read at most one byte past `expected_size` so an oversized stream is detected without
/// inflating it fully.
fn read_bounded<R: Read>(
    decoder: R,
    expected_size: usize,
    method: CompressionMethod,
) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(expected_size.min(64 << 20));
    decoder
        .take(expected_size as u64 + 1)
        .read_to_end(&mut out)
        .map_err(|e| ReplayError::DecompressionFailure(format!("{method:?}: {e}")))?;
    Ok(out)
}

#[cfg(feature = "lz4")]
fn compress_lz4(data: &[u8]) -> Result<Vec<u8>> {
    if data.is_empty() {
        return Ok(Vec::new());
    }
    Ok(lz4_flex::block::compress(data))
}

#[cfg(feature = "lz4")]
fn decompress_lz4(data: &[u8], expected_size: usize) -> Result<Vec<u8>> {
    if expected_size == 0 && data.is_empty() {
        return Ok(Vec::new());
    }
    lz4_flex::block::decompress(data, expected_size)
        .map_err(|e| ReplayError::DecompressionFailure(format!("Lz4: {e}")))
}

#[cfg(not(feature = "lz4"))]
fn compress_lz4(_data: &[u8]) -> Result<Vec<u8>> {
    Err(ReplayError::CompressionFailure(
        "LZ4 support not compiled in (enable the `lz4` feature)".into(),
    ))
}

#[cfg(not(feature = "lz4"))]
fn decompress_lz4(_data: &[u8], _expected_size: usize) -> Result<Vec<u8>> {
    Err(ReplayError::DecompressionFailure(
        "LZ4 support not compiled in (enable the `lz4` feature)".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn supported() -> Vec<CompressionMethod> {
        CompressionMethod::ALL
            .into_iter()
            .filter(|m| cfg!(feature = "lz4") || *m != CompressionMethod::Lz4)
            .collect()
    }

    #[test]
    fn test_roundtrip_sizes() {
        let large: Vec<u8> = (0..(1usize << 20) + 4096)
            .map(|i| ((i * 31) ^ (i >> 7)) as u8)
            .collect();
        let inputs: [&[u8]; 3] = [&[], &[42], &large];

        for method in supported() {
            for input in inputs {
                let packed = compress(input, method).unwrap();
                let unpacked = decompress(&packed, input.len(), method).unwrap();
                assert_eq!(unpacked, input, "{method:?} with {} bytes", input.len());
            }
        }
    }

    #[test]
    fn test_compresses_repetitive_data() {
        let data = b"pose pose pose pose ".repeat(500);
        for method in supported() {
            if method == CompressionMethod::None {
                continue;
            }
            let packed = compress(&data, method).unwrap();
            assert!(packed.len() < data.len() / 4, "{method:?}");
        }
    }

    #[test]
    fn test_size_mismatch() {
        let data = b"hello hello hello".to_vec();
        let packed = compress(&data, CompressionMethod::Zlib).unwrap();
        let err = decompress(&packed, data.len() - 1, CompressionMethod::Zlib).unwrap_err();
        assert!(matches!(err, ReplayError::DecompressionFailure(_)));
    }

    #[test]
    fn test_none_is_passthrough() {
        let short = decompress(&[1, 2, 3], 5, CompressionMethod::None).unwrap();
        assert_eq!(short, vec![1, 2, 3]);
        assert!(decompress(&[], 0, CompressionMethod::None).unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_stream() {
        let garbage = [0xFFu8; 32];
        for method in [CompressionMethod::Zlib, CompressionMethod::Gzip] {
            assert!(matches!(
                decompress(&garbage, 100, method),
                Err(ReplayError::DecompressionFailure(_))
            ));
        }
    }
}
