//! Error type shared by capture, codec and playback.

use std::io;

use crate::schema::ConfigError;

/// Errors produced while cooking, encoding, decoding or replaying clips.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("Not enough samples: need at least 2, found {found}")]
    InsufficientSamples { found: usize },

    #[error("Invalid activity interval: {0}")]
    InvalidInterval(String),

    #[error("Compression failed: {0}")]
    CompressionFailure(String),

    #[error("Decompression failed: {0}")]
    DecompressionFailure(String),

    #[error("Range data unavailable for {0}")]
    RangeUnavailable(String),

    #[error("Truncated file: expected {expected} bytes, found {actual}")]
    TruncatedFile { expected: usize, actual: usize },

    #[error("Unsupported clip file (magic {magic:#010x}, version {version})")]
    RuntimeVersionMismatch { magic: u32, version: u32 },

    #[error("Unknown compression method: {0}")]
    UnknownCompression(u8),

    #[error("Unknown quantization method: {0}")]
    UnknownQuantization(u8),

    #[error("Invalid clip data: {0}")]
    InvalidData(String),

    #[error("No playable entity clip left in the group")]
    EmptyGroup,

    #[error("Unknown record group: {0}")]
    UnknownGroup(String),

    #[error("Entity {entity} is already being recorded in group '{group}'")]
    AlreadyRecording { group: String, entity: u64 },

    #[error("Save worker stopped before delivering a result")]
    WorkerLost,

    #[error("Save result was already taken")]
    ResultTaken,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid options: {0}")]
    Config(#[from] ConfigError),
}

impl ReplayError {
    /// Map a read error to `TruncatedFile` when the stream simply ran out.
    pub(crate) fn from_read(err: io::Error, expected: usize, actual: usize) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            ReplayError::TruncatedFile { expected, actual }
        } else {
            ReplayError::Io(err)
        }
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, ReplayError>;
