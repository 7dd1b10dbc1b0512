//! Option types for recording, playback and clip files.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

/// Compression applied to the clip payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum CompressionMethod {
    /// Payload stored as-is.
    None = 0,
    /// zlib stream (RFC 1950).
    #[default]
    Zlib = 1,
    /// gzip stream (RFC 1952).
    Gzip = 2,
    /// LZ4 block format.
    Lz4 = 3,
}

impl CompressionMethod {
    /// All methods, in wire order.
    pub const ALL: [CompressionMethod; 4] = [
        CompressionMethod::None,
        CompressionMethod::Zlib,
        CompressionMethod::Gzip,
        CompressionMethod::Lz4,
    ];

    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(CompressionMethod::None),
            1 => Some(CompressionMethod::Zlib),
            2 => Some(CompressionMethod::Gzip),
            3 => Some(CompressionMethod::Lz4),
            _ => None,
        }
    }
}

/// Precision tier used for every transform in a clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum QuantizationMethod {
    /// Full f32 precision.
    None = 0,
    /// 0.01 position, 48-bit rotation, 0.1 scale.
    StandardHigh = 1,
    /// 0.01 position, 32-bit rotation, 0.1 scale.
    #[default]
    StandardMedium = 2,
    /// Range-relative position/scale, 32-bit rotation.
    StandardLow = 3,
}

impl QuantizationMethod {
    /// All tiers, in wire order.
    pub const ALL: [QuantizationMethod; 4] = [
        QuantizationMethod::None,
        QuantizationMethod::StandardHigh,
        QuantizationMethod::StandardMedium,
        QuantizationMethod::StandardLow,
    ];

    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(QuantizationMethod::None),
            1 => Some(QuantizationMethod::StandardHigh),
            2 => Some(QuantizationMethod::StandardMedium),
            3 => Some(QuantizationMethod::StandardLow),
            _ => None,
        }
    }

    /// Whether this tier needs per-clip range bounds.
    #[inline]
    pub fn needs_range(self) -> bool {
        self == QuantizationMethod::StandardLow
    }
}

/// Options stored in every clip file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileOptions {
    /// Payload compression.
    #[serde(default)]
    pub compression: CompressionMethod,
    /// Transform quantization tier.
    #[serde(default)]
    pub quantization: QuantizationMethod,
}

/// Recording options for one group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordOptions {
    /// Group every recorded entity is added to. Empty means the default group.
    #[serde(default)]
    pub group: String,
    /// Output file name without extension. Empty means "{group}-{timestamp}".
    #[serde(default)]
    pub file_name: String,
    /// Tags stored in the clip header for filtering.
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Maximum clip duration in seconds.
    pub max_record_time: f32,
    /// Seconds between two samples.
    pub sampling_interval: f32,
    /// Whether sub-part attach/detach notifications are honoured.
    #[serde(default = "default_true")]
    pub track_attachment_changes: bool,
    /// Stop and save the group once its last active entity stops.
    #[serde(default)]
    pub save_immediately_if_group_empty: bool,
}

impl Default for RecordOptions {
    fn default() -> Self {
        Self {
            group: String::new(),
            file_name: String::new(),
            tags: BTreeSet::new(),
            max_record_time: 5.0,
            sampling_interval: 0.1,
            track_attachment_changes: true,
            save_immediately_if_group_empty: false,
        }
    }
}

impl RecordOptions {
    /// Ring buffer capacity: one slot per sampling interval plus one, at least 2.
    pub fn buffer_capacity(&self) -> usize {
        let frames = (self.max_record_time / self.sampling_interval).ceil();
        let frames = if frames.is_finite() && frames > 0.0 {
            frames as usize
        } else {
            0
        };
        (frames + 1).max(2)
    }

    /// Validate recording parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.sampling_interval.is_finite() || self.sampling_interval <= 0.0 {
            return Err(ConfigError::InvalidSamplingInterval(self.sampling_interval));
        }
        if !self.max_record_time.is_finite() || self.max_record_time <= 0.0 {
            return Err(ConfigError::InvalidRecordTime(self.max_record_time));
        }
        Ok(())
    }
}

/// Playback options for one replay session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PlaybackOptions {
    /// Playback speed ratio (1.0 = real time, negative plays in reverse).
    pub playback_rate: f32,
    /// Wrap around at the end instead of finishing.
    #[serde(default)]
    pub looping: bool,
    /// Hint for the host renderer to swap in a ghost material.
    #[serde(default = "default_true")]
    pub use_ghost_material: bool,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            playback_rate: 1.0,
            looping: false,
            use_ghost_material: true,
        }
    }
}

impl PlaybackOptions {
    /// Validate playback parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.playback_rate.is_finite() || self.playback_rate == 0.0 {
            return Err(ConfigError::InvalidPlaybackRate(self.playback_rate));
        }
        Ok(())
    }
}

/// Option validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Sampling interval must be positive, got {0}")]
    InvalidSamplingInterval(f32),
    #[error("Max record time must be positive, got {0}")]
    InvalidRecordTime(f32),
    #[error("Playback rate must be finite and non-zero, got {0}")]
    InvalidPlaybackRate(f32),
}
