//! Clip set encoding: range accumulation, transform quantization, binary framing
//! and payload compression.
//!
//! # File Format
//!
//! ```text
//! i32    header_byte_size
//! FileHeader (18 bytes): magic "GHST", version, compression, quantization, uncompressed size
//! ClipSetHeader: name, level, tags, spawn transform, timing, user payloads
//! Payload (compressed):
//!   i32 entity_count
//!   per entity: primary part, intervals, global range, bone ranges,
//!               i32 frame_count, frames of quantized transforms
//! ```

mod body;
mod compress;
mod file;
mod format;
mod quantize;
mod range;
mod wire;

pub use compress::{compress, decompress};
pub use file::{
    RawClipFile, decode_clip_set, encode_clip_set, read_clip_file, read_header,
    read_header_from_path, read_raw, write_clip_file, write_encoded,
};
pub use format::{CLIP_MAGIC, CLIP_VERSION, FileHeader};
pub use quantize::{
    HighTransform, LowTransform, MediumTransform, decode_transform, encode_transform, encoded_size,
};
pub use range::{accumulate_ranges, compute_ranges};
pub use wire::WireFormat;
