//! Schema module - Option types for recording, playback and clip files.

mod options;

pub use options::*;
