//! Ghostreel - Pose capture, compact clip encoding and interpolated replay.
//!
//! This crate records the poses of animated entities at a fixed sampling
//! interval, packs them into a quantized and compressed binary clip file, and
//! replays them later with per-frame interpolation and sub-part visibility.
//!
//! # Architecture
//!
//! - `pose`: Data model (transforms, samples, activity intervals, clips)
//! - `schema`: Recording, playback and file options
//! - `capture`: Ring buffer, lifecycle tracking, cooking and group windowing
//! - `codec`: Range accumulation, quantization, framing and compression
//! - `playback`: Interval tree and the time-driven clip player
//! - `session`: Record groups, playback sessions and background saves
//!
//! # Example
//!
//! ```rust,no_run
//! use ghostreel::{
//!     pose::{PoseSnapshot, SubPartKind, SubPartMeta, Transform},
//!     schema::{FileOptions, PlaybackOptions, RecordOptions},
//!     session::SessionManager,
//! };
//!
//! let mut sessions = SessionManager::new();
//! let group = sessions.start_recording(1, &RecordOptions::default(), 0.0)?;
//! sessions.notify_attached(1, SubPartMeta::new("body", SubPartKind::StaticMesh));
//!
//! let mut now = 0.0;
//! for _ in 0..30 {
//!     now += 0.1;
//!     let mut poses = PoseSnapshot::default();
//!     poses.transforms.insert("body".to_string(), Transform::IDENTITY);
//!     sessions.tick(0.1, now, &mut |_: &str, _: u64| Some(poses.clone()));
//! }
//!
//! let mut clip_set = sessions.stop_recording(&group, now)?;
//! let bytes = ghostreel::codec::encode_clip_set(&mut clip_set, FileOptions::default())?;
//! let decoded = ghostreel::codec::decode_clip_set(&bytes)?;
//!
//! let id = sessions.start_playback(decoded, PlaybackOptions::default(), now)?;
//! let frames = sessions.tick_playback(id, now + 0.5);
//! println!("{:?}", frames.map(|f| f.len()));
//! # Ok::<(), ghostreel::ReplayError>(())
//! ```

pub mod capture;
pub mod codec;
pub mod error;
pub mod playback;
pub mod pose;
pub mod schema;
pub mod session;

// Re-export commonly used types
pub use error::{ReplayError, Result};
pub use playback::{ClipPlayer, PlaybackFrame};
pub use pose::{Clip, ClipSet, ClipSetHeader, Transform};
pub use schema::{FileOptions, PlaybackOptions, RecordOptions};
pub use session::SessionManager;
