//! Session layer: record groups, playback sessions and background saves.
//!
//! A [`SessionManager`] is constructed and owned by the host. It drives one
//! [`EntityRecorder`](crate::capture::EntityRecorder) per recorded entity,
//! cooks whole groups into [`ClipSet`](crate::pose::ClipSet)s, and runs a
//! [`ClipPlayer`](crate::playback::ClipPlayer) per replayed clip. Encoding a
//! cooked set can be moved off the calling thread with [`SaveTask`].

mod manager;
mod save_task;

pub use manager::{DEFAULT_GROUP, EntityId, PlaybackId, PoseSource, SessionManager};
pub use save_task::{SaveSink, SaveTask, SavedClip};
