//! Capture side: bounded sample buffering, sub-part lifecycle tracking and cooking.
//!
//! An [`EntityRecorder`] pushes one [`Sample`](crate::pose::Sample) per sampling
//! interval into a [`CaptureRing`] and records attach/detach events in a
//! [`LifecycleTracker`]. When recording stops the recorder is consumed and its
//! contents are cooked into a time-rebased [`Clip`](crate::pose::Clip).

mod cook;
mod lifecycle;
mod recorder;
mod ring;

pub use cook::{clip_by_group_window, cook_from_buffer};
pub use lifecycle::LifecycleTracker;
pub use recorder::EntityRecorder;
pub use ring::CaptureRing;
