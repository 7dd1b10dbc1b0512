//! Per-entity recorder driving the capture ring and lifecycle tracker.

use log::{debug, warn};

use super::{CaptureRing, LifecycleTracker, cook_from_buffer};
use crate::error::Result;
use crate::pose::{Clip, PoseSnapshot, SubPartMeta, UserPayload};
use crate::schema::RecordOptions;

/// Records one entity at a fixed sampling interval.
///
/// Usage:
/// ```ignore
/// let mut recorder = EntityRecorder::new(&options, group_start);
/// recorder.attach(SubPartMeta::new("body", SubPartKind::StaticMesh));
/// while running {
///     recorder.tick(dt, now, snapshot_of_entity());
/// }
/// let clip = recorder.finish(clip_start_time)?;
/// ```
#[derive(Debug)]
pub struct EntityRecorder {
    ring: CaptureRing,
    lifecycle: LifecycleTracker,
    sampling_interval: f32,
    track_attachment_changes: bool,
    group_start_time: f32,
    /// Index given to the next recorded sample.
    current_frame: i32,
    time_since_last_sample: f32,
    primary_part: Option<String>,
    user_payload: UserPayload,
}

impl EntityRecorder {
    /// Create a recorder whose timestamps are relative to `group_start_time`.
    pub fn new(options: &RecordOptions, group_start_time: f32) -> Self {
        Self {
            ring: CaptureRing::with_capacity(options.buffer_capacity()),
            lifecycle: LifecycleTracker::new(),
            sampling_interval: options.sampling_interval,
            track_attachment_changes: options.track_attachment_changes,
            group_start_time,
            current_frame: 0,
            time_since_last_sample: 0.0,
            primary_part: None,
            user_payload: UserPayload::default(),
        }
    }

    /// Advance the sampling clock; records `poses` when an interval has elapsed.
    ///
    /// Returns true if a sample was pushed.
    pub fn tick(&mut self, delta: f32, now: f32, poses: PoseSnapshot) -> bool {
        self.time_since_last_sample += delta;
        if self.time_since_last_sample < self.sampling_interval {
            return false;
        }
        self.time_since_last_sample -= self.sampling_interval;

        let sample = poses.into_sample(now - self.group_start_time, self.current_frame);
        self.current_frame += 1;
        self.ring.push(sample);
        true
    }

    /// Register a sub-part as active from the next recorded frame.
    pub fn attach(&mut self, meta: SubPartMeta) {
        if self.primary_part.is_none() {
            self.primary_part = Some(meta.name.clone());
        }
        let name = meta.name.clone();
        if self.lifecycle.open(meta, self.current_frame).is_ok() {
            debug!("Sub-part '{name}' attached at frame {}", self.current_frame);
        }
    }

    /// Mark a sub-part inactive from the current frame on.
    pub fn detach(&mut self, name: &str) {
        if !self.track_attachment_changes {
            return;
        }
        if self.lifecycle.close(name, self.current_frame).is_ok() {
            debug!("Sub-part '{name}' detached at frame {}", self.current_frame);
        }
    }

    /// Override the sub-part used as the entity root.
    pub fn set_primary_part(&mut self, name: impl Into<String>) {
        self.primary_part = Some(name.into());
    }

    pub fn primary_part(&self) -> Option<&str> {
        self.primary_part.as_deref()
    }

    pub fn set_user_payload(&mut self, payload: UserPayload) {
        self.user_payload = payload;
    }

    pub fn user_payload(&self) -> &UserPayload {
        &self.user_payload
    }

    pub fn track_attachment_changes(&self) -> bool {
        self.track_attachment_changes
    }

    /// Number of buffered samples.
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Discard samples with a group-relative timestamp below `cutoff`.
    pub fn prune_older_than(&mut self, cutoff: f32) {
        let mut dropped = 0usize;
        while self.ring.peek_oldest().is_some_and(|s| s.timestamp < cutoff) {
            self.ring.pop_oldest();
            dropped += 1;
        }
        if dropped > 0 {
            let first = self
                .ring
                .peek_oldest()
                .map_or(self.current_frame, |s| s.frame_index);
            self.lifecycle.prune_before(first);
            debug!("Pruned {dropped} samples older than {cutoff}");
        }
    }

    /// Consume the recorder and cook its buffer into a clip.
    pub fn finish(mut self, clip_start_time: f32) -> Result<Clip> {
        let primary_part = match self.primary_part.take() {
            Some(name) => name,
            None => {
                warn!("Recorder has no attached sub-part, using an unnamed primary part");
                String::new()
            }
        };
        let samples = self.ring.drain_all();
        cook_from_buffer(samples, self.lifecycle.into_intervals(), primary_part, clip_start_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReplayError;
    use crate::pose::{SubPartKind, Transform};
    use glam::Vec3;

    fn options() -> RecordOptions {
        RecordOptions {
            max_record_time: 1.0,
            sampling_interval: 0.25,
            ..Default::default()
        }
    }

    fn snapshot(x: f32) -> PoseSnapshot {
        let mut poses = PoseSnapshot::default();
        poses
            .transforms
            .insert("body".to_string(), Transform::from_translation(Vec3::new(x, 0.0, 0.0)));
        poses
    }

    fn run(recorder: &mut EntityRecorder, ticks: usize, start: f32) -> f32 {
        let mut now = start;
        for _ in 0..ticks {
            now += 0.25;
            recorder.tick(0.25, now, snapshot(now));
        }
        now
    }

    #[test]
    fn test_recorder_sampling() {
        let mut recorder = EntityRecorder::new(&options(), 0.0);
        assert!(!recorder.tick(0.1, 0.1, snapshot(0.0)));
        assert!(!recorder.tick(0.1, 0.2, snapshot(0.0)));
        assert!(recorder.tick(0.1, 0.3, snapshot(0.0)));
        assert_eq!(recorder.len(), 1);
    }

    #[test]
    fn test_recorder_bounded() {
        let mut recorder = EntityRecorder::new(&options(), 0.0);
        recorder.attach(SubPartMeta::new("body", SubPartKind::StaticMesh));
        run(&mut recorder, 20, 0.0);
        // ceil(1.0 / 0.25) + 1
        assert_eq!(recorder.len(), 5);

        let clip = recorder.finish(0.0).unwrap();
        assert_eq!(clip.primary_part, "body");
        assert_eq!(clip.samples.len(), 5);
        assert_eq!(clip.intervals.len(), 1);
        assert_eq!((clip.intervals[0].start_frame, clip.intervals[0].end_frame), (0, 5));
    }

    #[test]
    fn test_recorder_detach() {
        let mut recorder = EntityRecorder::new(&options(), 0.0);
        recorder.attach(SubPartMeta::new("body", SubPartKind::StaticMesh));
        recorder.attach(SubPartMeta::new("shield", SubPartKind::StaticMesh));
        let now = run(&mut recorder, 2, 0.0);
        recorder.detach("shield");
        recorder.detach("shield");
        run(&mut recorder, 2, now);

        let clip = recorder.finish(0.0).unwrap();
        let shield = clip
            .intervals
            .iter()
            .find(|i| i.name() == "shield")
            .unwrap();
        assert_eq!((shield.start_frame, shield.end_frame), (0, 2));
    }

    #[test]
    fn test_recorder_prune() {
        let mut recorder = EntityRecorder::new(&options(), 0.0);
        run(&mut recorder, 4, 0.0);
        recorder.prune_older_than(0.6);
        assert_eq!(recorder.len(), 2);
        recorder.prune_older_than(10.0);
        assert!(recorder.is_empty());
    }

    #[test]
    fn test_recorder_finish_requires_two_samples() {
        let mut recorder = EntityRecorder::new(&options(), 0.0);
        run(&mut recorder, 1, 0.0);
        assert!(matches!(
            recorder.finish(0.0),
            Err(ReplayError::InsufficientSamples { found: 1 })
        ));
    }
}
