//! One tick's pose snapshot for one entity.

use std::collections::BTreeMap;

use super::Transform;

/// Pose snapshot captured at one sampling tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sample {
    /// Seconds since the recording group started (rebased to the clip after cooking).
    pub timestamp: f32,
    /// Monotonic tick counter of the recorder that produced this sample.
    pub frame_index: i32,
    /// World transform per sub-part name.
    pub transforms: BTreeMap<String, Transform>,
    /// Bone-local transforms per skinned sub-part name, in skeleton order.
    pub bones: BTreeMap<String, Vec<Transform>>,
}

impl Sample {
    pub fn new(timestamp: f32, frame_index: i32) -> Self {
        Self {
            timestamp,
            frame_index,
            ..Default::default()
        }
    }

    /// Builder-style helper used by pose sources and tests.
    pub fn with_transform(mut self, name: impl Into<String>, transform: Transform) -> Self {
        self.transforms.insert(name.into(), transform);
        self
    }

    /// Builder-style helper for a skinned sub-part's bone list.
    pub fn with_bones(mut self, name: impl Into<String>, bones: Vec<Transform>) -> Self {
        self.bones.insert(name.into(), bones);
        self
    }
}

/// Poses supplied by the host for one entity at one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoseSnapshot {
    pub transforms: BTreeMap<String, Transform>,
    pub bones: BTreeMap<String, Vec<Transform>>,
}

impl PoseSnapshot {
    /// Stamp the snapshot into an immutable sample.
    pub fn into_sample(self, timestamp: f32, frame_index: i32) -> Sample {
        Sample {
            timestamp,
            frame_index,
            transforms: self.transforms,
            bones: self.bones,
        }
    }
}
