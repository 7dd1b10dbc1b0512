//! Cooked clips and the clip set that is encoded as one blob.

use std::collections::{BTreeMap, BTreeSet};

use glam::Vec3;
use log::warn;

use super::{ActivityInterval, Sample, Transform};

/// Min/max envelope of positions and scales, used by range-relative quantization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeBounds {
    pub position_min: Vec3,
    pub position_max: Vec3,
    pub scale_min: Vec3,
    pub scale_max: Vec3,
}

impl Default for RangeBounds {
    fn default() -> Self {
        Self {
            position_min: Vec3::ZERO,
            position_max: Vec3::ZERO,
            scale_min: Vec3::ONE,
            scale_max: Vec3::ONE,
        }
    }
}

impl RangeBounds {
    /// Smallest extent used as a quantization divisor.
    pub const MIN_EXTENT: f32 = 1e-4;

    /// Range seeded from a single observed transform.
    pub fn from_transform(t: &Transform) -> Self {
        Self {
            position_min: t.translation,
            position_max: t.translation,
            scale_min: t.scale,
            scale_max: t.scale,
        }
    }

    /// Grow the envelope to include `t`.
    pub fn include(&mut self, t: &Transform) {
        self.position_min = self.position_min.min(t.translation);
        self.position_max = self.position_max.max(t.translation);
        self.scale_min = self.scale_min.min(t.scale);
        self.scale_max = self.scale_max.max(t.scale);
    }

    /// Position extent with degenerate axes clamped to `MIN_EXTENT`.
    pub fn position_extent(&self) -> Vec3 {
        (self.position_max - self.position_min).max(Vec3::splat(Self::MIN_EXTENT))
    }

    /// Scale extent with degenerate axes clamped to `MIN_EXTENT`.
    pub fn scale_extent(&self) -> Vec3 {
        (self.scale_max - self.scale_min).max(Vec3::splat(Self::MIN_EXTENT))
    }
}

/// Global range for sub-part transforms plus one range per bone-set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClipRanges {
    pub global: RangeBounds,
    pub bones: BTreeMap<String, RangeBounds>,
}

/// Cooked recording of one entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Clip {
    /// Root sub-part; its first transform anchors the group spawn point.
    pub primary_part: String,
    /// Activation intervals in clip-relative frame indices.
    pub intervals: Vec<ActivityInterval>,
    /// Filled in by the range accumulator before encoding.
    pub ranges: ClipRanges,
    /// Samples with monotonically increasing timestamps starting near 0.
    pub samples: Vec<Sample>,
}

impl Clip {
    /// Fewer than two samples cannot be interpolated and are never encoded or replayed.
    pub fn is_valid(&self) -> bool {
        self.samples.len() >= 2
    }

    pub fn first_timestamp(&self) -> Option<f32> {
        self.samples.first().map(|s| s.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<f32> {
        self.samples.last().map(|s| s.timestamp)
    }

    /// Time covered by the samples.
    pub fn duration(&self) -> f32 {
        match (self.first_timestamp(), self.last_timestamp()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        }
    }

    /// Transform of the primary part in the first sample.
    pub fn spawn_transform(&self) -> Option<Transform> {
        self.samples
            .first()
            .and_then(|s| s.transforms.get(&self.primary_part))
            .copied()
    }
}

/// Opaque user data: a type name plus its serialized bytes. Empty when unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPayload {
    pub type_name: String,
    pub bytes: Vec<u8>,
}

impl UserPayload {
    pub fn new(type_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            type_name: type_name.into(),
            bytes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.type_name.is_empty()
    }
}

/// Header shared by every clip in a recording session.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipSetHeader {
    pub name: String,
    pub level: String,
    pub tags: BTreeSet<String>,
    /// Where the group is placed on replay.
    pub spawn_transform: Transform,
    pub max_record_time: f32,
    pub sampling_interval: f32,
    /// Playback duration in seconds.
    pub total_length: f32,
    pub group_payload: UserPayload,
    /// One payload per clip, same order as the clips.
    pub entity_payloads: Vec<UserPayload>,
}

impl Default for ClipSetHeader {
    fn default() -> Self {
        Self {
            name: String::new(),
            level: String::new(),
            tags: BTreeSet::new(),
            spawn_transform: Transform::IDENTITY,
            max_record_time: 5.0,
            sampling_interval: 0.1,
            total_length: 0.0,
            group_payload: UserPayload::default(),
            entity_payloads: Vec::new(),
        }
    }
}

impl ClipSetHeader {
    /// True when every tag in `filter` is present.
    pub fn has_tags<'a>(&self, filter: impl IntoIterator<Item = &'a str>) -> bool {
        filter.into_iter().all(|tag| self.tags.contains(tag))
    }
}

/// Header plus all entity clips of one session; the unit of encoding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClipSet {
    pub header: ClipSetHeader,
    pub clips: Vec<Clip>,
}

impl ClipSet {
    pub fn is_valid(&self) -> bool {
        !self.clips.is_empty()
    }

    /// Drop clips with fewer than two samples, along with their entity payloads.
    ///
    /// A non-empty payload list of the wrong length is padded or truncated to
    /// one payload per clip first. Returns the number of clips removed.
    pub fn retain_valid(&mut self) -> usize {
        let before = self.clips.len();
        let payloads = &mut self.header.entity_payloads;
        if !payloads.is_empty() {
            if payloads.len() != before {
                warn!(
                    "{} entity payload(s) for {} clip(s), resizing to match",
                    payloads.len(),
                    before
                );
                payloads.resize(before, UserPayload::default());
            }
            let mut valid = self.clips.iter().map(Clip::is_valid);
            payloads.retain(|_| valid.next().unwrap_or(false));
        }
        self.clips.retain(Clip::is_valid);
        before - self.clips.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_extent_clamped() {
        let range =
            RangeBounds::from_transform(&Transform::from_translation(Vec3::new(1.0, 2.0, 3.0)));
        let extent = range.position_extent();
        assert_eq!(extent, Vec3::splat(RangeBounds::MIN_EXTENT));
        assert_eq!(range.scale_extent(), Vec3::splat(RangeBounds::MIN_EXTENT));
    }

    #[test]
    fn test_range_include() {
        let mut range = RangeBounds::from_transform(&Transform::IDENTITY);
        range.include(&Transform::new(
            Vec3::new(-1.0, 4.0, 0.0),
            glam::Quat::IDENTITY,
            Vec3::new(2.0, 0.5, 1.0),
        ));
        assert_eq!(range.position_min, Vec3::new(-1.0, 0.0, 0.0));
        assert_eq!(range.position_max, Vec3::new(0.0, 4.0, 0.0));
        assert_eq!(range.scale_min, Vec3::new(1.0, 0.5, 1.0));
        assert_eq!(range.scale_max, Vec3::new(2.0, 1.0, 1.0));
    }

    #[test]
    fn test_clip_validity_and_spawn() {
        let mut clip = Clip {
            primary_part: "root".to_string(),
            ..Default::default()
        };
        assert!(!clip.is_valid());
        clip.samples.push(
            Sample::new(0.0, 0).with_transform("root", Transform::from_translation(Vec3::X)),
        );
        clip.samples.push(Sample::new(0.5, 1));
        assert!(clip.is_valid());
        assert_eq!(clip.duration(), 0.5);
        assert_eq!(clip.spawn_transform().map(|t| t.translation), Some(Vec3::X));
    }

    #[test]
    fn test_retain_valid() {
        let valid = Clip {
            samples: vec![Sample::new(0.0, 0), Sample::new(0.1, 1)],
            ..Default::default()
        };
        let mut set = ClipSet {
            clips: vec![Clip::default(), valid.clone()],
            ..Default::default()
        };
        set.header.entity_payloads =
            vec![UserPayload::new("A", vec![1]), UserPayload::new("B", vec![2])];

        assert_eq!(set.retain_valid(), 1);
        assert_eq!(set.clips, vec![valid]);
        assert_eq!(set.header.entity_payloads, vec![UserPayload::new("B", vec![2])]);
    }

    #[test]
    fn test_retain_valid_short_payloads() {
        let valid = Clip {
            samples: vec![Sample::new(0.0, 0), Sample::new(0.1, 1)],
            ..Default::default()
        };
        let mut set = ClipSet {
            clips: vec![valid.clone(), Clip::default(), valid.clone()],
            ..Default::default()
        };
        set.header.entity_payloads =
            vec![UserPayload::new("A", vec![1]), UserPayload::new("B", vec![2])];

        assert_eq!(set.retain_valid(), 1);
        assert_eq!(set.clips.len(), 2);
        assert_eq!(
            set.header.entity_payloads,
            vec![UserPayload::new("A", vec![1]), UserPayload::default()]
        );

        set.header.entity_payloads = vec![UserPayload::new("C", vec![3]); 4];
        assert_eq!(set.retain_valid(), 0);
        assert_eq!(set.header.entity_payloads.len(), 2);
    }

    #[test]
    fn test_header_tags() {
        let mut header = ClipSetHeader::default();
        header.tags.insert("boss".to_string());
        header.tags.insert("death".to_string());
        assert!(header.has_tags(["boss"]));
        assert!(header.has_tags(["boss", "death"]));
        assert!(!header.has_tags(["boss", "victory"]));
    }
}
