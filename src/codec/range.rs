//! Per-clip position/scale envelopes used by range-relative quantization.

use std::collections::btree_map::Entry;

use rayon::prelude::*;

use crate::pose::{Clip, ClipRanges, RangeBounds};

/// Compute the global and per-bone-set ranges of one clip.
///
/// Each range is seeded from the first value it sees so that zero does not
/// leak into the envelope.
pub fn compute_ranges(clip: &Clip) -> ClipRanges {
    let mut global: Option<RangeBounds> = None;
    let mut ranges = ClipRanges::default();

    for sample in &clip.samples {
        for t in sample.transforms.values() {
            match &mut global {
                Some(range) => range.include(t),
                None => global = Some(RangeBounds::from_transform(t)),
            }
        }
        for (name, bones) in &sample.bones {
            let mut iter = bones.iter();
            let Some(first) = iter.next() else {
                continue;
            };
            let range = match ranges.bones.entry(name.clone()) {
                Entry::Occupied(e) => {
                    let range = e.into_mut();
                    range.include(first);
                    range
                }
                Entry::Vacant(e) => e.insert(RangeBounds::from_transform(first)),
            };
            for t in iter {
                range.include(t);
            }
        }
    }

    ranges.global = global.unwrap_or_default();
    ranges
}

/// Fill in `ranges` on every clip, one clip per rayon task.
pub fn accumulate_ranges(clips: &mut [Clip]) {
    clips.par_iter_mut().for_each(|clip| {
        clip.ranges = compute_ranges(clip);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{Sample, Transform};
    use glam::{Quat, Vec3};

    fn at(x: f32, y: f32, s: f32) -> Transform {
        Transform::new(Vec3::new(x, y, 0.0), Quat::IDENTITY, Vec3::splat(s))
    }

    #[test]
    fn test_global_range_seeded_from_data() {
        let clip = Clip {
            samples: vec![
                Sample::new(0.0, 0).with_transform("a", at(5.0, 6.0, 2.0)),
                Sample::new(0.1, 1).with_transform("a", at(7.0, 5.5, 3.0)),
            ],
            ..Default::default()
        };
        let ranges = compute_ranges(&clip);
        assert_eq!(ranges.global.position_min, Vec3::new(5.0, 5.5, 0.0));
        assert_eq!(ranges.global.position_max, Vec3::new(7.0, 6.0, 0.0));
        assert_eq!(ranges.global.scale_min, Vec3::splat(2.0));
        assert_eq!(ranges.global.scale_max, Vec3::splat(3.0));
        assert!(ranges.bones.is_empty());
    }

    #[test]
    fn test_bone_ranges_per_set() {
        let clip = Clip {
            samples: vec![
                Sample::new(0.0, 0)
                    .with_bones("body", vec![at(1.0, 1.0, 1.0), at(-1.0, 2.0, 1.0)])
                    .with_bones("cape", vec![at(10.0, 10.0, 1.0)])
                    .with_bones("empty", Vec::new()),
                Sample::new(0.1, 1).with_bones("body", vec![at(0.0, 4.0, 0.5)]),
            ],
            ..Default::default()
        };
        let ranges = compute_ranges(&clip);
        let body = ranges.bones["body"];
        assert_eq!(body.position_min, Vec3::new(-1.0, 1.0, 0.0));
        assert_eq!(body.position_max, Vec3::new(1.0, 4.0, 0.0));
        assert_eq!(body.scale_min, Vec3::splat(0.5));
        assert_eq!(ranges.bones["cape"].position_min, Vec3::new(10.0, 10.0, 0.0));
        assert!(!ranges.bones.contains_key("empty"));
        // No sub-part transforms: default range.
        assert_eq!(ranges.global, RangeBounds::default());
    }

    #[test]
    fn test_accumulate_all() {
        let mut clips = vec![
            Clip {
                samples: vec![Sample::new(0.0, 0).with_transform("a", at(1.0, 0.0, 1.0))],
                ..Default::default()
            },
            Clip {
                samples: vec![Sample::new(0.0, 0).with_transform("b", at(-3.0, 0.0, 1.0))],
                ..Default::default()
            },
        ];
        accumulate_ranges(&mut clips);
        assert_eq!(clips[0].ranges.global.position_min.x, 1.0);
        assert_eq!(clips[1].ranges.global.position_max.x, -3.0);
    }
}
