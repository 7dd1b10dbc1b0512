//! Turning buffered samples and lifecycle intervals into normalized clips.

use log::{debug, warn};

use crate::error::{ReplayError, Result};
use crate::pose::{ActivityInterval, Clip, OPEN_END, Sample};

/// Build a clip from drained samples and the entity's recorded intervals.
///
/// Samples earlier than `clip_start_time` are dropped and the rest are
/// re-based so the window starts at zero. Interval frame numbers are remapped
/// to indices into the kept samples.
pub fn cook_from_buffer(
    samples: Vec<Sample>,
    mut intervals: Vec<ActivityInterval>,
    primary_part: String,
    clip_start_time: f32,
) -> Result<Clip> {
    let mut kept = Vec::with_capacity(samples.len());
    for mut sample in samples {
        sample.timestamp -= clip_start_time;
        if sample.timestamp < 0.0 {
            continue;
        }
        kept.push(sample);
    }

    if kept.len() < 2 {
        warn!("Not enough samples to interpolate ({})", kept.len());
        return Err(ReplayError::InsufficientSamples { found: kept.len() });
    }

    let first_frame = kept[0].frame_index;
    let num_kept = kept.len() as i32;

    intervals.sort_by_key(|i| i.end_frame);
    let start = intervals.partition_point(|i| i.end_frame <= first_frame);

    let intervals = intervals
        .drain(start..)
        .map(|mut interval| {
            interval.start_frame = (interval.start_frame - first_frame).max(0);
            interval.end_frame = if interval.end_frame == OPEN_END {
                num_kept
            } else {
                (interval.end_frame - first_frame).min(num_kept)
            };
            debug!(
                "Cooked interval '{}' [{}, {})",
                interval.name(),
                interval.start_frame,
                interval.end_frame
            );
            interval
        })
        .collect();

    Ok(Clip {
        primary_part,
        intervals,
        ranges: Default::default(),
        samples: kept,
    })
}

/// Trim every clip of a group to the last `max_group_duration` seconds.
///
/// Clips must share one time base. Each surviving clip is re-based to its first
/// kept sample; clips with no sample inside the window are emptied.
pub fn clip_by_group_window(clips: &mut [Clip], max_group_duration: f32) {
    let mut group_start = f32::MAX;
    let mut group_end = f32::MIN;
    for clip in clips.iter() {
        if let (Some(first), Some(last)) = (clip.first_timestamp(), clip.last_timestamp()) {
            group_start = group_start.min(first);
            group_end = group_end.max(last);
        }
    }
    if group_start > group_end {
        warn!("Group window requested for a group without samples");
        return;
    }

    let window_start = group_start.max(group_end - max_group_duration);
    debug!("Group window [{window_start}, {group_end}]");

    for clip in clips.iter_mut() {
        window_clip(clip, window_start, group_end);
    }
}

fn window_clip(clip: &mut Clip, window_start: f32, window_end: f32) {
    let (Some(first), Some(last)) = (clip.first_timestamp(), clip.last_timestamp()) else {
        clip.intervals.clear();
        return;
    };
    if last < window_start || first > window_end {
        clip.samples.clear();
        clip.intervals.clear();
        return;
    }

    let len = clip.samples.len();
    let start_idx = clip.samples.partition_point(|s| s.timestamp < window_start);
    let end_idx = clip
        .samples
        .partition_point(|s| s.timestamp <= window_end)
        .saturating_sub(1);
    let start_idx = start_idx.min(len - 1);
    let end_idx = end_idx.min(len - 1);
    if start_idx > end_idx {
        clip.samples.clear();
        clip.intervals.clear();
        return;
    }

    let new_count = (end_idx - start_idx + 1) as i32;
    let mut old_to_new = vec![-1i32; len];
    for (old, slot) in old_to_new.iter_mut().enumerate().take(end_idx + 1).skip(start_idx) {
        *slot = (old - start_idx) as i32;
    }

    let mut samples: Vec<Sample> = clip.samples.drain(start_idx..=end_idx).collect();
    let zero = samples[0].timestamp;
    for sample in &mut samples {
        sample.timestamp -= zero;
    }
    clip.samples = samples;

    let len = len as i32;
    clip.intervals.retain_mut(|interval| {
        let mapped = |o: i32| old_to_new[o as usize];

        let lo = interval.start_frame.max(0);
        let hi = interval.end_frame.min(len);
        let Some(s) = (lo..hi).map(mapped).find(|&n| n != -1) else {
            return false;
        };
        let Some(e) = (lo..hi).rev().map(mapped).find(|&n| n != -1).map(|n| n + 1) else {
            return false;
        };
        if e <= s {
            return false;
        }
        interval.start_frame = s.clamp(0, new_count);
        interval.end_frame = e.clamp(0, new_count);
        true
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{SubPartKind, SubPartMeta};

    fn samples(timestamps: &[f32], first_frame: i32) -> Vec<Sample> {
        timestamps
            .iter()
            .enumerate()
            .map(|(i, &t)| Sample::new(t, first_frame + i as i32))
            .collect()
    }

    fn interval(name: &str, start: i32, end: i32) -> ActivityInterval {
        ActivityInterval::new(SubPartMeta::new(name, SubPartKind::StaticMesh), start, end)
    }

    fn clip_spanning(from: i32, to: i32) -> Clip {
        let timestamps: Vec<f32> = (from..=to).map(|t| t as f32).collect();
        Clip {
            primary_part: "root".to_string(),
            samples: samples(&timestamps, 0),
            ..Default::default()
        }
    }

    #[test]
    fn test_cook_drops_before_start() {
        let raw = samples(&[0.0, 1.0, 2.0, 3.0, 4.0], 0);
        let clip = cook_from_buffer(raw, Vec::new(), "root".into(), 1.0).unwrap();
        assert_eq!(clip.samples.len(), 4);
        assert_eq!(clip.samples[0].timestamp, 0.0);
        assert_eq!(clip.samples[3].timestamp, 3.0);
    }

    #[test]
    fn test_cook_insufficient() {
        let raw = samples(&[0.0, 1.0, 2.0], 0);
        let err = cook_from_buffer(raw, Vec::new(), "root".into(), 1.5).unwrap_err();
        assert!(matches!(err, ReplayError::InsufficientSamples { found: 1 }));
    }

    #[test]
    fn test_cook_remaps_intervals() {
        // Buffer wrapped: frames 10..=15 survive.
        let raw = samples(&[1.0, 1.1, 1.2, 1.3, 1.4, 1.5], 10);
        let intervals = vec![
            ActivityInterval::open(SubPartMeta::new("body", SubPartKind::StaticMesh), 0),
            interval("gone", 2, 8),
            interval("hat", 12, 14),
            interval("edge", 4, 10),
            interval("late", 13, 40),
        ];
        let clip = cook_from_buffer(raw, intervals, "body".into(), 0.0).unwrap();

        let spans: Vec<(&str, i32, i32)> = clip
            .intervals
            .iter()
            .map(|i| (i.name(), i.start_frame, i.end_frame))
            .collect();
        assert!(spans.contains(&("hat", 2, 4)));
        assert!(spans.contains(&("late", 3, 6)));
        assert!(spans.contains(&("body", 0, 6)));
        assert!(!spans.iter().any(|s| s.0 == "gone" || s.0 == "edge"));
    }

    #[test]
    fn test_group_window() {
        let mut clips = vec![clip_spanning(0, 10), clip_spanning(5, 10)];
        clips[0].intervals.push(interval("a", 0, 11));
        clips[0].intervals.push(interval("early", 1, 4));
        clips[1].intervals.push(interval("b", 2, 6));

        clip_by_group_window(&mut clips, 3.0);

        let a = &clips[0];
        assert_eq!(a.samples.len(), 4);
        assert_eq!(a.samples[0].timestamp, 0.0);
        assert_eq!(a.samples[3].timestamp, 3.0);
        assert_eq!(a.samples[0].frame_index, 7);
        assert_eq!(a.intervals.len(), 1);
        assert_eq!((a.intervals[0].start_frame, a.intervals[0].end_frame), (0, 4));

        let b = &clips[1];
        assert_eq!(b.samples.len(), 4);
        assert_eq!(b.samples[0].frame_index, 2);
        assert_eq!((b.intervals[0].start_frame, b.intervals[0].end_frame), (0, 4));
    }

    #[test]
    fn test_group_window_keeps_short_group() {
        let mut clips = vec![clip_spanning(0, 2)];
        clip_by_group_window(&mut clips, 10.0);
        assert_eq!(clips[0].samples.len(), 3);
        assert_eq!(clips[0].duration(), 2.0);
    }

    #[test]
    fn test_group_window_drops_disjoint() {
        let mut clips = vec![clip_spanning(0, 2), clip_spanning(8, 10)];
        clips[0].intervals.push(interval("a", 0, 3));
        clip_by_group_window(&mut clips, 2.0);
        assert!(clips[0].samples.is_empty());
        assert!(clips[0].intervals.is_empty());
        assert_eq!(clips[1].samples.len(), 3);
    }
}
