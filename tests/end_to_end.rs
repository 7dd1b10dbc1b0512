//! Capture, cook, encode, decode and replay through the public API.

use glam::{Quat, Vec3};
use tempfile::tempdir;

use ghostreel::{
    codec::{read_clip_file, read_header_from_path, write_clip_file},
    pose::{PoseSnapshot, SubPartKind, SubPartMeta, Transform},
    schema::{CompressionMethod, FileOptions, PlaybackOptions, QuantizationMethod, RecordOptions},
    session::{EntityId, SessionManager},
};

fn poses(entity: EntityId, t: f32, sword: bool) -> PoseSnapshot {
    let mut poses = PoseSnapshot::default();
    let x = entity as f32 * 10.0 + t;
    poses.transforms.insert(
        "body".to_string(),
        Transform::new(Vec3::new(x, 0.0, 0.0), Quat::from_rotation_y(t * 0.5), Vec3::ONE),
    );
    poses.bones.insert(
        "body".to_string(),
        vec![Transform::new(Vec3::Y, Quat::from_rotation_x(t.sin() * 0.3), Vec3::ONE); 3],
    );
    if sword {
        poses
            .transforms
            .insert("sword".to_string(), Transform::from_translation(Vec3::new(x, 1.0, 0.0)));
    }
    poses
}

/// Record two entities for 6s with a 4s window; entity 1 holds a sword from 3s to 4.5s.
fn record() -> ghostreel::ClipSet {
    let options = RecordOptions {
        group: "arena".to_string(),
        max_record_time: 4.0,
        sampling_interval: 0.1,
        tags: ["boss".to_string()].into_iter().collect(),
        ..Default::default()
    };

    let mut sessions = SessionManager::new();
    for entity in [1, 2] {
        sessions.start_recording(entity, &options, 0.0).unwrap();
        sessions.notify_attached(
            entity,
            SubPartMeta::new("body", SubPartKind::SkeletalMesh { leader: None }),
        );
    }
    assert!(sessions.set_main_entity("arena", 1));

    let mut now = 0.0f32;
    let mut sword = false;
    for _ in 0..60 {
        now += 0.1;
        let want = (3.0..4.5).contains(&now);
        if want && !sword {
            sessions.notify_attached(1, SubPartMeta::new("sword", SubPartKind::StaticMesh));
        } else if !want && sword {
            sessions.notify_detached(1, "sword");
        }
        sword = want;
        let t = now;
        sessions.tick(0.1, now, &mut |_: &str, entity: EntityId| {
            Some(poses(entity, t, entity == 1 && sword))
        });
    }

    sessions.stop_recording("arena", now).unwrap()
}

#[test]
fn test_record_cook_window() {
    let set = record();
    assert_eq!(set.clips.len(), 2);
    assert!((set.header.total_length - 4.0).abs() < 1e-4);
    assert!(set.header.has_tags(["boss"]));

    for clip in &set.clips {
        assert!(clip.samples.len() >= 39);
        assert!(clip.samples[0].timestamp.abs() < 1e-6);
        assert!(clip.duration() <= 4.0 + 1e-4);
        for pair in clip.samples.windows(2) {
            assert!(pair[0].timestamp < pair[1].timestamp);
        }
    }

    let runner = &set.clips[0];
    let sword = runner.intervals.iter().find(|i| i.name() == "sword").unwrap();
    assert!(sword.start_frame > 0);
    assert!(sword.end_frame < runner.samples.len() as i32);
    assert!(runner.samples[sword.start_frame as usize].transforms.contains_key("sword"));

    let spawn = set.header.spawn_transform;
    assert_eq!(spawn, runner.spawn_transform().unwrap());
}

#[test]
fn test_file_roundtrip_and_replay() {
    let dir = tempdir().unwrap();

    for quantization in QuantizationMethod::ALL {
        let mut set = record();
        let options = FileOptions {
            compression: CompressionMethod::Gzip,
            quantization,
        };
        let path = dir.path().join(format!("{:?}.ghst", quantization));
        write_clip_file(&path, &mut set, options).unwrap();

        let (file_header, header) = read_header_from_path(&path).unwrap();
        assert_eq!(file_header.options, options);
        assert_eq!(header, set.header);

        let loaded = read_clip_file(&path).unwrap();
        assert_eq!(loaded.clips.len(), set.clips.len());
        for (a, b) in set.clips.iter().zip(&loaded.clips) {
            assert_eq!(a.primary_part, b.primary_part);
            assert_eq!(a.intervals.len(), b.intervals.len());
            for (x, y) in a.intervals.iter().zip(&b.intervals) {
                assert_eq!(x.meta, y.meta);
                assert_eq!((x.start_frame, x.end_frame), (y.start_frame, y.end_frame));
            }
            assert_eq!(a.ranges, b.ranges);
            assert_eq!(a.samples.len(), b.samples.len());

            let tol = match quantization {
                QuantizationMethod::None => 1e-6,
                QuantizationMethod::StandardLow => 0.05,
                _ => 0.01,
            };
            for (x, y) in a.samples.iter().zip(&b.samples) {
                for (name, t) in &x.transforms {
                    let (dt, _, _) = t.max_error(&y.transforms[name]);
                    assert!(dt <= tol, "{quantization:?} {name}: {dt}");
                }
            }
        }

        let mut sessions = SessionManager::new();
        let id = sessions.start_playback(loaded, PlaybackOptions::default(), 0.0).unwrap();

        let mut seen_sword = false;
        let mut lost_sword = false;
        let mut now = 0.0;
        while let Some(frames) = sessions.tick_playback(id, now) {
            for (clip, frame) in frames {
                if clip == 0 {
                    seen_sword |= frame.activated.iter().any(|n| n == "sword");
                    lost_sword |= frame.deactivated.iter().any(|n| n == "sword");
                }
                if !frame.hidden && !frame.finished {
                    assert!(frame.transforms.contains_key("body"));
                    assert_eq!(frame.bone_poses["body"].len(), 3);
                }
            }
            now += 0.05;
            assert!(now < 10.0, "playback never finished");
        }
        assert!(seen_sword && lost_sword);
    }
}
