//! Ghostreel CLI - Record synthetic clips, inspect and replay clip files.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::f32::consts::TAU;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use glam::{Quat, Vec3};
use rand::prelude::*;
use serde::{Deserialize, Serialize};

use ghostreel::{
    codec::{read_clip_file, read_header_from_path, write_clip_file},
    pose::{PoseSnapshot, SubPartKind, SubPartMeta, Transform},
    schema::{FileOptions, PlaybackOptions, RecordOptions},
    session::{EntityId, SessionManager},
};

/// Options for the `demo` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DemoConfig {
    record: RecordOptions,
    #[serde(default)]
    file: FileOptions,
    /// Seconds of simulated time to record.
    duration: f32,
    /// Host ticks per second.
    tick_rate: f32,
    #[serde(default)]
    random_seed: Option<u64>,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            record: RecordOptions {
                group: "demo".to_string(),
                ..Default::default()
            },
            file: FileOptions::default(),
            duration: 8.0,
            tick_rate: 60.0,
            random_seed: None,
        }
    }
}

/// Parametric motion for one synthetic entity.
struct Walker {
    origin: Vec3,
    radius: f32,
    speed: f32,
    phase: f32,
}

impl Walker {
    fn random(rng: &mut StdRng) -> Self {
        Self {
            origin: Vec3::new(rng.gen_range(-5.0..5.0), 0.0, rng.gen_range(-5.0..5.0)),
            radius: rng.gen_range(1.0..4.0),
            speed: rng.gen_range(0.5..1.5),
            phase: rng.gen_range(0.0..TAU),
        }
    }

    fn poses(&self, t: f32, with_sword: bool) -> PoseSnapshot {
        let angle = self.phase + t * self.speed;
        let position = self.origin + Vec3::new(angle.cos(), 0.0, angle.sin()) * self.radius;
        let heading = Quat::from_rotation_y(-angle);

        let mut poses = PoseSnapshot::default();
        poses
            .transforms
            .insert("body".to_string(), Transform::new(position, heading, Vec3::ONE));

        let swing = (t * 4.0).sin() * 0.6;
        let bones = (0..4)
            .map(|i| {
                Transform::new(
                    Vec3::Y * 0.5 * i as f32,
                    Quat::from_rotation_x(swing / (i + 1) as f32),
                    Vec3::ONE,
                )
            })
            .collect();
        poses.bones.insert("body".to_string(), bones);

        if with_sword {
            let hand = position + heading * Vec3::new(0.4, 1.2, 0.0);
            let grip = Transform::new(hand, heading * Quat::from_rotation_z(swing), Vec3::ONE);
            poses.transforms.insert("sword".to_string(), grip);
        }
        poses
    }
}

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage(&args[0]);
        std::process::exit(1);
    }

    match args[1].as_str() {
        "--example" => print_example_config(),
        "demo" if args.len() >= 3 => run_demo(&args[2], args.get(3)),
        "info" if args.len() >= 3 => run_info(&args[2]),
        "play" if args.len() >= 3 => {
            let rate: f32 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(1.0);
            run_play(&args[2], rate);
        }
        _ => {
            print_usage(&args[0]);
            std::process::exit(1);
        }
    }
}

fn print_usage(program: &str) {
    eprintln!("Usage: {} <command> [args]", program);
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  demo <out.ghst> [config.json]  Record a synthetic two-entity group");
    eprintln!("  info <file.ghst>               Print the clip header");
    eprintln!("  play <file.ghst> [rate]        Replay at 10 Hz and print sub-part changes");
    eprintln!("  --example                      Print the default demo configuration");
}

fn run_demo(out: &str, config_path: Option<&String>) {
    let config: DemoConfig = match config_path {
        Some(path) => {
            let config_str = fs::read_to_string(path).unwrap_or_else(|e| {
                eprintln!("Error reading config file: {}", e);
                std::process::exit(1);
            });
            serde_json::from_str(&config_str).unwrap_or_else(|e| {
                eprintln!("Error parsing config: {}", e);
                std::process::exit(1);
            })
        }
        None => DemoConfig::default(),
    };

    if !config.tick_rate.is_finite() || config.tick_rate <= 0.0 {
        eprintln!("Error: tick_rate must be positive, got {}", config.tick_rate);
        std::process::exit(1);
    }

    let seed = config.random_seed.unwrap_or_else(rand::random);
    let mut rng = StdRng::seed_from_u64(seed);
    let walkers: Vec<(EntityId, Walker)> =
        (1..=2).map(|id| (id, Walker::random(&mut rng))).collect();

    println!("Ghostreel Demo Recording");
    println!("========================");
    println!("Group: {}", config.record.group);
    println!("Duration: {}s at {} Hz (seed {})", config.duration, config.tick_rate, seed);
    println!(
        "Sampling: every {}s, keeping the last {}s",
        config.record.sampling_interval, config.record.max_record_time
    );
    println!();

    let mut sessions = SessionManager::new();
    let mut group = String::new();
    for (id, _) in &walkers {
        group = sessions.start_recording(*id, &config.record, 0.0).unwrap_or_else(|e| {
            eprintln!("Error starting recording: {}", e);
            std::process::exit(1);
        });
        sessions.notify_attached(
            *id,
            SubPartMeta::new("body", SubPartKind::SkeletalMesh { leader: None })
                .with_asset("/Game/Mannequin"),
        );
    }
    sessions.set_main_entity(&group, walkers[0].0);

    let dt = 1.0 / config.tick_rate;
    let sword_on = config.duration * 0.25;
    let sword_off = config.duration * 0.75;
    let mut sword_attached = false;
    let mut now = 0.0f32;

    let start = Instant::now();
    while now < config.duration {
        now += dt;

        let want_sword = now >= sword_on && now < sword_off;
        if want_sword != sword_attached {
            let runner = walkers[0].0;
            if want_sword {
                let sword =
                    SubPartMeta::new("sword", SubPartKind::StaticMesh).with_asset("/Game/Sword");
                sessions.notify_attached(runner, sword);
            } else {
                sessions.notify_detached(runner, "sword");
            }
            sword_attached = want_sword;
        }

        let t = now;
        sessions.tick(dt, now, &mut |_: &str, entity: EntityId| {
            walkers
                .iter()
                .find(|(id, _)| *id == entity)
                .map(|(id, w)| w.poses(t, *id == walkers[0].0 && sword_attached))
        });
    }

    let mut clip_set = sessions.stop_recording(&group, now).unwrap_or_else(|e| {
        eprintln!("Error cooking recording: {}", e);
        std::process::exit(1);
    });

    let written = write_clip_file(out, &mut clip_set, config.file).unwrap_or_else(|e| {
        eprintln!("Error writing {}: {}", out, e);
        std::process::exit(1);
    });

    println!("Recorded {} clip(s):", clip_set.clips.len());
    for (i, clip) in clip_set.clips.iter().enumerate() {
        println!(
            "  Clip {}: {} samples, {:.2}s, {} sub-part interval(s)",
            i,
            clip.samples.len(),
            clip.duration(),
            clip.intervals.len()
        );
    }
    println!();
    println!(
        "Wrote {} ({} bytes, {:?}/{:?}) in {:.2}ms",
        out,
        written,
        config.file.compression,
        config.file.quantization,
        start.elapsed().as_secs_f64() * 1000.0
    );
}

fn run_info(path: &str) {
    let (file_header, header) = read_header_from_path(PathBuf::from(path)).unwrap_or_else(|e| {
        eprintln!("Error reading {}: {}", path, e);
        std::process::exit(1);
    });

    println!("Clip file: {}", path);
    println!("  Name: {}", header.name);
    if !header.level.is_empty() {
        println!("  Level: {}", header.level);
    }
    println!("  Tags: {:?}", header.tags);
    println!("  Compression: {:?}", file_header.options.compression);
    println!("  Quantization: {:?}", file_header.options.quantization);
    println!("  Payload: {} bytes uncompressed", file_header.uncompressed_size);
    println!("  Length: {:.2}s (max {:.2}s)", header.total_length, header.max_record_time);
    println!("  Sampling interval: {}s", header.sampling_interval);
    println!("  Entities: {}", header.entity_payloads.len());
    let spawn = header.spawn_transform.translation;
    println!("  Spawn: ({:.2}, {:.2}, {:.2})", spawn.x, spawn.y, spawn.z);
}

fn run_play(path: &str, rate: f32) {
    let clip_set = read_clip_file(path).unwrap_or_else(|e| {
        eprintln!("Error loading {}: {}", path, e);
        std::process::exit(1);
    });

    let options = PlaybackOptions {
        playback_rate: rate,
        ..Default::default()
    };
    let total = clip_set.header.total_length;

    let mut sessions = SessionManager::new();
    let id = sessions.start_playback(clip_set, options, 0.0).unwrap_or_else(|e| {
        eprintln!("Error starting playback: {}", e);
        std::process::exit(1);
    });

    println!("Playing {} at rate {} ({:.2}s)", path, rate, total);

    let dt = 0.1;
    let max_ticks = ((total / rate.abs()) / dt).ceil() as usize + 10;
    let mut now = 0.0f32;
    for _ in 0..max_ticks {
        let Some(frames) = sessions.tick_playback(id, now) else {
            break;
        };
        for (clip, frame) in frames {
            for name in &frame.activated {
                println!("  [{:6.2}s] clip {} + {}", now, clip, name);
            }
            for name in &frame.deactivated {
                println!("  [{:6.2}s] clip {} - {}", now, clip, name);
            }
            if frame.finished {
                println!("  [{:6.2}s] clip {} finished", now, clip);
            }
        }
        now += dt;
    }

    if sessions.is_playing(id) {
        sessions.stop_playback(id);
    }
}

fn print_example_config() {
    let config = DemoConfig::default();

    println!("Example configuration (config.json):");
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing config: {}", e),
    }
}
