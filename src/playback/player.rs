//! Time-driven replay of one entity clip.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, warn};

use super::IntervalTree;
use crate::error::{ReplayError, Result};
use crate::pose::{ActivityInterval, Clip, Transform};
use crate::schema::PlaybackOptions;

/// Frame gaps shorter than this snap straight to the next frame.
const MIN_FRAME_GAP: f32 = 1e-4;

/// Lifecycle of a [`ClipPlayer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    /// Created, query structure not built yet.
    Uninitialized,
    /// Playing; each tick seeks and interpolates.
    Ready,
    /// Elapsed time left the clip (non-looping only).
    Finished,
}

/// Per-tick output for the host: interpolated poses and visibility changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackFrame {
    /// Whole entity hidden this tick (time outside the sampled range).
    pub hidden: bool,
    /// Sub-parts that became active since the last frame.
    pub activated: Vec<String>,
    /// Sub-parts that became inactive since the last frame.
    pub deactivated: Vec<String>,
    /// Interpolated world transform per sub-part.
    pub transforms: BTreeMap<String, Transform>,
    /// Interpolated bone-local transforms per skinned sub-part.
    pub bone_poses: BTreeMap<String, Vec<Transform>>,
    /// Playback reached its end; no further frames follow.
    pub finished: bool,
}

/// Elapsed clip time for wall-clock `now`, or `None` once a non-looping replay is over.
///
/// Negative rates play backwards: without looping they start at `duration`.
pub fn calculate_elapsed_time(
    now: f32,
    start_time: f32,
    rate: f32,
    looping: bool,
    duration: f32,
) -> Option<f32> {
    if duration <= 0.0 {
        return None;
    }

    let mut elapsed = (now - start_time) * rate;
    if looping {
        elapsed %= duration;
        if elapsed < 0.0 {
            elapsed += duration;
        }
    } else {
        if rate < 0.0 {
            elapsed += duration;
        }
        if !(0.0..=duration).contains(&elapsed) {
            return None;
        }
    }
    Some(elapsed)
}

/// Replays one decoded clip.
///
/// Usage:
/// ```ignore
/// let mut player = ClipPlayer::new(clip, options, header.total_length);
/// player.start(clock.now())?;
/// loop {
///     let frame = player.tick(clock.now());
///     host.apply(&frame);
///     if frame.finished { break; }
/// }
/// ```
#[derive(Debug)]
pub struct ClipPlayer {
    clip: Clip,
    options: PlaybackOptions,
    duration: f32,
    state: PlayerState,
    tree: IntervalTree,
    start_time: f32,
    /// Index of the earlier sample of the current bracketing pair.
    current_frame: usize,
    /// Every sub-part name that appears in the clip's intervals.
    known_parts: BTreeSet<String>,
    active: BTreeSet<String>,
    pending_activated: Vec<String>,
    pending_deactivated: Vec<String>,
}

impl ClipPlayer {
    /// Create a player for `clip` that runs for `duration` seconds.
    pub fn new(clip: Clip, options: PlaybackOptions, duration: f32) -> Self {
        Self {
            clip,
            options,
            duration,
            state: PlayerState::Uninitialized,
            tree: IntervalTree::default(),
            start_time: 0.0,
            current_frame: 0,
            known_parts: BTreeSet::new(),
            active: BTreeSet::new(),
            pending_activated: Vec::new(),
            pending_deactivated: Vec::new(),
        }
    }

    /// Build the interval tree and seek to frame 0; playback time starts at `now`.
    pub fn start(&mut self, now: f32) -> Result<()> {
        self.options.validate()?;
        if !self.clip.is_valid() {
            return Err(ReplayError::InsufficientSamples {
                found: self.clip.samples.len(),
            });
        }

        self.known_parts = self.clip.intervals.iter().map(|i| i.meta.name.clone()).collect();
        self.tree = IntervalTree::build(self.clip.intervals.clone());
        self.start_time = now;
        self.current_frame = 0;
        self.active.clear();
        self.state = PlayerState::Ready;
        self.seek_frame(0);

        debug!(
            "Playback started: {} samples, {} intervals, tree depth {}",
            self.clip.samples.len(),
            self.tree.len(),
            self.tree.depth()
        );
        Ok(())
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn clip(&self) -> &Clip {
        &self.clip
    }

    pub fn options(&self) -> &PlaybackOptions {
        &self.options
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    /// Names of the sub-parts currently active.
    pub fn active_parts(&self) -> &BTreeSet<String> {
        &self.active
    }

    /// Elapsed clip time at wall-clock `now`.
    pub fn elapsed_time(&self, now: f32) -> Option<f32> {
        calculate_elapsed_time(
            now,
            self.start_time,
            self.options.playback_rate,
            self.options.looping,
            self.duration,
        )
    }

    /// Advance to wall-clock `now`.
    pub fn tick(&mut self, now: f32) -> PlaybackFrame {
        match self.state {
            PlayerState::Uninitialized => {
                warn!("Tick on a player that was never started");
                PlaybackFrame {
                    hidden: true,
                    ..Default::default()
                }
            }
            PlayerState::Finished => self.finished_frame(),
            PlayerState::Ready => match self.elapsed_time(now) {
                Some(t) => self.update_to_time(t),
                None => {
                    debug!("Playback finished at {now}");
                    self.state = PlayerState::Finished;
                    self.finished_frame()
                }
            },
        }
    }

    fn finished_frame(&mut self) -> PlaybackFrame {
        PlaybackFrame {
            hidden: true,
            finished: true,
            activated: std::mem::take(&mut self.pending_activated),
            deactivated: std::mem::take(&mut self.pending_deactivated),
            ..Default::default()
        }
    }

    /// Pose the entity at clip time `t`.
    pub fn update_to_time(&mut self, t: f32) -> PlaybackFrame {
        let mut frame = PlaybackFrame::default();
        let samples = &self.clip.samples;
        if self.state == PlayerState::Uninitialized || samples.len() < 2 {
            frame.hidden = true;
            return frame;
        }

        let (first, last) = (samples[0].timestamp, samples[samples.len() - 1].timestamp);
        if t < first || t > last {
            frame.hidden = true;
            frame.activated = std::mem::take(&mut self.pending_activated);
            frame.deactivated = std::mem::take(&mut self.pending_deactivated);
            return frame;
        }

        let upper = samples.partition_point(|s| s.timestamp <= t);
        let index = upper.saturating_sub(1).min(samples.len() - 2);
        if index != self.current_frame {
            self.current_frame = index;
            self.seek_frame(index as i32);
        }

        let samples = &self.clip.samples;
        let prev = &samples[index];
        let next = &samples[index + 1];
        let gap = next.timestamp - prev.timestamp;
        let alpha = if gap > MIN_FRAME_GAP {
            ((t - prev.timestamp) / gap).clamp(0.0, 1.0)
        } else {
            1.0
        };

        for (name, next_t) in &next.transforms {
            let blended = match prev.transforms.get(name) {
                Some(prev_t) => prev_t.blend(next_t, alpha),
                None => *next_t,
            };
            frame.transforms.insert(name.clone(), blended);
        }

        for (name, next_bones) in &next.bones {
            let Some(prev_bones) = prev.bones.get(name) else {
                continue;
            };
            let count = prev_bones.len().min(next_bones.len());
            if count == 0 {
                continue;
            }
            let pose = prev_bones[..count]
                .iter()
                .zip(&next_bones[..count])
                .map(|(p, n)| p.blend(n, alpha))
                .collect();
            frame.bone_poses.insert(name.clone(), pose);
        }

        frame.activated = std::mem::take(&mut self.pending_activated);
        frame.deactivated = std::mem::take(&mut self.pending_deactivated);
        frame
    }

    /// Intervals active at `frame`.
    pub fn query(&self, frame: i32) -> Vec<&ActivityInterval> {
        self.tree.query(frame)
    }

    /// Recompute the active sub-part set for `frame`, queuing only real changes.
    ///
    /// Returns false (and changes nothing) if `frame` is outside the clip.
    pub fn seek_frame(&mut self, frame: i32) -> bool {
        if frame < 0 || frame as usize >= self.clip.samples.len() {
            warn!("Seek to frame {frame} is out of bounds (0..{})", self.clip.samples.len());
            return false;
        }

        let alive: BTreeSet<&str> = self.tree.query(frame).into_iter().map(|i| i.name()).collect();
        for name in &self.known_parts {
            let should_be_active = alive.contains(name.as_str());
            if should_be_active == self.active.contains(name) {
                continue;
            }
            if should_be_active {
                self.active.insert(name.clone());
                cancel_or_push(&mut self.pending_deactivated, &mut self.pending_activated, name);
            } else {
                self.active.remove(name);
                cancel_or_push(&mut self.pending_activated, &mut self.pending_deactivated, name);
            }
        }
        true
    }
}

/// A toggle that undoes a not-yet-reported opposite toggle cancels it instead.
fn cancel_or_push(opposite: &mut Vec<String>, target: &mut Vec<String>, name: &str) {
    if let Some(pos) = opposite.iter().position(|n| n == name) {
        opposite.remove(pos);
    } else {
        target.push(name.to_string());
    }
}
