//! Record groups and playback sessions owned by one caller-constructed manager.

use std::collections::BTreeMap;
use std::fmt;

use log::{debug, info, warn};

use crate::capture::{EntityRecorder, clip_by_group_window};
use crate::error::{ReplayError, Result};
use crate::playback::{ClipPlayer, PlaybackFrame};
use crate::pose::{Clip, ClipSet, ClipSetHeader, PoseSnapshot, SubPartMeta, Transform, UserPayload};
use crate::schema::{PlaybackOptions, RecordOptions};

/// Group used when [`RecordOptions::group`] is empty.
pub const DEFAULT_GROUP: &str = "default";

/// Host-side identifier of a recorded entity.
pub type EntityId = u64;

/// Supplies the current poses of recorded entities.
pub trait PoseSource {
    /// Poses of `entity` in `group`, or `None` if it cannot be sampled this tick.
    fn poses(&mut self, group: &str, entity: EntityId) -> Option<PoseSnapshot>;
}

impl<F> PoseSource for F
where
    F: FnMut(&str, EntityId) -> Option<PoseSnapshot>,
{
    fn poses(&mut self, group: &str, entity: EntityId) -> Option<PoseSnapshot> {
        self(group, entity)
    }
}

/// Identifier of a running playback session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlaybackId(u64);

impl fmt::Display for PlaybackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "playback#{}", self.0)
    }
}

#[derive(Debug)]
struct RecordGroup {
    options: RecordOptions,
    start_time: f32,
    recorders: BTreeMap<EntityId, EntityRecorder>,
    /// Stopped entities whose buffers are kept for the group save.
    retired: Vec<(EntityId, EntityRecorder)>,
    group_payload: UserPayload,
    main_entity: Option<EntityId>,
}

impl RecordGroup {
    fn new(options: RecordOptions, start_time: f32) -> Self {
        Self {
            options,
            start_time,
            recorders: BTreeMap::new(),
            retired: Vec::new(),
            group_payload: UserPayload::default(),
            main_entity: None,
        }
    }
}

#[derive(Debug)]
struct PlaybackSession {
    header: ClipSetHeader,
    /// Players keyed by clip index in the source set.
    players: Vec<(usize, ClipPlayer)>,
}

/// Owns every record group and playback session of one host.
///
/// Usage:
/// ```ignore
/// let mut sessions = SessionManager::new();
/// let group = sessions.start_recording(hero_id, &options, clock.now())?;
/// sessions.notify_attached(hero_id, SubPartMeta::new("body", SubPartKind::StaticMesh));
/// // every host tick
/// sessions.tick(dt, clock.now(), &mut |_: &str, id: EntityId| world.poses(id));
/// let clip_set = sessions.stop_recording(&group, clock.now())?;
/// ```
#[derive(Debug, Default)]
pub struct SessionManager {
    groups: BTreeMap<String, RecordGroup>,
    playbacks: BTreeMap<PlaybackId, PlaybackSession>,
    next_playback: u64,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start recording `entity` in the group named by `options.group`.
    ///
    /// The group is created on first use and keeps the options it was created
    /// with. Returns the resolved group name.
    pub fn start_recording(
        &mut self,
        entity: EntityId,
        options: &RecordOptions,
        now: f32,
    ) -> Result<String> {
        options.validate()?;
        let name = if options.group.is_empty() {
            DEFAULT_GROUP.to_string()
        } else {
            options.group.clone()
        };

        if let Some(group) = self.group_of(entity) {
            return Err(ReplayError::AlreadyRecording {
                group: group.to_string(),
                entity,
            });
        }

        let group = self.groups.entry(name.clone()).or_insert_with(|| {
            info!("Record group '{name}' started at {now}");
            RecordGroup::new(options.clone(), now)
        });
        let recorder = EntityRecorder::new(&group.options, group.start_time);
        group.recorders.insert(entity, recorder);
        debug!("Entity {entity} joined record group '{name}'");
        Ok(name)
    }

    /// Name of the group currently recording `entity`.
    pub fn group_of(&self, entity: EntityId) -> Option<&str> {
        self.groups
            .iter()
            .find(|(_, g)| g.recorders.contains_key(&entity))
            .map(|(name, _)| name.as_str())
    }

    pub fn is_recording(&self, group: &str) -> bool {
        self.groups.contains_key(group)
    }

    /// Group names in sorted order.
    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    fn recorder_mut(&mut self, entity: EntityId) -> Option<&mut EntityRecorder> {
        self.groups
            .values_mut()
            .find_map(|g| g.recorders.get_mut(&entity))
    }

    /// Sample every active recorder, then prune retired buffers.
    pub fn tick<S: PoseSource + ?Sized>(&mut self, delta: f32, now: f32, source: &mut S) {
        for (name, group) in &mut self.groups {
            for (&entity, recorder) in &mut group.recorders {
                match source.poses(name, entity) {
                    Some(poses) => {
                        recorder.tick(delta, now, poses);
                    }
                    None => debug!("No poses for entity {entity} in '{name}'"),
                }
            }
        }
        self.prune_retired(now);
    }

    /// A sub-part appeared on a recorded entity.
    pub fn notify_attached(&mut self, entity: EntityId, meta: SubPartMeta) -> bool {
        match self.recorder_mut(entity) {
            Some(recorder) => {
                recorder.attach(meta);
                true
            }
            None => {
                warn!("Attach '{}' for entity {entity} that is not recording", meta.name);
                false
            }
        }
    }

    /// A sub-part was removed from a recorded entity.
    pub fn notify_detached(&mut self, entity: EntityId, name: &str) -> bool {
        match self.recorder_mut(entity) {
            Some(recorder) => {
                recorder.detach(name);
                true
            }
            None => {
                warn!("Detach '{name}' for entity {entity} that is not recording");
                false
            }
        }
    }

    pub fn set_group_user_payload(&mut self, group: &str, payload: UserPayload) -> bool {
        match self.groups.get_mut(group) {
            Some(g) => {
                g.group_payload = payload;
                true
            }
            None => false,
        }
    }

    pub fn set_entity_user_payload(&mut self, entity: EntityId, payload: UserPayload) -> bool {
        match self.recorder_mut(entity) {
            Some(recorder) => {
                recorder.set_user_payload(payload);
                true
            }
            None => false,
        }
    }

    /// Entity whose first pose becomes the group's spawn transform.
    pub fn set_main_entity(&mut self, group: &str, entity: EntityId) -> bool {
        match self.groups.get_mut(group) {
            Some(g) if g.recorders.contains_key(&entity) => {
                g.main_entity = Some(entity);
                true
            }
            Some(_) => {
                warn!("Entity {entity} is not recording in '{group}'");
                false
            }
            None => false,
        }
    }

    /// Stop recording one entity.
    ///
    /// With `keep` its buffered samples stay with the group and are saved with
    /// it. Returns the saved clip set if this emptied a group configured with
    /// `save_immediately_if_group_empty`.
    pub fn stop_entity(
        &mut self,
        entity: EntityId,
        keep: bool,
        now: f32,
    ) -> Option<Result<ClipSet>> {
        let Some(name) = self.group_of(entity).map(str::to_string) else {
            warn!("Stop requested for entity {entity} that is not recording");
            return None;
        };
        let group = self.groups.get_mut(&name)?;
        let recorder = group.recorders.remove(&entity)?;
        if keep {
            group.retired.push((entity, recorder));
            debug!("Entity {entity} retired in '{name}'");
        } else {
            debug!("Entity {entity} discarded from '{name}'");
        }

        if group.recorders.is_empty() && group.options.save_immediately_if_group_empty {
            info!("Record group '{name}' is empty, saving");
            return Some(self.stop_recording(&name, now));
        }
        None
    }

    /// Drop retired samples older than each group's record window.
    pub fn prune_retired(&mut self, now: f32) {
        for group in self.groups.values_mut() {
            if group.retired.is_empty() {
                continue;
            }
            let cutoff = (now - group.start_time) - group.options.max_record_time;
            for (_, recorder) in &mut group.retired {
                recorder.prune_older_than(cutoff);
            }
            group.retired.retain(|(entity, recorder)| {
                if recorder.is_empty() {
                    debug!("Retired entity {entity} has no samples left");
                }
                !recorder.is_empty()
            });
        }
    }

    /// Stop a group and cook everything it recorded into one clip set.
    pub fn stop_recording(&mut self, group: &str, now: f32) -> Result<ClipSet> {
        let g = self
            .groups
            .remove(group)
            .ok_or_else(|| ReplayError::UnknownGroup(group.to_string()))?;

        let elapsed = now - g.start_time;
        let max_time = g.options.max_record_time;
        let clip_start_time = (elapsed - max_time).max(0.0);

        let mut entities: Vec<EntityId> = Vec::new();
        let mut clips: Vec<Clip> = Vec::new();
        let mut payloads: Vec<UserPayload> = Vec::new();
        for (entity, recorder) in g.retired.into_iter().chain(g.recorders) {
            let payload = recorder.user_payload().clone();
            match recorder.finish(clip_start_time) {
                Ok(clip) => {
                    entities.push(entity);
                    clips.push(clip);
                    payloads.push(payload);
                }
                Err(e) => warn!("Dropping entity {entity} from '{group}': {e}"),
            }
        }

        clip_by_group_window(&mut clips, max_time);

        let mut kept = Vec::with_capacity(clips.len());
        let mut kept_payloads = Vec::with_capacity(clips.len());
        let mut spawn: Option<Transform> = None;
        for ((entity, clip), payload) in entities.into_iter().zip(clips).zip(payloads) {
            if !clip.is_valid() {
                warn!("Entity {entity} has no samples inside the group window");
                continue;
            }
            if g.main_entity == Some(entity) {
                spawn = clip.spawn_transform();
            }
            kept.push(clip);
            kept_payloads.push(payload);
        }

        if kept.is_empty() {
            warn!("Record group '{group}' produced no clip");
            return Err(ReplayError::EmptyGroup);
        }

        let spawn_transform = spawn
            .or_else(|| kept[0].spawn_transform())
            .unwrap_or(Transform::IDENTITY);
        let name = if g.options.file_name.is_empty() {
            format!("{group}-{}", (now * 1000.0) as i64)
        } else {
            g.options.file_name.clone()
        };

        let header = ClipSetHeader {
            name,
            level: String::new(),
            tags: g.options.tags.clone(),
            spawn_transform,
            max_record_time: max_time,
            sampling_interval: g.options.sampling_interval,
            total_length: elapsed.min(max_time),
            group_payload: g.group_payload,
            entity_payloads: kept_payloads,
        };
        info!("Record group '{group}' stopped with {} clip(s)", kept.len());
        Ok(ClipSet { header, clips: kept })
    }

    /// Start replaying every playable clip of `clip_set` from `now`.
    pub fn start_playback(
        &mut self,
        clip_set: ClipSet,
        options: PlaybackOptions,
        now: f32,
    ) -> Result<PlaybackId> {
        options.validate()?;
        let ClipSet { header, clips } = clip_set;

        let mut players = Vec::with_capacity(clips.len());
        for (index, clip) in clips.into_iter().enumerate() {
            let duration = if header.total_length > 0.0 {
                header.total_length
            } else {
                clip.duration()
            };
            let mut player = ClipPlayer::new(clip, options, duration);
            match player.start(now) {
                Ok(()) => players.push((index, player)),
                Err(e) => warn!("Clip {index} of '{}' is not playable: {e}", header.name),
            }
        }
        if players.is_empty() {
            return Err(ReplayError::EmptyGroup);
        }

        let id = PlaybackId(self.next_playback);
        self.next_playback += 1;
        info!("{id} started '{}' with {} clip(s)", header.name, players.len());
        self.playbacks.insert(id, PlaybackSession { header, players });
        Ok(id)
    }

    /// Advance a playback session to `now`.
    ///
    /// Frames are paired with the index of their clip in the source set. A
    /// player is removed after the tick that reports it finished, and the
    /// session with its last player. Returns `None` for unknown sessions.
    pub fn tick_playback(
        &mut self,
        id: PlaybackId,
        now: f32,
    ) -> Option<Vec<(usize, PlaybackFrame)>> {
        let session = self.playbacks.get_mut(&id)?;
        let frames: Vec<(usize, PlaybackFrame)> = session
            .players
            .iter_mut()
            .map(|(index, player)| (*index, player.tick(now)))
            .collect();

        let finished: Vec<usize> = frames
            .iter()
            .filter(|(_, f)| f.finished)
            .map(|(i, _)| *i)
            .collect();
        if !finished.is_empty() {
            session.players.retain(|(index, _)| !finished.contains(index));
        }
        if session.players.is_empty() {
            info!("{id} finished");
            self.playbacks.remove(&id);
        }
        Some(frames)
    }

    pub fn stop_playback(&mut self, id: PlaybackId) -> bool {
        let stopped = self.playbacks.remove(&id).is_some();
        if stopped {
            debug!("{id} stopped");
        }
        stopped
    }

    pub fn is_playing(&self, id: PlaybackId) -> bool {
        self.playbacks.contains_key(&id)
    }

    /// Header of the clip set a session is replaying.
    pub fn playback_header(&self, id: PlaybackId) -> Option<&ClipSetHeader> {
        self.playbacks.get(&id).map(|s| &s.header)
    }
}
