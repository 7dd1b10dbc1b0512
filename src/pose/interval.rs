//! Sub-part metadata and activation intervals.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// End frame of an interval whose sub-part is still active.
pub const OPEN_END: i32 = i32::MAX;

/// Kind of renderable unit a sub-part is, with the fields each kind needs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SubPartKind {
    #[default]
    StaticMesh,
    /// Skinned mesh; `leader` names the sub-part whose pose it follows.
    SkeletalMesh { leader: Option<String> },
    /// Hair/fur strands bound to a skinned parent.
    Groom,
}

impl SubPartKind {
    pub(crate) fn tag(&self) -> u8 {
        match self {
            SubPartKind::StaticMesh => 0,
            SubPartKind::SkeletalMesh { .. } => 1,
            SubPartKind::Groom => 2,
        }
    }

    pub fn leader(&self) -> Option<&str> {
        match self {
            SubPartKind::SkeletalMesh { leader } => leader.as_deref(),
            _ => None,
        }
    }
}

/// Dynamic material parameters captured for one material slot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MaterialParameters {
    pub vectors: BTreeMap<String, [f32; 4]>,
    pub scalars: BTreeMap<String, f32>,
}

impl MaterialParameters {
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty() && self.scalars.is_empty()
    }
}

/// Everything needed to rebuild a sub-part on replay.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SubPartMeta {
    /// Stable name, unique within the entity.
    pub name: String,
    pub kind: SubPartKind,
    /// Mesh/groom asset reference.
    pub asset_path: String,
    /// Material per slot; empty string for an unset slot.
    pub material_paths: Vec<String>,
    /// Saved dynamic parameters keyed by slot index.
    pub material_parameters: BTreeMap<i32, MaterialParameters>,
}

impl SubPartMeta {
    pub fn new(name: impl Into<String>, kind: SubPartKind) -> Self {
        Self {
            name: name.into(),
            kind,
            ..Default::default()
        }
    }

    pub fn with_asset(mut self, asset_path: impl Into<String>) -> Self {
        self.asset_path = asset_path.into();
        self
    }
}

/// Frame range `[start_frame, end_frame)` during which a sub-part existed.
///
/// Equality compares sub-part names only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityInterval {
    pub meta: SubPartMeta,
    pub start_frame: i32,
    pub end_frame: i32,
}

impl ActivityInterval {
    pub fn new(meta: SubPartMeta, start_frame: i32, end_frame: i32) -> Self {
        Self {
            meta,
            start_frame,
            end_frame,
        }
    }

    /// Interval that stays open until closed.
    pub fn open(meta: SubPartMeta, start_frame: i32) -> Self {
        Self::new(meta, start_frame, OPEN_END)
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.meta.name
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.end_frame == OPEN_END
    }

    #[inline]
    pub fn contains(&self, frame: i32) -> bool {
        self.start_frame <= frame && frame < self.end_frame
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.end_frame <= self.start_frame
    }
}

impl PartialEq for ActivityInterval {
    fn eq(&self, other: &Self) -> bool {
        self.meta.name == other.meta.name
    }
}

impl Eq for ActivityInterval {}
