//! Pose data model: transforms, samples, sub-part intervals and clips.

mod clip;
mod interval;
mod sample;
mod transform;

pub use clip::{Clip, ClipRanges, ClipSet, ClipSetHeader, RangeBounds, UserPayload};
pub use interval::{ActivityInterval, MaterialParameters, OPEN_END, SubPartKind, SubPartMeta};
pub use sample::{PoseSnapshot, Sample};
pub use transform::Transform;
