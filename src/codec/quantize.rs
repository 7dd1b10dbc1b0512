//! Transform quantization tiers.
//!
//! | Tier   | Position              | Rotation        | Scale                 | Bytes |
//! |--------|-----------------------|-----------------|-----------------------|-------|
//! | None   | 3 x f32               | 4 x f32         | 3 x f32               | 40    |
//! | High   | 3 x i32, 0.01 units   | smallest-3, 48b | 3 x i16, 0.1 units    | 24    |
//! | Medium | 3 x i32, 0.01 units   | smallest-3, 32b | 3 x i16, 0.1 units    | 22    |
//! | Low    | 11/11/10 in range     | smallest-3, 32b | 11/11/10 in range     | 12    |

use std::f32::consts::FRAC_1_SQRT_2;
use std::io::{Read, Write};

use glam::{Quat, Vec3};

use super::wire::{
    read_f32, read_i16, read_i32, read_u32, read_u48, write_f32, write_i16, write_i32, write_u32,
    write_u48,
};
use crate::error::{ReplayError, Result};
use crate::pose::{RangeBounds, Transform};
use crate::schema::QuantizationMethod;

const POSITION_STEPS_PER_UNIT: f32 = 100.0;
const SCALE_STEPS_PER_UNIT: f32 = 10.0;

/// Pack a quaternion as its three smallest components.
///
/// The index of the dropped (largest) component goes in the top two bits;
/// the quaternion is negated if needed so the dropped component is positive.
fn pack_smallest_three(q: Quat, component_bits: u32) -> u64 {
    let q = q.normalize();
    let c = q.to_array();
    let mut largest = 0;
    for i in 1..4 {
        if c[i].abs() > c[largest].abs() {
            largest = i;
        }
    }
    let sign = if c[largest] < 0.0 { -1.0 } else { 1.0 };
    let max = ((1u64 << component_bits) - 1) as f32;

    let mut packed = largest as u64;
    for (i, &v) in c.iter().enumerate() {
        if i == largest {
            continue;
        }
        let t = ((v * sign + FRAC_1_SQRT_2) / (2.0 * FRAC_1_SQRT_2)).clamp(0.0, 1.0);
        packed = (packed << component_bits) | (t * max).round() as u64;
    }
    packed
}

fn unpack_smallest_three(packed: u64, component_bits: u32) -> Quat {
    let mask = (1u64 << component_bits) - 1;
    let max = mask as f32;
    let largest = ((packed >> (3 * component_bits)) & 0b11) as usize;

    let mut c = [0.0f32; 4];
    let mut sum_sq = 0.0;
    let mut shift = 2 * component_bits;
    for (i, slot) in c.iter_mut().enumerate() {
        if i == largest {
            continue;
        }
        let u = ((packed >> shift) & mask) as f32;
        let v = u / max * (2.0 * FRAC_1_SQRT_2) - FRAC_1_SQRT_2;
        *slot = v;
        sum_sq += v * v;
        shift = shift.saturating_sub(component_bits);
    }
    c[largest] = (1.0 - sum_sq).max(0.0).sqrt();
    Quat::from_array(c).normalize()
}

fn quantize_fixed(v: Vec3, steps: f32) -> [i32; 3] {
    let q = |x: f32| (x * steps).round() as i32;
    [q(v.x), q(v.y), q(v.z)]
}

fn quantize_short(v: Vec3, steps: f32) -> [i16; 3] {
    let q = |x: f32| (x * steps).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16;
    [q(v.x), q(v.y), q(v.z)]
}

/// Pack a vector into 11/11/10 bits relative to `min` and `extent`.
fn pack_interval(v: Vec3, min: Vec3, extent: Vec3) -> u32 {
    let q = |x: f32, lo: f32, ext: f32, bits: u32| {
        let max = ((1u32 << bits) - 1) as f32;
        (((x - lo) / ext).clamp(0.0, 1.0) * max).round() as u32
    };
    (q(v.x, min.x, extent.x, 11) << 21)
        | (q(v.y, min.y, extent.y, 11) << 10)
        | q(v.z, min.z, extent.z, 10)
}

fn unpack_interval(packed: u32, min: Vec3, extent: Vec3) -> Vec3 {
    let d = |u: u32, lo: f32, ext: f32, bits: u32| {
        let max = ((1u32 << bits) - 1) as f32;
        lo + (u & ((1u32 << bits) - 1)) as f32 / max * ext
    };
    Vec3::new(
        d(packed >> 21, min.x, extent.x, 11),
        d(packed >> 10, min.y, extent.y, 11),
        d(packed, min.z, extent.z, 10),
    )
}

/// 0.01 position, 48-bit rotation, 0.1 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighTransform {
    pub position: [i32; 3],
    pub rotation: u64,
    pub scale: [i16; 3],
}

impl HighTransform {
    pub const SIZE: usize = 24;

    pub fn from_transform(t: &Transform) -> Self {
        Self {
            position: quantize_fixed(t.translation, POSITION_STEPS_PER_UNIT),
            rotation: pack_smallest_three(t.rotation, 15),
            scale: quantize_short(t.scale, SCALE_STEPS_PER_UNIT),
        }
    }

    pub fn to_transform(&self) -> Transform {
        Transform {
            translation: Vec3::from_array(self.position.map(|p| p as f32))
                / POSITION_STEPS_PER_UNIT,
            rotation: unpack_smallest_three(self.rotation, 15),
            scale: Vec3::from_array(self.scale.map(|s| s as f32)) / SCALE_STEPS_PER_UNIT,
        }
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        for p in self.position {
            write_i32(w, p)?;
        }
        write_u48(w, self.rotation)?;
        for s in self.scale {
            write_i16(w, s)?;
        }
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> std::io::Result<Self> {
        let position = [read_i32(r)?, read_i32(r)?, read_i32(r)?];
        let rotation = read_u48(r)?;
        let scale = [read_i16(r)?, read_i16(r)?, read_i16(r)?];
        Ok(Self {
            position,
            rotation,
            scale,
        })
    }
}

/// 0.01 position, 32-bit rotation, 0.1 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediumTransform {
    pub position: [i32; 3],
    pub rotation: u32,
    pub scale: [i16; 3],
}

impl MediumTransform {
    pub const SIZE: usize = 22;

    pub fn from_transform(t: &Transform) -> Self {
        Self {
            position: quantize_fixed(t.translation, POSITION_STEPS_PER_UNIT),
            rotation: pack_smallest_three(t.rotation, 10) as u32,
            scale: quantize_short(t.scale, SCALE_STEPS_PER_UNIT),
        }
    }

    pub fn to_transform(&self) -> Transform {
        Transform {
            translation: Vec3::from_array(self.position.map(|p| p as f32))
                / POSITION_STEPS_PER_UNIT,
            rotation: unpack_smallest_three(self.rotation as u64, 10),
            scale: Vec3::from_array(self.scale.map(|s| s as f32)) / SCALE_STEPS_PER_UNIT,
        }
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        for p in self.position {
            write_i32(w, p)?;
        }
        write_u32(w, self.rotation)?;
        for s in self.scale {
            write_i16(w, s)?;
        }
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> std::io::Result<Self> {
        let position = [read_i32(r)?, read_i32(r)?, read_i32(r)?];
        let rotation = read_u32(r)?;
        let scale = [read_i16(r)?, read_i16(r)?, read_i16(r)?];
        Ok(Self {
            position,
            rotation,
            scale,
        })
    }
}

/// Range-relative position and scale, 32-bit rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LowTransform {
    pub position: u32,
    pub rotation: u32,
    pub scale: u32,
}

impl LowTransform {
    pub const SIZE: usize = 12;

    pub fn from_transform(t: &Transform, range: &RangeBounds) -> Self {
        Self {
            position: pack_interval(t.translation, range.position_min, range.position_extent()),
            rotation: pack_smallest_three(t.rotation, 10) as u32,
            scale: pack_interval(t.scale, range.scale_min, range.scale_extent()),
        }
    }

    pub fn to_transform(&self, range: &RangeBounds) -> Transform {
        Transform {
            translation: unpack_interval(
                self.position,
                range.position_min,
                range.position_extent(),
            ),
            rotation: unpack_smallest_three(self.rotation as u64, 10),
            scale: unpack_interval(self.scale, range.scale_min, range.scale_extent()),
        }
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        write_u32(w, self.position)?;
        write_u32(w, self.rotation)?;
        write_u32(w, self.scale)
    }

    pub fn read_from<R: Read>(r: &mut R) -> std::io::Result<Self> {
        Ok(Self {
            position: read_u32(r)?,
            rotation: read_u32(r)?,
            scale: read_u32(r)?,
        })
    }
}

/// Write one transform in the given tier.
///
/// `range` is required for `StandardLow` and ignored otherwise.
pub fn encode_transform<W: Write>(
    w: &mut W,
    t: &Transform,
    method: QuantizationMethod,
    range: Option<&RangeBounds>,
) -> Result<()> {
    match method {
        QuantizationMethod::None => {
            for v in t.translation.to_array() {
                write_f32(w, v)?;
            }
            for v in t.rotation.to_array() {
                write_f32(w, v)?;
            }
            for v in t.scale.to_array() {
                write_f32(w, v)?;
            }
        }
        QuantizationMethod::StandardHigh => HighTransform::from_transform(t).write_to(w)?,
        QuantizationMethod::StandardMedium => MediumTransform::from_transform(t).write_to(w)?,
        QuantizationMethod::StandardLow => {
            let range = range.ok_or_else(|| ReplayError::RangeUnavailable("encode".into()))?;
            LowTransform::from_transform(t, range).write_to(w)?;
        }
    }
    Ok(())
}

/// Read one transform written by [`encode_transform`] with the same tier and range.
pub fn decode_transform<R: Read>(
    r: &mut R,
    method: QuantizationMethod,
    range: Option<&RangeBounds>,
) -> Result<Transform> {
    let t = match method {
        QuantizationMethod::None => {
            let translation = Vec3::new(read_f32(r)?, read_f32(r)?, read_f32(r)?);
            let rotation = Quat::from_xyzw(read_f32(r)?, read_f32(r)?, read_f32(r)?, read_f32(r)?);
            let scale = Vec3::new(read_f32(r)?, read_f32(r)?, read_f32(r)?);
            Transform::new(translation, rotation, scale)
        }
        QuantizationMethod::StandardHigh => HighTransform::read_from(r)?.to_transform(),
        QuantizationMethod::StandardMedium => MediumTransform::read_from(r)?.to_transform(),
        QuantizationMethod::StandardLow => {
            let range = range.ok_or_else(|| ReplayError::RangeUnavailable("decode".into()))?;
            LowTransform::read_from(r)?.to_transform(range)
        }
    };
    Ok(t)
}

/// Encoded size of one transform in bytes.
pub fn encoded_size(method: QuantizationMethod) -> usize {
    match method {
        QuantizationMethod::None => 40,
        QuantizationMethod::StandardHigh => HighTransform::SIZE,
        QuantizationMethod::StandardMedium => MediumTransform::SIZE,
        QuantizationMethod::StandardLow => LowTransform::SIZE,
    }
}
