//! Little-endian primitives and the serialization trait shared by the clip format.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Read, Write};

use glam::{Quat, Vec3};

use crate::pose::{
    ActivityInterval, MaterialParameters, RangeBounds, SubPartKind, SubPartMeta, Transform,
    UserPayload,
};

/// Types with a fixed little-endian binary layout.
pub trait WireFormat: Sized {
    fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()>;
    fn read_from<R: Read>(r: &mut R) -> io::Result<Self>;
}

fn invalid(msg: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.into())
}

macro_rules! le_primitive {
    ($write:ident, $read:ident, $ty:ty) => {
        #[inline]
        pub fn $write<W: Write>(w: &mut W, v: $ty) -> io::Result<()> {
            w.write_all(&v.to_le_bytes())
        }

        #[inline]
        pub fn $read<R: Read>(r: &mut R) -> io::Result<$ty> {
            let mut buf = [0u8; std::mem::size_of::<$ty>()];
            r.read_exact(&mut buf)?;
            Ok(<$ty>::from_le_bytes(buf))
        }
    };
}

le_primitive!(write_u8, read_u8, u8);
le_primitive!(write_i16, read_i16, i16);
le_primitive!(write_i32, read_i32, i32);
le_primitive!(write_u32, read_u32, u32);
le_primitive!(write_i64, read_i64, i64);
le_primitive!(write_f32, read_f32, f32);

/// Low 48 bits of `v`, little-endian.
pub fn write_u48<W: Write>(w: &mut W, v: u64) -> io::Result<()> {
    w.write_all(&v.to_le_bytes()[..6])
}

pub fn read_u48<R: Read>(r: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf[..6])?;
    Ok(u64::from_le_bytes(buf))
}

pub fn write_bool<W: Write>(w: &mut W, v: bool) -> io::Result<()> {
    write_u8(w, v as u8)
}

pub fn read_bool<R: Read>(r: &mut R) -> io::Result<bool> {
    Ok(read_u8(r)? != 0)
}

/// Element count as i32.
pub fn write_len<W: Write>(w: &mut W, len: usize) -> io::Result<()> {
    let len = i32::try_from(len).map_err(|_| invalid(format!("Length {len} exceeds i32")))?;
    write_i32(w, len)
}

/// Element count; negative values are rejected.
pub fn read_len<R: Read>(r: &mut R) -> io::Result<usize> {
    let len = read_i32(r)?;
    usize::try_from(len).map_err(|_| invalid(format!("Negative length {len}")))
}

/// Capacity hint that cannot be inflated by a corrupt length.
#[inline]
pub fn capacity_hint(len: usize) -> usize {
    len.min(1024)
}

pub fn write_bytes<W: Write>(w: &mut W, bytes: &[u8]) -> io::Result<()> {
    write_len(w, bytes.len())?;
    w.write_all(bytes)
}

pub fn read_bytes<R: Read>(r: &mut R) -> io::Result<Vec<u8>> {
    let len = read_len(r)?;
    let mut bytes = Vec::with_capacity(capacity_hint(len));
    r.take(len as u64).read_to_end(&mut bytes)?;
    if bytes.len() != len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("Expected {len} bytes, got {}", bytes.len()),
        ));
    }
    Ok(bytes)
}

pub fn write_string<W: Write>(w: &mut W, s: &str) -> io::Result<()> {
    write_bytes(w, s.as_bytes())
}

pub fn read_string<R: Read>(r: &mut R) -> io::Result<String> {
    String::from_utf8(read_bytes(r)?).map_err(|e| invalid(format!("Invalid UTF-8 string: {e}")))
}

pub fn write_vec3<W: Write>(w: &mut W, v: Vec3) -> io::Result<()> {
    for c in v.to_array() {
        write_f32(w, c)?;
    }
    Ok(())
}

pub fn read_vec3<R: Read>(r: &mut R) -> io::Result<Vec3> {
    Ok(Vec3::new(read_f32(r)?, read_f32(r)?, read_f32(r)?))
}

pub fn write_quat<W: Write>(w: &mut W, q: Quat) -> io::Result<()> {
    for c in q.to_array() {
        write_f32(w, c)?;
    }
    Ok(())
}

pub fn read_quat<R: Read>(r: &mut R) -> io::Result<Quat> {
    Ok(Quat::from_xyzw(read_f32(r)?, read_f32(r)?, read_f32(r)?, read_f32(r)?))
}

pub fn write_vec<W: Write, T: WireFormat>(w: &mut W, items: &[T]) -> io::Result<()> {
    write_len(w, items.len())?;
    for item in items {
        item.write_to(w)?;
    }
    Ok(())
}

pub fn read_vec<R: Read, T: WireFormat>(r: &mut R) -> io::Result<Vec<T>> {
    let len = read_len(r)?;
    let mut items = Vec::with_capacity(capacity_hint(len));
    for _ in 0..len {
        items.push(T::read_from(r)?);
    }
    Ok(items)
}

impl WireFormat for String {
    fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        write_string(w, self)
    }

    fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        read_string(r)
    }
}

impl WireFormat for Transform {
    fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        write_vec3(w, self.translation)?;
        write_quat(w, self.rotation)?;
        write_vec3(w, self.scale)
    }

    fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        Ok(Transform::new(read_vec3(r)?, read_quat(r)?, read_vec3(r)?))
    }
}

impl WireFormat for RangeBounds {
    fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        write_vec3(w, self.position_min)?;
        write_vec3(w, self.position_max)?;
        write_vec3(w, self.scale_min)?;
        write_vec3(w, self.scale_max)
    }

    fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        Ok(Self {
            position_min: read_vec3(r)?,
            position_max: read_vec3(r)?,
            scale_min: read_vec3(r)?,
            scale_max: read_vec3(r)?,
        })
    }
}

impl WireFormat for UserPayload {
    fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        write_string(w, &self.type_name)?;
        write_bytes(w, &self.bytes)
    }

    fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        Ok(Self {
            type_name: read_string(r)?,
            bytes: read_bytes(r)?,
        })
    }
}

impl WireFormat for MaterialParameters {
    fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        write_len(w, self.vectors.len())?;
        for (name, value) in &self.vectors {
            write_string(w, name)?;
            for c in value {
                write_f32(w, *c)?;
            }
        }
        write_len(w, self.scalars.len())?;
        for (name, value) in &self.scalars {
            write_string(w, name)?;
            write_f32(w, *value)?;
        }
        Ok(())
    }

    fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let mut vectors = BTreeMap::new();
        for _ in 0..read_len(r)? {
            let name = read_string(r)?;
            let value = [read_f32(r)?, read_f32(r)?, read_f32(r)?, read_f32(r)?];
            vectors.insert(name, value);
        }
        let mut scalars = BTreeMap::new();
        for _ in 0..read_len(r)? {
            let name = read_string(r)?;
            scalars.insert(name, read_f32(r)?);
        }
        Ok(Self { vectors, scalars })
    }
}

impl WireFormat for SubPartMeta {
    fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        write_string(w, &self.name)?;
        write_u8(w, self.kind.tag())?;
        if let SubPartKind::SkeletalMesh { leader } = &self.kind {
            write_bool(w, leader.is_some())?;
            write_string(w, leader.as_deref().unwrap_or_default())?;
        }
        write_string(w, &self.asset_path)?;
        write_vec(w, &self.material_paths)?;
        write_len(w, self.material_parameters.len())?;
        for (slot, params) in &self.material_parameters {
            write_i32(w, *slot)?;
            params.write_to(w)?;
        }
        Ok(())
    }

    fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let name = read_string(r)?;
        let kind = match read_u8(r)? {
            0 => SubPartKind::StaticMesh,
            1 => {
                let has_leader = read_bool(r)?;
                let leader = read_string(r)?;
                SubPartKind::SkeletalMesh {
                    leader: has_leader.then_some(leader),
                }
            }
            2 => SubPartKind::Groom,
            other => return Err(invalid(format!("Unknown sub-part kind {other}"))),
        };
        let asset_path = read_string(r)?;
        let material_paths = read_vec(r)?;
        let mut material_parameters = BTreeMap::new();
        for _ in 0..read_len(r)? {
            let slot = read_i32(r)?;
            material_parameters.insert(slot, MaterialParameters::read_from(r)?);
        }
        Ok(Self {
            name,
            kind,
            asset_path,
            material_paths,
            material_parameters,
        })
    }
}

impl WireFormat for ActivityInterval {
    fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        self.meta.write_to(w)?;
        write_i32(w, self.start_frame)?;
        write_i32(w, self.end_frame)
    }

    fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let meta = SubPartMeta::read_from(r)?;
        Ok(ActivityInterval::new(meta, read_i32(r)?, read_i32(r)?))
    }
}

pub fn write_string_set<W: Write>(w: &mut W, set: &BTreeSet<String>) -> io::Result<()> {
    write_len(w, set.len())?;
    for s in set {
        write_string(w, s)?;
    }
    Ok(())
}

pub fn read_string_set<R: Read>(r: &mut R) -> io::Result<BTreeSet<String>> {
    let len = read_len(r)?;
    let mut set = BTreeSet::new();
    for _ in 0..len {
        set.insert(read_string(r)?);
    }
    Ok(set)
}
