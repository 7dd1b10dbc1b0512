//! Clip payload serialization: entities, intervals, ranges and quantized frames.

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};

use rayon::prelude::*;

use super::quantize::{decode_transform, encode_transform};
use super::wire::{
    WireFormat, capacity_hint, read_f32, read_i32, read_len, read_string, read_vec, write_f32,
    write_i32, write_len, write_string, write_vec,
};
use crate::error::{ReplayError, Result};
use crate::pose::{Clip, ClipRanges, RangeBounds, Sample};
use crate::schema::QuantizationMethod;

/// Serialize every clip into one uncompressed payload.
///
/// Clips are encoded in parallel and concatenated in order.
pub fn write_body(clips: &[Clip], method: QuantizationMethod) -> Result<Vec<u8>> {
    let parts: Vec<Vec<u8>> = clips
        .par_iter()
        .map(|clip| {
            let mut buf = Vec::new();
            write_clip(&mut buf, clip, method)?;
            Ok(buf)
        })
        .collect::<Result<_>>()?;

    let total = 4 + parts.iter().map(Vec::len).sum::<usize>();
    let mut out = Vec::with_capacity(total);
    write_len(&mut out, clips.len())?;
    for part in parts {
        out.extend_from_slice(&part);
    }
    Ok(out)
}

/// Parse a payload produced by [`write_body`].
pub fn read_body(bytes: &[u8], method: QuantizationMethod) -> Result<Vec<Clip>> {
    let mut r = Cursor::new(bytes);
    let parsed = read_clips(&mut r, method);
    parsed.map_err(|e| match e {
        ReplayError::Io(err) => ReplayError::from_read(err, bytes.len(), r.position() as usize),
        other => other,
    })
}

fn read_clips<R: Read>(r: &mut R, method: QuantizationMethod) -> Result<Vec<Clip>> {
    let count = read_len(r)?;
    let mut clips = Vec::with_capacity(capacity_hint(count));
    for _ in 0..count {
        clips.push(read_clip(r, method)?);
    }
    Ok(clips)
}

fn write_clip<W: Write>(w: &mut W, clip: &Clip, method: QuantizationMethod) -> Result<()> {
    write_string(w, &clip.primary_part)?;
    write_vec(w, &clip.intervals)?;

    clip.ranges.global.write_to(w)?;
    write_len(w, clip.ranges.bones.len())?;
    for (name, range) in &clip.ranges.bones {
        write_string(w, name)?;
        range.write_to(w)?;
    }

    write_len(w, clip.samples.len())?;
    for sample in &clip.samples {
        write_f32(w, sample.timestamp)?;
        write_i32(w, sample.frame_index)?;

        write_len(w, sample.transforms.len())?;
        for (name, t) in &sample.transforms {
            write_string(w, name)?;
            encode_transform(w, t, method, Some(&clip.ranges.global))?;
        }

        write_len(w, sample.bones.len())?;
        for (name, bones) in &sample.bones {
            let range = clip.ranges.bones.get(name);
            if method.needs_range() && range.is_none() && !bones.is_empty() {
                return Err(ReplayError::RangeUnavailable(format!("bone set '{name}'")));
            }
            write_string(w, name)?;
            write_len(w, bones.len())?;
            for t in bones {
                encode_transform(w, t, method, range)?;
            }
        }
    }
    Ok(())
}

fn read_clip<R: Read>(r: &mut R, method: QuantizationMethod) -> Result<Clip> {
    let primary_part = read_string(r)?;
    let intervals = read_vec(r)?;

    let global = RangeBounds::read_from(r)?;
    let mut bone_ranges = BTreeMap::new();
    for _ in 0..read_len(r)? {
        let name = read_string(r)?;
        bone_ranges.insert(name, RangeBounds::read_from(r)?);
    }
    let ranges = ClipRanges {
        global,
        bones: bone_ranges,
    };

    let frame_count = read_len(r)?;
    let mut samples = Vec::with_capacity(capacity_hint(frame_count));
    for _ in 0..frame_count {
        let mut sample = Sample::new(read_f32(r)?, read_i32(r)?);

        for _ in 0..read_len(r)? {
            let name = read_string(r)?;
            let t = decode_transform(r, method, Some(&ranges.global))?;
            sample.transforms.insert(name, t);
        }

        for _ in 0..read_len(r)? {
            let name = read_string(r)?;
            let count = read_len(r)?;
            let range = ranges.bones.get(&name);
            if method.needs_range() && range.is_none() && count > 0 {
                return Err(ReplayError::RangeUnavailable(format!("bone set '{name}'")));
            }
            let mut bones = Vec::with_capacity(capacity_hint(count));
            for _ in 0..count {
                bones.push(decode_transform(r, method, range)?);
            }
            sample.bones.insert(name, bones);
        }

        samples.push(sample);
    }

    Ok(Clip {
        primary_part,
        intervals,
        ranges,
        samples,
    })
}
