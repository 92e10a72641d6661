//! Bit-exact serialization: flattens a cache's header and block
//! descriptors to a contiguous byte blob, and rehydrates a blob back into a
//! cache whose callbacks are rebound from a caller-supplied template.
//!
//! This follows `omni_serial.c`'s `OmniSerialCache`/`OmniSerialBlockInfo`
//! trimmed-record layout, not `omnicache.c`'s cruder variant that dumps the
//! live struct verbatim (that variant embeds raw pointers and cannot survive
//! a process restart). Sample payload bytes are not encoded: `serialize`/
//! `deserialize` round-trip the header and descriptors only.

use std::io::{Cursor, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::block::{BlockInfo, DataType};
use crate::cache::{Cache, CacheFlags};
use crate::sample::SampleStore;
use crate::status::{cache_set_status, CacheStatus};
use crate::template::{CacheTemplate, MAX_NAME};
use crate::time::{FloatOrUint, TimeType};

fn write_name(out: &mut Vec<u8>, name: &str) {
    let mut bytes = [0u8; MAX_NAME];
    let src = name.as_bytes();
    let len = src.len().min(MAX_NAME);
    bytes[..len].copy_from_slice(&src[..len]);
    out.extend_from_slice(&bytes);
}

fn read_name(cursor: &mut Cursor<&[u8]>) -> Option<String> {
    let mut bytes = [0u8; MAX_NAME];
    cursor.read_exact(&mut bytes).ok()?;
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(MAX_NAME);
    String::from_utf8(bytes[..end].to_vec()).ok()
}

fn write_time_type(out: &mut Vec<u8>, time_type: TimeType) {
    out.write_u8(if time_type.is_float() { 1 } else { 0 }).unwrap();
}

fn read_time_type(cursor: &mut Cursor<&[u8]>) -> Option<TimeType> {
    Some(if cursor.read_u8().ok()? == 1 { TimeType::Float } else { TimeType::Int })
}

fn write_fu(out: &mut Vec<u8>, value: FloatOrUint) {
    match value {
        FloatOrUint::Float(v) => {
            out.write_u8(1).unwrap();
            out.write_f32::<LittleEndian>(v).unwrap();
        }
        FloatOrUint::Uint(v) => {
            out.write_u8(0).unwrap();
            out.write_u32::<LittleEndian>(v).unwrap();
        }
    }
}

fn read_fu(cursor: &mut Cursor<&[u8]>) -> Option<FloatOrUint> {
    let tag = cursor.read_u8().ok()?;
    if tag == 1 {
        Some(FloatOrUint::from_float(cursor.read_f32::<LittleEndian>().ok()?))
    } else {
        Some(FloatOrUint::from_uint(cursor.read_u32::<LittleEndian>().ok()?))
    }
}

/// Produces the cache-header record plus one block-descriptor record per
/// descriptor. `include_data` controls only whether the sample
/// counters reflect the live store or are zeroed; no sample bytes are ever
/// written (see module docs).
pub fn serialize<U>(cache: &Cache<U>, include_data: bool) -> Vec<u8> {
    let mut out = Vec::new();

    write_name(&mut out, &cache.id);
    write_time_type(&mut out, cache.time_type);
    write_fu(&mut out, cache.time_initial);
    write_fu(&mut out, cache.time_final);
    write_fu(&mut out, cache.time_step);
    out.write_u32::<LittleEndian>(cache.flags.bits()).unwrap();
    out.write_u32::<LittleEndian>(cache.blocks.len() as u32).unwrap();

    if include_data {
        out.write_u32::<LittleEndian>(cache.store.num_samples_array()).unwrap();
        out.write_u32::<LittleEndian>(cache.store.num_samples_tot).unwrap();
    } else {
        out.write_u32::<LittleEndian>(0).unwrap();
        out.write_u32::<LittleEndian>(0).unwrap();
    }

    out.write_u32::<LittleEndian>(cache.meta_size).unwrap();

    for block in &cache.blocks {
        write_name(&mut out, &block.name);
        out.write_u8(block.data_type as u8).unwrap();
        out.write_u32::<LittleEndian>(block.element_size).unwrap();
        out.write_u32::<LittleEndian>(block.flags.bits()).unwrap();
    }

    out
}

struct DecodedBlock {
    name: String,
    data_type: DataType,
    element_size: u32,
    flags: crate::block::BlockFlags,
}

/// Rehydrates a cache from `bytes`. Returns `None` if the blob is
/// malformed, or if `template` is given and its id does not match the
/// blob's. Descriptors whose name+slot match a template entry get
/// that entry's callbacks; unmatched descriptors get inert no-op
/// callbacks, since there is nothing else to bind them to.
pub fn deserialize<U>(bytes: &[u8], template: Option<&CacheTemplate<U>>) -> Option<Cache<U>> {
    let mut cursor = Cursor::new(bytes);

    let id = read_name(&mut cursor)?;
    if let Some(t) = template {
        if t.id != id {
            return None;
        }
    }

    let time_type = read_time_type(&mut cursor)?;
    let time_initial = read_fu(&mut cursor)?;
    let time_final = read_fu(&mut cursor)?;
    let time_step = read_fu(&mut cursor)?;
    let flags = CacheFlags::from_bits_truncate(cursor.read_u32::<LittleEndian>().ok()?);
    let num_blocks = cursor.read_u32::<LittleEndian>().ok()? as usize;
    let _num_samples_array = cursor.read_u32::<LittleEndian>().ok()?;
    let _num_samples_tot = cursor.read_u32::<LittleEndian>().ok()?;
    let meta_size = cursor.read_u32::<LittleEndian>().ok()?;

    let mut decoded = Vec::with_capacity(num_blocks);
    for _ in 0..num_blocks {
        let name = read_name(&mut cursor)?;
        let data_type = DataType::from_ordinal(cursor.read_u8().ok()?)?;
        let element_size = cursor.read_u32::<LittleEndian>().ok()?;
        let block_flags = crate::block::BlockFlags::from_bits_truncate(cursor.read_u32::<LittleEndian>().ok()?);
        decoded.push(DecodedBlock {
            name,
            data_type,
            element_size,
            flags: block_flags,
        });
    }

    let blocks = decoded
        .into_iter()
        .enumerate()
        .map(|(slot, d)| resolve_block::<U>(slot, d, template))
        .collect();

    let mut status = CacheStatus::empty();
    cache_set_status(&mut status, CacheStatus::CURRENT);

    Some(Cache {
        id,
        time_type,
        time_initial,
        time_final,
        time_step,
        flags,
        status,
        meta_size,
        meta_gen: template.and_then(|t| t.meta_gen.clone()),
        blocks,
        store: SampleStore::new(time_type),
        #[cfg(feature = "stats")]
        stats: crate::stats::CacheStats::default(),
    })
}

fn resolve_block<U>(slot: usize, decoded: DecodedBlock, template: Option<&CacheTemplate<U>>) -> BlockInfo<U> {
    let matching = template.and_then(|t| {
        t.blocks
            .get(slot)
            .filter(|b| b.name == decoded.name)
    });

    match matching {
        Some(b) => BlockInfo {
            name: decoded.name,
            data_type: decoded.data_type,
            element_size: decoded.element_size,
            flags: decoded.flags,
            count: std::rc::Rc::clone(&b.count),
            read: std::rc::Rc::clone(&b.read),
            write: std::rc::Rc::clone(&b.write),
            interp: b.interp.clone(),
        },
        None => BlockInfo {
            name: decoded.name,
            data_type: decoded.data_type,
            element_size: decoded.element_size,
            flags: decoded.flags,
            count: std::rc::Rc::new(|_: &U| 0),
            read: std::rc::Rc::new(|_, _: &mut U| false),
            write: std::rc::Rc::new(|_, _: &U| false),
            interp: None,
        },
    }
}
