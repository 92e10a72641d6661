//! # OmniCache basic usage
//!
//! Demonstrates the core lifecycle a host application drives: building a
//! `CacheTemplate` with one `FLOAT` and one `FLOAT3` block, writing samples
//! on and off the time grid, reading them back, marking a range stale, and
//! reclaiming it with `consolidate`.

use std::cell::RefCell;
use std::rc::Rc;

use omnicache::block::{BlockFlags, DataType, OmniData};
use omnicache::cache::{Cache, CacheFlags, ConsolidationFlags};
use omnicache::template::{BlockTemplate, CacheTemplate};
use omnicache::time::{FloatOrUint, TimeType};

/// The host's own state: a simulated particle's position and velocity at
/// whatever time the cache last asked it to produce output for.
#[derive(Clone, Copy, Default)]
struct ParticleState {
    position: [f32; 3],
    speed: f32,
}

fn build_template() -> CacheTemplate<RefCell<ParticleState>> {
    let position_count: omnicache::block::CountCallback<RefCell<ParticleState>> = Rc::new(|_| 1);
    let position_write: omnicache::block::WriteCallback<RefCell<ParticleState>> =
        Rc::new(|data: &mut OmniData, state: &RefCell<ParticleState>| {
            let position = state.borrow().position;
            for (chunk, value) in data.data.chunks_mut(4).zip(position.iter()) {
                chunk.copy_from_slice(&value.to_le_bytes());
            }
            true
        });
    let position_read: omnicache::block::ReadCallback<RefCell<ParticleState>> =
        Rc::new(|data: &OmniData, state: &mut RefCell<ParticleState>| {
            let mut position = [0.0f32; 3];
            for (chunk, value) in data.data.chunks(4).zip(position.iter_mut()) {
                *value = f32::from_le_bytes(chunk.try_into().unwrap());
            }
            state.borrow_mut().position = position;
            true
        });

    let speed_count: omnicache::block::CountCallback<RefCell<ParticleState>> = Rc::new(|_| 1);
    let speed_write: omnicache::block::WriteCallback<RefCell<ParticleState>> =
        Rc::new(|data: &mut OmniData, state: &RefCell<ParticleState>| {
            let speed = state.borrow().speed;
            data.data[0..4].copy_from_slice(&speed.to_le_bytes());
            true
        });
    let speed_read: omnicache::block::ReadCallback<RefCell<ParticleState>> =
        Rc::new(|data: &OmniData, state: &mut RefCell<ParticleState>| {
            let speed = f32::from_le_bytes(data.data[0..4].try_into().unwrap());
            state.borrow_mut().speed = speed;
            true
        });

    CacheTemplate {
        id: "particle-sim".to_string(),
        time_type: TimeType::Float,
        time_initial: FloatOrUint::from_float(0.0),
        time_final: FloatOrUint::from_float(5.0),
        time_step: FloatOrUint::from_float(1.0),
        flags: CacheFlags::empty(),
        meta_size: 0,
        meta_gen: None,
        blocks: vec![
            BlockTemplate {
                name: "position".to_string(),
                data_type: DataType::Float3,
                data_size: 0,
                flags: BlockFlags::CONTINUOUS,
                count: position_count,
                read: position_read,
                write: position_write,
                interp: None,
            },
            BlockTemplate {
                name: "speed".to_string(),
                data_type: DataType::Float,
                data_size: 0,
                flags: BlockFlags::empty(),
                count: speed_count,
                read: speed_read,
                write: speed_write,
                interp: None,
            },
        ],
    }
}

fn main() {
    let mut cache = Cache::new(build_template());

    for t in 0..=3 {
        let state = RefCell::new(ParticleState {
            position: [t as f32, t as f32 * 2.0, 0.0],
            speed: t as f32 * 0.5,
        });
        cache.sample_write(FloatOrUint::from_float(t as f32), &state);
    }

    let mut out = RefCell::new(ParticleState::default());
    let result = cache.sample_read(FloatOrUint::from_float(2.0), &mut out);
    println!("read at t=2: {:?} -> {result:?}", out.borrow().position);

    println!(
        "samples: {} populated of {} array slots",
        cache.num_samples_tot(),
        cache.num_samples_array()
    );

    cache.sample_mark_outdated(FloatOrUint::from_float(1.0));
    cache.consolidate(ConsolidationFlags::FREE_OUTDATED);
    println!("after consolidating away the stale t=1 sample: {} remain", cache.num_samples_tot());

    let bytes = cache.serialize(false);
    println!("serialized header+descriptors to {} bytes", bytes.len());
}
