//! Integration tests for status-lattice monotonicity as observed through
//! the cache façade: outdated/invalid overlays, propagation to later
//! samples, and write/meta-gen failure clearing validity.

use omnicache::block::{BlockFlags, DataType, OmniData};
use omnicache::cache::{Cache, CacheFlags, ConsolidationFlags, ReadResult, WriteResult};
use omnicache::template::{BlockTemplate, CacheTemplate};
use omnicache::time::{FloatOrUint, TimeType};
use std::cell::Cell;
use std::rc::Rc;

fn float_cache(initial: f32, final_: f32, step: f32) -> Cache<Cell<f32>> {
    let count: omnicache::block::CountCallback<Cell<f32>> = Rc::new(|_u: &Cell<f32>| 1u32);
    let write: omnicache::block::WriteCallback<Cell<f32>> = Rc::new(|data: &mut OmniData, u: &Cell<f32>| {
        data.data[0..4].copy_from_slice(&u.get().to_le_bytes());
        true
    });
    let read: omnicache::block::ReadCallback<Cell<f32>> = Rc::new(|data: &OmniData, u: &Cell<f32>| {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&data.data[0..4]);
        u.set(f32::from_le_bytes(bytes));
        true
    });

    let template = CacheTemplate {
        id: "status-lattice".to_string(),
        time_type: TimeType::Float,
        time_initial: FloatOrUint::from_float(initial),
        time_final: FloatOrUint::from_float(final_),
        time_step: FloatOrUint::from_float(step),
        flags: CacheFlags::empty(),
        meta_size: 0,
        meta_gen: None,
        blocks: vec![BlockTemplate {
            name: "value".to_string(),
            data_type: DataType::Float,
            data_size: 0,
            flags: BlockFlags::empty(),
            count,
            read,
            write,
            interp: None,
        }],
    };

    Cache::new(template)
}

#[test]
fn mark_outdated_surfaces_as_overlay_bit() {
    let mut cache = float_cache(0.0, 10.0, 1.0);
    for t in [0.0, 1.0, 2.0] {
        let ud = Cell::new(t);
        cache.sample_write(FloatOrUint::from_float(t), &ud);
    }

    cache.mark_outdated();
    let mut ud = Cell::new(0.0);
    let result = cache.sample_read(FloatOrUint::from_float(1.0), &mut ud);
    assert_eq!(result, ReadResult::EXACT | ReadResult::OUTDATED);

    cache.consolidate(ConsolidationFlags::FREE_OUTDATED);
    assert_eq!(cache.num_samples_tot(), 0);
}

#[test]
fn mark_invalid_on_one_sample_hides_only_that_sample() {
    let mut cache = float_cache(0.0, 10.0, 1.0);
    for t in [0.0, 1.0] {
        let ud = Cell::new(t);
        cache.sample_write(FloatOrUint::from_float(t), &ud);
    }

    assert!(cache.sample_mark_invalid(FloatOrUint::from_float(0.0)));

    let mut ud = Cell::new(0.0);
    assert_eq!(
        cache.sample_read(FloatOrUint::from_float(0.0), &mut ud),
        ReadResult::empty()
    );
    assert_eq!(cache.sample_read(FloatOrUint::from_float(1.0), &mut ud), ReadResult::EXACT);

    // Samples still exist (mark_invalid does not remove), just unreadable.
    assert_eq!(cache.num_samples_tot(), 2);
}

#[test]
fn mark_invalid_on_absent_sample_is_a_silent_no_op() {
    let mut cache = float_cache(0.0, 10.0, 1.0);
    assert!(!cache.sample_mark_invalid(FloatOrUint::from_float(7.0)));
    assert!(!cache.sample_mark_outdated(FloatOrUint::from_float(7.0)));
    assert!(!cache.sample_clear(FloatOrUint::from_float(7.0)));
}

#[test]
fn write_failure_clears_validity_instead_of_panicking() {
    let count: omnicache::block::CountCallback<()> = Rc::new(|_: &()| 1u32);
    let write: omnicache::block::WriteCallback<()> = Rc::new(|_: &mut OmniData, _: &()| false);
    let read: omnicache::block::ReadCallback<()> = Rc::new(|_: &OmniData, _: &()| true);

    let template = CacheTemplate {
        id: "write-fail".to_string(),
        time_type: TimeType::Float,
        time_initial: FloatOrUint::from_float(0.0),
        time_final: FloatOrUint::from_float(10.0),
        time_step: FloatOrUint::from_float(1.0),
        flags: CacheFlags::empty(),
        meta_size: 0,
        meta_gen: None,
        blocks: vec![BlockTemplate {
            name: "value".to_string(),
            data_type: DataType::Float,
            data_size: 0,
            flags: BlockFlags::empty(),
            count,
            read,
            write,
            interp: None,
        }],
    };

    let mut cache = Cache::new(template);
    assert_eq!(cache.sample_write(FloatOrUint::from_float(0.0), &()), WriteResult::Failed);

    let mut ud = ();
    assert_eq!(cache.sample_read(FloatOrUint::from_float(0.0), &mut ud), ReadResult::empty());
}

#[test]
fn mark_outdated_from_propagates_to_every_later_sample() {
    let mut cache = float_cache(0.0, 10.0, 1.0);
    for t in [0.0, 1.0, 2.0, 3.0] {
        let ud = Cell::new(t);
        cache.sample_write(FloatOrUint::from_float(t), &ud);
    }

    cache.sample_mark_outdated_from(FloatOrUint::from_float(2.0));

    let mut ud = Cell::new(0.0);
    assert_eq!(cache.sample_read(FloatOrUint::from_float(1.0), &mut ud), ReadResult::EXACT);
    assert_eq!(
        cache.sample_read(FloatOrUint::from_float(2.0), &mut ud),
        ReadResult::EXACT | ReadResult::OUTDATED
    );
    assert_eq!(
        cache.sample_read(FloatOrUint::from_float(3.0), &mut ud),
        ReadResult::EXACT | ReadResult::OUTDATED
    );
}

#[test]
fn meta_gen_failure_invalidates_the_sample_even_when_every_block_wrote_fine() {
    let count: omnicache::block::CountCallback<()> = Rc::new(|_: &()| 1u32);
    let write: omnicache::block::WriteCallback<()> = Rc::new(|_: &mut OmniData, _: &()| true);
    let read: omnicache::block::ReadCallback<()> = Rc::new(|_: &OmniData, _: &()| true);
    let meta_gen: omnicache::block::MetaGenCallback<()> = Rc::new(|_: &(), _: &mut [u8]| false);

    let template = CacheTemplate {
        id: "meta-fail".to_string(),
        time_type: TimeType::Float,
        time_initial: FloatOrUint::from_float(0.0),
        time_final: FloatOrUint::from_float(10.0),
        time_step: FloatOrUint::from_float(1.0),
        flags: CacheFlags::empty(),
        meta_size: 8,
        meta_gen: Some(meta_gen),
        blocks: vec![BlockTemplate {
            name: "value".to_string(),
            data_type: DataType::Float,
            data_size: 0,
            flags: BlockFlags::empty(),
            count,
            read,
            write,
            interp: None,
        }],
    };

    let mut cache = Cache::new(template);
    assert_eq!(cache.sample_write(FloatOrUint::from_float(0.0), &()), WriteResult::Failed);

    let mut ud = ();
    assert_eq!(cache.sample_read(FloatOrUint::from_float(0.0), &mut ud), ReadResult::empty());
}

#[test]
fn meta_gen_success_does_not_block_reads() {
    let count: omnicache::block::CountCallback<()> = Rc::new(|_: &()| 1u32);
    let write: omnicache::block::WriteCallback<()> = Rc::new(|_: &mut OmniData, _: &()| true);
    let read: omnicache::block::ReadCallback<()> = Rc::new(|_: &OmniData, _: &()| true);
    let meta_gen: omnicache::block::MetaGenCallback<()> = Rc::new(|_: &(), buf: &mut [u8]| {
        buf.fill(0xAB);
        true
    });

    let template = CacheTemplate {
        id: "meta-ok".to_string(),
        time_type: TimeType::Float,
        time_initial: FloatOrUint::from_float(0.0),
        time_final: FloatOrUint::from_float(10.0),
        time_step: FloatOrUint::from_float(1.0),
        flags: CacheFlags::empty(),
        meta_size: 4,
        meta_gen: Some(meta_gen),
        blocks: vec![BlockTemplate {
            name: "value".to_string(),
            data_type: DataType::Float,
            data_size: 0,
            flags: BlockFlags::empty(),
            count,
            read,
            write,
            interp: None,
        }],
    };

    let mut cache = Cache::new(template);
    assert_eq!(cache.sample_write(FloatOrUint::from_float(0.0), &()), WriteResult::Success);

    let mut ud = ();
    assert_eq!(cache.sample_read(FloatOrUint::from_float(0.0), &mut ud), ReadResult::EXACT);
}
