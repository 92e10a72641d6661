//! Integration tests for the sample store's public behavior, exercised
//! through the cache façade rather than `SampleStore` directly.

use omnicache::block::{BlockFlags, DataType, OmniData};
use omnicache::cache::{Cache, CacheFlags, ReadResult, WriteResult};
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
        id: "sample-store".to_string(),
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
fn sequential_writes_then_reads() {
    let mut cache = float_cache(0.0, 10.0, 1.0);
    for t in [0.0, 1.0, 2.0] {
        let ud = Cell::new(t);
        assert_eq!(cache.sample_write(FloatOrUint::from_float(t), &ud), WriteResult::Success);
    }

    let ud = Cell::new(0.0);
    assert_eq!(
        cache.sample_read(FloatOrUint::from_float(1.0), &mut ud.clone()),
        ReadResult::EXACT
    );
    assert_eq!(
        cache.sample_read(FloatOrUint::from_float(5.0), &mut ud.clone()),
        ReadResult::empty()
    );

    assert_eq!(cache.num_samples_tot(), 3);
    assert_eq!(cache.num_samples_array(), 3);
}

#[test]
fn write_ahead_fills_skip_placeholders() {
    let mut cache = float_cache(0.0, 10.0, 1.0);
    let ud = Cell::new(5.0);
    assert_eq!(cache.sample_write(FloatOrUint::from_float(5.0), &ud), WriteResult::Success);

    assert_eq!(cache.num_samples_array(), 6);
    assert_eq!(cache.num_samples_tot(), 1);

    // Slots 0..=4 exist but were never written, so reads through them
    // all miss.
    for t in [0.0, 1.0, 2.0, 3.0, 4.0] {
        assert_eq!(
            cache.sample_read(FloatOrUint::from_float(t), &mut ud.clone()),
            ReadResult::empty()
        );
    }
    assert_eq!(
        cache.sample_read(FloatOrUint::from_float(5.0), &mut ud.clone()),
        ReadResult::EXACT
    );
}

#[test]
fn sub_sample_leaves_root_as_skip() {
    let mut cache = float_cache(0.0, 10.0, 1.0);
    let ud = Cell::new(0.5);
    assert_eq!(cache.sample_write(FloatOrUint::from_float(0.5), &ud), WriteResult::Success);

    assert_eq!(cache.num_samples_array(), 1, "only the root slot at index 0 is populated");
    assert_eq!(cache.num_samples_tot(), 1);

    assert_eq!(
        cache.sample_read(FloatOrUint::from_float(0.0), &mut ud.clone()),
        ReadResult::empty(),
        "root at slot 0 remains SKIP; only its 0.5 sub-sample is live"
    );
    assert_eq!(
        cache.sample_read(FloatOrUint::from_float(0.5), &mut ud.clone()),
        ReadResult::EXACT
    );
}

#[test]
fn out_of_order_sub_sample_writes_stay_sorted_by_offset() {
    let mut cache = float_cache(0.0, 10.0, 1.0);
    for offset in [0.7, 0.2, 0.5] {
        let ud = Cell::new(offset);
        cache.sample_write(FloatOrUint::from_float(offset), &ud);
    }
    assert_eq!(cache.num_samples_tot(), 3);

    for offset in [0.2, 0.5, 0.7] {
        let mut ud = Cell::new(0.0);
        assert_eq!(
            cache.sample_read(FloatOrUint::from_float(offset), &mut ud),
            ReadResult::EXACT
        );
        assert_eq!(ud.get(), offset);
    }
}

#[test]
fn growth_past_initial_allocation_preserves_existing_samples() {
    let mut cache = float_cache(0.0, 100.0, 1.0);
    for t in [0.0, 5.0, 9.0] {
        let ud = Cell::new(t);
        cache.sample_write(FloatOrUint::from_float(t), &ud);
    }
    assert_eq!(cache.num_samples_array(), 10);

    // Triggers a reallocation of the backing sample array.
    let ud = Cell::new(20.0);
    cache.sample_write(FloatOrUint::from_float(20.0), &ud);
    assert_eq!(cache.num_samples_array(), 21);

    for t in [0.0, 5.0, 9.0, 20.0] {
        let mut out = Cell::new(0.0);
        assert_eq!(
            cache.sample_read(FloatOrUint::from_float(t), &mut out),
            ReadResult::EXACT,
            "sample at t={t} must survive array growth"
        );
        assert_eq!(out.get(), t);
    }
}
